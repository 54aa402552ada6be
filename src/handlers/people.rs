use crate::db::Conn;
use crate::error::{ApiError, ApiResult};
use crate::extract::{BodyFields, QueryParams};
use crate::models::*;
use crate::validation::{parse_person_id, person_input, sanitize_map};
use axum::{
    extract::OriginalUri,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

impl PeopleQuery {
    /// The optional `id` parameter. It must be numeric whenever it is given,
    /// whatever the method.
    fn id(&self) -> ApiResult<Option<i64>> {
        self.id.as_deref().map(parse_person_id).transpose()
    }

    fn required_id(&self, method: &str) -> ApiResult<i64> {
        self.id()?.ok_or_else(|| {
            ApiError::validation(format!("ID is required for {} requests", method))
        })
    }
}

pub async fn get_people(
    Conn(mut conn): Conn,
    QueryParams(params): QueryParams<PeopleQuery>,
) -> ApiResult<Response> {
    match params.id()? {
        None => {
            let people = sqlx::query_as::<_, Person>(
                "SELECT id, firstname, lastname, phone FROM people ORDER BY id",
            )
            .fetch_all(&mut *conn)
            .await?;

            if people.is_empty() {
                return Ok((
                    StatusCode::NO_CONTENT,
                    Json(StatusResponse {
                        message: "No people found".to_string(),
                    }),
                )
                    .into_response());
            }

            tracing::debug!("Returning {} people", people.len());
            Ok(Json(people).into_response())
        }
        Some(id) => {
            let person = sqlx::query_as::<_, Person>(
                "SELECT id, firstname, lastname, phone FROM people WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| ApiError::not_found("Person not found"))?;

            Ok(Json(person).into_response())
        }
    }
}

pub async fn create_person(
    Conn(mut conn): Conn,
    OriginalUri(uri): OriginalUri,
    QueryParams(params): QueryParams<PeopleQuery>,
    BodyFields(fields): BodyFields,
) -> ApiResult<Response> {
    params.id()?;
    let input = person_input(&sanitize_map(fields))?;

    let result = sqlx::query("INSERT INTO people (firstname, lastname, phone) VALUES (?, ?, ?)")
        .bind(&input.firstname)
        .bind(&input.lastname)
        .bind(&input.phone)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Internal(
            "Failed to create person entry".to_string(),
        ));
    }

    let id = result.last_insert_rowid();
    tracing::info!(id, "Created person");

    let location = format!("{}?id={}", uri.path(), id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(PersonMutationResponse {
            id,
            message: "Successfully created person entry".to_string(),
        }),
    )
        .into_response())
}

pub async fn update_person(
    Conn(mut conn): Conn,
    QueryParams(params): QueryParams<PeopleQuery>,
    BodyFields(fields): BodyFields,
) -> ApiResult<Json<PersonMutationResponse>> {
    let id = params.required_id("PUT")?;
    let input = person_input(&sanitize_map(fields))?;

    // A missing row shows up as zero affected rows.
    let result = sqlx::query(
        "UPDATE people SET firstname = ?, lastname = ?, phone = ? WHERE id = ?",
    )
    .bind(&input.firstname)
    .bind(&input.lastname)
    .bind(&input.phone)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Person not found"));
    }

    tracing::info!(id, "Updated person");

    Ok(Json(PersonMutationResponse {
        id,
        message: "Successfully updated person entry".to_string(),
    }))
}

pub async fn delete_person(
    Conn(mut conn): Conn,
    QueryParams(params): QueryParams<PeopleQuery>,
) -> ApiResult<Json<StatusResponse>> {
    let id = params.required_id("DELETE")?;

    let result = sqlx::query("DELETE FROM people WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Person not found"));
    }

    tracing::info!(id, "Deleted person");

    Ok(Json(StatusResponse {
        message: "Successfully deleted person entry".to_string(),
    }))
}
