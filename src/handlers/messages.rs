use crate::db::Conn;
use crate::error::{ApiError, ApiResult};
use crate::extract::{BodyFields, QueryParams};
use crate::models::*;
use crate::validation::{is_valid_message_content, is_valid_username};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

/// Which side(s) of a conversation a read is filtered on.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageFilter {
    Between { source: String, target: String },
    From(String),
    To(String),
}

impl MessageFilter {
    pub fn from_query(query: &MessagesQuery) -> ApiResult<Self> {
        let source = present(query.source.as_deref());
        let target = present(query.target.as_deref());

        if let Some(source) = source {
            if !is_valid_username(source) {
                return Err(ApiError::validation("Invalid source username"));
            }
        }
        if let Some(target) = target {
            if !is_valid_username(target) {
                return Err(ApiError::validation("Invalid target username"));
            }
        }

        match (source, target) {
            (None, None) => Err(ApiError::validation(
                "At least one of source or target is required",
            )),
            (Some(s), Some(t)) if s == t => Err(ApiError::validation(
                "Source and target must be different users",
            )),
            (Some(s), Some(t)) => Ok(MessageFilter::Between {
                source: s.to_string(),
                target: t.to_string(),
            }),
            (Some(s), None) => Ok(MessageFilter::From(s.to_string())),
            (None, Some(t)) => Ok(MessageFilter::To(t.to_string())),
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            MessageFilter::Between { .. } => {
                "SELECT id, sent, source, target, message FROM message \
                 WHERE source = ? AND target = ? ORDER BY sent ASC, id ASC"
            }
            MessageFilter::From(_) => {
                "SELECT id, sent, source, target, message FROM message \
                 WHERE source = ? ORDER BY sent ASC, id ASC"
            }
            MessageFilter::To(_) => {
                "SELECT id, sent, source, target, message FROM message \
                 WHERE target = ? ORDER BY sent ASC, id ASC"
            }
        }
    }

    fn params(&self) -> Vec<&str> {
        match self {
            MessageFilter::Between { source, target } => vec![source.as_str(), target.as_str()],
            MessageFilter::From(user) | MessageFilter::To(user) => vec![user.as_str()],
        }
    }
}

// Blank query parameters count as absent.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl NewMessage {
    /// Checks a decoded body: all three fields present, both usernames valid
    /// and distinct, message text string-typed. Usernames are trimmed, the
    /// message text is kept verbatim.
    pub fn from_fields(fields: &Map<String, Value>) -> ApiResult<Self> {
        let (Some(source), Some(target), Some(message)) = (
            fields.get("source"),
            fields.get("target"),
            fields.get("message"),
        ) else {
            return Err(ApiError::validation(
                "Missing required fields(source, target, message)",
            ));
        };

        let source = username_field(source)
            .ok_or_else(|| ApiError::validation("Invalid source username"))?;
        let target = username_field(target)
            .ok_or_else(|| ApiError::validation("Invalid target username"))?;

        if !is_valid_message_content(Some(message)) {
            return Err(ApiError::validation("Invalid message content"));
        }

        if source == target {
            return Err(ApiError::validation(
                "Source and target must be different users",
            ));
        }

        Ok(NewMessage {
            source,
            target,
            message: message.as_str().unwrap_or_default().to_string(),
        })
    }
}

fn username_field(value: &Value) -> Option<String> {
    let name = value.as_str()?.trim();
    is_valid_username(name).then(|| name.to_string())
}

pub async fn get_messages(
    Conn(mut conn): Conn,
    QueryParams(query): QueryParams<MessagesQuery>,
) -> ApiResult<Response> {
    let filter = MessageFilter::from_query(&query)?;
    tracing::debug!(?filter, "Querying messages");

    let mut select = sqlx::query_as::<_, Message>(filter.sql());
    for param in filter.params() {
        select = select.bind(param);
    }
    let messages = select.fetch_all(&mut *conn).await?;

    tracing::debug!("Query returned {} messages", messages.len());

    if messages.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    Ok(Json(MessagesResponse { messages }).into_response())
}

pub async fn create_message(
    Conn(mut conn): Conn,
    BodyFields(fields): BodyFields,
) -> ApiResult<(StatusCode, Json<CreateMessageResponse>)> {
    let new_message = NewMessage::from_fields(&fields)?;

    let result =
        sqlx::query("INSERT INTO message (source, target, message, sent) VALUES (?, ?, ?, ?)")
            .bind(&new_message.source)
            .bind(&new_message.target)
            .bind(&new_message.message)
            .bind(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
            .execute(&mut *conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Internal("Failed to create message".to_string()));
    }

    let id = result.last_insert_rowid();
    tracing::info!(
        id,
        source = %new_message.source,
        target = %new_message.target,
        "Message stored"
    );

    Ok((StatusCode::CREATED, Json(CreateMessageResponse { id })))
}
