use crate::error::ApiError;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Query string parameters. A repeated key keeps its last value, and any
/// failure is reported as a JSON validation error.
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or_default();
        let fields = decode_form(query.as_bytes())
            .ok_or_else(|| ApiError::validation("Malformed query string"))?;

        serde_json::from_value(Value::Object(fields))
            .map(QueryParams)
            .map_err(|e| ApiError::validation(format!("Invalid query string: {}", e)))
    }
}

/// Request body decoded into a flat field map.
///
/// A JSON object is tried first; when the body is empty, not JSON, or an
/// empty object, it is read as `application/x-www-form-urlencoded` instead.
/// Anything else yields an empty map and is left to validation to reject.
#[derive(Debug, Default)]
pub struct BodyFields(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for BodyFields
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(format!("Unreadable request body: {}", e)))?;

        Ok(BodyFields(parse_fields(&bytes)))
    }
}

pub fn parse_fields(body: &[u8]) -> Map<String, Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Map::new();
    }
    match decode_json(body) {
        Some(fields) if !fields.is_empty() => fields,
        _ => decode_form(body).unwrap_or_default(),
    }
}

fn decode_json(body: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body).ok()? {
        Value::Object(fields) => Some(fields),
        _ => None,
    }
}

// Later pairs overwrite earlier ones with the same key.
fn decode_form(body: &[u8]) -> Option<Map<String, Value>> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body).ok()?;
    Some(
        pairs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
    )
}
