pub mod messages;
pub mod people;

use crate::db::Conn;
use crate::error::ApiError;
use crate::models::StatusResponse;
use axum::Json;

pub async fn health_check() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "OK".to_string(),
    })
}

/// Fallback for verbs a resource does not serve. Storage is still checked
/// first so an unreachable database reports 500 on every request.
pub async fn method_not_allowed(_conn: Conn) -> ApiError {
    ApiError::MethodNotAllowed
}
