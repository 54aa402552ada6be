use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Person {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
}

/// The three writable person fields, already sanitized and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonInput {
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Message {
    pub id: i64,
    pub sent: DateTime<Utc>,
    pub source: String,
    pub target: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub source: String,
    pub target: String,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PeopleQuery {
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    pub source: Option<String>,
    pub target: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PersonMutationResponse {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateMessageResponse {
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
