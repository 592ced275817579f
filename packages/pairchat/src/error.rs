use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Errors surfaced by the messaging core and the account store.
///
/// Only [`ChatError::Persistence`] can come out of a message submission
/// after validation; broadcast delivery never produces an error.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message body must not be empty")]
    EmptyBody,

    #[error("failed to persist: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("registration is disabled")]
    RegistrationClosed,

    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] password_hash::Error),

    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl ChatError {
    pub fn status(&self) -> StatusCode {
        match self {
            ChatError::EmptyBody | ChatError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ChatError::NotFound(_) => StatusCode::NOT_FOUND,
            ChatError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ChatError::Conflict(_) => StatusCode::CONFLICT,
            ChatError::RegistrationClosed => StatusCode::FORBIDDEN,
            ChatError::Persistence(_) | ChatError::PasswordHash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T, E = ChatError> = std::result::Result<T, E>;
