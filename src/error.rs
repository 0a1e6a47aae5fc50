//! Service errors and their HTTP mapping.
//!
//! Handlers return `AppResult<T>`; every variant maps to a status code and a
//! plain-text body the web client shows to the user as-is.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Unknown login id or wrong password (deliberately indistinguishable)
    #[error("Unregistered login ID or incorrect password.")]
    InvalidLogin,

    #[error("This ID already exists.")]
    DuplicateLoginId,

    #[error("User not found.")]
    UserNotFound,

    #[error("History not found: {0}")]
    HistoryNotFound(String),

    #[error("History already exists: {0}")]
    DuplicateHistory(String),

    #[error("{0}")]
    Validation(String),

    #[error("User not authenticated")]
    Unauthorized,

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database unavailable")]
    Lock,

    #[error("Failed to process password")]
    Password,

    #[error("Could not allocate a guest session")]
    GuestIdExhausted,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidLogin | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::DuplicateLoginId | Self::DuplicateHistory(_) | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::UserNotFound | Self::HistoryNotFound(_) => StatusCode::NOT_FOUND,
            Self::Db(_) | Self::Lock | Self::Password | Self::GuestIdExhausted => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            // Keep SQL details in the log, not in the response
            Self::Db(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            Self::Lock | Self::Password | Self::GuestIdExhausted => {
                tracing::error!("{}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };
        (status, body).into_response()
    }
}
