//! Server error types.
//!
//! [`ServerError`] covers startup and storage failures. [`ApiError`] is what
//! a route returns; its [`IntoResponse`] impl is the single place where
//! errors become HTTP statuses and JSON bodies.

use std::io;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;
use umi_protocol::{ErrorCode, ErrorResponse, ValidationError};

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (socket, store file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The store file is not valid JSON.
    #[error("credential store is corrupted: {0}")]
    StoreFormat(#[from] serde_json::Error),

    /// No stored calendar matches.
    #[error("calendar not found: {email}")]
    CalendarNotFound { email: String },

    /// The email matches calendars of several users.
    #[error("{email} belongs to several users; pass the user")]
    AmbiguousCalendar { email: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a calendar-not-found error.
    pub fn calendar_not_found(email: impl Into<String>) -> Self {
        Self::CalendarNotFound {
            email: email.into(),
        }
    }
}

/// A failed API request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The body or query string did not deserialize.
    #[error("invalid request: {0}")]
    MalformedBody(String),

    /// Missing or wrong key.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// No matching calendar.
    #[error("{0}")]
    NotFound(String),

    /// Anything else; `details` is only filled in debug deployments.
    #[error("{message}")]
    Unexpected {
        message: String,
        details: Option<String>,
    },
}

impl ApiError {
    /// Creates an unexpected error, keeping `cause` only when `debug` is set.
    pub fn unexpected(message: impl Into<String>, cause: impl std::fmt::Display, debug: bool) -> Self {
        let message = message.into();
        error!(error = %cause, "{}", message);
        Self::Unexpected {
            message,
            details: debug.then(|| cause.to_string()),
        }
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unexpected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) | Self::MalformedBody(_) => ErrorCode::ValidationError,
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Unexpected { .. } => ErrorCode::InternalError,
        }
    }
}

impl From<ServerError> for ApiError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::CalendarNotFound { .. } => Self::NotFound("Calendar not found".to_string()),
            e @ ServerError::AmbiguousCalendar { .. } => Self::MalformedBody(e.to_string()),
            other => {
                error!(error = %other, "request failed");
                Self::Unexpected {
                    message: "Internal server error".to_string(),
                    details: None,
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = ErrorResponse::new(self.code(), self.to_string());
        if let Self::Unexpected {
            details: Some(details),
            ..
        } = self
        {
            body = body.with_details(details);
        }
        (status, Json(body)).into_response()
    }
}
