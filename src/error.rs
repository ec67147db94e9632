use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Message shared by every credential failure so unknown emails and wrong
/// passwords cannot be told apart.
pub const AUTH_FAILED: &str = "email or password invalid";

#[derive(Debug, Error)]
pub enum AppError {
    /// Bad input; the message is shown to the user and nothing is applied.
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("{}", AUTH_FAILED)]
    Auth,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Auth => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to put in front of a user.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "internal server error".into(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.into())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, field) = match &self {
            AppError::Validation { field, .. } => ("validation_error", Some(*field)),
            AppError::Auth => ("auth_error", None),
            AppError::Conflict(_) => ("conflict", None),
            AppError::NotFound(_) => ("not_found", None),
            AppError::Internal(e) => {
                error!(error = ?e, "request failed");
                ("internal_error", None)
            }
        };
        let status = self.status();
        let body = ErrorResponse {
            error: code,
            message: self.public_message(),
            field,
        };
        (status, Json(body)).into_response()
    }
}
