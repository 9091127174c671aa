//! HTTP-facing error type. Every handler returns `AppResult<T>`; the
//! mapping from error kind to status code lives only here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{auth::password::EncodingError, db::StoreError, expenses::overview::OverviewError};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    /// Shared by unknown email and wrong password.
    #[error("{}", INVALID_CREDENTIALS)]
    InvalidCredentials,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("{0}")]
    Conflict(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error(transparent)]
    Overview(#[from] OverviewError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: &'static str) -> Self {
        Self::Internal(anyhow::anyhow!(msg))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Overview(OverviewError::TotalOverflow) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_)
            | AppError::DuplicateEmail
            | AppError::Conflict(_)
            | AppError::Overview(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::Conflict) => StatusCode::BAD_REQUEST,
            AppError::Encoding(_) | AppError::Store(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status.is_server_error() {
            error!(error = ?self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "title": status.canonical_reason().unwrap_or("Error"),
            "status": status.as_u16(),
            "detail": detail,
        }));

        (status, body).into_response()
    }
}
