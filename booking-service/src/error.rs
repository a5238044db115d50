use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::currency::RateLookupError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid availability id")]
    UnknownAvailability,

    #[error("{0}")]
    NotFound(String),

    #[error("insufficient vacancies for the requested booking: requested {requested}, remaining {remaining}")]
    InsufficientCapacity { requested: i32, remaining: i32 },

    #[error("booking {0} is already confirmed")]
    AlreadyConfirmed(Uuid),

    #[error(transparent)]
    RateLookup(#[from] RateLookupError),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] bb8::RunError<diesel_async::pooled_connection::PoolError>),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<shared::DateError> for AppError {
    fn from(err: shared::DateError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<shared::InvalidCurrency> for AppError {
    fn from(err: shared::InvalidCurrency) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::UnknownAvailability => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyConfirmed(_) => StatusCode::CONFLICT,
            // A failed reservation aborts the booking transaction and is reported as such.
            AppError::InsufficientCapacity { .. }
            | AppError::RateLookup(_)
            | AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
