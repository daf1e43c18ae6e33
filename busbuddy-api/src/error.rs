use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use busbuddy_core::error::{FieldError, RepoError};
use busbuddy_core::repository::BookingCreateError;

/// Every failure leaving the api crate, rendered as the standard
/// `{success, message, errors?}` envelope.
#[derive(Debug)]
pub enum ApiError {
    Validation(Vec<FieldError>),
    Authentication(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    /// Business-rule rejection: insufficient seats, cancellation window,
    /// seat conflict, disallowed update. Always 400.
    Rejected(String),
    RateLimited,
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, "Validation failed".to_string(), Some(errors))
            }
            ApiError::Rejected(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please try again later".to_string(),
                None,
            ),
            ApiError::Internal(err) => {
                tracing::error!("Internal server error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = match errors {
            Some(errors) => json!({
                "success": false,
                "message": message,
                "errors": errors,
            }),
            None => json!({
                "success": false,
                "message": message,
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Conflict { field } => {
                Self::Conflict(format!("A record with this {} already exists", field))
            }
            RepoError::Database(msg) => Self::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<BookingCreateError> for ApiError {
    fn from(err: BookingCreateError) -> Self {
        match err {
            BookingCreateError::BusNotFound => Self::NotFound("Bus not found".to_string()),
            BookingCreateError::InsufficientSeats => {
                Self::Rejected("Not enough available seats".to_string())
            }
            BookingCreateError::SeatsTaken(seats) => {
                Self::Rejected(format!("Seats already booked: {}", seats.join(", ")))
            }
            BookingCreateError::Repo(e) => e.into(),
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::Internal(err.into())
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Internal(err.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}
