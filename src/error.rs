use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Error body sent to clients. `message` is meant to be displayed verbatim.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: &'static str,
    pub status: u16,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Discount code not found")]
    DiscountNotFound,

    #[error("Discount code has expired")]
    DiscountExpired,

    #[error("Discount code has reached its usage limit")]
    UsageExhausted,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("Expiration date must be in the future")]
    InvalidExpiry,

    #[error("Max uses must be a positive number")]
    InvalidMaxUses,

    #[error("Server not found")]
    ServerNotFound,

    #[error("Discount code is not valid for the selected server")]
    ServerMismatch,

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("{0}")]
    PaymentPending(String),

    #[error("Payment has already been applied to a subscription")]
    PaymentAlreadyApplied,

    #[error(
        "Payment {payment_reference} was received but the subscription could not be recorded. \
         Support has been notified and will complete it manually."
    )]
    PersistenceAfterPaymentFailed {
        payment_reference: String,
        reason: String,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::DiscountNotFound | AppError::ServerNotFound | AppError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::DiscountExpired
            | AppError::InvalidFormat(_)
            | AppError::InvalidExpiry
            | AppError::InvalidMaxUses
            | AppError::ServerMismatch
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UsageExhausted | AppError::PaymentAlreadyApplied | AppError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            AppError::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::PaymentPending(_) => StatusCode::ACCEPTED,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::PersistenceAfterPaymentFailed { .. }
            | AppError::Internal(_)
            | AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::DiscountNotFound => "DISCOUNT_NOT_FOUND",
            AppError::DiscountExpired => "DISCOUNT_EXPIRED",
            AppError::UsageExhausted => "USAGE_EXHAUSTED",
            AppError::InvalidFormat(_) => "INVALID_FORMAT",
            AppError::InvalidExpiry => "INVALID_EXPIRY",
            AppError::InvalidMaxUses => "INVALID_MAX_USES",
            AppError::ServerNotFound => "SERVER_NOT_FOUND",
            AppError::ServerMismatch => "SERVER_MISMATCH",
            AppError::PaymentFailed(_) => "PAYMENT_FAILED",
            AppError::PaymentPending(_) => "PAYMENT_PENDING",
            AppError::PaymentAlreadyApplied => "PAYMENT_ALREADY_APPLIED",
            AppError::PersistenceAfterPaymentFailed { .. } => "PERSISTENCE_AFTER_PAYMENT_FAILED",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Internal(_) | AppError::Database(_) | AppError::Pool(_) | AppError::Json(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// True when the underlying SQLite error is a UNIQUE/CHECK constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            AppError::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            AppError::PersistenceAfterPaymentFailed { .. } => self.to_string(),
            AppError::Internal(_) | AppError::Database(_) | AppError::Pool(_) | AppError::Json(_) => {
                tracing::error!(error = %self, "Internal error");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorBody {
            message,
            code: self.error_code(),
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
