//! Error types for the Legacy Radio SDK

use thiserror::Error;

/// Error codes for Legacy Radio errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyRadioErrorCode {
    /// No session stored
    NoToken,
    /// Session token missing, invalid, or expired on the server
    Unauthorized,
    /// Signed in, but the account lacks the required role
    Forbidden,
    /// Discount code does not exist
    DiscountNotFound,
    /// Discount code has expired
    DiscountExpired,
    /// Discount code has no uses left
    UsageExhausted,
    /// Server does not exist
    ServerNotFound,
    /// Discount code belongs to a different server
    ServerMismatch,
    /// Payment was declined or did not match the purchase
    PaymentFailed,
    /// Payment has not settled yet; check again later
    PaymentPending,
    /// Payment was already used for another purchase
    PaymentAlreadyApplied,
    /// Resource already exists (email, discount code)
    Conflict,
    /// Resource not found
    NotFound,
    /// Invalid request parameters
    ValidationError,
    /// The server failed to handle the request
    ServerError,
    /// Network request failed
    NetworkError,
    /// The session could not be written to or removed from storage
    StorageError,
}

impl std::fmt::Display for LegacyRadioErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoToken => write!(f, "NO_TOKEN"),
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::Forbidden => write!(f, "FORBIDDEN"),
            Self::DiscountNotFound => write!(f, "DISCOUNT_NOT_FOUND"),
            Self::DiscountExpired => write!(f, "DISCOUNT_EXPIRED"),
            Self::UsageExhausted => write!(f, "USAGE_EXHAUSTED"),
            Self::ServerNotFound => write!(f, "SERVER_NOT_FOUND"),
            Self::ServerMismatch => write!(f, "SERVER_MISMATCH"),
            Self::PaymentFailed => write!(f, "PAYMENT_FAILED"),
            Self::PaymentPending => write!(f, "PAYMENT_PENDING"),
            Self::PaymentAlreadyApplied => write!(f, "PAYMENT_ALREADY_APPLIED"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::ValidationError => write!(f, "VALIDATION_ERROR"),
            Self::ServerError => write!(f, "SERVER_ERROR"),
            Self::NetworkError => write!(f, "NETWORK_ERROR"),
            Self::StorageError => write!(f, "STORAGE_ERROR"),
        }
    }
}

/// Legacy Radio SDK error
#[derive(Debug, Error)]
#[error("{message} (code: {code})")]
pub struct LegacyRadioError {
    /// Error code
    pub code: LegacyRadioErrorCode,
    /// Human-readable message, suitable for display
    pub message: String,
    /// HTTP status code (for API errors)
    pub status_code: Option<u16>,
}

impl LegacyRadioError {
    /// Create a new error
    pub fn new(code: LegacyRadioErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a new error with status code
    pub fn with_status(
        code: LegacyRadioErrorCode,
        message: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LegacyRadioErrorCode::NetworkError, message)
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(LegacyRadioErrorCode::StorageError, message)
    }

    /// Create a no token error
    pub fn no_token() -> Self {
        Self::new(LegacyRadioErrorCode::NoToken, "Not signed in")
    }

    /// Whether the session was rejected by the server
    pub fn is_unauthorized(&self) -> bool {
        self.code == LegacyRadioErrorCode::Unauthorized
    }
}

/// Result type for Legacy Radio operations
pub type Result<T> = std::result::Result<T, LegacyRadioError>;

/// Map the API's error `code` (falling back to the HTTP status) to an error code
pub(crate) fn map_api_error_code(status: u16, code: Option<&str>) -> LegacyRadioErrorCode {
    match code {
        Some("UNAUTHORIZED") => return LegacyRadioErrorCode::Unauthorized,
        Some("FORBIDDEN") => return LegacyRadioErrorCode::Forbidden,
        Some("DISCOUNT_NOT_FOUND") => return LegacyRadioErrorCode::DiscountNotFound,
        Some("DISCOUNT_EXPIRED") => return LegacyRadioErrorCode::DiscountExpired,
        Some("USAGE_EXHAUSTED") => return LegacyRadioErrorCode::UsageExhausted,
        Some("SERVER_NOT_FOUND") => return LegacyRadioErrorCode::ServerNotFound,
        Some("SERVER_MISMATCH") => return LegacyRadioErrorCode::ServerMismatch,
        Some("PAYMENT_FAILED") => return LegacyRadioErrorCode::PaymentFailed,
        Some("PAYMENT_PENDING") => return LegacyRadioErrorCode::PaymentPending,
        Some("PAYMENT_ALREADY_APPLIED") => return LegacyRadioErrorCode::PaymentAlreadyApplied,
        Some("CONFLICT") => return LegacyRadioErrorCode::Conflict,
        Some("NOT_FOUND") => return LegacyRadioErrorCode::NotFound,
        Some("BAD_REQUEST" | "INVALID_FORMAT" | "INVALID_EXPIRY" | "INVALID_MAX_USES") => {
            return LegacyRadioErrorCode::ValidationError;
        }
        _ => {}
    }

    match status {
        401 => LegacyRadioErrorCode::Unauthorized,
        403 => LegacyRadioErrorCode::Forbidden,
        404 => LegacyRadioErrorCode::NotFound,
        409 => LegacyRadioErrorCode::Conflict,
        400 | 422 => LegacyRadioErrorCode::ValidationError,
        500..=599 => LegacyRadioErrorCode::ServerError,
        _ => LegacyRadioErrorCode::NetworkError,
    }
}
