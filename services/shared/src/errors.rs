/// Shared error taxonomy for the promo-code service
///
/// Design Philosophy:
/// - Every failure surfaced to a caller carries a stable, machine-readable code
/// - Codes are grouped into categories that decide HTTP status and log level
/// - Business rejections (expired, already redeemed, ...) are expected outcomes
///   and live in a client-error category; only storage and configuration
///   failures are server errors
///
/// Usage:
/// - The backend converts its `AppError` into a `ServiceError` for the wire
/// - Error codes are the lowercase snake_case strings the mobile client matches on
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error categories that map to HTTP status codes and logging severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Malformed or out-of-range input (400 Bad Request)
    Validation,

    /// A well-formed redemption the code's rules refuse (400 Bad Request)
    Redemption,

    /// Admin token mismatch (403 Forbidden)
    Forbidden,

    /// Storage failures and server misconfiguration (500 Internal Server Error)
    Internal,
}

impl ErrorCategory {
    /// Map error category to HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCategory::Validation => 400,
            ErrorCategory::Redemption => 400,
            ErrorCategory::Forbidden => 403,
            ErrorCategory::Internal => 500,
        }
    }

    /// Map error category to log level
    pub fn log_level(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "warn",
            ErrorCategory::Redemption => "info",
            ErrorCategory::Forbidden => "warn",
            ErrorCategory::Internal => "error",
        }
    }
}

/// Standard error codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode(pub &'static str);

impl ErrorCode {
    // Redemption rejections
    pub const INVALID_CODE: ErrorCode = ErrorCode("invalid_code");
    pub const EXPIRED: ErrorCode = ErrorCode("expired");
    pub const MAX_REDEMPTIONS: ErrorCode = ErrorCode("max_redemptions");
    pub const ALREADY_REDEEMED: ErrorCode = ErrorCode("already_redeemed");

    // Admin access
    pub const FORBIDDEN: ErrorCode = ErrorCode("forbidden");
    pub const ADMIN_TOKEN_NOT_CONFIGURED: ErrorCode = ErrorCode("admin_token_not_configured");

    // Validation
    pub const INVALID_EXPIRES_DATE: ErrorCode = ErrorCode("invalid_expires_date");
    pub const INVALID_INPUT: ErrorCode = ErrorCode("invalid_input");

    // Internal
    pub const SERVER_ERROR: ErrorCode = ErrorCode("server_error");

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Standardized error body returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceError {
    pub category: ErrorCategory,

    pub code: String,

    /// Human-readable message, never contains storage internals
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ServiceError {
    pub fn new(category: ErrorCategory, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            category,
            code: code.as_str().to_string(),
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn invalid_code() -> Self {
        Self::new(
            ErrorCategory::Redemption,
            ErrorCode::INVALID_CODE,
            "Promo code does not exist",
        )
    }

    pub fn expired() -> Self {
        Self::new(
            ErrorCategory::Redemption,
            ErrorCode::EXPIRED,
            "Promo code has expired",
        )
    }

    pub fn max_redemptions() -> Self {
        Self::new(
            ErrorCategory::Redemption,
            ErrorCode::MAX_REDEMPTIONS,
            "Promo code has no redemptions left",
        )
    }

    pub fn already_redeemed() -> Self {
        Self::new(
            ErrorCategory::Redemption,
            ErrorCode::ALREADY_REDEEMED,
            "Promo code was already redeemed on this device",
        )
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorCategory::Forbidden, ErrorCode::FORBIDDEN, "Invalid admin token")
    }

    pub fn admin_token_not_configured() -> Self {
        Self::new(
            ErrorCategory::Internal,
            ErrorCode::ADMIN_TOKEN_NOT_CONFIGURED,
            "Admin access is disabled: no admin token configured",
        )
    }

    pub fn invalid_expires_date(input: impl fmt::Display) -> Self {
        Self::new(
            ErrorCategory::Validation,
            ErrorCode::INVALID_EXPIRES_DATE,
            "Expiry date must be formatted as YYYY-MM-DD",
        )
        .with_context(format!("got: {}", input))
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, ErrorCode::INVALID_INPUT, message)
    }

    pub fn server_error() -> Self {
        Self::new(
            ErrorCategory::Internal,
            ErrorCode::SERVER_ERROR,
            "Internal server error",
        )
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "[{}] {}: {}", self.code, self.message, context)
        } else {
            write!(f, "[{}] {}", self.code, self.message)
        }
    }
}

impl std::error::Error for ServiceError {}

pub type Result<T> = std::result::Result<T, ServiceError>;
