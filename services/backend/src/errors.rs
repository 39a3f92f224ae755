use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use promo_shared::errors::{ErrorCategory, ServiceError};
use promo_shared::ValidationError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid promo code")]
    InvalidCode,

    #[error("Promo code expired")]
    Expired,

    #[error("Promo code has reached its redemption limit")]
    MaxRedemptionsReached,

    #[error("Promo code already redeemed by this device")]
    AlreadyRedeemed,

    #[error("Forbidden")]
    Forbidden,

    #[error("Admin token not configured")]
    AdminTokenNotConfigured,

    #[error("Invalid expiry date: {0}")]
    InvalidExpiryDate(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Wire representation. Storage details never leave the process.
    pub fn to_service_error(&self) -> ServiceError {
        match self {
            AppError::InvalidCode => ServiceError::invalid_code(),
            AppError::Expired => ServiceError::expired(),
            AppError::MaxRedemptionsReached => ServiceError::max_redemptions(),
            AppError::AlreadyRedeemed => ServiceError::already_redeemed(),
            AppError::Forbidden => ServiceError::forbidden(),
            AppError::AdminTokenNotConfigured => ServiceError::admin_token_not_configured(),
            AppError::InvalidExpiryDate(input) => ServiceError::invalid_expires_date(input),
            AppError::InvalidInput(msg) => ServiceError::invalid_input(msg.clone()),
            AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_) => {
                ServiceError::server_error()
            }
        }
    }

    /// True for failures of the store or the process, as opposed to the request
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_)
        )
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::InvalidInput(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Database(ref e) => tracing::error!("Database error: {:?}", e),
            AppError::Redis(ref e) => tracing::error!("Redis error: {:?}", e),
            AppError::Internal(ref e) => tracing::error!("Internal error: {:?}", e),
            AppError::AdminTokenNotConfigured => {
                tracing::error!("Admin request refused: PROMO_ADMIN_TOKEN is not set")
            }
            _ => {}
        }

        let error = self.to_service_error();
        let status = StatusCode::from_u16(error.category.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        metrics::counter!(
            "errors_total",
            "category" => category_label(error.category),
            "code" => error.code.clone()
        )
        .increment(1);

        let body = Json(json!({
            "error": error,
        }));

        (status, body).into_response()
    }
}

fn category_label(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::Validation => "Validation",
        ErrorCategory::Redemption => "Redemption",
        ErrorCategory::Forbidden => "Forbidden",
        ErrorCategory::Internal => "Internal",
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
