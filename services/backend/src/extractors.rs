use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::errors::AppError;

/// JSON extractor that runs `validator` rules and reports every failure as a
/// standardized `invalid_input` error instead of axum's plain-text rejection.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;

        value.validate().map_err(|e| {
            tracing::warn!(error_message = %e, "Request validation failed");
            AppError::from(e)
        })?;

        Ok(ValidatedJson(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    let error_message = rejection.body_text();

    let message = if let Some(field) = error_message
        .split("missing field `")
        .nth(1)
        .and_then(|s| s.split('`').next())
    {
        format!("Missing required field: {}", field)
    } else if matches!(rejection, JsonRejection::MissingJsonContentType(_)) {
        "Expected request with `Content-Type: application/json`".to_string()
    } else {
        "Invalid request body: failed to parse JSON".to_string()
    };

    tracing::warn!(
        error_message = %message,
        original_error = %error_message,
        "Request validation failed during JSON deserialization"
    );

    AppError::InvalidInput(message)
}
