use chrono::{DateTime, Utc};
use promo_shared::{PromoCodeValue, MAX_DEVICE_ID_LENGTH};
use std::sync::Arc;
use tracing::Instrument;

use crate::domain::{PromoCode, PromoGrant, RedemptionRecord};
use crate::errors::{AppError, Result};
use crate::repository::PromoRepository;

/// Validates and records promo redemptions.
///
/// Holds no promo state of its own; every call re-reads the store, and the
/// store's `redeem` is the only place where rules are checked against
/// current state.
pub struct RedemptionEngine {
    repo: Arc<dyn PromoRepository>,
}

impl RedemptionEngine {
    pub fn new(repo: Arc<dyn PromoRepository>) -> Self {
        Self { repo }
    }

    pub async fn redeem(&self, code: &str, device_id: &str) -> Result<PromoGrant> {
        self.redeem_at(code, device_id, Utc::now()).await
    }

    /// Redeem as of `now`, which is used both for the expiry check and as
    /// the recorded redemption time.
    pub async fn redeem_at(&self, code: &str, device_id: &str, now: DateTime<Utc>) -> Result<PromoGrant> {
        let span = tracing::info_span!(
            "redeem",
            promo.code = %code.trim(),
            device_id = %device_id
        );

        async move {
            let result = self.try_redeem(code, device_id, now).await;

            let outcome = match &result {
                Ok(grant) => {
                    tracing::info!(bonus_questions = grant.bonus_questions, "Promo code redeemed");
                    "redeemed".to_string()
                }
                Err(e) if e.is_server_error() => {
                    tracing::error!(error = %e, "Redemption failed");
                    e.to_service_error().code
                }
                Err(e) => {
                    tracing::info!(reason = %e, "Redemption rejected");
                    e.to_service_error().code
                }
            };
            metrics::counter!("promo_redemptions_total", "outcome" => outcome).increment(1);

            result
        }
        .instrument(span)
        .await
    }

    async fn try_redeem(&self, code: &str, device_id: &str, now: DateTime<Utc>) -> Result<PromoGrant> {
        // Nothing that fails normalization can exist in the store.
        let code = PromoCodeValue::parse(code).map_err(|_| AppError::InvalidCode)?;

        if device_id.trim().is_empty() {
            return Err(AppError::InvalidInput("deviceId must not be blank".to_string()));
        }
        if device_id.chars().count() > MAX_DEVICE_ID_LENGTH {
            return Err(AppError::InvalidInput(format!(
                "deviceId must be at most {} characters",
                MAX_DEVICE_ID_LENGTH
            )));
        }

        let promo = self.repo.redeem(&code, device_id, now).await?;
        Ok(promo.grant())
    }

    pub async fn find_code(&self, code: &str) -> Result<PromoCode> {
        let code = PromoCodeValue::parse(code).map_err(|_| AppError::InvalidCode)?;
        self.repo
            .find_by_code(&code)
            .await?
            .ok_or(AppError::InvalidCode)
    }

    pub async fn redemptions_for(&self, promo: &PromoCode) -> Result<Vec<RedemptionRecord>> {
        self.repo.list_redemptions(promo.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewPromoBatch;
    use crate::repository::InMemoryPromoRepository;
    use chrono::Duration;

    async fn engine_with(codes: &[&str], max_redemptions: i32, expires_at: Option<DateTime<Utc>>) -> RedemptionEngine {
        let repo = Arc::new(InMemoryPromoRepository::new());
        repo.insert_batch(&NewPromoBatch {
            codes: codes.iter().map(|c| PromoCodeValue::parse(c).unwrap()).collect(),
            bonus_questions: 50,
            max_redemptions,
            expires_at,
            notes: None,
        })
        .await
        .unwrap();
        RedemptionEngine::new(repo)
    }

    #[tokio::test]
    async fn test_example_scenario() {
        let engine = engine_with(&["STABXXXXXX"], 1, None).await;

        let grant = engine.redeem("STABXXXXXX", "device-A").await.unwrap();
        assert_eq!(grant.bonus_questions, 50);
        assert_eq!(grant.expires_at, None);

        assert!(matches!(
            engine.redeem("STABXXXXXX", "device-B").await,
            Err(AppError::MaxRedemptionsReached)
        ));
        assert!(matches!(
            engine.redeem("STABXXXXXX", "device-A").await,
            Err(AppError::AlreadyRedeemed)
        ));
    }

    #[tokio::test]
    async fn test_code_is_normalized_before_lookup() {
        let engine = engine_with(&["STABABCD"], 1, None).await;
        assert!(engine.redeem("  stababcd \t", "device-A").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_and_blank_codes_are_invalid() {
        let engine = engine_with(&["STABABCD"], 1, None).await;
        assert!(matches!(engine.redeem("NOPE", "device-A").await, Err(AppError::InvalidCode)));
        assert!(matches!(engine.redeem("   ", "device-A").await, Err(AppError::InvalidCode)));
    }

    #[tokio::test]
    async fn test_blank_device_rejected() {
        let engine = engine_with(&["STABABCD"], 1, None).await;
        assert!(matches!(engine.redeem("STABABCD", " ").await, Err(AppError::InvalidInput(_))));

        // The code is still untouched
        let promo = engine.find_code("STABABCD").await.unwrap();
        assert_eq!(promo.redemptions_used, 0);
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let expires_at = Utc::now() + Duration::hours(1);
        let engine = engine_with(&["STABEXPR"], 5, Some(expires_at)).await;

        assert!(matches!(
            engine.redeem_at("STABEXPR", "device-A", expires_at).await,
            Err(AppError::Expired)
        ));

        let grant = engine
            .redeem_at("STABEXPR", "device-A", expires_at - Duration::milliseconds(1))
            .await
            .unwrap();
        assert_eq!(grant.expires_at, Some(expires_at));
    }

    #[tokio::test]
    async fn test_redemption_is_recorded_with_time() {
        let engine = engine_with(&["STABTIME"], 2, None).await;
        let now = Utc::now();
        engine.redeem_at("STABTIME", "device-A", now).await.unwrap();

        let promo = engine.find_code("stabtime").await.unwrap();
        let records = engine.redemptions_for(&promo).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].device_id, "device-A");
        assert_eq!(records[0].redeemed_at, now);
    }
}
