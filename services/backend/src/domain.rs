use chrono::{DateTime, Utc};
use promo_shared::PromoCodeValue;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, Result};

/// A promo code row as persisted in `promo_codes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PromoCode {
    pub id: i64,
    pub code: String,
    pub bonus_questions: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_redemptions: i32,
    pub redemptions_used: i32,
    pub notes: Option<String>,
}

impl PromoCode {
    /// Expiry is inclusive: a code expiring at `now` is already expired
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    pub fn has_capacity(&self) -> bool {
        self.redemptions_used < self.max_redemptions
    }

    pub fn grant(&self) -> PromoGrant {
        PromoGrant {
            bonus_questions: self.bonus_questions,
            expires_at: self.expires_at,
        }
    }
}

/// Decide whether `device` may redeem `promo` right now.
///
/// Shared by every store that evaluates the rules in Rust (the Redis store
/// mirrors this order inside its Lua script). The device check runs before the
/// capacity check so a device that already holds the code is told so even once
/// the code is exhausted.
pub fn check_redeemable(promo: &PromoCode, already_redeemed: bool, now: DateTime<Utc>) -> Result<()> {
    if promo.is_expired_at(now) {
        return Err(AppError::Expired);
    }
    if already_redeemed {
        return Err(AppError::AlreadyRedeemed);
    }
    if !promo.has_capacity() {
        return Err(AppError::MaxRedemptionsReached);
    }
    Ok(())
}

/// A row of `promo_redemptions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RedemptionRecord {
    pub id: i64,
    pub promo_code_id: i64,
    pub device_id: String,
    pub redeemed_at: DateTime<Utc>,
}

/// Codes sharing one set of issuance parameters, inserted all-or-nothing
#[derive(Debug, Clone)]
pub struct NewPromoBatch {
    pub codes: Vec<PromoCodeValue>,
    pub bonus_questions: i32,
    pub max_redemptions: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Result of a batch insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchInsert {
    /// Every code was persisted
    Inserted,
    /// Nothing was persisted; these codes already exist
    Collided(Vec<PromoCodeValue>),
}

/// What a successful redemption grants. Describes the code, not the redemption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoGrant {
    pub bonus_questions: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RedeemRequest {
    /// Normalized and checked by the engine; a blank code is an unknown code
    pub code: String,
    #[serde(rename = "deviceId", alias = "device_id")]
    #[validate(length(min = 1, max = 128))]
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionView {
    pub device_id: String,
    pub redeemed_at: DateTime<Utc>,
}

impl From<RedemptionRecord> for RedemptionView {
    fn from(record: RedemptionRecord) -> Self {
        Self {
            device_id: record.device_id,
            redeemed_at: record.redeemed_at,
        }
    }
}

/// Admin view of a code and who redeemed it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeStatus {
    pub code: String,
    pub bonus_questions: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_redemptions: i32,
    pub redemptions_used: i32,
    pub notes: Option<String>,
    pub redemptions: Vec<RedemptionView>,
}

impl CodeStatus {
    pub fn new(promo: PromoCode, redemptions: Vec<RedemptionRecord>) -> Self {
        Self {
            code: promo.code,
            bonus_questions: promo.bonus_questions,
            expires_at: promo.expires_at,
            max_redemptions: promo.max_redemptions,
            redemptions_used: promo.redemptions_used,
            notes: promo.notes,
            redemptions: redemptions.into_iter().map(RedemptionView::from).collect(),
        }
    }
}
