//! Deserialization of promo codes and redemptions from Redis hash storage
//!
//! Handles parsing Redis hashes back into domain objects.

use chrono::{DateTime, TimeZone, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::str::FromStr;

use super::keys::{code_key, redemption_key};
use crate::domain::{PromoCode, RedemptionRecord};
use crate::errors::{AppError, Result};

/// Load a promo code from its hash
///
/// # Returns
/// * `Ok(Some(promo))` - Code found and parsed successfully
/// * `Ok(None)` - Code not found
/// * `Err(...)` - Redis error or corrupt hash
pub async fn load_promo_from_hash(redis: &mut ConnectionManager, code: &str) -> Result<Option<PromoCode>> {
    let key = code_key(code);
    let map: HashMap<String, String> = redis.hgetall(&key).await?;

    if map.is_empty() {
        return Ok(None);
    }

    promo_from_map(&key, &map).map(Some)
}

pub fn promo_from_map(key: &str, map: &HashMap<String, String>) -> Result<PromoCode> {
    Ok(PromoCode {
        id: required(key, map, "id")?,
        code: map.get("code").cloned().unwrap_or_default(),
        bonus_questions: required(key, map, "bonus_questions")?,
        expires_at: optional_millis(key, map, "expires_at_ms")?,
        max_redemptions: required(key, map, "max_redemptions")?,
        redemptions_used: required(key, map, "redemptions_used")?,
        notes: map.get("notes").cloned().filter(|v| !v.is_empty()),
    })
}

/// Load a redemption record from its hash
pub async fn load_redemption_from_hash(
    redis: &mut ConnectionManager,
    redemption_id: i64,
) -> Result<Option<RedemptionRecord>> {
    let key = redemption_key(redemption_id);
    let map: HashMap<String, String> = redis.hgetall(&key).await?;

    if map.is_empty() {
        return Ok(None);
    }

    let redeemed_at = optional_millis(&key, &map, "redeemed_at_ms")?
        .ok_or_else(|| corrupt(&key, "redeemed_at_ms"))?;

    Ok(Some(RedemptionRecord {
        id: required(&key, &map, "id")?,
        promo_code_id: required(&key, &map, "promo_code_id")?,
        device_id: map.get("device_id").cloned().unwrap_or_default(),
        redeemed_at,
    }))
}

fn required<T: FromStr>(key: &str, map: &HashMap<String, String>, field: &str) -> Result<T> {
    map.get(field)
        .and_then(|v| v.parse::<T>().ok())
        .ok_or_else(|| corrupt(key, field))
}

fn optional_millis(key: &str, map: &HashMap<String, String>, field: &str) -> Result<Option<DateTime<Utc>>> {
    match map.get(field).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => {
            let ms: i64 = raw.parse().map_err(|_| corrupt(key, field))?;
            Utc.timestamp_millis_opt(ms)
                .single()
                .map(Some)
                .ok_or_else(|| corrupt(key, field))
        }
    }
}

fn corrupt(key: &str, field: &str) -> AppError {
    AppError::Internal(anyhow::anyhow!("Invalid {} in {}", field, key))
}
