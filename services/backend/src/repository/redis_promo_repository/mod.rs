//! Redis-based PromoRepository implementation
//!
//! Promo codes live in hashes keyed by their normalized code; each code owns a
//! set of device ids that redeemed it and a list of its redemption ids.
//! Redemption and batch insert each run as one Lua script so that the
//! check-then-write sequence is atomic.

mod deserialization;
mod keys;
mod lua_scripts;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use promo_shared::PromoCodeValue;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::domain::{BatchInsert, NewPromoBatch, PromoCode, RedemptionRecord};
use crate::errors::{AppError, Result};

pub use deserialization::*;
pub use keys::*;
pub use lua_scripts::*;

/// Redis-based implementation of PromoRepository
pub struct RedisPromoRepository {
    redis: ConnectionManager,
}

impl RedisPromoRepository {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl super::PromoRepository for RedisPromoRepository {
    async fn find_by_code(&self, code: &PromoCodeValue) -> Result<Option<PromoCode>> {
        let mut redis_conn = self.redis.clone();
        load_promo_from_hash(&mut redis_conn, code.as_str()).await
    }

    async fn list_redemptions(&self, promo_code_id: i64) -> Result<Vec<RedemptionRecord>> {
        let mut redis_conn = self.redis.clone();
        let ids: Vec<i64> = redis_conn
            .lrange(code_redemptions_key(promo_code_id), 0, -1)
            .await?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = load_redemption_from_hash(&mut redis_conn, id).await? {
                records.push(record);
            }
        }

        Ok(records)
    }

    async fn redeem(&self, code: &PromoCodeValue, device_id: &str, now: DateTime<Utc>) -> Result<PromoCode> {
        let mut redis_conn = self.redis.clone();

        // Ids never change once issued, so resolving it outside the script is safe;
        // the script re-checks it against the hash.
        let promo_code_id: Option<i64> = redis_conn.hget(code_key(code.as_str()), "id").await?;
        let Some(promo_code_id) = promo_code_id else {
            return Err(AppError::InvalidCode);
        };
        let redemption_id: i64 = redis_conn.incr(redemption_sequence_key(), 1).await?;

        let script = Script::new(REDEEM_SCRIPT);
        let reply: Vec<String> = script
            .key(code_key(code.as_str()))
            .key(code_devices_key(promo_code_id))
            .key(code_redemptions_key(promo_code_id))
            .key(redemption_key(redemption_id))
            .arg(device_id)
            .arg(now.timestamp_millis())
            .arg(redemption_id)
            .arg(promo_code_id)
            .invoke_async(&mut redis_conn)
            .await?;

        match reply.first().map(String::as_str) {
            Some("ok") => load_promo_from_hash(&mut redis_conn, code.as_str())
                .await?
                .ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!("Promo code {} vanished after redemption", code))
                }),
            Some("invalid_code") => Err(AppError::InvalidCode),
            Some("expired") => Err(AppError::Expired),
            Some("already_redeemed") => Err(AppError::AlreadyRedeemed),
            Some("max_redemptions") => Err(AppError::MaxRedemptionsReached),
            other => Err(AppError::Internal(anyhow::anyhow!(
                "Unexpected redeem script reply: {:?}",
                other
            ))),
        }
    }

    async fn insert_batch(&self, batch: &NewPromoBatch) -> Result<BatchInsert> {
        let mut redis_conn = self.redis.clone();
        let script = Script::new(INSERT_BATCH_SCRIPT);

        let mut invocation = script.key(code_sequence_key());
        for code in &batch.codes {
            invocation.key(code_key(code.as_str()));
        }

        invocation
            .arg(batch.bonus_questions)
            .arg(batch.max_redemptions)
            .arg(
                batch
                    .expires_at
                    .map(|at| at.timestamp_millis().to_string())
                    .unwrap_or_default(),
            )
            .arg(batch.notes.clone().unwrap_or_default());
        for code in &batch.codes {
            invocation.arg(code.as_str());
        }

        let reply: Vec<String> = invocation.invoke_async(&mut redis_conn).await?;

        match reply.split_first() {
            Some((status, _)) if status == "ok" => Ok(BatchInsert::Inserted),
            Some((status, codes)) if status == "collided" => Ok(BatchInsert::Collided(
                codes
                    .iter()
                    .map(|c| PromoCodeValue::parse(c))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt collided code: {}", e)))?,
            )),
            _ => Err(AppError::Internal(anyhow::anyhow!(
                "Unexpected insert script reply: {:?}",
                reply
            ))),
        }
    }
}
