//! In-process PromoRepository
//!
//! Backs local development (`PROMO_STORE=memory`) and the test suite. A single
//! async mutex guards the whole store and is held for the full
//! read-check-write sequence of every operation, which gives each call the
//! same all-or-nothing behavior as a database transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use promo_shared::PromoCodeValue;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

use crate::domain::{check_redeemable, BatchInsert, NewPromoBatch, PromoCode, RedemptionRecord};
use crate::errors::{AppError, Result};

use super::PromoRepository;

#[derive(Default)]
struct MemoryStore {
    codes: HashMap<String, PromoCode>,
    redemptions: Vec<RedemptionRecord>,
    /// `(promo_code_id, device_id)` pairs, the uniqueness constraint
    redeemed_by: HashSet<(i64, String)>,
    next_code_id: i64,
    next_redemption_id: i64,
}

#[derive(Default)]
pub struct InMemoryPromoRepository {
    store: Mutex<MemoryStore>,
}

impl InMemoryPromoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PromoRepository for InMemoryPromoRepository {
    async fn find_by_code(&self, code: &PromoCodeValue) -> Result<Option<PromoCode>> {
        let store = self.store.lock().await;
        Ok(store.codes.get(code.as_str()).cloned())
    }

    async fn list_redemptions(&self, promo_code_id: i64) -> Result<Vec<RedemptionRecord>> {
        let store = self.store.lock().await;
        Ok(store
            .redemptions
            .iter()
            .filter(|r| r.promo_code_id == promo_code_id)
            .cloned()
            .collect())
    }

    async fn redeem(&self, code: &PromoCodeValue, device_id: &str, now: DateTime<Utc>) -> Result<PromoCode> {
        let mut store = self.store.lock().await;

        let promo = store
            .codes
            .get(code.as_str())
            .cloned()
            .ok_or(AppError::InvalidCode)?;

        let key = (promo.id, device_id.to_string());
        check_redeemable(&promo, store.redeemed_by.contains(&key), now)?;

        store.next_redemption_id += 1;
        let record = RedemptionRecord {
            id: store.next_redemption_id,
            promo_code_id: promo.id,
            device_id: device_id.to_string(),
            redeemed_at: now,
        };
        store.redemptions.push(record);
        store.redeemed_by.insert(key);

        let entry = store
            .codes
            .get_mut(code.as_str())
            .ok_or(AppError::InvalidCode)?;
        entry.redemptions_used += 1;

        Ok(entry.clone())
    }

    async fn insert_batch(&self, batch: &NewPromoBatch) -> Result<BatchInsert> {
        let mut store = self.store.lock().await;

        // A code repeated within the batch collides with its own first copy.
        let mut seen = HashSet::with_capacity(batch.codes.len());
        let collided: Vec<PromoCodeValue> = batch
            .codes
            .iter()
            .filter(|code| store.codes.contains_key(code.as_str()) || !seen.insert(code.as_str()))
            .cloned()
            .collect();
        if !collided.is_empty() {
            return Ok(BatchInsert::Collided(collided));
        }

        for code in &batch.codes {
            store.next_code_id += 1;
            let promo = PromoCode {
                id: store.next_code_id,
                code: code.as_str().to_string(),
                bonus_questions: batch.bonus_questions,
                expires_at: batch.expires_at,
                max_redemptions: batch.max_redemptions,
                redemptions_used: 0,
                notes: batch.notes.clone(),
            };
            store.codes.insert(promo.code.clone(), promo);
        }

        Ok(BatchInsert::Inserted)
    }
}
