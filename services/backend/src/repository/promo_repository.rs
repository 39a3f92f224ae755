use async_trait::async_trait;
use chrono::{DateTime, Utc};
use promo_shared::PromoCodeValue;
use sqlx::PgPool;

use crate::domain::{check_redeemable, BatchInsert, NewPromoBatch, PromoCode, RedemptionRecord};
use crate::errors::{AppError, Result};

/// Session over the store holding promo codes and their redemptions.
///
/// `redeem` and `insert_batch` are each one atomic unit: either every write
/// they make is persisted or none is.
#[async_trait]
pub trait PromoRepository: Send + Sync {
    async fn find_by_code(&self, code: &PromoCodeValue) -> Result<Option<PromoCode>>;

    async fn list_redemptions(&self, promo_code_id: i64) -> Result<Vec<RedemptionRecord>>;

    /// Check the code's rules for `device_id`, record the redemption and bump
    /// the counter. Returns the code as it stands after the increment.
    async fn redeem(&self, code: &PromoCodeValue, device_id: &str, now: DateTime<Utc>) -> Result<PromoCode>;

    /// Insert every code of the batch, or none of them if any code exists
    async fn insert_batch(&self, batch: &NewPromoBatch) -> Result<BatchInsert>;
}

pub struct PostgresPromoRepository {
    pool: PgPool,
}

impl PostgresPromoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PromoRepository for PostgresPromoRepository {
    async fn find_by_code(&self, code: &PromoCodeValue) -> Result<Option<PromoCode>> {
        let promo = sqlx::query_as::<_, PromoCode>(
            r#"
            SELECT id, code, bonus_questions, expires_at, max_redemptions, redemptions_used, notes
            FROM promo_codes
            WHERE code = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(promo)
    }

    async fn list_redemptions(&self, promo_code_id: i64) -> Result<Vec<RedemptionRecord>> {
        let records = sqlx::query_as::<_, RedemptionRecord>(
            r#"
            SELECT id, promo_code_id, device_id, redeemed_at
            FROM promo_redemptions
            WHERE promo_code_id = $1
            ORDER BY redeemed_at ASC, id ASC
            "#,
        )
        .bind(promo_code_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn redeem(&self, code: &PromoCodeValue, device_id: &str, now: DateTime<Utc>) -> Result<PromoCode> {
        // Dropping `tx` on any early return rolls the transaction back.
        let mut tx = self.pool.begin().await?;

        // Row lock serializes every redemption of this code until commit.
        let promo = sqlx::query_as::<_, PromoCode>(
            r#"
            SELECT id, code, bonus_questions, expires_at, max_redemptions, redemptions_used, notes
            FROM promo_codes
            WHERE code = $1
            FOR UPDATE
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::InvalidCode)?;

        let already_redeemed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM promo_redemptions
                WHERE promo_code_id = $1 AND device_id = $2
            )
            "#,
        )
        .bind(promo.id)
        .bind(device_id)
        .fetch_one(&mut *tx)
        .await?;

        check_redeemable(&promo, already_redeemed, now)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO promo_redemptions (promo_code_id, device_id, redeemed_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (promo_code_id, device_id) DO NOTHING
            "#,
        )
        .bind(promo.id)
        .bind(device_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::AlreadyRedeemed);
        }

        let updated = sqlx::query_as::<_, PromoCode>(
            r#"
            UPDATE promo_codes
            SET redemptions_used = redemptions_used + 1
            WHERE id = $1 AND redemptions_used < max_redemptions
            RETURNING id, code, bonus_questions, expires_at, max_redemptions, redemptions_used, notes
            "#,
        )
        .bind(promo.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::MaxRedemptionsReached)?;

        tx.commit().await?;

        Ok(updated)
    }

    async fn insert_batch(&self, batch: &NewPromoBatch) -> Result<BatchInsert> {
        let mut tx = self.pool.begin().await?;
        let mut collided = Vec::new();

        for code in &batch.codes {
            let result = sqlx::query(
                r#"
                INSERT INTO promo_codes (
                    code, bonus_questions, expires_at, max_redemptions, redemptions_used, notes
                )
                VALUES ($1, $2, $3, $4, 0, $5)
                ON CONFLICT (code) DO NOTHING
                "#,
            )
            .bind(code.as_str())
            .bind(batch.bonus_questions)
            .bind(batch.expires_at)
            .bind(batch.max_redemptions)
            .bind(batch.notes.as_deref())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                collided.push(code.clone());
            }
        }

        if !collided.is_empty() {
            tx.rollback().await?;
            return Ok(BatchInsert::Collided(collided));
        }

        tx.commit().await?;
        Ok(BatchInsert::Inserted)
    }
}

#[cfg(test)]
#[path = "promo_repository_tests.rs"]
mod promo_repository_tests;
