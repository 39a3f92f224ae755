// These tests talk to a real Postgres. Run with
// `DATABASE_URL=postgres://... cargo test -- --ignored`.
use super::*;
use crate::domain::NewPromoBatch;
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

async fn test_repo() -> (PostgresPromoRepository, PgPool) {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgresql://localhost/promo_test".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    (PostgresPromoRepository::new(pool.clone()), pool)
}

fn unique_code(tag: &str) -> PromoCodeValue {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    PromoCodeValue::parse(&format!("PGTEST{}{}", tag, nanos)).unwrap()
}

fn batch(codes: Vec<PromoCodeValue>, max_redemptions: i32) -> NewPromoBatch {
    NewPromoBatch {
        codes,
        bonus_questions: 50,
        max_redemptions,
        expires_at: None,
        notes: Some("repository test".to_string()),
    }
}

async fn cleanup(pool: &PgPool, codes: &[PromoCodeValue]) {
    for code in codes {
        sqlx::query(
            "DELETE FROM promo_redemptions WHERE promo_code_id IN (SELECT id FROM promo_codes WHERE code = $1)",
        )
        .bind(code.as_str())
        .execute(pool)
        .await
        .expect("Failed to cleanup redemptions");
        sqlx::query("DELETE FROM promo_codes WHERE code = $1")
            .bind(code.as_str())
            .execute(pool)
            .await
            .expect("Failed to cleanup codes");
    }
}

#[tokio::test]
#[ignore = "requires a Postgres database (DATABASE_URL)"]
async fn test_insert_and_redeem() {
    let (repo, pool) = test_repo().await;
    let code = unique_code("A");

    let inserted = repo
        .insert_batch(&batch(vec![code.clone()], 1))
        .await
        .expect("Failed to insert batch");
    assert_eq!(inserted, BatchInsert::Inserted);

    let promo = repo
        .redeem(&code, "device-A", Utc::now())
        .await
        .expect("Failed to redeem");
    assert_eq!(promo.redemptions_used, 1);

    let again = repo.redeem(&code, "device-A", Utc::now()).await;
    assert!(matches!(again, Err(AppError::AlreadyRedeemed)));

    let other = repo.redeem(&code, "device-B", Utc::now()).await;
    assert!(matches!(other, Err(AppError::MaxRedemptionsReached)));

    let records = repo.list_redemptions(promo.id).await.expect("Failed to list");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].device_id, "device-A");

    cleanup(&pool, &[code]).await;
}

#[tokio::test]
#[ignore = "requires a Postgres database (DATABASE_URL)"]
async fn test_collision_rolls_back_whole_batch() {
    let (repo, pool) = test_repo().await;
    let existing = unique_code("B");
    let fresh = unique_code("C");

    repo.insert_batch(&batch(vec![existing.clone()], 1))
        .await
        .expect("Failed to insert batch");

    let result = repo
        .insert_batch(&batch(vec![fresh.clone(), existing.clone()], 1))
        .await
        .expect("Failed to insert batch");
    assert_eq!(result, BatchInsert::Collided(vec![existing.clone()]));

    let missing = repo.find_by_code(&fresh).await.expect("Failed to query");
    assert!(missing.is_none(), "rolled back batch must not persist any code");

    cleanup(&pool, &[existing, fresh]).await;
}

#[tokio::test]
#[ignore = "requires a Postgres database (DATABASE_URL)"]
async fn test_expired_code_rejected() {
    let (repo, pool) = test_repo().await;
    let code = unique_code("D");
    let mut new_batch = batch(vec![code.clone()], 5);
    new_batch.expires_at = Some(Utc::now() - Duration::hours(1));

    repo.insert_batch(&new_batch).await.expect("Failed to insert batch");

    let result = repo.redeem(&code, "device-A", Utc::now()).await;
    assert!(matches!(result, Err(AppError::Expired)));

    cleanup(&pool, &[code]).await;
}

#[tokio::test]
#[ignore = "requires a Postgres database (DATABASE_URL)"]
async fn test_concurrent_redemptions_respect_limit() {
    let (repo, pool) = test_repo().await;
    let repo = Arc::new(repo);
    let code = unique_code("E");

    repo.insert_batch(&batch(vec![code.clone()], 3))
        .await
        .expect("Failed to insert batch");

    let mut handles = Vec::new();
    for i in 0..20 {
        let repo = Arc::clone(&repo);
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            repo.redeem(&code, &format!("device-{}", i), Utc::now()).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.expect("Task panicked").is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 3);

    let promo = repo
        .find_by_code(&code)
        .await
        .expect("Failed to query")
        .expect("Code missing");
    assert_eq!(promo.redemptions_used, 3);

    cleanup(&pool, &[code]).await;
}
