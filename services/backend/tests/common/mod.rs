/// Common test utilities and fixtures for integration tests
use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use promo_backend::{
    build_router,
    config::{AdminConfig, Config, DatabaseConfig, IssuanceConfig, RedisConfig, StoreBackend},
    domain::{BatchInsert, NewPromoBatch, PromoCode, RedemptionRecord},
    errors::{AppError, Result},
    repository::{InMemoryPromoRepository, PromoRepository},
    state::AppState,
};
use promo_shared::PromoCodeValue;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// In-memory store that also counts batch inserts
#[derive(Default)]
pub struct CountingRepository {
    inner: InMemoryPromoRepository,
    inserts: AtomicUsize,
}

impl CountingRepository {
    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PromoRepository for CountingRepository {
    async fn find_by_code(&self, code: &PromoCodeValue) -> Result<Option<PromoCode>> {
        self.inner.find_by_code(code).await
    }

    async fn list_redemptions(&self, promo_code_id: i64) -> Result<Vec<RedemptionRecord>> {
        self.inner.list_redemptions(promo_code_id).await
    }

    async fn redeem(&self, code: &PromoCodeValue, device_id: &str, now: DateTime<Utc>) -> Result<PromoCode> {
        self.inner.redeem(code, device_id, now).await
    }

    async fn insert_batch(&self, batch: &NewPromoBatch) -> Result<BatchInsert> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_batch(batch).await
    }
}

/// Store whose every call fails like an unreachable database
pub struct BrokenRepository;

#[async_trait]
impl PromoRepository for BrokenRepository {
    async fn find_by_code(&self, _code: &PromoCodeValue) -> Result<Option<PromoCode>> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn list_redemptions(&self, _promo_code_id: i64) -> Result<Vec<RedemptionRecord>> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn redeem(&self, _code: &PromoCodeValue, _device_id: &str, _now: DateTime<Utc>) -> Result<PromoCode> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn insert_batch(&self, _batch: &NewPromoBatch) -> Result<BatchInsert> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }
}

pub fn test_config(admin_token: Option<&str>) -> Config {
    Config {
        api_port: 0,
        metrics_port: 0,
        store: StoreBackend::Memory,
        database: DatabaseConfig {
            url: None,
            pool_size: 1,
            acquire_timeout_secs: 1,
        },
        redis: RedisConfig {
            url: "redis://127.0.0.1:6379".to_string(),
        },
        admin: AdminConfig {
            token: admin_token.map(str::to_string),
        },
        issuance: IssuanceConfig::default(),
    }
}

/// Test fixtures and helper functions
pub struct TestContext {
    pub server: TestServer,
    pub state: AppState,
    pub repo: Arc<CountingRepository>,
}

impl TestContext {
    /// Router over a fresh in-memory store with the admin token configured
    pub fn new() -> Self {
        Self::with_admin_token(Some(ADMIN_TOKEN))
    }

    pub fn with_admin_token(admin_token: Option<&str>) -> Self {
        let repo = Arc::new(CountingRepository::default());
        let state = AppState::new(test_config(admin_token), repo.clone());
        let server = TestServer::new(build_router(state.clone())).expect("Failed to start test server");

        Self { server, state, repo }
    }

    /// Insert codes directly, bypassing the admin routes
    pub async fn seed_codes(
        &self,
        codes: &[&str],
        max_redemptions: i32,
        expires_at: Option<DateTime<Utc>>,
    ) {
        let batch = NewPromoBatch {
            codes: codes
                .iter()
                .map(|c| PromoCodeValue::parse(c).expect("invalid seed code"))
                .collect(),
            bonus_questions: 50,
            max_redemptions,
            expires_at,
            notes: Some("seeded".to_string()),
        };

        match self.repo.insert_batch(&batch).await.expect("Failed to seed codes") {
            BatchInsert::Inserted => {}
            BatchInsert::Collided(codes) => panic!("seed codes already exist: {:?}", codes),
        }
    }
}

/// Helper function to parse error response
pub fn parse_error(body: &str) -> Option<(String, String, String)> {
    let json: Value = serde_json::from_str(body).ok()?;
    let error = json.get("error")?;

    Some((
        error.get("code")?.as_str()?.to_string(),
        error.get("message")?.as_str()?.to_string(),
        error.get("category")?.as_str()?.to_string(),
    ))
}

/// Promo codes listed on the created-codes page
pub fn codes_in_page(html: &str) -> Vec<String> {
    html.split("<code>")
        .skip(1)
        .filter_map(|chunk| chunk.split("</code>").next())
        .map(str::to_string)
        .collect()
}
