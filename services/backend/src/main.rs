use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use promo_backend::{
    build_router,
    config::{Config, StoreBackend},
    repository::{InMemoryPromoRepository, PostgresPromoRepository, PromoRepository, RedisPromoRepository},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging, JSON when LOG_FORMAT=json
    let use_json = std::env::var("LOG_FORMAT")
        .unwrap_or_else(|_| "text".to_string())
        .eq_ignore_ascii_case("json");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "promo_backend=info,tower_http=info".into());

    if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        service = "promo-backend",
        version = env!("CARGO_PKG_VERSION"),
        log_format = if use_json { "json" } else { "text" },
        "Starting promo backend"
    );

    let config = Config::load()?;
    tracing::info!(store = ?config.store, "Configuration loaded");

    if config.admin.token.is_none() {
        tracing::warn!("PROMO_ADMIN_TOKEN is not set, admin routes will refuse every request");
    }

    let repo = connect_store(&config).await?;
    let api_port = config.api_port;
    let metrics_port = config.metrics_port;

    let app = build_router(AppState::new(config, repo));

    // Metrics live on their own port
    tokio::spawn(async move {
        if let Err(e) = start_metrics_server(metrics_port).await {
            tracing::error!(error = %e, "Metrics server stopped");
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], api_port));
    tracing::info!("Promo API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Promo backend stopped");
    Ok(())
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn PromoRepository>> {
    match config.store {
        StoreBackend::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres store"))?;

            let pool = PgPoolOptions::new()
                .max_connections(config.database.pool_size)
                .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
                .connect(url)
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!(pool_size = config.database.pool_size, "Postgres connected, migrations applied");

            Ok(Arc::new(PostgresPromoRepository::new(pool)))
        }
        StoreBackend::Redis => {
            let client = redis::Client::open(config.redis.url.clone())?;
            let conn = client.get_connection_manager().await?;
            tracing::info!("Redis connected");

            Ok(Arc::new(RedisPromoRepository::new(conn)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store, promo data is lost on restart");
            Ok(Arc::new(InMemoryPromoRepository::new()))
        }
    }
}

async fn start_metrics_server(port: u16) -> anyhow::Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let handle = builder.install_recorder()?;

    let app = Router::new().route("/metrics", get(|| async move { handle.render() }));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Metrics server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
