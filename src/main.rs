//! Reservation forecast server
//!
//! Serves 6-month reservation forecasts for library equipment.

use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reservation_forecast::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    init_tracing(&config.logging);

    tracing::info!("Starting reservation forecast server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Model SARIMA{:?}x{:?}[{}], horizon {} months, gap policy {:?}",
        config.forecast.non_seasonal_order,
        config.forecast.seasonal_order,
        config.forecast.seasonal_period,
        config.forecast.horizon,
        config.forecast.gap_policy
    );
    match &config.auth.function_key {
        Some(key) => tracing::info!("Function key required (fingerprint {})", api::key_fingerprint(key)),
        None => tracing::warn!("No function key configured; forecast route is open"),
    }

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    let repository = Repository::new(pool);
    let services = Services::new(
        Arc::new(repository),
        config.forecast.clone(),
        config.forecast.fit_timeout(),
    );

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Routes are registered once here; handlers only read shared state afterwards
    let app = api::create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("reservation_forecast={},tower_http=debug", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
