use anyhow::Result;
use tracing::info;

use smokewatch_api::{app, config, middleware, services};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics()?;

    info!("Starting Smokewatch API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    info!(
        policy = ?config.ingestion.unknown_device_policy,
        cooldown_secs = config.ingestion.alarm_cooldown_secs,
        "Ingestion configured"
    );

    let sink = services::notification_sink(&config);
    let addr = config.socket_addr()?;
    let app = app::create_app(config, pool, sink);

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
