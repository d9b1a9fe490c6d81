use cinema_booking::{
    api::{AppState, create_router},
    config::{database, settings},
    errors::{Error, Result},
    jobs::{ExpirySweeper, StatusReconciler},
    payment_gateway::HostedCheckoutGateway,
};
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let config = Arc::new(settings::load_app_config()?);

    // 4. Connect and create tables
    let db = database::create_connection()
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Background jobs
    let sweeper = ExpirySweeper::new(db.clone(), &config.booking).spawn();
    let reconciler = StatusReconciler::new(db.clone(), &config.booking).spawn();

    // 6. Serve the API
    let state = AppState {
        db,
        gateway: HostedCheckoutGateway::shared(&config.payment),
        config: Arc::clone(&config),
    };
    let app = create_router(state);

    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .inspect_err(|e| error!(addr = %config.server.bind_addr, "Failed to bind: {}", e))?;
    info!(addr = %config.server.bind_addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Error::from)?;

    sweeper.abort();
    reconciler.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
