//! Safe Showing - a WhatsApp check-in bot
//!
//! This is the main entry point for the safe-showing server.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use safe_showing::{
    api::create_router,
    config::Config,
    state::AppState,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("safe_showing={},tower_http=info", config.log_level()))
        .init();

    info!("Starting safe-showing server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, store={:?}, scheduler={:?}",
          config.host, config.port, config.store, config.scheduler);

    let state = Arc::new(AppState::from_config(&config)?);
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /api/whatsapp - Webhook verification");
    info!("  POST /api/whatsapp - Inbound WhatsApp messages");
    info!("  POST /api/cron     - Timer expiry callback");
    info!("  GET  /health       - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
