//! Main entry point for the Repit server.

use std::sync::Arc;

use repit_server::{
    metrics,
    model::common::{AppState, Configuration},
    startup::{self, LoggingConfig},
};
use tracing::{info, warn};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let configuration = Configuration::new()?;

    let logging_config = LoggingConfig::resolve(&configuration);
    let _logging_guard = startup::init_logging(&logging_config)?;

    metrics::init_metrics();
    let prometheus = match metrics::install_prometheus() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus recorder not installed: {}", e);
            None
        }
    };

    let persistence =
        repit_persistence::create_persistence(configuration.database_url().as_deref()).await?;
    info!("Persistence mode: {}", persistence.storage_mode());

    let server_address = configuration.server_address();
    let server_port = configuration.server_port();
    let seed_defaults = configuration.seed_defaults();

    let mut app_state = AppState::new(configuration, persistence);
    if let Some(handle) = prometheus {
        app_state = app_state.with_prometheus(handle);
    }
    if seed_defaults {
        app_state.seed_defaults().await?;
    }

    info!(
        "Starting Repit server on {}:{} (version {})",
        server_address,
        server_port,
        app_state.configuration.version()
    );

    startup::main_server(Arc::new(app_state), server_address, server_port)?.await?;

    info!("Repit server stopped");
    Ok(())
}
