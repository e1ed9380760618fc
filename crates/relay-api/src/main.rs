//! Relay server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p relay-api --bin relay-server
//! ```
//!
//! Configuration is loaded from environment variables and `.env`.

use relay_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "Server failed to start");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = AppConfig::from_env()?;

    // Initialize tracing
    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        port = config.server.port,
        auth = config.database.is_some(),
        webhook = config.webhook.is_some(),
        "Configuration loaded"
    );

    relay_api::run(config).await?;

    Ok(())
}
