//! Warden server binary.

use anyhow::{bail, Context, Result};
use tracing::{error, info};
use warden_server::config::{load_config, validate_config};
use warden_server::Server;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = load_config()?;
    warden_common_log::init(config.logging.to_log_config())
        .context("Failed to initialize logging")?;

    if let Err(errors) = validate_config(&config) {
        for err in &errors {
            error!(error = %err, "Invalid configuration");
        }
        bail!("{} configuration error(s)", errors.len());
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Warden server");

    let server = Server::new(config).await?;
    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}
