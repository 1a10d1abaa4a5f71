//! Payroll cycle HTTP server.
//!
//! Environment:
//! - `PAYROLL_CONFIG_DIR`: configuration directory (default `config/payroll`)
//! - `PAYROLL_BIND_ADDR`: listen address (default `127.0.0.1:3000`)
//! - `RUST_LOG`: tracing filter (default `info`)

use payroll_cycle::api::{AppState, create_router};
use payroll_cycle::config::ConfigLoader;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_DIR: &str = "config/payroll";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_dir =
        std::env::var("PAYROLL_CONFIG_DIR").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
    let bind_addr =
        std::env::var("PAYROLL_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

    let loader = ConfigLoader::load(&config_dir)?;
    info!(
        config_dir = %config_dir,
        approval_threshold = %loader.config().approval_threshold(),
        "Configuration loaded"
    );

    let router = create_router(AppState::from_loader(loader));
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "Payroll cycle server listening");

    axum::serve(listener, router).await?;
    Ok(())
}
