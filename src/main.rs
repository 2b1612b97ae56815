use anyhow::Result;
use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use whojoshi::config::ProxyConfig;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = dotenv();
    init_tracing();
    match loaded {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }
    let config = ProxyConfig::from_env()?;
    info!(
        bind = %config.bind,
        upstream = %config.upstream.base_url,
        "Starting recommendation proxy"
    );
    whojoshi::app::run_server(config).await
}
