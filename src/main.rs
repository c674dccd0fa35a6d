use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let cfg = clinic::config::ServerConfig::from_env()?;
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "clinic",
        "clinic starting: RUST_LOG='{}', bind={}, port={}, session_ttl_secs={}, sweep_interval={:?}",
        rust_log, cfg.bind, cfg.port, cfg.session_ttl.num_seconds(), cfg.sweep_interval
    );

    clinic::server::run_with_config(cfg).await
}
