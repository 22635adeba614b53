use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let config = camwatch::config::Config::from_env()?;
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "camwatch",
        "camwatch starting: RUST_LOG='{}', http_port={}, data_dir='{}', auth_mode={:?}",
        rust_log, config.http_port, config.data_dir, config.auth_mode
    );

    camwatch::server::run(config).await
}
