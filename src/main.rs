use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use snapfeed::config::{Cli, Config};
use snapfeed::media::ImageKitClient;
use snapfeed::state::AppState;
use snapfeed::{app, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Uploads are staged here before going to the CDN
    std::fs::create_dir_all(config.temp_dir())?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    let missing = config.cdn.missing_settings();
    if !missing.is_empty() {
        tracing::warn!(?missing, "CDN settings incomplete");
    }
    let imagekit = ImageKitClient::new(&config.cdn);
    if !imagekit.is_configured() {
        tracing::warn!("cdn.private_key is not set; uploads will fail until it is configured");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::new(pool, config, Arc::new(imagekit));
    let app = app(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
