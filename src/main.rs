use anyhow::Result;
use clap::Parser;
use lectern::{create_router, AppState, Config, ModelCache, WhisperAdapter};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "lectern", about = "Lecture transcription service")]
struct Args {
    /// Configuration file (TOML, extension optional)
    #[arg(long, default_value = "config/lectern")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Pending folder: {}", cfg.folders.pending.display());
    info!("Models folder: {}", cfg.transcription.models_dir.display());
    info!("Default model: {}", cfg.transcription.default_model);

    cfg.folders.ensure().await?;

    let cache = Arc::new(ModelCache::new(cfg.transcription.models_dir.clone()));
    let adapter = Arc::new(WhisperAdapter::new(cache));
    let state = AppState::new(cfg.clone(), adapter);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
