//! Main entry point for the uploader server binary

use anyhow::Result;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uploader_core::{create_app, run_server, AppConfig, AppState, UploaderHooks};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    info!("Configuration loaded successfully");
    info!("Server will bind to: {}", config.bind_address());
    info!("Storage path: {}", config.storage_path().display());
    info!("Staging root: {}", config.staging_root().display());

    config
        .create_directories()
        .map_err(|e| anyhow::anyhow!("Failed to create storage directories: {}", e))?;

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;

    let hooks = UploaderHooks::new()
        .on_upload(|file, reference| {
            tracing::debug!(
                staging_id = %reference.id,
                filename = %file.original_filename,
                "upload accepted"
            );
        })
        .on_commit(|field, committed| {
            tracing::debug!(
                field = %field.id,
                committed = committed.urls.len(),
                "field committed"
            );
        });

    let state = AppState::with_hooks(config, hooks);

    info!("App: {} v{}", state.app_name, state.version);

    let app = create_app(state);

    run_server(app, addr).await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };

        format!(
            "{}={},uploader_core={},tower_http=debug",
            env!("CARGO_CRATE_NAME"),
            default_level,
            default_level
        )
        .into()
    });

    let fmt_layer = fmt::layer().with_target(true);

    let is_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    if is_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.pretty())
            .init();
    }
}
