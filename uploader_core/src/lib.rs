//! Core library for the drag-and-drop uploader service.
//!
//! Implements the two-phase upload flow: files are staged into isolated
//! per-upload temp directories by the upload endpoint, then promoted into
//! permanent storage by the commit processor when the owning form is
//! submitted.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod uploader;

pub use auth::NonceService;
pub use config::AppConfig;
pub use error::{AppError, Result};
pub use handlers::create_routes;
pub use models::{ApiResponse, FrontendConfig, SubmissionPayload};
pub use uploader::{
    CommitProcessor, CommittedField, StagingArea, StagingReference, SubmissionField, UploadPolicy,
    UploadService, UploadedFile, UploaderHooks, ValidationPipeline,
};

use axum::{extract::DefaultBodyLimit, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// Headroom on top of the policy's max file size for multipart framing and
/// the other form fields.
const BODY_LIMIT_SLACK_BYTES: u64 = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub config: Arc<AppConfig>,
    pub nonce: NonceService,
    pub upload_service: UploadService,
    pub commit: CommitProcessor,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self::with_hooks(config, UploaderHooks::new())
    }

    /// Builds the full service graph from configuration. Hooks registered
    /// here observe every upload and commit for the process lifetime; a
    /// single state instance carries them to every request.
    pub fn with_hooks(config: AppConfig, hooks: UploaderHooks) -> Self {
        let hooks = Arc::new(hooks);
        let staging = StagingArea::new(config.staging_root());

        let upload_service = UploadService::new(
            staging.clone(),
            ValidationPipeline::standard(),
            hooks.clone(),
        );

        let commit = CommitProcessor::new(
            staging,
            config.storage.uploads_root.clone(),
            config.storage_path(),
            config.storage.public_base_url.clone(),
            hooks,
        );

        let nonce = NonceService::new(
            config.auth.nonce_secret.clone(),
            config.auth.nonce_lifetime_seconds,
        );

        Self {
            app_name: "DragDrop Uploader".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config: Arc::new(config),
            nonce,
            upload_service,
            commit,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = (state.config.max_file_size_bytes() + BODY_LIMIT_SLACK_BYTES) as usize;

    let cors = if state.config.server.cors_allowed_origins.is_empty() {
        middleware::cors::cors_layer_permissive()
    } else {
        middleware::cors::cors_layer(&state.config.server.cors_allowed_origins)
    };

    Router::new()
        .merge(create_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(middleware::logging::logging_layer())
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
