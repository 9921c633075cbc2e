//! Route table for the uploader service

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::{handlers::uploader, models::ApiResponse, AppState};

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/uploader/config", get(uploader::handle_config))
        .route("/api/uploader/upload", post(uploader::handle_upload))
        .route("/api/uploader/remove", post(uploader::handle_remove))
        .route("/api/uploader/submit", post(uploader::handle_submit))
}

async fn handle_root(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(serde_json::json!({
        "app": state.app_name,
        "version": state.version,
        "endpoints": {
            "health": "/health",
            "config": "/api/uploader/config",
            "upload": "/api/uploader/upload",
            "remove": "/api/uploader/remove",
            "submit": "/api/uploader/submit"
        }
    })))
}

async fn handle_health() -> impl IntoResponse {
    Json(ApiResponse::success(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().timestamp(),
    })))
}
