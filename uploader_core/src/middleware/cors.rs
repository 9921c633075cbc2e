//! CORS (Cross-Origin Resource Sharing) middleware configuration
//!
//! The uploader widget runs inside pages served from other origins, so the
//! upload endpoints must answer preflights for the nonce and session
//! headers.

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer as TowerCorsLayer};

pub fn cors_layer(allowed_origins: &[String]) -> TowerCorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    TowerCorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("accept"),
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-uploader-nonce"),
            HeaderName::from_static("x-session-token"),
        ])
        .max_age(std::time::Duration::from_secs(3600))
}

pub fn cors_layer_permissive() -> TowerCorsLayer {
    TowerCorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600))
}
