//! End-to-end upload-then-commit scenarios.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uploader_core::handlers::uploader::{NONCE_ACTION, NONCE_HEADER};
use uploader_core::{create_app, AppConfig, AppState, UploadPolicy};

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

fn test_state(max_file_size_mb: u64) -> (AppState, TempDir) {
    let temp = TempDir::new().unwrap();

    let mut config = AppConfig::default();
    config.storage.uploads_root = temp.path().to_path_buf();
    config.storage.public_base_url = "http://example.test/uploads".to_string();
    config.uploader.max_file_size_mb = max_file_size_mb;

    (AppState::new(config), temp)
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn upload(
    app: &axum::Router,
    nonce: &str,
    filename: &str,
    data: &[u8],
    secret_key: &str,
) -> String {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(
        format!(
            "\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"secret_key\"\r\n\r\n{secret_key}\r\n--{BOUNDARY}--\r\n"
        )
        .as_bytes(),
    );

    let request = Request::builder()
        .method("POST")
        .uri("/api/uploader/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(NONCE_HEADER, nonce)
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    json["data"]["file_id"].as_str().unwrap().to_string()
}

async fn submit(app: &axum::Router, fields: Value) -> Value {
    let request = Request::builder()
        .method("POST")
        .uri("/api/uploader/submit")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "fields": fields }).to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    response_json(response).await
}

#[tokio::test]
async fn test_upload_then_commit_end_to_end() {
    let (state, temp) = test_state(5);
    let nonce = state.nonce.create(NONCE_ACTION, "");
    let app = create_app(state);

    let token = UploadPolicy::new(
        &["jpg".to_string(), "png".to_string()],
        5 * 1024 * 1024,
    )
    .encode();

    // A 2MB upload under a 5MB policy; extension matching ignores case.
    let file_id = upload(&app, &nonce, "photo.JPG", &vec![0u8; 2 * 1024 * 1024], &token).await;

    let json = submit(&app, json!([{ "id": "upload", "raw_value": [file_id] }])).await;

    let field = &json["data"]["fields"][0];
    assert_eq!(field["id"], "upload");
    assert_eq!(
        field["value"],
        json!(["http://example.test/uploads/photo.JPG"])
    );
    assert_eq!(field["raw_value"].as_array().unwrap().len(), 1);

    assert!(temp.path().join("photo.JPG").is_file());

    // Staging root is emptied once the file is committed.
    let staging_root = temp.path().join("easy-dragdrop-uploader-temp");
    assert_eq!(std::fs::read_dir(&staging_root).unwrap().count(), 0);
}

#[tokio::test]
async fn test_commit_deduplicates_collisions_in_order() {
    let (state, temp) = test_state(5);
    let nonce = state.nonce.create(NONCE_ACTION, "");
    let app = create_app(state.clone());

    // Destination already holds a file with A's basename.
    std::fs::write(temp.path().join("photo.jpg"), b"already there").unwrap();

    let token = UploadPolicy::new(&["jpg".to_string()], 5 * 1024 * 1024).encode();
    let a = upload(&app, &nonce, "photo.jpg", b"file a", &token).await;
    let b = upload(&app, &nonce, "other.jpg", b"file b", &token).await;

    let json = submit(&app, json!([{ "id": "upload", "raw_value": [a, b] }])).await;

    assert_eq!(
        json["data"]["fields"][0]["value"],
        json!([
            "http://example.test/uploads/photo-1.jpg",
            "http://example.test/uploads/other.jpg",
        ])
    );
    assert_eq!(
        std::fs::read(temp.path().join("photo.jpg")).unwrap(),
        b"already there"
    );
    assert_eq!(std::fs::read(temp.path().join("photo-1.jpg")).unwrap(), b"file a");
}

#[tokio::test]
async fn test_commit_skips_unknown_references() {
    let (state, _temp) = test_state(5);
    let nonce = state.nonce.create(NONCE_ACTION, "");
    let app = create_app(state);

    let token = UploadPolicy::new(&["jpg".to_string()], 5 * 1024 * 1024).encode();
    let real = upload(&app, &nonce, "real.jpg", b"real", &token).await;
    let ghost = format!("{}/ghost.jpg", uuid::Uuid::new_v4());

    let json = submit(&app, json!([{ "id": "upload", "raw_value": [ghost, real] }])).await;

    // The unknown reference contributes nothing; the rest commits normally.
    assert_eq!(
        json["data"]["fields"][0]["value"],
        json!(["http://example.test/uploads/real.jpg"])
    );
}

#[tokio::test]
async fn test_duplicate_submit_commits_once() {
    let (state, temp) = test_state(5);
    let nonce = state.nonce.create(NONCE_ACTION, "");
    let app = create_app(state);

    let token = UploadPolicy::new(&["jpg".to_string()], 5 * 1024 * 1024).encode();
    let file_id = upload(&app, &nonce, "photo.jpg", b"bytes", &token).await;

    let fields = json!([{ "id": "upload", "raw_value": [file_id] }]);
    let first = submit(&app, fields.clone()).await;
    let second = submit(&app, fields).await;

    assert_eq!(first["data"]["fields"][0]["value"].as_array().unwrap().len(), 1);
    // The second submit finds the staging directory gone and skips it.
    assert!(second["data"]["fields"][0]["value"]
        .as_array()
        .unwrap()
        .is_empty());
    // No photo-1.jpg was created by the replay.
    assert!(!temp.path().join("photo-1.jpg").exists());
}
