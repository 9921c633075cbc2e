//! Upload, remove, submit and widget-config endpoints.

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::{
    error::{AppError, Result},
    models::{ApiResponse, FrontendConfig, SubmissionPayload},
    uploader::{
        service::UploadError, validation::accepted_mime_types, StagingReference, UploadPolicy,
        UploadedFile, ValidationError,
    },
    AppState,
};

/// Action name the widget nonce is bound to.
pub const NONCE_ACTION: &str = "easy-dragdrop-upload";

pub const NONCE_HEADER: &str = "x-uploader-nonce";
const SESSION_HEADER: &str = "x-session-token";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

/// Verifies the request nonce before anything else runs.
fn require_nonce(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let nonce = header_str(headers, NONCE_HEADER);
    let session = header_str(headers, SESSION_HEADER);

    if !state.nonce.verify(nonce, NONCE_ACTION, session) {
        return Err(AppError::Authentication);
    }

    Ok(())
}

/// `POST /api/uploader/upload` - one multipart file plus its policy token.
pub async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    require_nonce(&state, &headers)?;

    let mut file: Option<UploadedFile> = None;
    let mut secret_key: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let filename = field
                    .file_name()
                    .ok_or_else(|| AppError::BadRequest("Missing filename".to_string()))?
                    .to_string();

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?;

                file = Some(UploadedFile::new(&filename, data.to_vec()));
            }
            "secret_key" => {
                let value = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read policy token: {}", e))
                })?;
                secret_key = Some(value);
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::BadRequest("No valid file uploaded.".to_string()))?;

    let secret_key = secret_key.filter(|key| !key.is_empty());
    let policy = match secret_key {
        // An absent token is an authentication failure, not a policy one:
        // every legitimate widget render embeds it.
        None => return Err(AppError::Authentication),
        Some(token) => UploadPolicy::decode(&token).map_err(|e| AppError::Policy(e.to_string()))?,
    };

    let reference = state
        .upload_service
        .handle_upload(file, &policy)
        .await
        .map_err(|err| map_upload_error(&state, err))?;

    Ok(Json(ApiResponse::success(json!({
        "file_id": reference.to_string(),
    }))))
}

fn map_upload_error(state: &AppState, err: UploadError) -> AppError {
    match err {
        UploadError::Validation(err) => match err {
            ValidationError::FileTypeNotAllowed { .. } | ValidationError::UnknownFileType => {
                let message = state
                    .config
                    .uploader
                    .file_type_error
                    .clone()
                    .unwrap_or_else(|| err.to_string());
                AppError::FileType(message)
            }
            ValidationError::FileTooLarge { .. } => {
                let message = state
                    .config
                    .uploader
                    .file_size_error
                    .clone()
                    .unwrap_or_else(|| err.to_string());
                AppError::FileSize(message)
            }
            ValidationError::MissingFilename => {
                AppError::BadRequest("No valid file uploaded.".to_string())
            }
        },
        UploadError::Storage(_) => AppError::InternalServerError,
    }
}

/// `POST /api/uploader/remove` - request body is the staging reference.
pub async fn handle_remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse> {
    require_nonce(&state, &headers)?;

    let reference = body.trim();
    if reference.is_empty() {
        return Err(AppError::BadRequest("Missing file reference.".to_string()));
    }

    let Some(reference) = StagingReference::parse(reference) else {
        return Err(AppError::BadRequest("Invalid file reference.".to_string()));
    };

    // Removal is idempotent: an unknown reference is a soft no-op so
    // clients retrying a remove never see an error.
    let removed = state
        .upload_service
        .remove(&reference)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    let message = if removed {
        "Files deleted successfully."
    } else {
        "Nothing to delete."
    };

    Ok(Json(ApiResponse::success(json!({ "message": message }))))
}

#[derive(Debug, Serialize)]
struct ProcessedField {
    id: String,
    /// Public URLs, for display and notifications.
    value: Vec<String>,
    /// Permanent paths, for internal re-processing.
    raw_value: Vec<String>,
}

/// `POST /api/uploader/submit` - promotes every staged reference carried by
/// the submitted fields into permanent storage.
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(payload): Json<SubmissionPayload>,
) -> Result<impl IntoResponse> {
    let mut fields = Vec::with_capacity(payload.fields.len());

    for field in &payload.fields {
        let committed = state.commit.commit_field(field).await;

        fields.push(ProcessedField {
            id: field.id.clone(),
            value: committed.urls,
            raw_value: committed.paths,
        });
    }

    Ok(Json(ApiResponse::success(json!({ "fields": fields }))))
}

/// `GET /api/uploader/config` - the widget bootstrap surface. The policy
/// token and a fresh nonce are minted here, page-render style.
pub async fn handle_config(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let session = header_str(&headers, SESSION_HEADER);

    let policy = UploadPolicy::new(
        &state.config.uploader.allowed_file_types,
        state.config.max_file_size_bytes(),
    );

    let config = FrontendConfig {
        accepted_file_types: accepted_mime_types(&state.config.uploader.allowed_file_types),
        ajax_url: format!(
            "{}/api/uploader/upload",
            state.config.server.public_url.trim_end_matches('/')
        ),
        label_idle: state.config.uploader.label_idle.clone(),
        nonce: state.nonce.create(NONCE_ACTION, session),
        secret_key: policy.encode(),
        label_file_type_not_allowed: state.config.uploader.file_type_error.clone(),
        label_max_file_size_exceeded: state.config.uploader.file_size_error.clone(),
    };

    Ok(Json(ApiResponse::success(config)))
}
