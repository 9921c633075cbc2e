//! Request and response models

use serde::{Deserialize, Serialize};

use crate::uploader::SubmissionField;

/// Response envelope shared by every endpoint: `{success, data}`, where
/// `data` carries an `error` string on failure.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

/// A submitted form carrying one or more uploader fields to commit.
#[derive(Debug, Deserialize)]
pub struct SubmissionPayload {
    pub fields: Vec<SubmissionField>,
}

/// The configuration surface the front-end widget consumes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendConfig {
    pub accepted_file_types: Vec<String>,
    pub ajax_url: String,
    pub label_idle: String,
    pub nonce: String,
    /// The policy token echoed back with each upload.
    pub secret_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_file_type_not_allowed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_max_file_size_exceeded: Option<String>,
}
