//! Upload endpoint service: validate against the policy, then stage.

use std::sync::Arc;

use super::hooks::UploaderHooks;
use super::models::{StagingReference, UploadedFile};
use super::policy::UploadPolicy;
use super::staging::StagingArea;
use super::validation::{ValidationError, ValidationPipeline};

#[derive(Clone)]
pub struct UploadService {
    staging: StagingArea,
    pipeline: Arc<ValidationPipeline>,
    hooks: Arc<UploaderHooks>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to store uploaded file")]
    Storage(#[source] std::io::Error),
}

impl UploadService {
    pub fn new(
        staging: StagingArea,
        pipeline: ValidationPipeline,
        hooks: Arc<UploaderHooks>,
    ) -> Self {
        Self {
            staging,
            pipeline: Arc::new(pipeline),
            hooks,
        }
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Validates one uploaded file against the policy and stages it.
    ///
    /// Validation failures surface to the caller before any filesystem
    /// write; a failed write leaves nothing behind in staging.
    pub async fn handle_upload(
        &self,
        file: UploadedFile,
        policy: &UploadPolicy,
    ) -> Result<StagingReference, UploadError> {
        self.pipeline.validate(&file, policy)?;

        match self.staging.stage(&file.original_filename, &file.data).await {
            Ok(reference) => {
                tracing::info!(
                    staging_id = %reference.id,
                    filename = %reference.filename,
                    size = file.size(),
                    "file staged"
                );
                self.hooks.notify_upload(&file, &reference);
                Ok(reference)
            }
            Err(err) => {
                tracing::error!(
                    filename = %file.original_filename,
                    error = %err,
                    "failed to stage uploaded file"
                );
                self.hooks.notify_upload_failure(&file);
                Err(UploadError::Storage(err))
            }
        }
    }

    /// Removes a previously staged upload. Unknown references are a soft
    /// no-op so duplicate removals never fail the caller.
    pub async fn remove(&self, reference: &StagingReference) -> std::io::Result<bool> {
        let removed = self.staging.remove(reference).await?;

        if removed {
            tracing::info!(staging_id = %reference.id, "staged upload removed");
        } else {
            tracing::debug!(staging_id = %reference.id, "staged upload already gone");
        }

        Ok(removed)
    }
}
