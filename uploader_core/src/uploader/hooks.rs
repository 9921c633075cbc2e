//! Post-processing callbacks, invoked in registration order.
//!
//! This replaces ambient event dispatch with explicit observer lists wired
//! at startup: integrations register interest in successful uploads and
//! committed fields before the services are constructed.

use super::models::{CommittedField, StagingReference, SubmissionField, UploadedFile};

type UploadCallback = Box<dyn Fn(&UploadedFile, &StagingReference) + Send + Sync>;
type UploadFailureCallback = Box<dyn Fn(&UploadedFile) + Send + Sync>;
type CommitCallback = Box<dyn Fn(&SubmissionField, &CommittedField) + Send + Sync>;

#[derive(Default)]
pub struct UploaderHooks {
    on_upload: Vec<UploadCallback>,
    on_upload_failure: Vec<UploadFailureCallback>,
    on_commit: Vec<CommitCallback>,
}

impl UploaderHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs after a file lands in staging.
    pub fn on_upload<F>(mut self, callback: F) -> Self
    where
        F: Fn(&UploadedFile, &StagingReference) + Send + Sync + 'static,
    {
        self.on_upload.push(Box::new(callback));
        self
    }

    /// Runs after a validated upload fails to reach staging.
    pub fn on_upload_failure<F>(mut self, callback: F) -> Self
    where
        F: Fn(&UploadedFile) + Send + Sync + 'static,
    {
        self.on_upload_failure.push(Box::new(callback));
        self
    }

    /// Runs after a field's references have been committed.
    pub fn on_commit<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SubmissionField, &CommittedField) + Send + Sync + 'static,
    {
        self.on_commit.push(Box::new(callback));
        self
    }

    pub(crate) fn notify_upload(&self, file: &UploadedFile, reference: &StagingReference) {
        for callback in &self.on_upload {
            callback(file, reference);
        }
    }

    pub(crate) fn notify_upload_failure(&self, file: &UploadedFile) {
        for callback in &self.on_upload_failure {
            callback(file);
        }
    }

    pub(crate) fn notify_commit(&self, field: &SubmissionField, committed: &CommittedField) {
        for callback in &self.on_commit {
            callback(field, committed);
        }
    }
}
