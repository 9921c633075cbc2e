//! Isolated per-upload staging directories.
//!
//! Every accepted upload gets a fresh `<root>/<uuid>/<filename>` directory.
//! The uuid is the only handle the client receives, so concurrent uploads
//! are isolated without any locking.

use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use super::models::StagingReference;

#[derive(Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes an uploaded file under a fresh staging directory and returns
    /// its reference. On a failed write the half-created directory is torn
    /// down so no partial state survives.
    pub async fn stage(&self, filename: &str, data: &[u8]) -> std::io::Result<StagingReference> {
        let reference = StagingReference::new(Uuid::new_v4(), filename);
        let dir = self.dir_for(&reference);

        fs::create_dir_all(&dir).await?;

        if let Err(err) = fs::write(dir.join(&reference.filename), data).await {
            if let Err(cleanup_err) = fs::remove_dir_all(&dir).await {
                tracing::warn!(
                    staging_id = %reference.id,
                    error = %cleanup_err,
                    "failed to clean up staging directory after write error"
                );
            }
            return Err(err);
        }

        Ok(reference)
    }

    /// Absolute path of a staged file.
    pub fn file_path(&self, reference: &StagingReference) -> PathBuf {
        self.dir_for(reference).join(&reference.filename)
    }

    /// Absolute path of a reference's staging directory.
    pub fn dir_for(&self, reference: &StagingReference) -> PathBuf {
        self.root.join(reference.id.to_string())
    }

    /// Recursively deletes a staging directory. Idempotent: removing an
    /// unknown or already-removed reference reports `false` rather than an
    /// error.
    pub async fn remove(&self, reference: &StagingReference) -> std::io::Result<bool> {
        let dir = self.dir_for(reference);

        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_stage_creates_isolated_directory() {
        let temp = TempDir::new().unwrap();
        let staging = StagingArea::new(temp.path());

        let reference = staging.stage("photo.jpg", b"fake image bytes").await.unwrap();

        let dir = staging.dir_for(&reference);
        assert!(dir.is_dir());

        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].as_ref().unwrap().file_name().to_str().unwrap(),
            "photo.jpg"
        );

        let contents = std::fs::read(staging.file_path(&reference)).unwrap();
        assert_eq!(contents, b"fake image bytes");
    }

    #[tokio::test]
    async fn test_concurrent_stages_do_not_collide() {
        let temp = TempDir::new().unwrap();
        let staging = StagingArea::new(temp.path());

        let a = staging.stage("photo.jpg", b"first").await.unwrap();
        let b = staging.stage("photo.jpg", b"second").await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(std::fs::read(staging.file_path(&a)).unwrap(), b"first");
        assert_eq!(std::fs::read(staging.file_path(&b)).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let staging = StagingArea::new(temp.path());

        let reference = staging.stage("photo.jpg", b"bytes").await.unwrap();

        assert!(staging.remove(&reference).await.unwrap());
        assert!(!staging.dir_for(&reference).exists());

        // Second removal is a no-op, not an error.
        assert!(!staging.remove(&reference).await.unwrap());
    }
}
