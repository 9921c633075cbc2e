//! Commit processor: promotes staged files into permanent storage when the
//! owning form is submitted.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use super::hooks::UploaderHooks;
use super::models::{CommittedField, StagingReference, SubmissionField};
use super::staging::StagingArea;

#[derive(Clone)]
pub struct CommitProcessor {
    staging: StagingArea,
    uploads_root: PathBuf,
    storage_path: PathBuf,
    public_base_url: String,
    hooks: Arc<UploaderHooks>,
}

impl CommitProcessor {
    pub fn new(
        staging: StagingArea,
        uploads_root: impl Into<PathBuf>,
        storage_path: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        hooks: Arc<UploaderHooks>,
    ) -> Self {
        Self {
            staging,
            uploads_root: uploads_root.into(),
            storage_path: storage_path.into(),
            public_base_url: public_base_url.into(),
            hooks,
        }
    }

    /// Promotes every staged reference in a field, in input order.
    ///
    /// Missing staging directories are skipped (duplicate submits race here,
    /// so the second mover finds nothing). Per-file IO failures are logged
    /// and isolated: earlier moves stand and later references still run.
    /// There is no rollback.
    pub async fn commit_field(&self, field: &SubmissionField) -> CommittedField {
        let mut committed = CommittedField::default();

        for raw in &field.raw_value {
            if raw.is_empty() {
                continue;
            }

            let Some(reference) = StagingReference::parse(raw) else {
                tracing::warn!(field = %field.id, reference = %raw, "unparseable staging reference skipped");
                continue;
            };

            match self.commit_one(&reference).await {
                Ok(Some(destination)) => {
                    committed.urls.push(self.public_url(&destination));
                    committed
                        .paths
                        .push(destination.to_string_lossy().to_string());
                }
                Ok(None) => {
                    // Expired, already committed, or never uploaded. The
                    // submission proceeds without this entry.
                    tracing::warn!(
                        field = %field.id,
                        staging_id = %reference.id,
                        "staging directory missing, reference skipped"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        field = %field.id,
                        staging_id = %reference.id,
                        error = %err,
                        "failed to commit staged file"
                    );
                }
            }
        }

        self.hooks.notify_commit(field, &committed);

        committed
    }

    /// Moves one staged file into the storage path. Returns the final
    /// destination, or `None` when the source no longer exists.
    async fn commit_one(&self, reference: &StagingReference) -> std::io::Result<Option<PathBuf>> {
        let source = self.staging.file_path(reference);

        if !source.is_file() {
            return Ok(None);
        }

        fs::create_dir_all(&self.storage_path).await?;

        let destination = self
            .unique_destination(&self.storage_path, &reference.filename)
            .await;

        move_file(&source, &destination).await?;

        tracing::info!(
            staging_id = %reference.id,
            destination = %destination.display(),
            "staged file committed"
        );

        // The staging directory is empty now; removal failures must not
        // fail the commit.
        if let Err(err) = self.staging.remove(reference).await {
            tracing::warn!(
                staging_id = %reference.id,
                error = %err,
                "failed to remove emptied staging directory"
            );
        }

        Ok(Some(destination))
    }

    /// Picks a free destination name, suffixing `name-1.ext`, `name-2.ext`,
    /// ... while the candidate is taken.
    async fn unique_destination(&self, dir: &Path, filename: &str) -> PathBuf {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        let mut candidate = dir.join(filename);
        let mut counter = 1u32;

        while fs::try_exists(&candidate).await.unwrap_or(false) {
            candidate = dir.join(format!("{}-{}{}", stem, counter, extension));
            counter += 1;
        }

        candidate
    }

    /// Maps an absolute path under the uploads root to its public URL.
    fn public_url(&self, path: &Path) -> String {
        let relative = path
            .strip_prefix(&self.uploads_root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            relative.trim_start_matches('/')
        )
    }
}

/// Moves a file, falling back to copy-and-delete when a plain rename is not
/// possible (staging and storage on different filesystems).
async fn move_file(source: &Path, destination: &Path) -> std::io::Result<()> {
    match fs::rename(source, destination).await {
        Ok(()) => {}
        Err(_) => {
            fs::copy(source, destination).await?;
            fs::remove_file(source).await?;
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        // Committed files are served publicly.
        let _ = fs::set_permissions(destination, std::fs::Permissions::from_mode(0o644)).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Setup {
        _temp: TempDir,
        staging: StagingArea,
        processor: CommitProcessor,
        storage: PathBuf,
    }

    fn setup() -> Setup {
        let temp = TempDir::new().unwrap();
        let uploads_root = temp.path().to_path_buf();
        let staging = StagingArea::new(uploads_root.join("easy-dragdrop-uploader-temp"));
        let storage = uploads_root.clone();

        let processor = CommitProcessor::new(
            staging.clone(),
            uploads_root,
            storage.clone(),
            "http://example.test/uploads",
            Arc::new(UploaderHooks::new()),
        );

        Setup {
            _temp: temp,
            staging,
            processor,
            storage,
        }
    }

    fn field(refs: &[&StagingReference]) -> SubmissionField {
        SubmissionField {
            id: "upload".to_string(),
            raw_value: refs.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_commit_moves_file_and_builds_url() {
        let s = setup();

        let reference = s.staging.stage("photo.jpg", b"bytes").await.unwrap();
        let committed = s.processor.commit_field(&field(&[&reference])).await;

        assert_eq!(
            committed.urls,
            vec!["http://example.test/uploads/photo.jpg"]
        );
        assert!(s.storage.join("photo.jpg").is_file());
        assert!(!s.staging.dir_for(&reference).exists());
    }

    #[tokio::test]
    async fn test_collision_gets_numeric_suffix() {
        let s = setup();

        std::fs::write(s.storage.join("photo.jpg"), b"existing").unwrap();
        std::fs::write(s.storage.join("photo-1.jpg"), b"existing too").unwrap();

        let reference = s.staging.stage("photo.jpg", b"new").await.unwrap();
        let committed = s.processor.commit_field(&field(&[&reference])).await;

        assert_eq!(
            committed.urls,
            vec!["http://example.test/uploads/photo-2.jpg"]
        );
        assert_eq!(std::fs::read(s.storage.join("photo-2.jpg")).unwrap(), b"new");
        assert_eq!(
            std::fs::read(s.storage.join("photo.jpg")).unwrap(),
            b"existing"
        );
    }

    #[tokio::test]
    async fn test_output_preserves_input_order() {
        let s = setup();

        std::fs::write(s.storage.join("a.jpg"), b"taken").unwrap();

        let a = s.staging.stage("a.jpg", b"first").await.unwrap();
        let b = s.staging.stage("b.jpg", b"second").await.unwrap();
        let committed = s.processor.commit_field(&field(&[&a, &b])).await;

        assert_eq!(
            committed.urls,
            vec![
                "http://example.test/uploads/a-1.jpg",
                "http://example.test/uploads/b.jpg",
            ]
        );
        assert_eq!(committed.paths.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_reference_is_skipped() {
        let s = setup();

        let staged = s.staging.stage("real.jpg", b"bytes").await.unwrap();
        let ghost = StagingReference::new(uuid::Uuid::new_v4(), "ghost.jpg");

        let committed = s.processor.commit_field(&field(&[&ghost, &staged])).await;

        assert_eq!(committed.urls, vec!["http://example.test/uploads/real.jpg"]);
    }

    #[tokio::test]
    async fn test_duplicate_commit_is_a_noop() {
        let s = setup();

        let reference = s.staging.stage("photo.jpg", b"bytes").await.unwrap();
        let submission = field(&[&reference]);

        let first = s.processor.commit_field(&submission).await;
        let second = s.processor.commit_field(&submission).await;

        assert_eq!(first.urls.len(), 1);
        assert!(second.urls.is_empty());
        assert!(second.paths.is_empty());
    }

    #[tokio::test]
    async fn test_garbage_references_are_skipped() {
        let s = setup();

        let submission = SubmissionField {
            id: "upload".to_string(),
            raw_value: vec![
                String::new(),
                "not-a-reference".to_string(),
                "../../etc/passwd".to_string(),
            ],
        };

        let committed = s.processor.commit_field(&submission).await;
        assert!(committed.urls.is_empty());
        assert!(committed.paths.is_empty());
    }

    #[tokio::test]
    async fn test_commit_into_custom_subdir() {
        let temp = TempDir::new().unwrap();
        let uploads_root = temp.path().to_path_buf();
        let staging = StagingArea::new(uploads_root.join("easy-dragdrop-uploader-temp"));

        let processor = CommitProcessor::new(
            staging.clone(),
            uploads_root.clone(),
            uploads_root.join("form-uploads"),
            "http://example.test/uploads",
            Arc::new(UploaderHooks::new()),
        );

        let reference = staging.stage("doc.pdf", b"%PDF").await.unwrap();
        let committed = processor
            .commit_field(&SubmissionField {
                id: "upload".to_string(),
                raw_value: vec![reference.to_string()],
            })
            .await;

        assert_eq!(
            committed.urls,
            vec!["http://example.test/uploads/form-uploads/doc.pdf"]
        );
        assert!(uploads_root.join("form-uploads/doc.pdf").is_file());
    }
}
