//! Per-upload validation against the decoded policy.
//!
//! Validation is an ordered list of checks evaluated until the first
//! failure. Extra checks can be appended at wiring time; the defaults cover
//! the type and size constraints the policy carries.

use thiserror::Error;

use super::models::UploadedFile;
use super::policy::UploadPolicy;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("File type not allowed: .{extension}")]
    FileTypeNotAllowed { extension: String },

    #[error("File has no recognizable type")]
    UnknownFileType,

    #[error("File too large: {size} bytes (max: {max_size} bytes)")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("Missing filename")]
    MissingFilename,
}

/// One validation predicate. Checks run in registration order; the first
/// failure stops the pipeline.
pub trait UploadCheck: Send + Sync {
    fn check(&self, file: &UploadedFile, policy: &UploadPolicy) -> Result<(), ValidationError>;
}

pub struct ValidationPipeline {
    checks: Vec<Box<dyn UploadCheck>>,
}

impl ValidationPipeline {
    /// The standard pipeline: filename, type, then size.
    pub fn standard() -> Self {
        Self {
            checks: vec![
                Box::new(FilenameCheck),
                Box::new(FileTypeCheck),
                Box::new(FileSizeCheck),
            ],
        }
    }

    pub fn with_check(mut self, check: Box<dyn UploadCheck>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn validate(
        &self,
        file: &UploadedFile,
        policy: &UploadPolicy,
    ) -> Result<(), ValidationError> {
        for check in &self.checks {
            check.check(file, policy)?;
        }

        Ok(())
    }
}

struct FilenameCheck;

impl UploadCheck for FilenameCheck {
    fn check(&self, file: &UploadedFile, _policy: &UploadPolicy) -> Result<(), ValidationError> {
        if file.original_filename.is_empty() {
            return Err(ValidationError::MissingFilename);
        }

        Ok(())
    }
}

/// Matches the file's type against the policy's allowed set.
///
/// The type is derived from the filename through the trusted extension to
/// MIME mapping; the client-declared content type is never consulted. The
/// policy may list either bare extensions or MIME types.
struct FileTypeCheck;

impl UploadCheck for FileTypeCheck {
    fn check(&self, file: &UploadedFile, policy: &UploadPolicy) -> Result<(), ValidationError> {
        let extension = file.extension().ok_or(ValidationError::UnknownFileType)?;

        if policy.allowed_types.iter().any(|t| *t == extension) {
            return Ok(());
        }

        let detected = mime_guess::from_ext(&extension).first();

        if let Some(mime) = detected {
            let essence = mime.essence_str().to_ascii_lowercase();
            if policy.allowed_types.iter().any(|t| *t == essence) {
                return Ok(());
            }
        }

        Err(ValidationError::FileTypeNotAllowed { extension })
    }
}

struct FileSizeCheck;

impl UploadCheck for FileSizeCheck {
    fn check(&self, file: &UploadedFile, policy: &UploadPolicy) -> Result<(), ValidationError> {
        if file.size() > policy.max_size_bytes {
            return Err(ValidationError::FileTooLarge {
                size: file.size(),
                max_size: policy.max_size_bytes,
            });
        }

        Ok(())
    }
}

/// Expands a mixed extension/MIME list into the MIME types the front-end
/// widget filters on.
pub fn accepted_mime_types(types: &[String]) -> Vec<String> {
    let mut mimes = Vec::new();

    for entry in types {
        let entry = entry.trim().to_ascii_lowercase();
        if entry.is_empty() {
            continue;
        }

        let mime = if entry.contains('/') {
            match entry.parse::<mime::Mime>() {
                Ok(mime) => mime.essence_str().to_string(),
                Err(_) => continue,
            }
        } else {
            match mime_guess::from_ext(&entry).first() {
                Some(mime) => mime.essence_str().to_string(),
                None => continue,
            }
        };

        if !mimes.contains(&mime) {
            mimes.push(mime);
        }
    }

    mimes
}
