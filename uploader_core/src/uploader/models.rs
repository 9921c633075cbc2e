use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// A single uploaded file as received from the multipart request.
#[derive(Debug)]
pub struct UploadedFile {
    pub original_filename: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: &str, data: Vec<u8>) -> Self {
        Self {
            original_filename: sanitize_filename(filename),
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.original_filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// The opaque `{staging_id}/{filename}` reference a client holds between
/// upload and commit. The staging id namespaces its own temp directory, so
/// concurrent uploads cannot collide on filenames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingReference {
    pub id: Uuid,
    pub filename: String,
}

impl StagingReference {
    pub fn new(id: Uuid, filename: &str) -> Self {
        Self {
            id,
            filename: sanitize_filename(filename),
        }
    }

    /// Parses a client-supplied reference. Anything that is not exactly a
    /// UUID followed by a single non-empty basename is rejected, which rules
    /// out traversal through the id or filename component.
    pub fn parse(reference: &str) -> Option<Self> {
        let (id_part, name_part) = reference.split_once('/')?;
        let id = Uuid::parse_str(id_part).ok()?;
        let filename = sanitize_filename(name_part);

        if filename.is_empty() {
            return None;
        }

        Some(Self { id, filename })
    }
}

impl fmt::Display for StagingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.filename)
    }
}

/// One form field carrying staged upload references at submission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionField {
    pub id: String,
    pub raw_value: Vec<String>,
}

/// The commit result for one field: permanent paths for re-processing and
/// public URLs for display, both in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommittedField {
    pub paths: Vec<String>,
    pub urls: Vec<String>,
}

/// Reduces a client-supplied name to a bare basename: directory components,
/// `..` and empty segments are all discarded.
pub fn sanitize_filename(name: &str) -> String {
    let name = name.replace('\\', "/");

    name.rsplit('/')
        .find(|part| !part.is_empty() && *part != "." && *part != "..")
        .unwrap_or("")
        .to_string()
}
