pub mod commit;
pub mod hooks;
pub mod models;
pub mod policy;
pub mod service;
pub mod staging;
pub mod validation;

pub use commit::CommitProcessor;
pub use hooks::UploaderHooks;
pub use models::{CommittedField, StagingReference, SubmissionField, UploadedFile};
pub use policy::{PolicyError, UploadPolicy};
pub use service::UploadService;
pub use staging::StagingArea;
pub use validation::{UploadCheck, ValidationError, ValidationPipeline};
