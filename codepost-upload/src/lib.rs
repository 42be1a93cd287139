//! # codepost-upload
//!
//! Reconcile a desired submission against what already exists on the
//! platform.
//!
//! Call [`upload_submission`] with a [`ResourceStore`], an [`UploadRequest`]
//! and an [`UploadMode`]; use [`preview`] to see what it would do first.

pub mod cleanup;
pub mod conflict;
pub mod error;
pub mod filediff;
pub mod memory;
pub mod modes;
pub mod preview;
pub mod reconcile;
pub mod store;

pub use error::{ConflictError, ReconcileError, UploadError};
pub use filediff::{reconcile_files, same_content, FileChange};
pub use memory::{MemoryStore, Operation};
pub use modes::{NamedMode, UploadMode};
pub use preview::{preview, FileAction, FilePlan, SupersededSubmission, UploadPlan};
pub use reconcile::{
    post_submission, remove_students_from_submission, upload_submission, UploadAction,
    UploadOutcome, UploadRequest,
};
pub use store::{ResourceStore, SubmissionQuery};
