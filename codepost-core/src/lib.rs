//! codepost-core — domain types, store error taxonomy, client configuration.
//!
//! - [`types`] — id newtypes and resource structs
//! - [`error`] — [`StoreError`], [`ConfigError`]
//! - [`config`] — [`ClientConfig`] discovery

pub mod config;
pub mod error;
pub mod types;

pub use config::{ApiKey, ClientConfig, KeySource};
pub use error::{ConfigError, ResourceKind, StoreError};
pub use types::{
    dedup_students, AssignmentId, Comment, CommentId, File, FileId, FileSpec, GraderEmail,
    StudentEmail, Submission, SubmissionId,
};
