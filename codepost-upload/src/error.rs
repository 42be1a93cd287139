//! Error types for codepost-upload.

use std::fmt;

use thiserror::Error;

use codepost_core::{
    ApiKey, AssignmentId, FileId, GraderEmail, StoreError, StudentEmail, SubmissionId,
};

/// Policy rejection raised before anything is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    /// The upload names no students at all.
    #[error("an upload needs at least one student")]
    NoStudents,

    /// The mode does not allow touching existing submissions.
    #[error(
        "submission exists for assignment {assignment}: {}; choose a mode that updates existing submissions",
        join_ids(.submissions)
    )]
    SubmissionExists {
        assignment: AssignmentId,
        submissions: Vec<SubmissionId>,
    },

    /// An existing submission has a grader and the mode refuses to override it.
    #[error("submission {submission} is claimed by {grader}")]
    SubmissionClaimed {
        submission: SubmissionId,
        grader: GraderEmail,
    },

    /// Existing submissions do not line up with the requested students.
    #[error(
        "student mismatch: {existing} existing submission(s) for {requested} student(s); submission {first} would need its students resolved"
    )]
    StudentMismatch {
        existing: usize,
        requested: usize,
        first: SubmissionId,
    },

    /// Looking up a student's submissions failed.
    #[error("could not look up submissions of {student}: {source}")]
    Lookup {
        student: StudentEmail,
        #[source]
        source: StoreError,
    },
}

/// A mutation failed after earlier steps of the same upload changed state.
///
/// Besides the failure itself the error is a ledger: `created_submissions`
/// and `created_files` list everything this upload created, which is what
/// [`UploadError::force_cleanup`] removes. `submission` names the submission
/// being worked on, which is not necessarily one this upload created.
#[derive(Debug, Clone, Error)]
#[error("{message}: {source}")]
pub struct UploadError {
    pub message: String,
    #[source]
    pub source: StoreError,
    pub api_key: Option<ApiKey>,
    pub assignment: Option<AssignmentId>,
    pub submission: Option<SubmissionId>,
    pub created_submissions: Vec<SubmissionId>,
    pub created_files: Vec<FileId>,
    pub(crate) trace: String,
}

impl UploadError {
    pub fn new(message: impl Into<String>, source: StoreError) -> Self {
        Self {
            message: message.into(),
            source,
            api_key: None,
            assignment: None,
            submission: None,
            created_submissions: Vec::new(),
            created_files: Vec::new(),
            trace: String::new(),
        }
    }

    pub fn for_assignment(mut self, assignment: AssignmentId) -> Self {
        self.assignment = Some(assignment);
        self
    }

    pub fn in_submission(mut self, submission: SubmissionId) -> Self {
        self.submission = Some(submission);
        self
    }

    /// Record a submission this upload created and that cleanup should remove.
    pub fn created_submission(mut self, submission: SubmissionId) -> Self {
        self.created_submissions.push(submission);
        self
    }

    pub fn created_files(mut self, files: impl IntoIterator<Item = FileId>) -> Self {
        self.created_files.extend(files);
        self
    }

    pub fn with_api_key(mut self, api_key: Option<ApiKey>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Cleanup trace, empty until [`UploadError::force_cleanup`] has run.
    pub fn trace(&self) -> &str {
        &self.trace
    }

    /// `true` when the ledger lists nothing to clean up.
    pub fn is_clean(&self) -> bool {
        self.created_submissions.is_empty() && self.created_files.is_empty()
    }
}

/// Everything `upload_submission` can fail with.
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl ReconcileError {
    /// `true` if the store may have been changed before the failure.
    pub fn mutated(&self) -> bool {
        matches!(self, ReconcileError::Upload(_))
    }
}

fn join_ids<T: fmt::Display>(ids: &[T]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
