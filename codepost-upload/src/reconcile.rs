//! Upload orchestration.
//!
//! One call to [`upload_submission`] makes a single pass:
//!
//! - no existing submission: create one with the requested files;
//! - one existing submission: force its students, reconcile its files, and
//!   on modification clear comments and unclaim as the mode asks;
//! - several existing submissions: take the requested students out of each
//!   (deleting any left empty), then create a fresh submission.
//!
//! Nothing here is atomic. When a mutation fails after earlier ones
//! succeeded, whatever this call created is removed again unless the mode
//! allows partial uploads.

use std::collections::BTreeMap;

use serde::Serialize;

use codepost_core::{
    dedup_students, AssignmentId, FileId, FileSpec, StudentEmail, Submission, SubmissionId,
};

use crate::conflict;
use crate::error::{ConflictError, ReconcileError, UploadError};
use crate::filediff;
use crate::modes::UploadMode;
use crate::store::ResourceStore;

/// What the caller wants to exist: one submission of `assignment` by
/// `students` containing `files`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub assignment: AssignmentId,
    pub students: Vec<StudentEmail>,
    pub files: Vec<FileSpec>,
}

impl UploadRequest {
    /// Build a request; repeated students are dropped.
    pub fn new(
        assignment: AssignmentId,
        students: impl IntoIterator<Item = StudentEmail>,
        files: Vec<FileSpec>,
    ) -> Self {
        Self {
            assignment,
            students: dedup_students(students),
            files,
        }
    }
}

/// How the upload was carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum UploadAction {
    /// No prior submission; a new one was created.
    Created,
    /// The single prior submission was reconciled in place.
    Updated,
    /// Several prior submissions were split up and a new one created.
    Superseded { previous: Vec<SubmissionId> },
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub submission: Submission,
    /// `false` only when an existing submission already matched the upload.
    pub modified: bool,
    pub action: UploadAction,
}

/// Reconcile `request` against the store under `mode`.
pub fn upload_submission<S: ResourceStore + ?Sized>(
    store: &S,
    request: &UploadRequest,
    mode: &UploadMode,
) -> Result<UploadOutcome, ReconcileError> {
    if request.students.is_empty() {
        return Err(ConflictError::NoStudents.into());
    }

    let existing = conflict::lookup(store, request.assignment, &request.students)?;
    conflict::validate(mode, request.assignment, &existing, &request.students)?;

    if existing.len() > 1 {
        return supersede(store, request, mode, existing);
    }
    match existing.into_values().next() {
        Some(current) => update_single(store, request, mode, current),
        None => {
            let submission = guarded(store, mode, post_submission(store, request))?;
            Ok(UploadOutcome {
                submission,
                modified: true,
                action: UploadAction::Created,
            })
        }
    }
}

/// Create a submission and then each of its files.
///
/// On failure the error lists the submission and files that were created.
pub fn post_submission<S: ResourceStore + ?Sized>(
    store: &S,
    request: &UploadRequest,
) -> Result<Submission, UploadError> {
    let submission = store
        .create_submission(request.assignment, &request.students)
        .map_err(|e| {
            UploadError::new("failed to create submission", e)
                .for_assignment(request.assignment)
                .with_api_key(store.api_key().cloned())
        })?;
    tracing::info!(
        submission = %submission.id,
        assignment = %request.assignment,
        students = request.students.len(),
        "created submission"
    );

    let mut added: Vec<FileId> = Vec::with_capacity(request.files.len());
    for spec in &request.files {
        match store.create_file(submission.id, spec) {
            Ok(file) => {
                tracing::info!(
                    submission = %submission.id,
                    file = %file.id,
                    name = %spec.name,
                    "added file"
                );
                added.push(file.id);
            }
            Err(e) => {
                return Err(UploadError::new(format!("failed to add file {}", spec.name), e)
                    .for_assignment(request.assignment)
                    .in_submission(submission.id)
                    .created_submission(submission.id)
                    .created_files(added)
                    .with_api_key(store.api_key().cloned()));
            }
        }
    }

    let mut submission = submission;
    submission.files = added;
    Ok(submission)
}

/// Take `students` out of `submission`, deleting it if nobody is left.
///
/// Returns `true` if the submission was deleted.
pub fn remove_students_from_submission<S: ResourceStore + ?Sized>(
    store: &S,
    submission: &Submission,
    students: &[StudentEmail],
) -> Result<bool, UploadError> {
    let remaining: Vec<StudentEmail> = submission
        .students
        .iter()
        .filter(|s| !students.contains(s))
        .cloned()
        .collect();

    let context = |message: &str, e| {
        UploadError::new(message, e)
            .for_assignment(submission.assignment)
            .in_submission(submission.id)
            .with_api_key(store.api_key().cloned())
    };

    if remaining.is_empty() {
        store
            .delete_submission(submission.id)
            .map_err(|e| context("failed to delete emptied submission", e))?;
        tracing::info!(submission = %submission.id, "deleted submission left without students");
        return Ok(true);
    }

    store
        .update_submission_students(submission.id, &remaining)
        .map_err(|e| context("failed to remove students from submission", e))?;
    tracing::info!(
        submission = %submission.id,
        remaining = remaining.len(),
        "removed students from submission"
    );
    Ok(false)
}

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

fn update_single<S: ResourceStore + ?Sized>(
    store: &S,
    request: &UploadRequest,
    mode: &UploadMode,
    current: Submission,
) -> Result<UploadOutcome, ReconcileError> {
    let with_context = |message: &str, e| {
        UploadError::new(message, e)
            .for_assignment(request.assignment)
            .in_submission(current.id)
            .with_api_key(store.api_key().cloned())
    };

    let current = store
        .update_submission_students(current.id, &request.students)
        .map_err(|e| with_context("failed to update submission students", e))?;

    let modified = guarded(
        store,
        mode,
        filediff::reconcile_files(store, &current, &request.files, mode),
    )?;

    if modified {
        if mode.remove_comments() && !store.delete_all_comments_for_submission(current.id) {
            tracing::warn!(submission = %current.id, "some comments could not be removed");
        }
        if mode.do_unclaim() {
            store
                .unclaim_submission(current.id)
                .map_err(|e| with_context("failed to unclaim submission", e))?;
            tracing::info!(submission = %current.id, "unclaimed submission");
        }
    }

    let submission = store
        .get_submission(current.id)
        .map_err(|e| with_context("failed to fetch updated submission", e))?;
    Ok(UploadOutcome {
        submission,
        modified,
        action: UploadAction::Updated,
    })
}

fn supersede<S: ResourceStore + ?Sized>(
    store: &S,
    request: &UploadRequest,
    mode: &UploadMode,
    existing: BTreeMap<SubmissionId, Submission>,
) -> Result<UploadOutcome, ReconcileError> {
    let previous: Vec<SubmissionId> = existing.keys().copied().collect();

    for submission in existing.values() {
        let deleted = remove_students_from_submission(store, submission, &request.students)?;
        if mode.delete_affected_submissions() && !deleted {
            store.delete_submission(submission.id).map_err(|e| {
                UploadError::new("failed to delete affected submission", e)
                    .for_assignment(request.assignment)
                    .in_submission(submission.id)
                    .with_api_key(store.api_key().cloned())
            })?;
            tracing::info!(submission = %submission.id, "deleted affected submission");
        }
    }

    let submission = guarded(store, mode, post_submission(store, request))?;
    Ok(UploadOutcome {
        submission,
        modified: true,
        action: UploadAction::Superseded { previous },
    })
}

/// Run compensating cleanup on failure unless the mode allows partial uploads.
fn guarded<S: ResourceStore + ?Sized, T>(
    store: &S,
    mode: &UploadMode,
    result: Result<T, UploadError>,
) -> Result<T, UploadError> {
    result.map_err(|mut err| {
        if mode.allow_partial() {
            tracing::warn!(error = %err, "upload failed; leaving partial changes in place");
        } else {
            let trace = err.force_cleanup(store);
            tracing::warn!(%trace, "upload failed; cleaned up");
        }
        err
    })
}
