//! Conflict detection and mode validation.
//!
//! Both steps run before anything is mutated.

use std::collections::BTreeMap;

use codepost_core::{AssignmentId, StoreError, StudentEmail, Submission, SubmissionId};

use crate::error::ConflictError;
use crate::modes::UploadMode;
use crate::store::{ResourceStore, SubmissionQuery};

/// Submissions of `assignment` that involve any of `students`, keyed by id.
pub fn find_existing<S: ResourceStore + ?Sized>(
    store: &S,
    assignment: AssignmentId,
    students: &[StudentEmail],
) -> Result<BTreeMap<SubmissionId, Submission>, StoreError> {
    find_existing_inner(store, assignment, students).map_err(|(_, err)| err)
}

/// Like [`find_existing`], but a failed lookup names the student involved.
pub(crate) fn lookup<S: ResourceStore + ?Sized>(
    store: &S,
    assignment: AssignmentId,
    students: &[StudentEmail],
) -> Result<BTreeMap<SubmissionId, Submission>, ConflictError> {
    find_existing_inner(store, assignment, students)
        .map_err(|(student, source)| ConflictError::Lookup { student, source })
}

fn find_existing_inner<S: ResourceStore + ?Sized>(
    store: &S,
    assignment: AssignmentId,
    students: &[StudentEmail],
) -> Result<BTreeMap<SubmissionId, Submission>, (StudentEmail, StoreError)> {
    let mut existing = BTreeMap::new();
    for student in students {
        let found = store
            .list_submissions(assignment, &SubmissionQuery::student(student.clone()))
            .map_err(|err| (student.clone(), err))?;
        tracing::debug!(%student, count = found.len(), "looked up existing submissions");
        for submission in found {
            existing.entry(submission.id).or_insert(submission);
        }
    }
    Ok(existing)
}

/// Check that `mode` permits reconciling against `existing`.
///
/// Checks run in order and the first failure wins: existence, claims, then
/// student resolution. An empty `existing` always passes.
pub fn validate(
    mode: &UploadMode,
    assignment: AssignmentId,
    existing: &BTreeMap<SubmissionId, Submission>,
    students: &[StudentEmail],
) -> Result<(), ConflictError> {
    let Some(first) = existing.values().next() else {
        return Ok(());
    };

    if !mode.update_if_exists() {
        return Err(ConflictError::SubmissionExists {
            assignment,
            submissions: existing.keys().copied().collect(),
        });
    }

    if !mode.update_if_claimed() {
        if let Some((id, grader)) = existing
            .values()
            .find_map(|s| s.grader.as_ref().map(|g| (s.id, g)))
        {
            return Err(ConflictError::SubmissionClaimed {
                submission: id,
                grader: grader.clone(),
            });
        }
    }

    // Unreachable with the built-in modes, which always pair this flag
    // with update_if_exists.
    if !mode.resolve_students() && (existing.len() > 1 || !first.has_students(students)) {
        return Err(ConflictError::StudentMismatch {
            existing: existing.len(),
            requested: students.len(),
            first: first.id,
        });
    }

    Ok(())
}
