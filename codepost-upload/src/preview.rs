//! Dry-run support: report what an upload would do without mutating anything.

use serde::Serialize;
use similar::TextDiff;

use codepost_core::{StoreError, StudentEmail, SubmissionId};

use crate::conflict;
use crate::error::ConflictError;
use crate::filediff::{self, FileChange};
use crate::modes::UploadMode;
use crate::reconcile::UploadRequest;
use crate::store::ResourceStore;

/// What would happen to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Add,
    Replace,
    Unchanged,
    Skip,
    Delete,
}

/// One file's planned action, with a unified diff for replacements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePlan {
    pub name: String,
    pub action: FileAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

/// What happens to an existing submission when it is superseded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupersededSubmission {
    pub id: SubmissionId,
    /// Students left after the uploaders are taken out.
    pub remaining: Vec<StudentEmail>,
    pub deleted: bool,
}

/// The outcome `upload_submission` would produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "plan")]
pub enum UploadPlan {
    /// A new submission with these files.
    Create { files: Vec<String> },
    /// The mode refuses the upload.
    Reject { reason: String },
    /// Existing submissions are split up, then a new one is created.
    Supersede {
        submissions: Vec<SupersededSubmission>,
        files: Vec<String>,
    },
    /// The single existing submission is reconciled in place.
    Update {
        submission: SubmissionId,
        students_changed: bool,
        files: Vec<FilePlan>,
        remove_comments: bool,
        unclaim: bool,
    },
}

impl UploadPlan {
    /// `true` if carrying out the plan would change the store.
    pub fn mutates(&self) -> bool {
        match self {
            UploadPlan::Create { .. } | UploadPlan::Supersede { .. } => true,
            UploadPlan::Reject { .. } => false,
            UploadPlan::Update {
                students_changed,
                files,
                ..
            } => {
                *students_changed
                    || files
                        .iter()
                        .any(|f| !matches!(f.action, FileAction::Unchanged | FileAction::Skip))
            }
        }
    }

    /// Diffs of the files that would be replaced.
    pub fn diffs(&self) -> impl Iterator<Item = (&str, &str)> {
        let files: &[FilePlan] = match self {
            UploadPlan::Update { files, .. } => files,
            _ => &[],
        };
        files
            .iter()
            .filter_map(|f| f.diff.as_deref().map(|d| (f.name.as_str(), d)))
    }
}

/// Plan the upload of `request` under `mode`. Only reads from the store.
pub fn preview<S: ResourceStore + ?Sized>(
    store: &S,
    request: &UploadRequest,
    mode: &UploadMode,
) -> Result<UploadPlan, StoreError> {
    if request.students.is_empty() {
        return Ok(reject(ConflictError::NoStudents));
    }

    let existing = conflict::find_existing(store, request.assignment, &request.students)?;
    if let Err(err) = conflict::validate(mode, request.assignment, &existing, &request.students) {
        return Ok(reject(err));
    }

    let file_names = || -> Vec<String> { request.files.iter().map(|f| f.name.clone()).collect() };

    if existing.len() > 1 {
        let submissions = existing
            .values()
            .map(|s| {
                let remaining: Vec<StudentEmail> = s
                    .students
                    .iter()
                    .filter(|st| !request.students.contains(st))
                    .cloned()
                    .collect();
                let deleted = remaining.is_empty() || mode.delete_affected_submissions();
                SupersededSubmission {
                    id: s.id,
                    remaining,
                    deleted,
                }
            })
            .collect();
        return Ok(UploadPlan::Supersede {
            submissions,
            files: file_names(),
        });
    }

    let Some(current) = existing.into_values().next() else {
        return Ok(UploadPlan::Create { files: file_names() });
    };

    let mut files = Vec::with_capacity(current.files.len());
    for id in &current.files {
        files.push(store.get_file(*id)?);
    }
    let changes = filediff::plan(files, &request.files, mode);
    let modified = changes.iter().any(FileChange::is_modification);

    Ok(UploadPlan::Update {
        submission: current.id,
        students_changed: !current.has_students(&request.students),
        files: changes.iter().map(file_plan).collect(),
        remove_comments: modified && mode.remove_comments(),
        unclaim: modified && mode.do_unclaim() && current.is_claimed(),
    })
}

/// Unified diff of `old` against `new` with `a/` and `b/` headers.
pub fn unified_diff(name: &str, old: &str, new: &str) -> String {
    let old_header = format!("a/{name}");
    let new_header = format!("b/{name}");
    TextDiff::from_lines(old, new)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string()
}

fn reject(err: ConflictError) -> UploadPlan {
    UploadPlan::Reject {
        reason: err.to_string(),
    }
}

fn file_plan(change: &FileChange<'_>) -> FilePlan {
    let (action, diff) = match change {
        FileChange::Add(_) => (FileAction::Add, None),
        FileChange::Replace { current, desired } => (
            FileAction::Replace,
            Some(unified_diff(&desired.name, &current.code, &desired.code)),
        ),
        FileChange::Unchanged { .. } => (FileAction::Unchanged, None),
        FileChange::Skipped(_) => (FileAction::Skip, None),
        FileChange::Delete(_) => (FileAction::Delete, None),
    };
    FilePlan {
        name: change.name().to_string(),
        action,
        diff,
    }
}
