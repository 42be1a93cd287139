//! File reconciliation: bring a submission's files in line with an upload.
//!
//! [`plan`] is pure and decides what to do per file; [`apply`] performs the
//! changes against a store. Files are matched by name, with the extension
//! checked secondarily. A changed file is replaced (delete, then create)
//! rather than edited in place, so its comments go with it.

use std::collections::{HashMap, HashSet};

use codepost_core::{File, FileId, FileSpec, Submission};

use crate::error::UploadError;
use crate::modes::UploadMode;
use crate::store::ResourceStore;

/// What happens to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange<'a> {
    /// New file created on the submission.
    Add(&'a FileSpec),
    /// Existing file deleted and recreated with new content.
    Replace { current: File, desired: &'a FileSpec },
    /// Existing file already matches.
    Unchanged { current: File },
    /// The mode forbids adding or replacing this desired file.
    Skipped(&'a FileSpec),
    /// Existing file absent from the upload, removed.
    Delete(File),
}

impl FileChange<'_> {
    /// `true` if applying this change mutates the submission.
    pub fn is_modification(&self) -> bool {
        matches!(
            self,
            FileChange::Add(_) | FileChange::Replace { .. } | FileChange::Delete(_)
        )
    }

    /// Name of the file the change concerns.
    pub fn name(&self) -> &str {
        match self {
            FileChange::Add(spec) | FileChange::Skipped(spec) => &spec.name,
            FileChange::Replace { desired, .. } => &desired.name,
            FileChange::Unchanged { current } | FileChange::Delete(current) => &current.name,
        }
    }
}

/// Content equality ignoring every `\n`.
pub fn same_content(a: &str, b: &str) -> bool {
    a.chars().filter(|c| *c != '\n').eq(b.chars().filter(|c| *c != '\n'))
}

/// Decide the changes that turn `current` into `desired` under `mode`.
///
/// Desired files come first, in input order, followed by deletions of
/// unspecified files in current-file order. If two current files share a
/// name the later one is the one matched.
pub fn plan<'a>(
    current: Vec<File>,
    desired: &'a [FileSpec],
    mode: &UploadMode,
) -> Vec<FileChange<'a>> {
    let mut order: Vec<String> = Vec::new();
    let mut by_name: HashMap<String, File> = HashMap::new();
    for file in current {
        if !by_name.contains_key(&file.name) {
            order.push(file.name.clone());
        }
        by_name.insert(file.name.clone(), file);
    }

    let mut changes = Vec::with_capacity(desired.len());
    for spec in desired {
        let matched = by_name
            .get(&spec.name)
            .filter(|file| file.extension == spec.extension);
        let change = match matched {
            Some(current) if same_content(&current.code, &spec.code) => FileChange::Unchanged {
                current: current.clone(),
            },
            Some(current) if mode.update_existing_files() => FileChange::Replace {
                current: current.clone(),
                desired: spec,
            },
            Some(_) => FileChange::Skipped(spec),
            None if mode.add_files() => FileChange::Add(spec),
            None => FileChange::Skipped(spec),
        };
        changes.push(change);
    }

    if mode.delete_unspecified_files() {
        let wanted: HashSet<&str> = desired.iter().map(|spec| spec.name.as_str()).collect();
        for name in order {
            if wanted.contains(name.as_str()) {
                continue;
            }
            if let Some(file) = by_name.remove(&name) {
                changes.push(FileChange::Delete(file));
            }
        }
    }

    changes
}

/// Apply `changes` to `submission`, in order. Returns whether anything changed.
///
/// On failure the error lists the files created so far.
pub fn apply<S: ResourceStore + ?Sized>(
    store: &S,
    submission: &Submission,
    changes: &[FileChange<'_>],
) -> Result<bool, UploadError> {
    let mut added: Vec<FileId> = Vec::new();
    let mut modified = false;

    let fail = |message: String, source, added: &[FileId]| {
        UploadError::new(message, source)
            .for_assignment(submission.assignment)
            .in_submission(submission.id)
            .created_files(added.iter().copied())
            .with_api_key(store.api_key().cloned())
    };

    for change in changes {
        match change {
            FileChange::Add(spec) => {
                let file = store
                    .create_file(submission.id, spec)
                    .map_err(|e| fail(format!("failed to add file {}", spec.name), e, &added))?;
                tracing::info!(
                    submission = %submission.id,
                    file = %file.id,
                    name = %spec.name,
                    "added file"
                );
                added.push(file.id);
                modified = true;
            }
            FileChange::Replace { current, desired } => {
                store.delete_file(current.id).map_err(|e| {
                    fail(format!("failed to remove outdated file {}", current.name), e, &added)
                })?;
                let file = store.create_file(submission.id, desired).map_err(|e| {
                    fail(format!("failed to replace file {}", desired.name), e, &added)
                })?;
                tracing::info!(
                    submission = %submission.id,
                    old = %current.id,
                    new = %file.id,
                    name = %desired.name,
                    "replaced file"
                );
                added.push(file.id);
                modified = true;
            }
            FileChange::Delete(current) => {
                store.delete_file(current.id).map_err(|e| {
                    fail(format!("failed to delete unspecified file {}", current.name), e, &added)
                })?;
                tracing::info!(
                    submission = %submission.id,
                    file = %current.id,
                    name = %current.name,
                    "deleted file"
                );
                modified = true;
            }
            FileChange::Unchanged { current } => {
                tracing::debug!(file = %current.id, name = %current.name, "file unchanged");
            }
            FileChange::Skipped(spec) => {
                tracing::debug!(name = %spec.name, "mode does not allow this change; skipped");
            }
        }
    }

    if !modified {
        tracing::info!(submission = %submission.id, "nothing to add or update");
    }
    Ok(modified)
}

/// Fetch the submission's files, then [`plan`] and [`apply`].
pub fn reconcile_files<S: ResourceStore + ?Sized>(
    store: &S,
    submission: &Submission,
    desired: &[FileSpec],
    mode: &UploadMode,
) -> Result<bool, UploadError> {
    let current = fetch_files(store, submission)?;
    let changes = plan(current, desired, mode);
    apply(store, submission, &changes)
}

/// Every file of `submission`, fetched by id.
pub fn fetch_files<S: ResourceStore + ?Sized>(
    store: &S,
    submission: &Submission,
) -> Result<Vec<File>, UploadError> {
    submission
        .files
        .iter()
        .map(|id| {
            store.get_file(*id).map_err(|e| {
                UploadError::new(format!("failed to fetch file {id}"), e)
                    .for_assignment(submission.assignment)
                    .in_submission(submission.id)
                    .with_api_key(store.api_key().cloned())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use codepost_core::{AssignmentId, SubmissionId};
    use rstest::rstest;

    use super::*;
    use crate::memory::{MemoryStore, Operation};

    fn file(id: u64, name: &str, ext: &str, code: &str) -> File {
        File {
            id: FileId(id),
            submission: SubmissionId(1),
            name: name.into(),
            extension: ext.into(),
            code: code.into(),
            comments: vec![],
        }
    }

    fn kinds(changes: &[FileChange<'_>]) -> Vec<String> {
        changes
            .iter()
            .map(|c| {
                let kind = match c {
                    FileChange::Add(_) => "add",
                    FileChange::Replace { .. } => "replace",
                    FileChange::Unchanged { .. } => "unchanged",
                    FileChange::Skipped(_) => "skipped",
                    FileChange::Delete(_) => "delete",
                };
                format!("{kind} {}", c.name())
            })
            .collect()
    }

    #[rstest]
    #[case("print(1)", "print(1)\n", true)]
    #[case("a\nb\n", "ab", true)]
    #[case("\n\n", "", true)]
    #[case("a b", "ab", false)]
    #[case("a\r\n", "a\n", false)]
    fn newline_insensitive_comparison(#[case] a: &str, #[case] b: &str, #[case] same: bool) {
        assert_eq!(same_content(a, b), same);
    }

    #[rstest]
    #[case::extend(UploadMode::EXTEND, &["skipped a.py", "add new.py"])]
    #[case::diff_scan(UploadMode::DIFF_SCAN, &["replace a.py", "add new.py"])]
    #[case::overwrite(UploadMode::OVERWRITE, &["replace a.py", "add new.py", "delete old.py"])]
    #[case::cautious(UploadMode::CAUTIOUS, &["skipped a.py", "skipped new.py"])]
    fn plan_follows_mode(#[case] mode: UploadMode, #[case] expected: &[&str]) {
        let current = vec![file(1, "a.py", "py", "v1"), file(2, "old.py", "py", "x")];
        let desired = vec![
            FileSpec::new("a.py", "py", "v2"),
            FileSpec::new("new.py", "py", "n"),
        ];
        assert_eq!(kinds(&plan(current, &desired, &mode)), expected);
    }

    #[test]
    fn extension_mismatch_is_a_new_file() {
        let current = vec![file(1, "main", "py", "x")];
        let desired = vec![FileSpec::new("main", "java", "x")];
        let changes = plan(current, &desired, &UploadMode::OVERWRITE);
        assert_eq!(kinds(&changes), vec!["add main"]);
    }

    #[test]
    fn later_duplicate_name_wins() {
        let current = vec![file(1, "a.py", "py", "old"), file(2, "a.py", "py", "new")];
        let desired = vec![FileSpec::new("a.py", "py", "new")];
        let changes = plan(current, &desired, &UploadMode::OVERWRITE);
        assert_eq!(
            changes,
            vec![FileChange::Unchanged {
                current: file(2, "a.py", "py", "new")
            }]
        );
    }

    #[test]
    fn reconcile_is_a_noop_for_identical_files() {
        let store = MemoryStore::new();
        let sub = store.insert_submission(
            AssignmentId(1),
            &["a@x".into()],
            None,
            &[FileSpec::new("t.py", "py", "print(1)")],
        );
        let before = store.mutation_count();

        let desired = [FileSpec::new("t.py", "py", "print(1)\n")];
        let modified =
            reconcile_files(&store, &sub, &desired, &UploadMode::DIFF_SCAN).expect("reconcile");

        assert!(!modified);
        assert_eq!(store.mutation_count(), before);
        assert_eq!(store.submission(sub.id).expect("sub").files, sub.files);
    }

    #[test]
    fn replacement_drops_comments_of_the_old_file() {
        let store = MemoryStore::new();
        let sub = store.insert_submission(
            AssignmentId(1),
            &["a@x".into()],
            None,
            &[FileSpec::new("t.py", "py", "v1")],
        );
        store.add_comment(sub.files[0], "typo");

        let desired = [FileSpec::new("t.py", "py", "v2")];
        let modified =
            reconcile_files(&store, &sub, &desired, &UploadMode::DIFF_SCAN).expect("reconcile");
        assert!(modified);

        let after = store.submission(sub.id).expect("sub");
        assert_eq!(after.files.len(), 1);
        assert_ne!(after.files[0], sub.files[0]);
        assert_eq!(store.file(after.files[0]).expect("file").code, "v2");
        assert!(store.comments_for_submission(sub.id).is_empty());
    }

    #[test]
    fn failure_reports_files_added_so_far() {
        let store = MemoryStore::new();
        let sub = store.insert_submission(AssignmentId(4), &["a@x".into()], None, &[]);
        store.fail_on(Operation::CreateFile, 1);

        let desired = [
            FileSpec::new("a.py", "py", "a"),
            FileSpec::new("b.py", "py", "b"),
        ];
        let err = reconcile_files(&store, &sub, &desired, &UploadMode::EXTEND).unwrap_err();

        let added = store.submission(sub.id).expect("sub").files;
        assert_eq!(err.created_files, added);
        assert_eq!(err.submission, Some(sub.id));
        assert_eq!(err.assignment, Some(AssignmentId(4)));
        assert!(err.created_submissions.is_empty());
        assert!(err.message.contains("b.py"));
    }

    #[test]
    fn unreadable_file_aborts_before_mutating() {
        let store = MemoryStore::new();
        let sub = store.insert_submission(
            AssignmentId(1),
            &["a@x".into()],
            None,
            &[FileSpec::new("t.py", "py", "")],
        );
        store.fail_on(Operation::GetFile, 0);
        let before = store.mutation_count();

        let desired = [FileSpec::new("u.py", "py", "")];
        let err = reconcile_files(&store, &sub, &desired, &UploadMode::OVERWRITE).unwrap_err();
        assert!(err.is_clean());
        assert_eq!(store.mutation_count(), before);
    }
}
