//! Compensating cleanup for failed uploads.

use std::fmt::Write as _;

use crate::error::UploadError;
use crate::store::ResourceStore;

impl UploadError {
    /// Delete everything this failed upload created, files first, then
    /// submissions.
    ///
    /// Each deletion is attempted independently. The outcome is appended to
    /// the error's trace as `<<-file(1); !submission(2); >>`, where `-` marks
    /// a deletion and `!` a failed one. Never fails; returns the full trace.
    pub fn force_cleanup<S: ResourceStore + ?Sized>(&mut self, store: &S) -> &str {
        let mut trace = String::from("<<");

        for id in &self.created_files {
            match store.delete_file(*id) {
                Ok(()) => {
                    tracing::info!(file = %id, "cleanup: deleted file");
                    let _ = write!(trace, "-file({id}); ");
                }
                Err(err) => {
                    tracing::warn!(file = %id, error = %err, "cleanup: could not delete file");
                    let _ = write!(trace, "!file({id}); ");
                }
            }
        }

        for id in &self.created_submissions {
            match store.delete_submission(*id) {
                Ok(()) => {
                    tracing::info!(submission = %id, "cleanup: deleted submission");
                    let _ = write!(trace, "-submission({id}); ");
                }
                Err(err) => {
                    tracing::warn!(
                        submission = %id,
                        error = %err,
                        "cleanup: could not delete submission"
                    );
                    let _ = write!(trace, "!submission({id}); ");
                }
            }
        }

        trace.push_str(">>");
        self.trace.push_str(&trace);
        &self.trace
    }
}

#[cfg(test)]
mod tests {
    use codepost_core::{AssignmentId, FileId, FileSpec, StoreError, SubmissionId};

    use super::*;
    use crate::memory::{MemoryStore, Operation};

    fn failure() -> StoreError {
        StoreError::Server {
            status: 500,
            body: "boom".into(),
        }
    }

    #[test]
    fn empty_ledger_produces_empty_brackets() {
        let store = MemoryStore::new();
        let mut err = UploadError::new("x", failure());
        assert_eq!(err.force_cleanup(&store), "<<>>");
        assert_eq!(store.mutation_count(), 0);
    }

    #[test]
    fn files_are_deleted_before_submissions() {
        let store = MemoryStore::new();
        let sub = store.insert_submission(
            AssignmentId(1),
            &["a@x.edu".into()],
            None,
            &[FileSpec::new("a.py", "py", ""), FileSpec::new("b.py", "py", "")],
        );
        let mut err = UploadError::new("x", failure())
            .created_submission(sub.id)
            .created_files(sub.files.clone());

        let trace = err.force_cleanup(&store).to_string();
        assert_eq!(
            trace,
            format!(
                "<<-file({}); -file({}); -submission({}); >>",
                sub.files[0], sub.files[1], sub.id
            )
        );
        assert!(store.submission(sub.id).is_none());
        assert_eq!(err.trace(), trace);
    }

    #[test]
    fn failures_are_recorded_and_skipped() {
        let store = MemoryStore::new();
        let sub = store.insert_submission(AssignmentId(1), &["a@x.edu".into()], None, &[]);
        store.fail_on(Operation::DeleteFile, 0);
        let mut err = UploadError::new("x", failure())
            .created_submission(sub.id)
            .created_files([FileId(900), FileId(901)]);

        let trace = err.force_cleanup(&store);
        assert_eq!(
            trace,
            format!("<<!file(900); !file(901); -submission({}); >>", sub.id)
        );
    }

    #[test]
    fn missing_submission_is_marked_failed() {
        let store = MemoryStore::new();
        let mut err = UploadError::new("x", failure()).created_submission(SubmissionId(77));
        assert_eq!(err.force_cleanup(&store), "<<!submission(77); >>");
    }
}
