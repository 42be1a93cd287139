//! The resource-store contract consumed by the reconciler.
//!
//! Implementations: [`crate::memory::MemoryStore`] and the HTTP store in
//! `codepost-http`. Every call is blocking and independent; the store offers
//! no transactions.

use std::collections::BTreeSet;

use codepost_core::{
    ApiKey, AssignmentId, CommentId, File, FileId, FileSpec, GraderEmail, StoreError,
    StudentEmail, Submission, SubmissionId,
};

/// Filters for listing an assignment's submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionQuery {
    pub student: Option<StudentEmail>,
    pub grader: Option<GraderEmail>,
}

impl SubmissionQuery {
    pub fn student(student: StudentEmail) -> Self {
        Self {
            student: Some(student),
            grader: None,
        }
    }

    pub fn grader(grader: GraderEmail) -> Self {
        Self {
            student: None,
            grader: Some(grader),
        }
    }

    /// `true` when `submission` passes every filter that is set.
    pub fn matches(&self, submission: &Submission) -> bool {
        let student_ok = self
            .student
            .as_ref()
            .map_or(true, |s| submission.students.contains(s));
        let grader_ok = self
            .grader
            .as_ref()
            .map_or(true, |g| submission.grader.as_ref() == Some(g));
        student_ok && grader_ok
    }
}

/// CRUD operations on submissions, files and comments.
///
/// Deleting a submission removes its files and their comments; deleting a
/// file removes its comments.
pub trait ResourceStore {
    /// Credentials this store acts with, if any.
    fn api_key(&self) -> Option<&ApiKey> {
        None
    }

    fn list_submissions(
        &self,
        assignment: AssignmentId,
        query: &SubmissionQuery,
    ) -> Result<Vec<Submission>, StoreError>;

    /// Create an empty submission (no files).
    fn create_submission(
        &self,
        assignment: AssignmentId,
        students: &[StudentEmail],
    ) -> Result<Submission, StoreError>;

    fn get_submission(&self, id: SubmissionId) -> Result<Submission, StoreError>;

    fn update_submission_students(
        &self,
        id: SubmissionId,
        students: &[StudentEmail],
    ) -> Result<Submission, StoreError>;

    /// Claim (`Some`) or unclaim (`None`) a submission. Unclaiming also clears
    /// the finalized flag, since a finalized submission must have a grader.
    fn set_submission_grader(
        &self,
        id: SubmissionId,
        grader: Option<&GraderEmail>,
    ) -> Result<(), StoreError>;

    fn delete_submission(&self, id: SubmissionId) -> Result<(), StoreError>;

    fn get_file(&self, id: FileId) -> Result<File, StoreError>;

    fn create_file(&self, submission: SubmissionId, spec: &FileSpec) -> Result<File, StoreError>;

    fn delete_file(&self, id: FileId) -> Result<(), StoreError>;

    fn delete_comment(&self, id: CommentId) -> Result<(), StoreError>;

    fn unclaim_submission(&self, id: SubmissionId) -> Result<(), StoreError> {
        self.set_submission_grader(id, None)
    }

    /// Best-effort removal of every comment on every file of a submission.
    ///
    /// Failures are logged and skipped. Returns `true` iff every comment that
    /// was discovered got deleted.
    fn delete_all_comments_for_submission(&self, id: SubmissionId) -> bool {
        let submission = match self.get_submission(id) {
            Ok(submission) => submission,
            Err(err) => {
                tracing::warn!(submission = %id, error = %err, "cannot list comments");
                return false;
            }
        };

        let mut comment_ids = BTreeSet::new();
        let mut complete = true;
        for file_id in &submission.files {
            match self.get_file(*file_id) {
                Ok(file) => comment_ids.extend(file.comments),
                Err(err) => {
                    tracing::warn!(file = %file_id, error = %err, "cannot list file comments");
                    complete = false;
                }
            }
        }

        let total = comment_ids.len();
        let mut deleted = 0;
        for comment_id in comment_ids {
            match self.delete_comment(comment_id) {
                Ok(()) => deleted += 1,
                Err(err) => {
                    tracing::warn!(comment = %comment_id, error = %err, "failed to delete comment")
                }
            }
        }
        tracing::info!(submission = %id, deleted, total, "removed comments");
        complete && deleted == total
    }
}

impl<S: ResourceStore + ?Sized> ResourceStore for &S {
    fn api_key(&self) -> Option<&ApiKey> {
        (**self).api_key()
    }
    fn list_submissions(
        &self,
        assignment: AssignmentId,
        query: &SubmissionQuery,
    ) -> Result<Vec<Submission>, StoreError> {
        (**self).list_submissions(assignment, query)
    }
    fn create_submission(
        &self,
        assignment: AssignmentId,
        students: &[StudentEmail],
    ) -> Result<Submission, StoreError> {
        (**self).create_submission(assignment, students)
    }
    fn get_submission(&self, id: SubmissionId) -> Result<Submission, StoreError> {
        (**self).get_submission(id)
    }
    fn update_submission_students(
        &self,
        id: SubmissionId,
        students: &[StudentEmail],
    ) -> Result<Submission, StoreError> {
        (**self).update_submission_students(id, students)
    }
    fn set_submission_grader(
        &self,
        id: SubmissionId,
        grader: Option<&GraderEmail>,
    ) -> Result<(), StoreError> {
        (**self).set_submission_grader(id, grader)
    }
    fn delete_submission(&self, id: SubmissionId) -> Result<(), StoreError> {
        (**self).delete_submission(id)
    }
    fn get_file(&self, id: FileId) -> Result<File, StoreError> {
        (**self).get_file(id)
    }
    fn create_file(&self, submission: SubmissionId, spec: &FileSpec) -> Result<File, StoreError> {
        (**self).create_file(submission, spec)
    }
    fn delete_file(&self, id: FileId) -> Result<(), StoreError> {
        (**self).delete_file(id)
    }
    fn delete_comment(&self, id: CommentId) -> Result<(), StoreError> {
        (**self).delete_comment(id)
    }
    fn unclaim_submission(&self, id: SubmissionId) -> Result<(), StoreError> {
        (**self).unclaim_submission(id)
    }
    fn delete_all_comments_for_submission(&self, id: SubmissionId) -> bool {
        (**self).delete_all_comments_for_submission(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryStore, Operation};

    fn seeded() -> (MemoryStore, Submission) {
        let store = MemoryStore::new();
        let sub = store.insert_submission(
            AssignmentId(1),
            &["a@x.edu".into()],
            Some("g@x.edu".into()),
            &[
                FileSpec::new("a.py", "py", "a"),
                FileSpec::new("b.py", "py", "b"),
            ],
        );
        (store, sub)
    }

    #[test]
    fn query_matches_student_and_grader() {
        let (_store, sub) = seeded();
        assert!(SubmissionQuery::default().matches(&sub));
        assert!(SubmissionQuery::student("a@x.edu".into()).matches(&sub));
        assert!(!SubmissionQuery::student("z@x.edu".into()).matches(&sub));
        assert!(SubmissionQuery::grader("g@x.edu".into()).matches(&sub));
        assert!(!SubmissionQuery::grader("h@x.edu".into()).matches(&sub));
    }

    #[test]
    fn delete_all_comments_removes_every_comment() {
        let (store, sub) = seeded();
        store.add_comment(sub.files[0], "off by one");
        store.add_comment(sub.files[1], "nice");
        store.add_comment(sub.files[1], "style");

        assert!(store.delete_all_comments_for_submission(sub.id));
        assert!(store.comments_for_submission(sub.id).is_empty());
    }

    #[test]
    fn delete_all_comments_is_best_effort() {
        let (store, sub) = seeded();
        store.add_comment(sub.files[0], "one");
        store.add_comment(sub.files[1], "two");
        store.fail_on(Operation::DeleteComment, 0);

        assert!(!store.delete_all_comments_for_submission(sub.id));
        assert_eq!(
            store.comments_for_submission(sub.id).len(),
            1,
            "the second deletion still ran"
        );
    }

    #[test]
    fn unclaim_clears_grader_and_finalized() {
        let (store, sub) = seeded();
        store.finalize(sub.id);
        store.unclaim_submission(sub.id).expect("unclaim");
        let after = store.get_submission(sub.id).expect("get");
        assert!(after.grader.is_none());
        assert!(!after.is_finalized);
    }
}
