//! In-memory [`ResourceStore`] with the platform's cascade rules.
//!
//! Used by the test suites and for offline dry runs. Ids come from a single
//! counter starting at 1, so every resource id is unique across kinds.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use codepost_core::{
    AssignmentId, Comment, CommentId, File, FileId, FileSpec, GraderEmail, ResourceKind,
    StoreError, StudentEmail, Submission, SubmissionId,
};

use crate::store::{ResourceStore, SubmissionQuery};

/// Store operations, for failure injection and the call journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListSubmissions,
    CreateSubmission,
    GetSubmission,
    UpdateStudents,
    SetGrader,
    DeleteSubmission,
    GetFile,
    CreateFile,
    DeleteFile,
    DeleteComment,
}

impl Operation {
    pub fn is_mutation(self) -> bool {
        !matches!(
            self,
            Operation::ListSubmissions | Operation::GetSubmission | Operation::GetFile
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ListSubmissions => "list_submissions",
            Operation::CreateSubmission => "create_submission",
            Operation::GetSubmission => "get_submission",
            Operation::UpdateStudents => "update_submission_students",
            Operation::SetGrader => "set_submission_grader",
            Operation::DeleteSubmission => "delete_submission",
            Operation::GetFile => "get_file",
            Operation::CreateFile => "create_file",
            Operation::DeleteFile => "delete_file",
            Operation::DeleteComment => "delete_comment",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    submissions: BTreeMap<SubmissionId, Submission>,
    files: BTreeMap<FileId, File>,
    comments: BTreeMap<CommentId, Comment>,
    // operation -> number of calls to let through before failing
    failures: HashMap<Operation, usize>,
    calls: Vec<Operation>,
}

impl State {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Journal the call and apply any injected failure.
    fn enter(&mut self, op: Operation) -> Result<(), StoreError> {
        self.calls.push(op);
        match self.failures.get_mut(&op) {
            Some(0) => {
                self.failures.remove(&op);
                Err(StoreError::Server {
                    status: 500,
                    body: format!("injected failure in {op}"),
                })
            }
            Some(skip) => {
                *skip -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn submission_mut(&mut self, id: SubmissionId) -> Result<&mut Submission, StoreError> {
        self.submissions.get_mut(&id).ok_or(StoreError::NotFound {
            kind: ResourceKind::Submission,
            id: id.0,
        })
    }

    fn create_file(
        &mut self,
        submission: SubmissionId,
        spec: &FileSpec,
    ) -> Result<File, StoreError> {
        let id = FileId(self.allocate());
        let owner = self.submission_mut(submission)?;
        owner.files.push(id);
        owner.date_edited = Some(Utc::now());
        let file = File {
            id,
            submission,
            name: spec.name.clone(),
            extension: spec.extension.clone(),
            code: spec.code.clone(),
            comments: Vec::new(),
        };
        self.files.insert(id, file.clone());
        Ok(file)
    }

    fn remove_file(&mut self, id: FileId) -> Option<File> {
        let file = self.files.remove(&id)?;
        for comment in &file.comments {
            self.comments.remove(comment);
        }
        if let Some(owner) = self.submissions.get_mut(&file.submission) {
            owner.files.retain(|f| *f != id);
            owner.date_edited = Some(Utc::now());
        }
        Some(file)
    }
}

/// A thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the `(skip + 1)`-th upcoming call of `op` fail with a server error.
    pub fn fail_on(&self, op: Operation, skip: usize) {
        self.lock().failures.insert(op, skip);
    }

    /// Every operation called so far, in order.
    pub fn calls(&self) -> Vec<Operation> {
        self.lock().calls.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().calls.iter().filter(|op| op.is_mutation()).count()
    }

    // -- seeding -----------------------------------------------------------

    /// Insert a submission with files directly, bypassing the journal.
    pub fn insert_submission(
        &self,
        assignment: AssignmentId,
        students: &[StudentEmail],
        grader: Option<GraderEmail>,
        files: &[FileSpec],
    ) -> Submission {
        let mut state = self.lock();
        let id = SubmissionId(state.allocate());
        state.submissions.insert(
            id,
            Submission {
                id,
                assignment,
                students: students.to_vec(),
                grader,
                is_finalized: false,
                files: Vec::new(),
                date_edited: Some(Utc::now()),
            },
        );
        for spec in files {
            // The submission was inserted above, so this cannot miss.
            let _ = state.create_file(id, spec);
        }
        state.submissions[&id].clone()
    }

    /// Attach a comment to `file`; `None` if there is no such file.
    pub fn add_comment(&self, file: FileId, text: &str) -> Option<CommentId> {
        let mut state = self.lock();
        if !state.files.contains_key(&file) {
            return None;
        }
        let id = CommentId(state.allocate());
        state.files.get_mut(&file)?.comments.push(id);
        state.comments.insert(
            id,
            Comment {
                id,
                file,
                text: text.to_string(),
            },
        );
        Some(id)
    }

    /// Mark a claimed submission finalized.
    pub fn finalize(&self, id: SubmissionId) {
        if let Some(sub) = self.lock().submissions.get_mut(&id) {
            sub.is_finalized = sub.grader.is_some();
        }
    }

    // -- inspection --------------------------------------------------------

    pub fn submission(&self, id: SubmissionId) -> Option<Submission> {
        self.lock().submissions.get(&id).cloned()
    }

    pub fn file(&self, id: FileId) -> Option<File> {
        self.lock().files.get(&id).cloned()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.lock().submissions.values().cloned().collect()
    }

    /// Comments on any file of the submission.
    pub fn comments_for_submission(&self, id: SubmissionId) -> Vec<Comment> {
        let state = self.lock();
        state
            .comments
            .values()
            .filter(|c| state.files.get(&c.file).map(|f| f.submission) == Some(id))
            .cloned()
            .collect()
    }
}

impl ResourceStore for MemoryStore {
    fn list_submissions(
        &self,
        assignment: AssignmentId,
        query: &SubmissionQuery,
    ) -> Result<Vec<Submission>, StoreError> {
        let mut state = self.lock();
        state.enter(Operation::ListSubmissions)?;
        Ok(state
            .submissions
            .values()
            .filter(|s| s.assignment == assignment && query.matches(s))
            .cloned()
            .collect())
    }

    fn create_submission(
        &self,
        assignment: AssignmentId,
        students: &[StudentEmail],
    ) -> Result<Submission, StoreError> {
        let mut state = self.lock();
        state.enter(Operation::CreateSubmission)?;
        if students.is_empty() {
            return Err(StoreError::BadRequest {
                detail: "missing fields: students".into(),
            });
        }
        let id = SubmissionId(state.allocate());
        let submission = Submission {
            id,
            assignment,
            students: students.to_vec(),
            grader: None,
            is_finalized: false,
            files: Vec::new(),
            date_edited: Some(Utc::now()),
        };
        state.submissions.insert(id, submission.clone());
        Ok(submission)
    }

    fn get_submission(&self, id: SubmissionId) -> Result<Submission, StoreError> {
        let mut state = self.lock();
        state.enter(Operation::GetSubmission)?;
        state.submission_mut(id).map(|s| s.clone())
    }

    fn update_submission_students(
        &self,
        id: SubmissionId,
        students: &[StudentEmail],
    ) -> Result<Submission, StoreError> {
        let mut state = self.lock();
        state.enter(Operation::UpdateStudents)?;
        let sub = state.submission_mut(id)?;
        sub.students = students.to_vec();
        sub.date_edited = Some(Utc::now());
        Ok(sub.clone())
    }

    fn set_submission_grader(
        &self,
        id: SubmissionId,
        grader: Option<&GraderEmail>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.enter(Operation::SetGrader)?;
        let sub = state.submission_mut(id)?;
        sub.grader = grader.cloned();
        if sub.grader.is_none() {
            sub.is_finalized = false;
        }
        sub.date_edited = Some(Utc::now());
        Ok(())
    }

    fn delete_submission(&self, id: SubmissionId) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.enter(Operation::DeleteSubmission)?;
        let sub = state.submissions.remove(&id).ok_or(StoreError::NotFound {
            kind: ResourceKind::Submission,
            id: id.0,
        })?;
        for file in sub.files {
            state.remove_file(file);
        }
        Ok(())
    }

    fn get_file(&self, id: FileId) -> Result<File, StoreError> {
        let mut state = self.lock();
        state.enter(Operation::GetFile)?;
        state.files.get(&id).cloned().ok_or(StoreError::NotFound {
            kind: ResourceKind::File,
            id: id.0,
        })
    }

    fn create_file(&self, submission: SubmissionId, spec: &FileSpec) -> Result<File, StoreError> {
        let mut state = self.lock();
        state.enter(Operation::CreateFile)?;
        state.create_file(submission, spec)
    }

    fn delete_file(&self, id: FileId) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.enter(Operation::DeleteFile)?;
        state.remove_file(id).map(|_| ()).ok_or(StoreError::NotFound {
            kind: ResourceKind::File,
            id: id.0,
        })
    }

    fn delete_comment(&self, id: CommentId) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.enter(Operation::DeleteComment)?;
        let comment = state.comments.remove(&id).ok_or(StoreError::NotFound {
            kind: ResourceKind::Comment,
            id: id.0,
        })?;
        if let Some(file) = state.files.get_mut(&comment.file) {
            file.comments.retain(|c| *c != id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(store: &MemoryStore) -> Submission {
        store.insert_submission(
            AssignmentId(1),
            &["a@x".into()],
            Some("g@x".into()),
            &[FileSpec::new("a.py", "py", "a")],
        )
    }

    #[test]
    fn ids_are_unique_across_kinds() {
        let store = MemoryStore::new();
        let sub = seeded(&store);
        let comment = store.add_comment(sub.files[0], "hi").expect("comment");
        assert_eq!((sub.id.0, sub.files[0].0, comment.0), (1, 2, 3));
    }

    #[test]
    fn deleting_a_submission_cascades() {
        let store = MemoryStore::new();
        let sub = seeded(&store);
        store.add_comment(sub.files[0], "hi");

        store.delete_submission(sub.id).expect("delete");

        assert!(store.submission(sub.id).is_none());
        assert!(store.file(sub.files[0]).is_none());
        assert!(store.comments_for_submission(sub.id).is_empty());
        assert!(matches!(
            store.get_submission(sub.id),
            Err(StoreError::NotFound { kind: ResourceKind::Submission, .. })
        ));
    }

    #[test]
    fn deleting_a_file_detaches_it() {
        let store = MemoryStore::new();
        let sub = seeded(&store);
        store.delete_file(sub.files[0]).expect("delete");
        assert!(store.submission(sub.id).expect("sub").files.is_empty());
    }

    #[test]
    fn injected_failure_fires_once_after_skips() {
        let store = MemoryStore::new();
        let sub = seeded(&store);
        store.fail_on(Operation::GetSubmission, 1);

        assert!(store.get_submission(sub.id).is_ok());
        assert!(matches!(
            store.get_submission(sub.id),
            Err(StoreError::Server { status: 500, .. })
        ));
        assert!(store.get_submission(sub.id).is_ok());
    }

    #[test]
    fn journal_separates_reads_from_mutations() {
        let store = MemoryStore::new();
        let sub = seeded(&store);
        store.get_submission(sub.id).expect("get");
        store
            .list_submissions(AssignmentId(1), &SubmissionQuery::default())
            .expect("list");
        store.unclaim_submission(sub.id).expect("unclaim");

        assert_eq!(
            store.calls(),
            vec![
                Operation::GetSubmission,
                Operation::ListSubmissions,
                Operation::SetGrader
            ]
        );
        assert_eq!(store.mutation_count(), 1);
    }

    #[test]
    fn creating_without_students_is_a_bad_request() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.create_submission(AssignmentId(1), &[]),
            Err(StoreError::BadRequest { .. })
        ));
    }
}
