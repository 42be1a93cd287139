//! Domain types for the codePost resources touched by submission uploads.
//!
//! Field names follow the platform's JSON payloads (camelCase on the wire).
//! Ids are opaque integers assigned by the server.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Id newtypes
// ---------------------------------------------------------------------------

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

resource_id!(
    /// Server-assigned id of an assignment.
    AssignmentId
);
resource_id!(
    /// Server-assigned id of a submission.
    SubmissionId
);
resource_id!(
    /// Server-assigned id of a file attached to a submission.
    FileId
);
resource_id!(
    /// Server-assigned id of a comment attached to a file.
    CommentId
);

// ---------------------------------------------------------------------------
// Identity newtypes
// ---------------------------------------------------------------------------

/// A student identifier (the platform uses e-mail addresses).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentEmail(pub String);

impl fmt::Display for StudentEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for StudentEmail {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StudentEmail {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A grader identifier. A submission with a grader is "claimed".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraderEmail(pub String);

impl fmt::Display for GraderEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for GraderEmail {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GraderEmail {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A submission of one assignment by one or more students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: SubmissionId,
    pub assignment: AssignmentId,
    pub students: Vec<StudentEmail>,
    #[serde(default, deserialize_with = "empty_grader_as_none")]
    pub grader: Option<GraderEmail>,
    #[serde(default)]
    pub is_finalized: bool,
    #[serde(default)]
    pub files: Vec<FileId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_edited: Option<DateTime<Utc>>,
}

impl Submission {
    /// `true` when a grader has claimed the submission.
    pub fn is_claimed(&self) -> bool {
        self.grader.is_some()
    }

    /// Set equality between this submission's students and `students`.
    pub fn has_students(&self, students: &[StudentEmail]) -> bool {
        let ours: HashSet<&StudentEmail> = self.students.iter().collect();
        let theirs: HashSet<&StudentEmail> = students.iter().collect();
        ours == theirs
    }
}

/// A source file attached to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub id: FileId,
    pub submission: SubmissionId,
    pub name: String,
    pub extension: String,
    pub code: String,
    #[serde(default)]
    pub comments: Vec<CommentId>,
}

/// A grader comment attached to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub file: FileId,
    #[serde(default)]
    pub text: String,
}

/// A file as the caller wants it to exist on a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub name: String,
    pub extension: String,
    pub code: String,
}

impl FileSpec {
    pub fn new(
        name: impl Into<String>,
        extension: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            code: code.into(),
        }
    }
}

/// Drop repeated students, keeping the first occurrence of each.
pub fn dedup_students(students: impl IntoIterator<Item = StudentEmail>) -> Vec<StudentEmail> {
    let mut seen = HashSet::new();
    students
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

// The API sends `""` for an unclaimed submission in some responses.
fn empty_grader_as_none<'de, D>(deserializer: D) -> Result<Option<GraderEmail>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|g| !g.is_empty()).map(GraderEmail))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
