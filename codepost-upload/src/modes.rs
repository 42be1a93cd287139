//! Upload modes: named policies controlling how an upload is reconciled
//! against submissions that already exist.
//!
//! | mode      | partial | exists | claimed | students | add | update | prune | comments | unclaim | delete affected |
//! |-----------|---------|--------|---------|----------|-----|--------|-------|----------|---------|-----------------|
//! | Cautious  |         |        |         |          |     |        |       |          |         |                 |
//! | Extend    |         | ✓      |         | ✓        | ✓   |        |       |          |         |                 |
//! | DiffScan  |         | ✓      |         | ✓        | ✓   | ✓      |       |          |         |                 |
//! | Overwrite |         | ✓      | ✓       | ✓        | ✓   | ✓      | ✓     | ✓        | ✓       | ✓               |
//! | Pregrade  |         | ✓      |         | ✓        | ✓   | ✓      | ✓     | ✓        |         | ✓               |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Ten independent policy flags. Built-ins are the associated constants;
/// custom modes start from [`UploadMode::custom`] and are refined with the
/// `with_*` constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMode {
    allow_partial: bool,
    update_if_exists: bool,
    update_if_claimed: bool,
    resolve_students: bool,
    add_files: bool,
    update_existing_files: bool,
    delete_unspecified_files: bool,
    remove_comments: bool,
    do_unclaim: bool,
    delete_affected_submissions: bool,
}

impl UploadMode {
    /// Refuse to touch any existing submission.
    pub const CAUTIOUS: UploadMode = UploadMode::custom();

    /// Only add files that are not already on the submission.
    pub const EXTEND: UploadMode = UploadMode::custom()
        .with_update_if_exists(true)
        .with_resolve_students(true)
        .with_add_files(true);

    /// Add missing files and replace files whose content changed.
    pub const DIFF_SCAN: UploadMode = UploadMode::EXTEND.with_update_existing_files(true);

    /// Make the submission match the upload exactly, even if claimed.
    pub const OVERWRITE: UploadMode = UploadMode::DIFF_SCAN
        .with_update_if_claimed(true)
        .with_delete_unspecified_files(true)
        .with_remove_comments(true)
        .with_do_unclaim(true)
        .with_delete_affected_submissions(true);

    /// Overwrite, but only while nobody has claimed the submission.
    pub const PREGRADE: UploadMode = UploadMode::DIFF_SCAN
        .with_delete_unspecified_files(true)
        .with_remove_comments(true)
        .with_delete_affected_submissions(true);

    /// All flags off (identical to Cautious).
    pub const fn custom() -> Self {
        Self {
            allow_partial: false,
            update_if_exists: false,
            update_if_claimed: false,
            resolve_students: false,
            add_files: false,
            update_existing_files: false,
            delete_unspecified_files: false,
            remove_comments: false,
            do_unclaim: false,
            delete_affected_submissions: false,
        }
    }

    pub const fn allow_partial(&self) -> bool {
        self.allow_partial
    }
    pub const fn update_if_exists(&self) -> bool {
        self.update_if_exists
    }
    pub const fn update_if_claimed(&self) -> bool {
        self.update_if_claimed
    }
    pub const fn resolve_students(&self) -> bool {
        self.resolve_students
    }
    pub const fn add_files(&self) -> bool {
        self.add_files
    }
    pub const fn update_existing_files(&self) -> bool {
        self.update_existing_files
    }
    pub const fn delete_unspecified_files(&self) -> bool {
        self.delete_unspecified_files
    }
    pub const fn remove_comments(&self) -> bool {
        self.remove_comments
    }
    pub const fn do_unclaim(&self) -> bool {
        self.do_unclaim
    }
    pub const fn delete_affected_submissions(&self) -> bool {
        self.delete_affected_submissions
    }

    /// Keep partially applied changes when a multi-step upload fails.
    pub const fn with_allow_partial(mut self, on: bool) -> Self {
        self.allow_partial = on;
        self
    }
    pub const fn with_update_if_exists(mut self, on: bool) -> Self {
        self.update_if_exists = on;
        self
    }
    pub const fn with_update_if_claimed(mut self, on: bool) -> Self {
        self.update_if_claimed = on;
        self
    }
    pub const fn with_resolve_students(mut self, on: bool) -> Self {
        self.resolve_students = on;
        self
    }
    pub const fn with_add_files(mut self, on: bool) -> Self {
        self.add_files = on;
        self
    }
    pub const fn with_update_existing_files(mut self, on: bool) -> Self {
        self.update_existing_files = on;
        self
    }
    pub const fn with_delete_unspecified_files(mut self, on: bool) -> Self {
        self.delete_unspecified_files = on;
        self
    }
    pub const fn with_remove_comments(mut self, on: bool) -> Self {
        self.remove_comments = on;
        self
    }
    pub const fn with_do_unclaim(mut self, on: bool) -> Self {
        self.do_unclaim = on;
        self
    }
    pub const fn with_delete_affected_submissions(mut self, on: bool) -> Self {
        self.delete_affected_submissions = on;
        self
    }

    /// `(flag name, value)` pairs in canonical order.
    pub fn flags(&self) -> [(&'static str, bool); 10] {
        [
            ("allowPartial", self.allow_partial),
            ("updateIfExists", self.update_if_exists),
            ("updateIfClaimed", self.update_if_claimed),
            ("resolveStudents", self.resolve_students),
            ("addFiles", self.add_files),
            ("updateExistingFiles", self.update_existing_files),
            ("deleteUnspecifiedFiles", self.delete_unspecified_files),
            ("removeComments", self.remove_comments),
            ("doUnclaim", self.do_unclaim),
            ("deleteAffectedSubmissions", self.delete_affected_submissions),
        ]
    }
}

impl Default for UploadMode {
    fn default() -> Self {
        Self::CAUTIOUS
    }
}

// ---------------------------------------------------------------------------
// Named built-ins
// ---------------------------------------------------------------------------

/// The built-in modes by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NamedMode {
    #[default]
    Cautious,
    Extend,
    DiffScan,
    Overwrite,
    Pregrade,
}

impl NamedMode {
    pub fn all() -> &'static [NamedMode] {
        &[
            NamedMode::Cautious,
            NamedMode::Extend,
            NamedMode::DiffScan,
            NamedMode::Overwrite,
            NamedMode::Pregrade,
        ]
    }

    pub fn mode(self) -> UploadMode {
        match self {
            NamedMode::Cautious => UploadMode::CAUTIOUS,
            NamedMode::Extend => UploadMode::EXTEND,
            NamedMode::DiffScan => UploadMode::DIFF_SCAN,
            NamedMode::Overwrite => UploadMode::OVERWRITE,
            NamedMode::Pregrade => UploadMode::PREGRADE,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            NamedMode::Cautious => "cancel the upload if any submission already exists",
            NamedMode::Extend => "add files missing from the existing submission",
            NamedMode::DiffScan => "add missing files and replace files whose content changed",
            NamedMode::Overwrite => {
                "replace the submission, clear comments and unclaim it, even if claimed"
            }
            NamedMode::Pregrade => "overwrite the submission unless a grader has claimed it",
        }
    }
}

impl fmt::Display for NamedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamedMode::Cautious => write!(f, "cautious"),
            NamedMode::Extend => write!(f, "extend"),
            NamedMode::DiffScan => write!(f, "diffscan"),
            NamedMode::Overwrite => write!(f, "overwrite"),
            NamedMode::Pregrade => write!(f, "pregrade"),
        }
    }
}

impl FromStr for NamedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cautious" => Ok(NamedMode::Cautious),
            "extend" => Ok(NamedMode::Extend),
            "diffscan" | "diff-scan" | "diff_scan" => Ok(NamedMode::DiffScan),
            "overwrite" => Ok(NamedMode::Overwrite),
            "pregrade" => Ok(NamedMode::Pregrade),
            other => Err(format!(
                "unknown upload mode '{other}'; expected: cautious, extend, diffscan, overwrite, pregrade"
            )),
        }
    }
}

impl From<NamedMode> for UploadMode {
    fn from(named: NamedMode) -> Self {
        named.mode()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
