//! `codepost submissions` — list the submissions of an assignment.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use codepost_core::{AssignmentId, GraderEmail, StudentEmail, Submission};
use codepost_upload::{ResourceStore, SubmissionQuery};

use super::connect;

/// Arguments for `codepost submissions`.
#[derive(Args, Debug)]
pub struct SubmissionsArgs {
    /// Assignment id.
    #[arg(long, value_name = "ID")]
    pub assignment: u64,

    /// Only submissions that include this student.
    #[arg(long, value_name = "EMAIL")]
    pub student: Option<String>,

    /// Only submissions claimed by this grader.
    #[arg(long, value_name = "EMAIL")]
    pub grader: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct SubmissionTableRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "students")]
    students: String,
    #[tabled(rename = "grader")]
    grader: String,
    #[tabled(rename = "finalized")]
    finalized: String,
    #[tabled(rename = "files")]
    files: usize,
    #[tabled(rename = "edited")]
    edited: String,
}

impl From<&Submission> for SubmissionTableRow {
    fn from(s: &Submission) -> Self {
        Self {
            id: s.id.to_string(),
            students: s
                .students
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            grader: s
                .grader
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string()),
            finalized: if s.is_finalized { "yes" } else { "no" }.to_string(),
            files: s.files.len(),
            edited: s
                .date_edited
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

impl SubmissionsArgs {
    fn query(&self) -> SubmissionQuery {
        SubmissionQuery {
            student: self.student.as_deref().map(StudentEmail::from),
            grader: self.grader.as_deref().map(GraderEmail::from),
        }
    }

    pub fn run(self, api_key: Option<&str>) -> Result<()> {
        let store = connect(api_key)?;
        let assignment = AssignmentId(self.assignment);
        let submissions = store
            .list_submissions(assignment, &self.query())
            .with_context(|| format!("failed to list submissions of assignment {assignment}"))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&submissions)
                    .context("failed to serialize submissions JSON")?
            );
            return Ok(());
        }

        if submissions.is_empty() {
            println!("No submissions for assignment {assignment}.");
            return Ok(());
        }

        let rows: Vec<SubmissionTableRow> = submissions.iter().map(Into::into).collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
