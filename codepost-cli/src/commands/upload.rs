//! `codepost upload` — upload files and reconcile with existing submissions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use codepost_upload::{
    preview, upload_submission, FileAction, ReconcileError, UploadAction, UploadOutcome, UploadPlan,
};

use super::{build_request, connect, ModeArgs, TargetArgs};

/// Arguments for `codepost upload`.
#[derive(Args, Debug)]
pub struct UploadArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub mode: ModeArgs,

    /// Print the plan without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Files to upload.
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

impl UploadArgs {
    pub fn run(self, api_key: Option<&str>) -> Result<()> {
        let request = build_request(&self.target, &self.files)?;
        let mode = self.mode.resolve()?;
        let store = connect(api_key)?;

        if self.dry_run {
            let plan = preview(&store, &request, &mode).context("failed to plan upload")?;
            if self.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&plan).context("failed to serialize plan")?
                );
            } else {
                print_plan(&plan);
            }
            return Ok(());
        }

        match upload_submission(&store, &request, &mode) {
            Ok(outcome) => {
                if self.json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&outcome)
                            .context("failed to serialize upload outcome")?
                    );
                } else {
                    print_outcome(&outcome);
                }
                Ok(())
            }
            Err(ReconcileError::Upload(err)) => {
                if !err.trace().is_empty() {
                    eprintln!("{} {}", "cleanup:".yellow().bold(), err.trace());
                } else if !err.is_clean() {
                    eprintln!(
                        "{} partial upload kept: submissions [{}], files [{}]",
                        "warning:".yellow().bold(),
                        join(&err.created_submissions),
                        join(&err.created_files)
                    );
                }
                Err(err).context("upload failed")
            }
            Err(err) => Err(err).context("upload refused"),
        }
    }
}

fn print_outcome(outcome: &UploadOutcome) {
    let id = outcome.submission.id;
    match &outcome.action {
        UploadAction::Created => println!("{} submission {id}", "created".green().bold()),
        UploadAction::Updated if outcome.modified => {
            println!("{} submission {id}", "updated".green().bold())
        }
        UploadAction::Updated => println!("submission {id} already up to date"),
        UploadAction::Superseded { previous } => println!(
            "{} submission {id}, superseding {}",
            "created".green().bold(),
            join(previous)
        ),
    }
}

fn print_plan(plan: &UploadPlan) {
    match plan {
        UploadPlan::Create { files } => {
            println!("would create a new submission with {} file(s)", files.len());
            for name in files {
                println!("  {} {name}", "+".green());
            }
        }
        UploadPlan::Reject { reason } => {
            println!("{} {reason}", "would refuse:".red().bold());
        }
        UploadPlan::Supersede { submissions, files } => {
            for s in submissions {
                if s.deleted {
                    println!("would delete submission {}", s.id);
                } else {
                    println!(
                        "would leave submission {} with {}",
                        s.id,
                        join(&s.remaining)
                    );
                }
            }
            println!("would create a new submission with {} file(s)", files.len());
        }
        UploadPlan::Update {
            submission,
            students_changed,
            files,
            remove_comments,
            unclaim,
        } => {
            println!("would update submission {submission}");
            if *students_changed {
                println!("  students set to the uploaders");
            }
            for file in files {
                let marker = match file.action {
                    FileAction::Add => "+".green(),
                    FileAction::Replace => "~".yellow(),
                    FileAction::Delete => "-".red(),
                    FileAction::Unchanged => "=".normal(),
                    FileAction::Skip => "!".dimmed(),
                };
                println!("  {marker} {}", file.name);
            }
            if *remove_comments {
                println!("  comments removed");
            }
            if *unclaim {
                println!("  grader unclaimed");
            }
            if !plan.mutates() {
                println!("  nothing to change");
            }
        }
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
