//! `codepost diff` — show unified diffs for files an upload would replace.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use codepost_upload::{preview, UploadPlan};

use super::{build_request, connect, ModeArgs, TargetArgs};

/// Arguments for `codepost diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub mode: ModeArgs,

    /// Local files to compare against the submission.
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

impl DiffArgs {
    pub fn run(self, api_key: Option<&str>) -> Result<()> {
        let request = build_request(&self.target, &self.files)?;
        let mode = self.mode.resolve()?;
        let store = connect(api_key)?;

        let plan = preview(&store, &request, &mode)
            .with_context(|| format!("diff failed for assignment {}", request.assignment))?;

        if let UploadPlan::Reject { reason } = &plan {
            println!("Upload would be refused: {reason}");
            return Ok(());
        }

        let mut any = false;
        for (_, diff) in plan.diffs() {
            any = true;
            print!("{diff}");
            if !diff.ends_with('\n') {
                println!();
            }
        }
        if !any {
            println!("No differences for assignment {}.", request.assignment);
        }

        Ok(())
    }
}
