//! `codepost unclaim <id>` — release a submission from its grader.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use codepost_core::SubmissionId;
use codepost_upload::ResourceStore;

use super::connect;

/// Arguments for `codepost unclaim`.
#[derive(Args, Debug)]
pub struct UnclaimArgs {
    /// Submission id.
    pub submission: u64,
}

impl UnclaimArgs {
    pub fn run(self, api_key: Option<&str>) -> Result<()> {
        let store = connect(api_key)?;
        let id = SubmissionId(self.submission);
        store
            .unclaim_submission(id)
            .with_context(|| format!("failed to unclaim submission {id}"))?;
        println!("{} submission {id}", "unclaimed".green().bold());
        Ok(())
    }
}
