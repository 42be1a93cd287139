//! codePost — submission upload CLI.
//!
//! # Usage
//!
//! ```text
//! codepost modes [--json]
//! codepost upload --assignment <id> --student <email>... [--mode <name> | --mode-file <path>]
//!                 [--allow-partial] [--dry-run] [--json] <file>...
//! codepost diff --assignment <id> --student <email>... [--mode <name>] <file>...
//! codepost submissions --assignment <id> [--student <email>] [--grader <email>] [--json]
//! codepost unclaim <submission-id>
//! ```
//!
//! Every command accepts `--api-key`; otherwise the key comes from
//! `$CP_API_KEY` or a `codepost-config.yaml` file.

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use codepost_upload::NamedMode;
use commands::{
    diff::DiffArgs, modes::ModesArgs, submissions::SubmissionsArgs, unclaim::UnclaimArgs,
    upload::UploadArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "codepost",
    version,
    about = "Upload and reconcile student submissions on codePost",
    long_about = None,
)]
struct Cli {
    /// API key; overrides $CP_API_KEY and config files.
    #[arg(long, global = true, value_name = "KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the built-in upload modes and their flags.
    Modes(ModesArgs),

    /// Upload files as a submission, reconciling with existing ones.
    Upload(UploadArgs),

    /// Show unified diffs of files an upload would replace.
    Diff(DiffArgs),

    /// List the submissions of an assignment.
    Submissions(SubmissionsArgs),

    /// Remove the grader from a submission and clear its finalized flag.
    Unclaim(UnclaimArgs),
}

// ---------------------------------------------------------------------------
// Shared mode argument — parsed from CLI strings, converts to NamedMode
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `NamedMode` from CLI args.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeArg(pub NamedMode);

impl FromStr for ModeArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for ModeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<ModeArg> for NamedMode {
    fn from(m: ModeArg) -> Self {
        m.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let api_key = cli.api_key.as_deref();
    match cli.command {
        Commands::Modes(args) => args.run(),
        Commands::Upload(args) => args.run(api_key),
        Commands::Diff(args) => args.run(api_key),
        Commands::Submissions(args) => args.run(api_key),
        Commands::Unclaim(args) => args.run(api_key),
    }
}
