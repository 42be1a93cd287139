//! Subcommands and the argument groups they share.

pub mod diff;
pub mod modes;
pub mod submissions;
pub mod unclaim;
pub mod upload;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use codepost_core::{config, AssignmentId, FileSpec, StudentEmail};
use codepost_http::HttpStore;
use codepost_upload::{UploadMode, UploadRequest};

use crate::ModeArg;

/// Resolve the API configuration and build a client.
pub fn connect(api_key: Option<&str>) -> Result<HttpStore> {
    let config = config::discover(api_key).context("failed to resolve codePost configuration")?;
    if !config.api_key.looks_valid() {
        eprintln!(
            "{} API key {} (from {}) does not look like a codePost token",
            "warning:".yellow().bold(),
            config.api_key,
            config.source
        );
    }
    tracing::debug!(base_url = %config.base_url, source = %config.source, "using codePost API");
    Ok(HttpStore::new(&config))
}

/// Which submission an upload targets.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Assignment id.
    #[arg(long, value_name = "ID")]
    pub assignment: u64,

    /// Student e-mail; repeat for group submissions.
    #[arg(long = "student", value_name = "EMAIL", required = true)]
    pub students: Vec<String>,
}

/// How an upload treats existing submissions.
#[derive(Args, Debug)]
pub struct ModeArgs {
    /// Built-in upload mode.
    #[arg(long, default_value = "cautious")]
    pub mode: ModeArg,

    /// Custom mode as YAML or JSON with the ten camelCase flags.
    #[arg(long, value_name = "PATH", conflicts_with = "mode")]
    pub mode_file: Option<PathBuf>,

    /// Keep partial changes instead of cleaning up when an upload fails.
    #[arg(long)]
    pub allow_partial: bool,
}

impl ModeArgs {
    pub fn resolve(&self) -> Result<UploadMode> {
        let mode = match &self.mode_file {
            Some(path) => load_mode_file(path)?,
            None => self.mode.0.mode(),
        };
        Ok(if self.allow_partial {
            mode.with_allow_partial(true)
        } else {
            mode
        })
    }
}

fn load_mode_file(path: &Path) -> Result<UploadMode> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read mode file {}", path.display()))?;
    serde_yaml::from_str(&text)
        .with_context(|| format!("failed to parse mode file {}", path.display()))
}

/// Build an upload request from command-line arguments and files on disk.
pub fn build_request(target: &TargetArgs, files: &[PathBuf]) -> Result<UploadRequest> {
    Ok(UploadRequest::new(
        AssignmentId(target.assignment),
        target.students.iter().map(|s| StudentEmail::from(s.as_str())),
        read_file_specs(files)?,
    ))
}

/// Read each path into a [`FileSpec`] named after its file name.
pub fn read_file_specs(paths: &[PathBuf]) -> Result<Vec<FileSpec>> {
    paths.iter().map(|path| read_file_spec(path)).collect()
}

fn read_file_spec(path: &Path) -> Result<FileSpec> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let code = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(FileSpec::new(name, extension, code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use codepost_upload::NamedMode;
    use tempfile::TempDir;

    #[test]
    fn file_specs_use_name_and_last_extension() {
        let dir = TempDir::new().expect("tmp");
        let a = dir.path().join("Main.java");
        let b = dir.path().join("archive.tar.gz");
        let c = dir.path().join("Makefile");
        std::fs::write(&a, "class Main {}\n").expect("write");
        std::fs::write(&b, "").expect("write");
        std::fs::write(&c, "all:\n").expect("write");

        let specs = read_file_specs(&[a, b, c]).expect("read");
        assert_eq!(specs[0], FileSpec::new("Main.java", "java", "class Main {}\n"));
        assert_eq!(specs[1].extension, "gz");
        assert_eq!(specs[2].extension, "");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_file_specs(&[PathBuf::from("/definitely/not/here.py")]).unwrap_err();
        assert!(err.to_string().contains("here.py"));
    }

    #[test]
    fn mode_file_and_partial_flag() {
        let dir = TempDir::new().expect("tmp");
        let path = dir.path().join("mode.yaml");
        std::fs::write(
            &path,
            "allowPartial: false\nupdateIfExists: true\nupdateIfClaimed: false\n\
             resolveStudents: true\naddFiles: true\nupdateExistingFiles: false\n\
             deleteUnspecifiedFiles: false\nremoveComments: false\ndoUnclaim: false\n\
             deleteAffectedSubmissions: false\n",
        )
        .expect("write");

        let args = ModeArgs {
            mode: ModeArg::default(),
            mode_file: Some(path),
            allow_partial: true,
        };
        let mode = args.resolve().expect("resolve");
        assert_eq!(mode, UploadMode::EXTEND.with_allow_partial(true));

        let named = ModeArgs {
            mode: ModeArg(NamedMode::Overwrite),
            mode_file: None,
            allow_partial: false,
        };
        assert_eq!(named.resolve().expect("resolve"), UploadMode::OVERWRITE);
    }
}
