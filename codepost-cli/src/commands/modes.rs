//! `codepost modes` — list the built-in upload modes.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use codepost_upload::{NamedMode, UploadMode};

/// Arguments for `codepost modes`.
#[derive(Args, Debug)]
pub struct ModesArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ModeJson {
    name: String,
    description: &'static str,
    flags: UploadMode,
}

#[derive(Tabled)]
struct ModeTableRow {
    #[tabled(rename = "mode")]
    name: String,
    #[tabled(rename = "enabled flags")]
    flags: String,
    #[tabled(rename = "description")]
    description: &'static str,
}

impl ModesArgs {
    pub fn run(self) -> Result<()> {
        if self.json {
            let payload: Vec<ModeJson> = NamedMode::all()
                .iter()
                .map(|named| ModeJson {
                    name: named.to_string(),
                    description: named.description(),
                    flags: named.mode(),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize modes JSON")?
            );
            return Ok(());
        }

        let rows: Vec<ModeTableRow> = NamedMode::all()
            .iter()
            .map(|named| ModeTableRow {
                name: named.to_string(),
                flags: enabled_flags(&named.mode()),
                description: named.description(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn enabled_flags(mode: &UploadMode) -> String {
    let on: Vec<&str> = mode
        .flags()
        .iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(name, _)| *name)
        .collect();
    if on.is_empty() {
        "-".to_string()
    } else {
        on.join(", ")
    }
}
