//! `fat import`: load records from a JSON export into the local store.
//!
//! Accepts either a bare array of records or the record service's listing
//! envelope (`{"data": [...], "meta": {...}}`). Records are upserted by NUP,
//! replacing any stored copy together with its audit trail.

use crate::context::CliContext;
use crate::output::{OutputMode, render};
use anyhow::Context as _;
use clap::Args;
use faturamento_core::error::CoreError;
use faturamento_core::model::ProcessRecord;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON file to read, or `-` for stdin.
    pub file: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Envelope { data: Vec<ProcessRecord> },
    Records(Vec<ProcessRecord>),
}

impl Payload {
    fn into_records(self) -> Vec<ProcessRecord> {
        match self {
            Self::Envelope { data } => data,
            Self::Records(records) => records,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub store: String,
}

fn read_source(file: &Path) -> anyhow::Result<String> {
    if file.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn parse_records(text: &str) -> anyhow::Result<Vec<ProcessRecord>> {
    let payload: Payload =
        serde_json::from_str(text).context("Expected a JSON array of records or {\"data\": [...]}")?;
    Ok(payload.into_records())
}

/// Execute `fat import <file>`.
///
/// # Errors
///
/// Unreadable or malformed input, an HTTP backend, or a database failure.
pub fn run_import(args: &ImportArgs, ctx: &CliContext) -> anyhow::Result<()> {
    ctx.require_local("import")?;
    let records = parse_records(&read_source(&args.file)?)?;

    let store = ctx.open_sqlite()?;
    let imported = store.import(&records).map_err(CoreError::from)?;
    let path = ctx.config.sqlite_path();

    let summary = ImportSummary {
        imported,
        store: path.display().to_string(),
    };
    render(ctx.output, &summary, write_summary)
}

fn write_summary(summary: &ImportSummary, mode: OutputMode, w: &mut dyn Write) -> io::Result<()> {
    if mode == OutputMode::Text {
        return writeln!(w, "{}", summary.imported);
    }
    writeln!(w, "✓ imported {} records into {}", summary.imported, summary.store)
}
