//! `fat status`: move a record to another workflow status.

use super::parse_status;
use crate::context::CliContext;
use crate::output::{OutputMode, render};
use clap::Args;
use faturamento_core::model::{ProcessRecord, StatusTransition};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// NUP of the record.
    pub nup: String,

    /// Target status, e.g. "em análise", "assinado-e-tramitado".
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusChange {
    pub transition: StatusTransition,
    pub record: ProcessRecord,
}

/// Execute `fat status <nup> <status>`.
///
/// The change is applied optimistically and confirmed by the store; a
/// failed round trip rolls the record back and reports a connectivity error.
///
/// # Errors
///
/// Unknown status, finalized record, missing record or store failure.
pub fn run_status(args: &StatusArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let target = parse_status(&args.status)?;
    let mut controller = ctx.controller()?;
    controller.open_record(args.nup.trim())?;
    let transition = controller.change_status(target)?;

    let record = controller
        .state()
        .editing
        .clone()
        .ok_or_else(|| anyhow::anyhow!("record {} vanished after the update", args.nup))?;
    render(
        ctx.output,
        &StatusChange { transition, record },
        write_change,
    )
}

fn write_change(change: &StatusChange, mode: OutputMode, w: &mut dyn Write) -> io::Result<()> {
    let t = &change.transition;
    match mode {
        OutputMode::Text => writeln!(w, "{}\t{}\t{}", change.record.nup, t.from, t.to),
        _ => writeln!(
            w,
            "✓ {}: {} → {} (by {})",
            change.record.nup, t.from, t.to, t.actor_name
        ),
    }
}
