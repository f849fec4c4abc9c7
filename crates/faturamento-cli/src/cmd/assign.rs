//! `fat assign`: hand a record to a collaborator (administrators only).

use super::or_dash;
use crate::context::CliContext;
use crate::output::{OutputMode, render};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct AssignArgs {
    /// NUP of the record.
    pub nup: String,

    /// Collaborator name. An empty string clears the assignment.
    pub collaborator: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignResult {
    pub nup: String,
    pub responsavel: Option<String>,
    /// The name was not in the collaborator list before this call.
    pub new_collaborator: bool,
}

/// Execute `fat assign <nup> <collaborator>`.
///
/// # Errors
///
/// Access denied for non-administrators, missing record or store failure.
pub fn run_assign(args: &AssignArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let mut controller = ctx.controller()?;
    let name = args.collaborator.trim();
    let known_before = controller.known_collaborators().iter().any(|n| n == name);

    controller.open_record(args.nup.trim())?;
    controller.assign(name)?;

    let responsavel = controller
        .state()
        .editing
        .as_ref()
        .and_then(|r| r.assignee().map(str::to_string));
    let result = AssignResult {
        nup: args.nup.trim().to_string(),
        responsavel,
        new_collaborator: !name.is_empty() && !known_before,
    };
    render(ctx.output, &result, write_result)
}

fn write_result(result: &AssignResult, mode: OutputMode, w: &mut dyn Write) -> io::Result<()> {
    let who = or_dash(result.responsavel.as_deref());
    if mode == OutputMode::Text {
        return writeln!(w, "{}\t{who}", result.nup);
    }
    match result.responsavel {
        Some(_) => writeln!(w, "✓ {} assigned to {who}", result.nup)?,
        None => writeln!(w, "✓ {} is now unassigned", result.nup)?,
    }
    if result.new_collaborator {
        writeln!(w, "  {who} added to the collaborator list")?;
    }
    Ok(())
}
