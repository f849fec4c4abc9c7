//! `fat collaborators`: names offered when assigning a record.

use crate::context::CliContext;
use crate::output::{OutputMode, pretty_section, render};
use std::io::{self, Write};
use tracing::debug;

/// Execute `fat collaborators`.
///
/// Walks every listing page so names only present in the store are learned
/// alongside the configured roster.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn run_collaborators(ctx: &CliContext) -> anyhow::Result<()> {
    let mut controller = ctx.controller()?;
    controller.refresh_listing()?;
    let pages = controller.state().listing.total_pages;
    for page in 2..=pages {
        controller.go_to_page(page)?;
    }
    debug!(pages, "collaborator scan complete");

    let names = controller.known_collaborators();
    render(ctx.output, &names, write_names)
}

#[allow(clippy::ptr_arg)]
fn write_names(names: &Vec<String>, mode: OutputMode, w: &mut dyn Write) -> io::Result<()> {
    if mode == OutputMode::Pretty {
        pretty_section(w, &format!("Colaboradores ({})", names.len()))?;
    }
    for name in names {
        writeln!(w, "{name}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_mode_is_one_name_per_line() {
        let names = vec!["ANA".to_string(), "Deise".to_string()];
        let mut buf = Vec::new();
        write_names(&names, OutputMode::Text, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "ANA\nDeise\n");
    }
}
