//! `fat list`: filtered, paginated record listing.

use super::{or_dash, parse_status, parse_treatment, record_row};
use crate::context::CliContext;
use crate::output::{OutputMode, pretty_rule, pretty_section, render};
use clap::Args;
use faturamento_core::app::Action;
use faturamento_core::model::{ProcessRecord, Treatment};
use faturamento_core::query::Page;
use std::io::{self, Write};
use std::time::Instant;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Case-insensitive substring of the case number.
    #[arg(short, long)]
    pub search: Option<String>,

    /// Assigned collaborator (exact match).
    #[arg(short, long)]
    pub responsavel: Option<String>,

    /// Treatment category, e.g. "internamento" or "leito dia".
    #[arg(short, long)]
    pub tratamento: Option<String>,

    /// Workflow status, e.g. "em análise" or "em-analise".
    #[arg(long)]
    pub status: Option<String>,

    /// Page to show (1-based).
    #[arg(short, long, default_value_t = 1)]
    pub page: u32,
}

/// Execute `fat list`.
///
/// # Errors
///
/// Returns an error for unknown filter values, a page outside the result,
/// or a store failure.
pub fn run_list(args: &ListArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let tratamento = args.tratamento.as_deref().map(parse_treatment).transpose()?;
    let status = args.status.as_deref().map(parse_status).transpose()?;

    let mut controller = ctx.controller()?;
    controller.dispatch(Action::SetCollaboratorFilter(args.responsavel.clone()));
    controller.dispatch(Action::SetTreatmentFilter(tratamento));
    controller.dispatch(Action::SetStatusFilter(status));

    match args.search.as_deref() {
        Some(search) => {
            controller.type_search(search, Instant::now());
            controller.submit_search()?;
        }
        None => controller.refresh_listing()?,
    }

    if args.page != controller.state().page && !controller.go_to_page(args.page)? {
        anyhow::bail!(
            "page {} is out of range (1..={})",
            args.page,
            controller.state().listing.total_pages
        );
    }

    render(ctx.output, &controller.state().listing, write_page)
}

fn write_page(page: &Page<ProcessRecord>, mode: OutputMode, w: &mut dyn Write) -> io::Result<()> {
    if mode == OutputMode::Text {
        for record in &page.items {
            writeln!(w, "{}", record_row(record))?;
        }
        return Ok(());
    }

    pretty_section(
        w,
        &format!(
            "Processos (page {}/{}, {} total)",
            page.page, page.total_pages, page.total_count
        ),
    )?;
    if page.items.is_empty() {
        writeln!(w, "no records match")?;
        return Ok(());
    }
    writeln!(
        w,
        "{:<24} {:<22} {:<16} {:<14} {:>14}",
        "NUP", "STATUS", "TRATAMENTO", "RESPONSÁVEL", "VALOR"
    )?;
    pretty_rule(w)?;
    for record in &page.items {
        writeln!(
            w,
            "{:<24} {:<22} {:<16} {:<14} {:>14}",
            record.nup,
            record.status.as_str(),
            or_dash(record.tratamento.map(Treatment::as_str)),
            or_dash(record.assignee()),
            record.valor_capa.to_string(),
        )?;
    }
    Ok(())
}
