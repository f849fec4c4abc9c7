//! `fat productivity`: per-collaborator counts and totals for a date window.

use super::parse_date;
use crate::context::CliContext;
use crate::output::{OutputMode, pretty_rule, pretty_section, render};
use clap::Args;
use faturamento_core::aggregate::{AggregationWindow, CollaboratorAggregate};
use faturamento_core::app::View;
use faturamento_core::model::Money;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ProductivityArgs {
    /// First day of the window (YYYY-MM-DD or DD/MM/YYYY). Default: first of this month.
    #[arg(long)]
    pub from: Option<String>,

    /// Last day of the window, inclusive. Default: today.
    #[arg(long)]
    pub to: Option<String>,

    /// Count records still in progress instead of finalized ones.
    #[arg(long)]
    pub pending: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityReport {
    pub window: AggregationWindow,
    pub collaborators: Vec<CollaboratorAggregate>,
    pub total_count: usize,
    pub total_value: Money,
}

impl ProductivityReport {
    fn new(window: AggregationWindow, collaborators: Vec<CollaboratorAggregate>) -> Self {
        Self {
            total_count: collaborators.iter().map(|c| c.count).sum(),
            total_value: collaborators.iter().map(|c| c.total_value).sum(),
            window,
            collaborators,
        }
    }
}

/// Execute `fat productivity`.
///
/// # Errors
///
/// Access denied for non-administrators, an inverted window, or a store
/// failure.
pub fn run_productivity(args: &ProductivityArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let mut controller = ctx.controller()?;
    let current = controller.state().window;
    let start = args
        .from
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or(current.start);
    let end = args
        .to
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or(current.end);

    controller.set_window(start, end, !args.pending)?;
    controller.switch_view(View::Dashboard)?;

    let state = controller.state();
    let report = ProductivityReport::new(state.window, state.aggregates.clone());
    render(ctx.output, &report, write_report)
}

fn write_report(report: &ProductivityReport, mode: OutputMode, w: &mut dyn Write) -> io::Result<()> {
    if mode == OutputMode::Text {
        for c in &report.collaborators {
            writeln!(w, "{}\t{}\t{}", c.name, c.count, c.total_value.cents())?;
        }
        return Ok(());
    }

    let kind = if report.window.finalized {
        "finalized"
    } else {
        "in progress"
    };
    pretty_section(
        w,
        &format!(
            "Produtividade {} a {} ({kind})",
            report.window.start.format("%d/%m/%Y"),
            report.window.end.format("%d/%m/%Y"),
        ),
    )?;
    if report.collaborators.is_empty() {
        writeln!(w, "no records in this window")?;
        return Ok(());
    }
    for c in &report.collaborators {
        writeln!(w, "{:<28} {:>6} {:>18}", c.name, c.count, c.total_value.to_string())?;
    }
    pretty_rule(w)?;
    writeln!(
        w,
        "{:<28} {:>6} {:>18}",
        "Total",
        report.total_count,
        report.total_value.to_string()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn group(name: &str, count: usize, cents: i64) -> CollaboratorAggregate {
        CollaboratorAggregate {
            name: name.into(),
            count,
            total_value: Money::from_cents(cents),
            matching_records: Vec::new(),
            unassigned: false,
        }
    }

    fn report() -> ProductivityReport {
        let window = AggregationWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            true,
        )
        .unwrap();
        ProductivityReport::new(window, vec![group("ANA", 2, 15_000), group("Deise", 1, 5_050)])
    }

    #[test]
    fn totals_sum_every_group() {
        let r = report();
        assert_eq!(r.total_count, 3);
        assert_eq!(r.total_value, Money::from_cents(20_050));
    }

    #[test]
    fn text_rows_use_cents() {
        let mut buf = Vec::new();
        write_report(&report(), OutputMode::Text, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "ANA\t2\t15000\nDeise\t1\t5050\n");
    }

    #[test]
    fn pretty_output_has_window_and_total() {
        let mut buf = Vec::new();
        write_report(&report(), OutputMode::Pretty, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("01/01/2024 a 31/01/2024 (finalized)"));
        assert!(text.contains("R$ 200,50"));
    }
}
