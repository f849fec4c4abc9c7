//! `fat show`: full details and audit trail of a single record.

use super::or_dash;
use crate::context::CliContext;
use crate::output::{OutputMode, pretty_kv, pretty_section, render};
use chrono::Local;
use clap::Args;
use faturamento_core::model::{ProcessRecord, Status, Treatment};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// NUP of the record.
    pub nup: String,
}

/// Record detail as returned in JSON output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowRecord {
    #[serde(flatten)]
    pub record: ProcessRecord,
    /// Statuses the record may move to next.
    pub allowed_targets: Vec<Status>,
}

/// Execute `fat show <nup>`.
///
/// # Errors
///
/// Returns an error if the record does not exist or the store fails.
pub fn run_show(args: &ShowArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let mut controller = ctx.controller()?;
    let record = controller.open_record(args.nup.trim())?.clone();
    let detail = ShowRecord {
        allowed_targets: controller.allowed_targets(),
        record,
    };
    render(ctx.output, &detail, write_detail)
}

pub(crate) fn write_detail(
    detail: &ShowRecord,
    mode: OutputMode,
    w: &mut dyn Write,
) -> io::Result<()> {
    let r = &detail.record;
    if mode == OutputMode::Text {
        writeln!(w, "{}", super::record_row(r))?;
        for t in &r.historico_status {
            writeln!(w, "{}\t{}\t{}\t{}", t.at.to_rfc3339(), t.from, t.to, t.actor_email)?;
        }
        return Ok(());
    }

    pretty_section(w, &format!("Processo {}", r.nup))?;
    pretty_kv(w, "Número", or_dash(Some(r.numero_processo.as_str())))?;
    pretty_kv(w, "Credenciado", or_dash(Some(r.credenciado.as_str())))?;
    pretty_kv(w, "Tratamento", or_dash(r.tratamento.map(Treatment::as_str)))?;
    pretty_kv(w, "Status", r.status.as_str())?;
    pretty_kv(w, "Responsável", or_dash(r.assignee()))?;
    pretty_kv(w, "Valor capa", r.valor_capa.to_string())?;
    if let Some(date) = r.data_recebimento {
        pretty_kv(w, "Recebido", date.format("%d/%m/%Y").to_string())?;
    }
    if let Some(at) = r.ultima_atualizacao {
        pretty_kv(
            w,
            "Atualizado",
            at.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string(),
        )?;
    }
    if r.is_finalized() {
        writeln!(w, "\nThis record is final; its status can no longer change.")?;
    } else {
        let targets: Vec<&str> = detail.allowed_targets.iter().copied().map(Status::as_str).collect();
        pretty_kv(w, "Next", targets.join(", "))?;
    }

    writeln!(w)?;
    pretty_section(w, "Histórico")?;
    if r.historico_status.is_empty() {
        writeln!(w, "no status changes yet")?;
    }
    for t in &r.historico_status {
        writeln!(
            w,
            "{}  {} → {}  ({} <{}>)",
            t.at.with_timezone(&Local).format("%d/%m/%Y %H:%M"),
            t.from,
            t.to,
            t.actor_name,
            t.actor_email
        )?;
    }
    Ok(())
}
