pub mod assign;
pub mod collaborators;
pub mod completions;
pub mod import;
pub mod list;
pub mod productivity;
pub mod show;
pub mod status;
pub mod whoami;

use anyhow::Context as _;
use chrono::NaiveDate;
use faturamento_core::error::CoreError;
use faturamento_core::model::record::parse_calendar_date;
use faturamento_core::model::{ProcessRecord, Status, Treatment};

pub(crate) fn parse_status(raw: &str) -> Result<Status, CoreError> {
    Ok(raw.parse::<Status>()?)
}

pub(crate) fn parse_treatment(raw: &str) -> Result<Treatment, CoreError> {
    Ok(raw.parse::<Treatment>()?)
}

pub(crate) fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    parse_calendar_date(raw)
        .with_context(|| format!("invalid date '{raw}' (use YYYY-MM-DD or DD/MM/YYYY)"))
}

pub(crate) fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

/// One tab-separated line per record.
pub(crate) fn record_row(record: &ProcessRecord) -> String {
    let tratamento = record.tratamento.map(Treatment::as_str);
    let received = record
        .data_recebimento
        .map(|d| d.format("%Y-%m-%d").to_string());
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        record.nup,
        record.status,
        or_dash(tratamento),
        or_dash(record.assignee()),
        record.valor_capa,
        or_dash(received.as_deref()),
    )
}
