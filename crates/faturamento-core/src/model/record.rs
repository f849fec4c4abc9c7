use super::money::Money;
use super::status::{Status, status_or_default};
use super::treatment::{Treatment, optional_treatment};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// One entry of a record's audit trail.
///
/// Wire names follow the record service: `de`, `para`, `usuario`,
/// `responsavel`, `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    #[serde(rename = "de", default, deserialize_with = "status_or_default")]
    pub from: Status,
    #[serde(rename = "para")]
    pub to: Status,
    #[serde(rename = "usuario", default)]
    pub actor_email: String,
    #[serde(rename = "responsavel", default)]
    pub actor_name: String,
    #[serde(rename = "data")]
    pub at: DateTime<Utc>,
}

/// A billing case as owned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawRecord")]
pub struct ProcessRecord {
    /// Primary key.
    pub nup: String,
    pub numero_processo: String,
    pub credenciado: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tratamento: Option<Treatment>,
    pub status: Status,
    /// Assigned collaborator. Legacy payloads call it `colaborador`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsavel: Option<String>,
    pub valor_capa: Money,
    #[serde(
        serialize_with = "serialize_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub data_recebimento: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ultima_atualizacao: Option<DateTime<Utc>>,
    pub historico_status: Vec<StatusTransition>,
}

/// Which date places a record inside a productivity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateBasis {
    /// Calendar day of the last update, falling back to the received date.
    #[default]
    Updated,
    /// `dataRecebimento` only.
    Received,
}

impl fmt::Display for DateBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Updated => "updated",
            Self::Received => "received",
        })
    }
}

impl ProcessRecord {
    /// A fresh record in the entry state with no history.
    pub fn new(nup: impl Into<String>) -> Self {
        Self {
            nup: nup.into(),
            numero_processo: String::new(),
            credenciado: String::new(),
            tratamento: None,
            status: Status::default(),
            responsavel: None,
            valor_capa: Money::ZERO,
            data_recebimento: None,
            ultima_atualizacao: None,
            historico_status: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.status.is_terminal()
    }

    /// The assigned collaborator, treating blank names as unassigned.
    #[must_use]
    pub fn assignee(&self) -> Option<&str> {
        self.responsavel
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// The date that places this record in a productivity window.
    #[must_use]
    pub fn relevant_date(&self, basis: DateBasis) -> Option<NaiveDate> {
        match basis {
            DateBasis::Updated => self
                .ultima_atualizacao
                .map(|ts| ts.date_naive())
                .or(self.data_recebimento),
            DateBasis::Received => self.data_recebimento,
        }
    }
}

/// Shape accepted on read; folds the legacy `colaborador` field into
/// `responsavel` so only one field survives in memory.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    nup: String,
    #[serde(default)]
    numero_processo: String,
    #[serde(default)]
    credenciado: String,
    #[serde(default, deserialize_with = "optional_treatment")]
    tratamento: Option<Treatment>,
    #[serde(default, deserialize_with = "status_or_default")]
    status: Status,
    #[serde(default)]
    responsavel: Option<String>,
    #[serde(default)]
    colaborador: Option<String>,
    #[serde(default)]
    valor_capa: Money,
    #[serde(default, deserialize_with = "deserialize_date")]
    data_recebimento: Option<NaiveDate>,
    #[serde(default, alias = "updatedAt")]
    ultima_atualizacao: Option<DateTime<Utc>>,
    #[serde(default)]
    historico_status: Vec<StatusTransition>,
}

impl From<RawRecord> for ProcessRecord {
    fn from(raw: RawRecord) -> Self {
        let non_blank = |name: Option<String>| name.filter(|n| !n.trim().is_empty());
        let responsavel = non_blank(raw.responsavel).or_else(|| non_blank(raw.colaborador));
        Self {
            nup: raw.nup,
            numero_processo: raw.numero_processo,
            credenciado: raw.credenciado,
            tratamento: raw.tratamento,
            status: raw.status,
            responsavel,
            valor_capa: raw.valor_capa,
            data_recebimento: raw.data_recebimento,
            ultima_atualizacao: raw.ultima_atualizacao,
            historico_status: raw.historico_status,
        }
    }
}

/// Parse `YYYY-MM-DD`, `DD/MM/YYYY`, or the date part of an RFC 3339 timestamp.
///
/// # Errors
///
/// Returns a `chrono` parse error when no format matches.
pub fn parse_calendar_date(text: &str) -> Result<NaiveDate, chrono::ParseError> {
    let text = text.trim();
    NaiveDate::from_str(text)
        .or_else(|_| NaiveDate::parse_from_str(text, "%d/%m/%Y"))
        .or_else(|err| {
            DateTime::parse_from_rfc3339(text)
                .map(|ts| ts.date_naive())
                .map_err(|_| err)
        })
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_calendar_date(text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[allow(clippy::ref_option)]
fn serialize_date<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
    match date {
        Some(d) => s.serialize_str(&d.format("%Y-%m-%d").to_string()),
        None => s.serialize_none(),
    }
}
