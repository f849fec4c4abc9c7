use super::{ParseEnumError, slugify};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

/// Treatment/procedure category of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Treatment {
    Anestesiologia,
    AtendimentoMedicoRedeCredenciada,
    EmergenciaUrgencia,
    Hemodinamica,
    InternacaoDomiciliarJudicial,
    Internamento,
    LeitoDia,
    Odonto,
}

impl Treatment {
    pub const ALL: [Self; 8] = [
        Self::Anestesiologia,
        Self::AtendimentoMedicoRedeCredenciada,
        Self::EmergenciaUrgencia,
        Self::Hemodinamica,
        Self::InternacaoDomiciliarJudicial,
        Self::Internamento,
        Self::LeitoDia,
        Self::Odonto,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anestesiologia => "ANESTESIOLOGIA",
            Self::AtendimentoMedicoRedeCredenciada => "ATENDIMENTO MEDICO NA REDE CREDENCIADA",
            Self::EmergenciaUrgencia => "EMERGENCIA/URGENCIA",
            Self::Hemodinamica => "HEMODINAMICA",
            Self::InternacaoDomiciliarJudicial => "INTERNAÇÃO DOMICILIAR - JUDICIAL",
            Self::Internamento => "INTERNAMENTO",
            Self::LeitoDia => "LEITO DIA",
            Self::Odonto => "ODONTO",
        }
    }
}

impl fmt::Display for Treatment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Treatment> for &'static str {
    fn from(treatment: Treatment) -> Self {
        treatment.as_str()
    }
}

impl FromStr for Treatment {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = slugify(s);
        Self::ALL
            .into_iter()
            .find(|t| slugify(t.as_str()) == wanted)
            .ok_or_else(|| ParseEnumError {
                expected: "treatment",
                got: s.to_string(),
            })
    }
}

impl TryFrom<String> for Treatment {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Read an optional treatment where `null` and `""` both mean "not informed".
///
/// # Errors
///
/// Fails on a non-empty string outside the treatment list.
pub fn optional_treatment<'de, D>(deserializer: D) -> Result<Option<Treatment>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
