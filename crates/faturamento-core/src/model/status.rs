use super::{ParseEnumError, slugify};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

/// The ten workflow states a billing case can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Status {
    #[default]
    PendenteAuditoria,
    ParaAnalise,
    EmAnalise,
    AssinadoAnalista,
    AssinadoGestor,
    /// Terminal: once here a case can only be re-stamped with the same status.
    AssinadoETramitado,
    AuditoriaOdonto,
    PendentePrestador,
    PendenteCliente,
    Arquivado,
}

impl Status {
    /// Every status, in the order the review screen lists them.
    pub const ALL: [Self; 10] = [
        Self::PendenteAuditoria,
        Self::ParaAnalise,
        Self::EmAnalise,
        Self::AssinadoAnalista,
        Self::AssinadoGestor,
        Self::AssinadoETramitado,
        Self::AuditoriaOdonto,
        Self::PendentePrestador,
        Self::PendenteCliente,
        Self::Arquivado,
    ];

    pub const TERMINAL: Self = Self::AssinadoETramitado;

    /// Canonical spelling used on the wire and in the audit trail.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendenteAuditoria => "pendente auditoria",
            Self::ParaAnalise => "para análise",
            Self::EmAnalise => "em análise",
            Self::AssinadoAnalista => "Assinado analista",
            Self::AssinadoGestor => "assinado gestor",
            Self::AssinadoETramitado => "assinado e tramitado",
            Self::AuditoriaOdonto => "auditoria odonto",
            Self::PendentePrestador => "pendente prestador",
            Self::PendenteCliente => "pendente cliente",
            Self::Arquivado => "arquivado",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::AssinadoETramitado)
    }

    /// Accent-free kebab-case form, handy on the command line.
    #[must_use]
    pub fn slug(self) -> String {
        slugify(self.as_str())
    }

    /// Validate whether a transition from self to `target` is allowed.
    ///
    /// Every move is allowed, cycles included, except leaving the terminal
    /// status. Re-stamping the terminal status is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when `self` is terminal and `target` is not.
    pub const fn can_transition_to(self, target: Self) -> Result<(), InvalidTransition> {
        if self.is_terminal() && !target.is_terminal() {
            return Err(InvalidTransition {
                from: self,
                to: target,
                reason: "finalized records cannot change status",
            });
        }
        Ok(())
    }
}

/// Error returned when a state transition is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: Status,
    pub to: Status,
    pub reason: &'static str,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Status> for &'static str {
    fn from(status: Status) -> Self {
        status.as_str()
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = slugify(s);
        Self::ALL
            .into_iter()
            .find(|status| status.slug() == wanted)
            .ok_or_else(|| ParseEnumError {
                expected: "status",
                got: s.to_string(),
            })
    }
}

impl TryFrom<String> for Status {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Read a status that may be absent, `null` or empty as the entry state.
///
/// # Errors
///
/// Fails on a non-empty string that names no status.
pub fn status_or_default<'de, D>(deserializer: D) -> Result<Status, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(Status::default()),
        Some(text) => text.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_strings_round_trip() {
        for status in Status::ALL {
            assert_eq!(status.as_str().parse::<Status>(), Ok(status));
        }
    }

    #[test]
    fn parsing_ignores_case_accents_and_dashes() {
        assert_eq!("EM ANÁLISE".parse::<Status>(), Ok(Status::EmAnalise));
        assert_eq!("em-analise".parse::<Status>(), Ok(Status::EmAnalise));
        assert_eq!("assinado analista".parse::<Status>(), Ok(Status::AssinadoAnalista));
        assert_eq!(
            "assinado-e-tramitado".parse::<Status>(),
            Ok(Status::AssinadoETramitado)
        );
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "NOVO".parse::<Status>().unwrap_err();
        assert_eq!(err.expected, "status");
        assert_eq!(err.got, "NOVO");
    }

    #[test]
    fn only_one_terminal_status() {
        let terminal: Vec<_> = Status::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![Status::AssinadoETramitado]);
    }

    #[test]
    fn terminal_only_transitions_to_itself() {
        for target in Status::ALL {
            let result = Status::TERMINAL.can_transition_to(target);
            assert_eq!(result.is_ok(), target.is_terminal(), "target {target}");
        }
    }

    #[test]
    fn non_terminal_may_move_anywhere() {
        for from in Status::ALL.into_iter().filter(|s| !s.is_terminal()) {
            for to in Status::ALL {
                assert!(from.can_transition_to(to).is_ok(), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn serde_uses_canonical_spelling() {
        let json = serde_json::to_string(&Status::AssinadoAnalista).unwrap();
        assert_eq!(json, "\"Assinado analista\"");
        let back: Status = serde_json::from_str("\"para análise\"").unwrap();
        assert_eq!(back, Status::ParaAnalise);
    }
}
