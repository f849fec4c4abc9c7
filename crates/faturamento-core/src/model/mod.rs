//! Domain types shared by every component.

pub mod money;
pub mod principal;
pub mod record;
pub mod status;
pub mod treatment;

pub use money::{Money, ParseMoneyError};
pub use principal::Principal;
pub use record::{DateBasis, ProcessRecord, StatusTransition};
pub use status::{InvalidTransition, Status};
pub use treatment::Treatment;

use std::fmt;

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

/// Lowercase, accent-free, dash-separated form of a label.
///
/// `"Em Análise"` and `"em-analise"` both fold to `"em-analise"`.
#[must_use]
pub fn slugify(input: &str) -> String {
    input
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' | 'ü' => 'u',
            'ç' => 'c',
            ' ' | '_' => '-',
            other => other,
        })
        .collect()
}
