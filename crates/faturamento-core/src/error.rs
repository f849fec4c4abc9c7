use crate::model::{ParseEnumError, Status};
use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

/// Machine-readable error codes for scripts and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissing,
    ConfigInvalid,
    AccessDenied,
    RecordNotFound,
    NoRecordOpen,
    TransitionDenied,
    InvalidEnumValue,
    InvalidWindow,
    MutationInFlight,
    StoreUnreachable,
    StoreConflict,
    CorruptStore,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigMissing => "E1001",
            Self::ConfigInvalid => "E1002",
            Self::AccessDenied => "E1101",
            Self::RecordNotFound => "E2001",
            Self::NoRecordOpen => "E2002",
            Self::TransitionDenied => "E2003",
            Self::InvalidEnumValue => "E2004",
            Self::InvalidWindow => "E2005",
            Self::MutationInFlight => "E2006",
            Self::StoreUnreachable => "E5001",
            Self::StoreConflict => "E5002",
            Self::CorruptStore => "E5003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigMissing => "Required configuration missing",
            Self::ConfigInvalid => "Configuration value invalid",
            Self::AccessDenied => "Access denied",
            Self::RecordNotFound => "Record not found",
            Self::NoRecordOpen => "No record open for editing",
            Self::TransitionDenied => "Status change not allowed",
            Self::InvalidEnumValue => "Invalid status/treatment value",
            Self::InvalidWindow => "Invalid date window",
            Self::MutationInFlight => "Mutation already in flight",
            Self::StoreUnreachable => "Record store unreachable",
            Self::StoreConflict => "Record changed in the store",
            Self::CorruptStore => "Local record store error",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to users.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigMissing => {
                Some("Set store.api_base_url in config.toml or export FAT_API_BASE_URL.")
            }
            Self::ConfigInvalid => Some("Fix the value in config.toml and retry."),
            Self::AccessDenied => Some("Sign in with a corporate e-mail address."),
            Self::RecordNotFound => Some("Check the NUP with `fat list`."),
            Self::NoRecordOpen => None,
            Self::TransitionDenied => {
                Some("Records 'assinado e tramitado' are final and cannot change status.")
            }
            Self::InvalidEnumValue => Some("Use one of the values listed by `fat list --help`."),
            Self::InvalidWindow => Some("The start date must not be after the end date."),
            Self::MutationInFlight => Some("Wait for the previous change to this record to finish."),
            Self::StoreUnreachable => {
                Some("Check that the API is up; the view was reloaded from the store.")
            }
            Self::StoreConflict => Some("Reload the record and apply the change again."),
            Self::CorruptStore => Some("Check the SQLite file path and permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failure of a round trip to a [`crate::store::RecordStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("store answered HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("record {nup} changed in the store: expected '{expected}', found '{found}'")]
    Conflict {
        nup: String,
        expected: Status,
        found: Status,
    },

    #[error("record {nup} is finalized in the store")]
    Finalized { nup: String },

    #[error("record {0} not found in store")]
    NotFound(String),

    #[error("malformed store payload: {0}")]
    Malformed(String),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unreachable(_) | Self::Rejected { .. } | Self::Malformed(_) => {
                ErrorCode::StoreUnreachable
            }
            Self::Conflict { .. } | Self::Finalized { .. } => ErrorCode::StoreConflict,
            Self::NotFound(_) => ErrorCode::RecordNotFound,
            Self::Sqlite(_) => ErrorCode::CorruptStore,
        }
    }
}

/// Every failure the core reports to its callers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A finalized record was asked to move to a different status.
    #[error("record {nup} is '{current}' and cannot move to '{target}'")]
    TransitionDenied {
        nup: String,
        current: Status,
        target: Status,
    },

    /// The store round trip failed; optimistic state has been rolled back.
    #[error("connectivity error: {0}")]
    Connectivity(#[from] StoreError),

    #[error("access denied for '{email}': {reason}")]
    AccessDenied { email: String, reason: &'static str },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("a mutation for record {nup} is already in flight")]
    MutationInFlight { nup: String },

    #[error("record {nup} not found")]
    RecordNotFound { nup: String },

    #[error("no record is open for editing")]
    NoRecordOpen,

    #[error(transparent)]
    InvalidEnum(#[from] ParseEnumError),

    #[error("invalid date window: {start} is after {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
}

impl CoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::TransitionDenied { .. } => ErrorCode::TransitionDenied,
            Self::Connectivity(inner) => inner.code(),
            Self::AccessDenied { .. } => ErrorCode::AccessDenied,
            Self::Configuration(_) => ErrorCode::ConfigMissing,
            Self::InvalidConfiguration(_) => ErrorCode::ConfigInvalid,
            Self::MutationInFlight { .. } => ErrorCode::MutationInFlight,
            Self::RecordNotFound { .. } => ErrorCode::RecordNotFound,
            Self::NoRecordOpen => ErrorCode::NoRecordOpen,
            Self::InvalidEnum(_) => ErrorCode::InvalidEnumValue,
            Self::InvalidWindow { .. } => ErrorCode::InvalidWindow,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// Whether the caller can recover by reloading its view.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Connectivity(_) | Self::MutationInFlight { .. })
    }
}
