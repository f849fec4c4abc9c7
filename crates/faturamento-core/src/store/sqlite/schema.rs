//! SQLite schema for the local record store.
//!
//! - `records` holds the latest state of each case, keyed by NUP
//! - `status_history` holds the audit trail, one row per transition,
//!   ordered by `seq` within a record

/// Migration v1: records and their status history.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS records (
    nup TEXT PRIMARY KEY CHECK (length(trim(nup)) > 0),
    numero_processo TEXT NOT NULL DEFAULT '',
    credenciado TEXT NOT NULL DEFAULT '',
    tratamento TEXT,
    status TEXT NOT NULL,
    responsavel TEXT,
    valor_cents INTEGER NOT NULL DEFAULT 0,
    data_recebimento TEXT,
    ultima_atualizacao TEXT
);

CREATE TABLE IF NOT EXISTS status_history (
    nup TEXT NOT NULL REFERENCES records(nup) ON DELETE CASCADE,
    seq INTEGER NOT NULL,
    de TEXT NOT NULL,
    para TEXT NOT NULL,
    usuario TEXT NOT NULL DEFAULT '',
    responsavel TEXT NOT NULL DEFAULT '',
    data TEXT NOT NULL,
    PRIMARY KEY (nup, seq)
);
";

/// Migration v2: indexes for the listing filters and the dashboard window.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_records_status ON records(status);
CREATE INDEX IF NOT EXISTS idx_records_responsavel ON records(responsavel);
CREATE INDEX IF NOT EXISTS idx_records_tratamento ON records(tratamento);
";

/// Indexes every migrated database must carry.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_records_status",
    "idx_records_responsavel",
    "idx_records_tratamento",
];
