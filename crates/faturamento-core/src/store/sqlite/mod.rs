//! Local single-user record store backed by SQLite.
//!
//! Connection defaults:
//! - `journal_mode = WAL` so a second `fat` process can read while one writes
//! - `busy_timeout = 5s` to ride out short lock contention
//! - `foreign_keys = ON` so history rows follow their record

pub mod migrations;
pub mod schema;

use super::{CollaboratorUpdateRequest, RecordStore, StatusUpdateRequest, StorePage};
use crate::aggregate::AggregationWindow;
use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::model::{DateBasis, Money, ProcessRecord, Status, StatusTransition, Treatment};
use crate::query::{ListFilter, PageRequest};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params, params_from_iter};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const RECORD_COLUMNS: &str = "nup, numero_processo, credenciado, tratamento, status, \
     responsavel, valor_cents, data_recebimento, ultima_atualizacao";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
    basis: DateBasis,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("basis", &self.basis)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) the database at `path`, configure it and migrate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory, connection, pragmas or migrations fail.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create record store directory {}", parent.display()))?;
        }
        let mut conn = Connection::open(path)
            .with_context(|| format!("open record store {}", path.display()))?;
        configure_connection(&conn).context("configure sqlite pragmas")?;
        let version = migrations::migrate(&mut conn).context("apply record store migrations")?;
        info!(path = %path.display(), version, "record store opened");
        Ok(Self::from_connection(conn))
    }

    /// A throwaway database, already migrated.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate or migrate the database.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().context("open in-memory record store")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::migrate(&mut conn).context("apply record store migrations")?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
            basis: DateBasis::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn with_date_basis(mut self, basis: DateBasis) -> Self {
        self.basis = basis;
        self
    }

    /// Insert or replace a record together with its full history.
    ///
    /// # Errors
    ///
    /// Returns the SQLite error; the transaction is rolled back.
    pub fn upsert(&self, record: &ProcessRecord) -> Result<(), StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        write_record(&tx, record)?;
        tx.commit()?;
        Ok(())
    }

    /// Upsert many records in one transaction. Returns how many were written.
    ///
    /// # Errors
    ///
    /// Returns the SQLite error; nothing is written.
    pub fn import(&self, records: &[ProcessRecord]) -> Result<usize, StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        for record in records {
            write_record(&tx, record)?;
        }
        tx.commit()?;
        info!(count = records.len(), "records imported");
        Ok(records.len())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

fn write_record(tx: &Transaction<'_>, record: &ProcessRecord) -> rusqlite::Result<()> {
    tx.execute("DELETE FROM status_history WHERE nup = ?1", [&record.nup])?;
    tx.execute("DELETE FROM records WHERE nup = ?1", [&record.nup])?;
    tx.execute(
        &format!("INSERT INTO records ({RECORD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            record.nup,
            record.numero_processo,
            record.credenciado,
            record.tratamento.map(Treatment::as_str),
            record.status.as_str(),
            record.responsavel,
            record.valor_capa.cents(),
            record.data_recebimento.map(|d| d.format("%Y-%m-%d").to_string()),
            record.ultima_atualizacao.map(|ts| ts.to_rfc3339()),
        ],
    )?;
    for (seq, entry) in record.historico_status.iter().enumerate() {
        insert_history(tx, &record.nup, i64::try_from(seq + 1).unwrap_or(i64::MAX), entry)?;
    }
    Ok(())
}

fn insert_history(
    conn: &Connection,
    nup: &str,
    seq: i64,
    entry: &StatusTransition,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO status_history (nup, seq, de, para, usuario, responsavel, data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            nup,
            seq,
            entry.from.as_str(),
            entry.to.as_str(),
            entry.actor_email,
            entry.actor_name,
            entry.at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn parse_text<T>(idx: usize, text: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.parse()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn parse_timestamp(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ProcessRecord> {
    let tratamento: Option<String> = row.get(3)?;
    let status: String = row.get(4)?;
    let data_recebimento: Option<String> = row.get(7)?;
    let ultima_atualizacao: Option<String> = row.get(8)?;
    Ok(ProcessRecord {
        nup: row.get(0)?,
        numero_processo: row.get(1)?,
        credenciado: row.get(2)?,
        tratamento: tratamento.map(|t| parse_text(3, &t)).transpose()?,
        status: parse_text(4, &status)?,
        responsavel: row.get(5)?,
        valor_capa: Money::from_cents(row.get(6)?),
        data_recebimento: data_recebimento
            .map(|d| parse_text::<NaiveDate>(7, &d))
            .transpose()?,
        ultima_atualizacao: ultima_atualizacao
            .map(|ts| parse_timestamp(8, &ts))
            .transpose()?,
        historico_status: Vec::new(),
    })
}

fn load_history(conn: &Connection, nup: &str) -> rusqlite::Result<Vec<StatusTransition>> {
    let mut stmt = conn.prepare_cached(
        "SELECT de, para, usuario, responsavel, data
         FROM status_history WHERE nup = ?1 ORDER BY seq",
    )?;
    let rows = stmt.query_map([nup], |row| {
        let from: String = row.get(0)?;
        let to: String = row.get(1)?;
        let at: String = row.get(4)?;
        Ok(StatusTransition {
            from: parse_text(0, &from)?,
            to: parse_text(1, &to)?,
            actor_email: row.get(2)?,
            actor_name: row.get(3)?,
            at: parse_timestamp(4, &at)?,
        })
    })?;
    rows.collect()
}

fn query_records(
    conn: &Connection,
    sql: &str,
    values: &[Box<dyn ToSql>],
) -> rusqlite::Result<Vec<ProcessRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let params_ref: Vec<&dyn ToSql> = values.iter().map(AsRef::as_ref).collect();
    let mut records = stmt
        .query_map(params_from_iter(params_ref), row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for record in &mut records {
        record.historico_status = load_history(conn, &record.nup)?;
    }
    Ok(records)
}

/// SQL for a record's relevant calendar day. Timestamps are stored as
/// UTC RFC 3339, so their first ten characters are the UTC date.
const fn window_date_expr(basis: DateBasis) -> &'static str {
    match basis {
        DateBasis::Updated => "COALESCE(substr(ultima_atualizacao, 1, 10), data_recebimento)",
        DateBasis::Received => "data_recebimento",
    }
}

/// `WHERE` clause and bound values for a listing filter.
fn filter_clause(filter: &ListFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        values.push(Box::new(search.to_lowercase()));
        conditions.push(format!(
            "instr(lower(numero_processo), ?{}) > 0",
            values.len()
        ));
    }
    if let Some(who) = filter.responsavel.as_deref().filter(|s| !s.is_empty()) {
        values.push(Box::new(who.to_string()));
        conditions.push(format!("responsavel = ?{}", values.len()));
    }
    if let Some(treatment) = filter.tratamento {
        values.push(Box::new(treatment.as_str()));
        conditions.push(format!("tratamento = ?{}", values.len()));
    }
    if let Some(status) = filter.status {
        values.push(Box::new(status.as_str()));
        conditions.push(format!("status = ?{}", values.len()));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    (clause, values)
}

impl RecordStore for SqliteStore {
    fn fetch_page(&self, filter: &ListFilter, page: PageRequest) -> Result<StorePage, StoreError> {
        let conn = self.lock();
        let (where_clause, values) = filter_clause(filter);

        let params_ref: Vec<&dyn ToSql> = values.iter().map(AsRef::as_ref).collect();
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM records{where_clause}"),
            params_from_iter(params_ref),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM records{where_clause} ORDER BY nup LIMIT {} OFFSET {}",
            page.page_size,
            page.offset()
        );
        let items = query_records(&conn, &sql, &values)?;
        debug!(total, returned = items.len(), "sqlite page read");
        Ok(StorePage {
            items,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    fn fetch_window(&self, window: &AggregationWindow) -> Result<Vec<ProcessRecord>, StoreError> {
        let conn = self.lock();
        let op = if window.finalized { "=" } else { "<>" };
        let date = window_date_expr(self.basis);
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM records \
             WHERE status {op} ?1 AND {date} BETWEEN ?2 AND ?3 ORDER BY nup"
        );
        let values: Vec<Box<dyn ToSql>> = vec![
            Box::new(Status::TERMINAL.as_str()),
            Box::new(window.start.format("%Y-%m-%d").to_string()),
            Box::new(window.end.format("%Y-%m-%d").to_string()),
        ];
        let records = query_records(&conn, &sql, &values)?;
        Ok(records
            .into_iter()
            .filter(|r| window.selects(r, self.basis))
            .collect())
    }

    fn get(&self, nup: &str) -> Result<Option<ProcessRecord>, StoreError> {
        let conn = self.lock();
        let record = conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM records WHERE nup = ?1"),
                [nup],
                row_to_record,
            )
            .optional()?;
        let Some(mut record) = record else {
            return Ok(None);
        };
        record.historico_status = load_history(&conn, nup)?;
        Ok(Some(record))
    }

    fn update_status(&self, nup: &str, request: &StatusUpdateRequest) -> Result<(), StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let current: Option<String> = tx
            .query_row("SELECT status FROM records WHERE nup = ?1", [nup], |row| {
                row.get(0)
            })
            .optional()?;
        let current: Status = match current {
            Some(text) => parse_text(0, &text)?,
            None => return Err(StoreError::NotFound(nup.to_string())),
        };

        if current != request.status_anterior {
            return Err(StoreError::Conflict {
                nup: nup.to_string(),
                expected: request.status_anterior,
                found: current,
            });
        }
        if current.can_transition_to(request.novo_status).is_err() {
            return Err(StoreError::Finalized {
                nup: nup.to_string(),
            });
        }

        let now = self.clock.now();
        let next_seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM status_history WHERE nup = ?1",
            [nup],
            |row| row.get(0),
        )?;
        insert_history(
            &tx,
            nup,
            next_seq,
            &StatusTransition {
                from: current,
                to: request.novo_status,
                actor_email: request.usuario_email.clone(),
                actor_name: request.usuario_nome.clone(),
                at: now,
            },
        )?;
        tx.execute(
            "UPDATE records SET status = ?2, ultima_atualizacao = ?3 WHERE nup = ?1",
            params![nup, request.novo_status.as_str(), now.to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn update_collaborator(
        &self,
        nup: &str,
        request: &CollaboratorUpdateRequest,
    ) -> Result<(), StoreError> {
        let conn = self.lock();
        let name = request.novo_colaborador.trim();
        let value = (!name.is_empty()).then_some(request.novo_colaborador.as_str());
        let changed = conn.execute(
            "UPDATE records SET responsavel = ?2 WHERE nup = ?1",
            params![nup, value],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(nup.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Principal;
    use chrono::TimeZone;

    fn sample(nup: &str, numero: &str) -> ProcessRecord {
        let mut r = ProcessRecord::new(nup);
        r.numero_processo = numero.to_string();
        r.credenciado = "Clínica Sol".into();
        r.tratamento = Some(Treatment::Internamento);
        r.valor_capa = Money::from_cents(12_345);
        r.data_recebimento = NaiveDate::from_ymd_opt(2024, 1, 10);
        r
    }

    #[test]
    fn open_sets_wal_and_foreign_keys() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = SqliteStore::open(&dir.path().join("nested/records.db")).expect("open store");
        let conn = store.lock();
        let mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("journal_mode");
        assert_eq!(mode.to_ascii_lowercase(), "wal");
        let fk: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("foreign_keys");
        assert_eq!(fk, 1);
    }

    #[test]
    fn record_survives_write_and_read() {
        let store = SqliteStore::open_in_memory().expect("open");
        let mut record = sample("1", "PROC-1");
        record.responsavel = Some("Deise".into());
        record.historico_status.push(StatusTransition {
            from: Status::PendenteAuditoria,
            to: Status::EmAnalise,
            actor_email: "a@maida.health".into(),
            actor_name: "A".into(),
            at: Utc.with_ymd_and_hms(2024, 1, 11, 9, 30, 0).unwrap(),
        });
        store.upsert(&record).expect("upsert");
        assert_eq!(store.get("1").expect("get"), Some(record));
        assert_eq!(store.get("2").expect("get"), None);
    }

    #[test]
    fn search_and_filters_run_in_sql() {
        let store = SqliteStore::open_in_memory().expect("open");
        let mut odonto = sample("2", "ODT-ABC-2");
        odonto.tratamento = Some(Treatment::Odonto);
        store
            .import(&[sample("1", "PROC-abc-1"), odonto, sample("3", "PROC-3")])
            .expect("import");

        let filter = ListFilter {
            search: Some("ABC".into()),
            ..ListFilter::default()
        };
        let page = store.fetch_page(&filter, PageRequest::new(1, 20)).expect("page");
        assert_eq!(page.total, 2);

        let filter = ListFilter {
            search: Some("abc".into()),
            tratamento: Some(Treatment::Odonto),
            ..ListFilter::default()
        };
        let page = store.fetch_page(&filter, PageRequest::new(1, 20)).expect("page");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].nup, "2");
    }

    #[test]
    fn status_update_checks_previous_status() {
        let at = Utc.with_ymd_and_hms(2024, 1, 20, 8, 0, 0).unwrap();
        let store = SqliteStore::open_in_memory()
            .expect("open")
            .with_clock(Arc::new(crate::clock::ManualClock::new(at)));
        store.upsert(&sample("1", "P")).expect("upsert");
        let actor = Principal::new("r@maida.health", "R");

        let stale = StatusUpdateRequest::new(Status::EmAnalise, Status::Arquivado, &actor);
        assert!(matches!(
            store.update_status("1", &stale),
            Err(StoreError::Conflict { .. })
        ));

        let ok = StatusUpdateRequest::new(Status::PendenteAuditoria, Status::EmAnalise, &actor);
        store.update_status("1", &ok).expect("update");
        let record = store.get("1").expect("get").expect("present");
        assert_eq!(record.status, Status::EmAnalise);
        assert_eq!(record.ultima_atualizacao, Some(at));
        assert_eq!(record.historico_status.len(), 1);
    }

    #[test]
    fn window_splits_finalized_from_open() {
        let store = SqliteStore::open_in_memory()
            .expect("open")
            .with_date_basis(DateBasis::Received);
        let mut done = sample("1", "P1");
        done.status = Status::AssinadoETramitado;
        store.import(&[done, sample("2", "P2")]).expect("import");

        let jan = AggregationWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            true,
        )
        .unwrap();
        let finalized = store.fetch_window(&jan).expect("window");
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].nup, "1");

        let open = AggregationWindow { finalized: false, ..jan };
        let open = store.fetch_window(&open).expect("window");
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].nup, "2");
    }

    #[test]
    fn window_dates_are_selected_in_sql_by_update_day() {
        let store = SqliteStore::open_in_memory().expect("open");
        let finalized = |nup: &str, updated: Option<(u32, u32)>, received: (u32, u32)| {
            let mut r = sample(nup, nup);
            r.status = Status::AssinadoETramitado;
            r.data_recebimento = NaiveDate::from_ymd_opt(2024, received.0, received.1);
            r.ultima_atualizacao =
                updated.map(|(m, d)| Utc.with_ymd_and_hms(2024, m, d, 23, 59, 0).unwrap());
            r
        };
        store
            .import(&[
                finalized("first-day", Some((1, 1)), (1, 1)),
                finalized("last-day", Some((1, 31)), (1, 2)),
                finalized("february", Some((2, 1)), (1, 20)),
                finalized("received-only", None, (1, 15)),
                finalized("old-received", Some((1, 5)), (12, 1)),
            ])
            .expect("import");

        let jan = AggregationWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            true,
        )
        .unwrap();
        let nups: Vec<String> = store
            .fetch_window(&jan)
            .expect("window")
            .into_iter()
            .map(|r| r.nup)
            .collect();
        assert_eq!(nups, vec!["first-day", "last-day", "old-received", "received-only"]);

        let conn = store.lock();
        let in_sql: i64 = conn
            .query_row(
                &format!(
                    "SELECT COUNT(*) FROM records WHERE {} BETWEEN '2024-01-01' AND '2024-01-31'",
                    window_date_expr(DateBasis::Updated)
                ),
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(in_sql, 4);
    }

    #[test]
    fn collaborator_update_on_missing_record_is_not_found() {
        let store = SqliteStore::open_in_memory().expect("open");
        let req = CollaboratorUpdateRequest {
            novo_colaborador: "Karen".into(),
            usuario_email: "a@maida.health".into(),
        };
        assert!(matches!(
            store.update_collaborator("x", &req),
            Err(StoreError::NotFound(_))
        ));
    }
}
