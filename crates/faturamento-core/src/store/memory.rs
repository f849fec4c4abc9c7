//! In-process store keyed by NUP.
//!
//! Applies the same rules as the service: a status update must name the
//! status it expects to replace, and finalized records only accept the
//! terminal status again.

use super::{CollaboratorUpdateRequest, RecordStore, StatusUpdateRequest, StorePage};
use crate::aggregate::AggregationWindow;
use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::model::{DateBasis, ProcessRecord, StatusTransition};
use crate::query::{ListFilter, PageRequest};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct MemoryStore {
    records: Mutex<BTreeMap<String, ProcessRecord>>,
    clock: Arc<dyn Clock>,
    basis: DateBasis,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("records", &self.lock().len())
            .field("basis", &self.basis)
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            clock,
            basis: DateBasis::default(),
        }
    }

    #[must_use]
    pub const fn with_date_basis(mut self, basis: DateBasis) -> Self {
        self.basis = basis;
        self
    }

    /// Seed with `records`, replacing any with the same NUP.
    #[must_use]
    pub fn with_records(self, records: impl IntoIterator<Item = ProcessRecord>) -> Self {
        for record in records {
            self.upsert(record);
        }
        self
    }

    /// Insert or replace a record as-is.
    pub fn upsert(&self, record: ProcessRecord) {
        self.lock().insert(record.nup.clone(), record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, ProcessRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStore for MemoryStore {
    fn fetch_page(&self, filter: &ListFilter, page: PageRequest) -> Result<StorePage, StoreError> {
        let records = self.lock();
        let matching: Vec<&ProcessRecord> =
            records.values().filter(|r| filter.matches(r)).collect();
        let total = u64::try_from(matching.len()).unwrap_or(u64::MAX);
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let size = usize::try_from(page.page_size).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(size)
            .cloned()
            .collect();
        Ok(StorePage { items, total })
    }

    fn fetch_window(&self, window: &AggregationWindow) -> Result<Vec<ProcessRecord>, StoreError> {
        Ok(self
            .lock()
            .values()
            .filter(|r| window.selects(r, self.basis))
            .cloned()
            .collect())
    }

    fn get(&self, nup: &str) -> Result<Option<ProcessRecord>, StoreError> {
        Ok(self.lock().get(nup).cloned())
    }

    fn update_status(&self, nup: &str, request: &StatusUpdateRequest) -> Result<(), StoreError> {
        let mut records = self.lock();
        let record = records
            .get_mut(nup)
            .ok_or_else(|| StoreError::NotFound(nup.to_string()))?;

        if record.status != request.status_anterior {
            return Err(StoreError::Conflict {
                nup: nup.to_string(),
                expected: request.status_anterior,
                found: record.status,
            });
        }
        if record.status.can_transition_to(request.novo_status).is_err() {
            return Err(StoreError::Finalized {
                nup: nup.to_string(),
            });
        }

        let now = self.clock.now();
        record.historico_status.push(StatusTransition {
            from: record.status,
            to: request.novo_status,
            actor_email: request.usuario_email.clone(),
            actor_name: request.usuario_nome.clone(),
            at: now,
        });
        record.status = request.novo_status;
        record.ultima_atualizacao = Some(now);
        Ok(())
    }

    fn update_collaborator(
        &self,
        nup: &str,
        request: &CollaboratorUpdateRequest,
    ) -> Result<(), StoreError> {
        let mut records = self.lock();
        let record = records
            .get_mut(nup)
            .ok_or_else(|| StoreError::NotFound(nup.to_string()))?;
        let name = request.novo_colaborador.trim();
        record.responsavel = (!name.is_empty()).then(|| request.novo_colaborador.clone());
        Ok(())
    }
}
