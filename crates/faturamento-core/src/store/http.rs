//! Blocking client for the shared record service.

use super::wire::{ListResponse, SummaryResponse};
use super::{CollaboratorUpdateRequest, RecordStore, StatusUpdateRequest, StorePage};
use crate::aggregate::AggregationWindow;
use crate::error::StoreError;
use crate::model::ProcessRecord;
use crate::query::{ListFilter, PageRequest};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = concat!("faturamento/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpStore {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpStore {
    #[must_use]
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn record_url(&self, nup: &str) -> String {
        format!("{}/processos/{}", self.base_url, urlencoding::encode(nup))
    }

    fn read_json<T: DeserializeOwned>(response: ureq::Response) -> Result<T, StoreError> {
        response
            .into_json::<T>()
            .map_err(|err| StoreError::Malformed(err.to_string()))
    }
}

/// Map a ureq failure onto the store taxonomy.
fn classify(url: &str, err: ureq::Error) -> StoreError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            warn!(url, status, "record service refused request");
            StoreError::Rejected { status, body }
        }
        ureq::Error::Transport(transport) => {
            warn!(url, error = %transport, "record service unreachable");
            StoreError::Unreachable(transport.to_string())
        }
    }
}

impl RecordStore for HttpStore {
    fn fetch_page(&self, filter: &ListFilter, page: PageRequest) -> Result<StorePage, StoreError> {
        let url = format!("{}/processos", self.base_url);
        let mut request = self
            .agent
            .get(&url)
            .query("page", &page.page.to_string())
            .query("limit", &page.page_size.to_string());
        if let Some(search) = filter.search.as_deref() {
            request = request.query("search", search);
        }
        if let Some(who) = filter.responsavel.as_deref() {
            request = request.query("responsavel", who);
        }
        if let Some(treatment) = filter.tratamento {
            request = request.query("tratamento", treatment.as_str());
        }
        if let Some(status) = filter.status {
            request = request.query("status", status.as_str());
        }

        let response = request.call().map_err(|err| classify(&url, err))?;
        let body: ListResponse = Self::read_json(response)?;
        let total = body
            .meta
            .total
            .unwrap_or_else(|| u64::try_from(body.data.len()).unwrap_or_default());
        debug!(page = page.page, total, "service page read");
        Ok(StorePage {
            items: body.data,
            total,
        })
    }

    fn fetch_window(&self, window: &AggregationWindow) -> Result<Vec<ProcessRecord>, StoreError> {
        let url = format!("{}/dashboard/resumo", self.base_url);
        let response = self
            .agent
            .get(&url)
            .query("startDate", &window.start.format("%Y-%m-%d").to_string())
            .query("endDate", &window.end.format("%Y-%m-%d").to_string())
            .query("isFinalized", if window.finalized { "true" } else { "false" })
            .call()
            .map_err(|err| classify(&url, err))?;
        let summary: SummaryResponse = Self::read_json(response)?;
        Ok(summary
            .into_iter()
            .flat_map(|group| group.matching_records)
            .collect())
    }

    fn get(&self, nup: &str) -> Result<Option<ProcessRecord>, StoreError> {
        let url = self.record_url(nup);
        match self.agent.get(&url).call() {
            Ok(response) => Self::read_json(response).map(Some),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(err) => Err(classify(&url, err)),
        }
    }

    fn update_status(&self, nup: &str, request: &StatusUpdateRequest) -> Result<(), StoreError> {
        let url = self.record_url(nup);
        match self.agent.put(&url).send_json(request) {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(404, _)) => Err(StoreError::NotFound(nup.to_string())),
            Err(err) => Err(classify(&url, err)),
        }
    }

    fn update_collaborator(
        &self,
        nup: &str,
        request: &CollaboratorUpdateRequest,
    ) -> Result<(), StoreError> {
        let url = format!("{}/colaborador", self.record_url(nup));
        match self.agent.put(&url).send_json(request) {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(404, _)) => Err(StoreError::NotFound(nup.to_string())),
            Err(err) => Err(classify(&url, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let store = HttpStore::new("http://localhost:5000/api/", DEFAULT_TIMEOUT);
        assert_eq!(store.base_url(), "http://localhost:5000/api");
    }

    #[test]
    fn nup_is_percent_encoded_in_paths() {
        let store = HttpStore::new("http://svc", DEFAULT_TIMEOUT);
        assert_eq!(
            store.record_url("00001.000001/2024-11"),
            "http://svc/processos/00001.000001%2F2024-11"
        );
    }

    #[test]
    fn unreachable_host_is_a_connectivity_failure() {
        // Port 9 (discard) on localhost is closed in test environments.
        let store = HttpStore::new("http://127.0.0.1:9", Duration::from_millis(500));
        let err = store.get("1").unwrap_err();
        assert!(matches!(err, StoreError::Unreachable(_)));
    }
}
