//! The record store contract and its implementations.
//!
//! The store owns every [`ProcessRecord`]; everything else holds transient
//! copies. Three backends are provided:
//!
//! - [`memory::MemoryStore`] for tests and embedding
//! - [`sqlite::SqliteStore`] for a local single-user database
//! - [`http::HttpStore`] for the shared record service

pub mod http;
pub mod memory;
pub mod sqlite;
pub mod wire;

use crate::aggregate::AggregationWindow;
use crate::error::StoreError;
use crate::model::ProcessRecord;
use crate::query::{ListFilter, PageRequest};
use std::sync::Arc;

pub use wire::{CollaboratorUpdateRequest, StatusUpdateRequest};

/// One page of records plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePage {
    pub items: Vec<ProcessRecord>,
    pub total: u64,
}

/// Request/response access to the records.
///
/// Every call blocks until the store answers. Implementations must keep a
/// stable order across pages of the same filter.
pub trait RecordStore: Send + Sync {
    /// Records matching `filter`, sliced to `page`.
    ///
    /// # Errors
    ///
    /// Any failure to reach or read the store.
    fn fetch_page(&self, filter: &ListFilter, page: PageRequest) -> Result<StorePage, StoreError>;

    /// Every record inside a productivity window.
    ///
    /// Which date counts is defined by the store.
    ///
    /// # Errors
    ///
    /// Any failure to reach or read the store.
    fn fetch_window(&self, window: &AggregationWindow) -> Result<Vec<ProcessRecord>, StoreError>;

    /// A single record by NUP.
    ///
    /// # Errors
    ///
    /// Any failure to reach or read the store.
    fn get(&self, nup: &str) -> Result<Option<ProcessRecord>, StoreError>;

    /// Persist a status change.
    ///
    /// # Errors
    ///
    /// Unreachable store, unknown record, or a refused change.
    fn update_status(&self, nup: &str, request: &StatusUpdateRequest) -> Result<(), StoreError>;

    /// Persist a collaborator change.
    ///
    /// # Errors
    ///
    /// Unreachable store or unknown record.
    fn update_collaborator(
        &self,
        nup: &str,
        request: &CollaboratorUpdateRequest,
    ) -> Result<(), StoreError>;
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn fetch_page(&self, filter: &ListFilter, page: PageRequest) -> Result<StorePage, StoreError> {
        (**self).fetch_page(filter, page)
    }

    fn fetch_window(&self, window: &AggregationWindow) -> Result<Vec<ProcessRecord>, StoreError> {
        (**self).fetch_window(window)
    }

    fn get(&self, nup: &str) -> Result<Option<ProcessRecord>, StoreError> {
        (**self).get(nup)
    }

    fn update_status(&self, nup: &str, request: &StatusUpdateRequest) -> Result<(), StoreError> {
        (**self).update_status(nup, request)
    }

    fn update_collaborator(
        &self,
        nup: &str,
        request: &CollaboratorUpdateRequest,
    ) -> Result<(), StoreError> {
        (**self).update_collaborator(nup, request)
    }
}
