//! Filtered, paginated listing over a [`RecordStore`].

use crate::error::CoreError;
use crate::model::{ProcessRecord, Status, Treatment};
use crate::store::RecordStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Page size used when nothing is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Filter criteria for record listings.
///
/// All fields are optional. When multiple fields are set, they are combined
/// with AND semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    /// Case-insensitive substring of the case number.
    pub search: Option<String>,
    /// Assigned collaborator (exact match).
    pub responsavel: Option<String>,
    /// Treatment category (exact match).
    pub tratamento: Option<Treatment>,
    /// Workflow status (exact match).
    pub status: Option<Status>,
}

impl ListFilter {
    /// Drop blank text criteria so they do not filter anything.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let keep = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        self.search = keep(self.search).map(|s| s.trim().to_string());
        self.responsavel = keep(self.responsavel);
        self
    }

    /// Whether `record` passes every set criterion.
    #[must_use]
    pub fn matches(&self, record: &ProcessRecord) -> bool {
        let search = self.search.as_deref().map(str::trim).unwrap_or_default();
        if !search.is_empty()
            && !record
                .numero_processo
                .to_lowercase()
                .contains(&search.to_lowercase())
        {
            return false;
        }

        let who = self.responsavel.as_deref().unwrap_or_default();
        if !who.is_empty() && record.responsavel.as_deref() != Some(who) {
            return false;
        }

        self.tratamento.is_none_or(|t| record.tratamento == Some(t))
            && self.status.is_none_or(|s| record.status == s)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clone().normalized() == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// A 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Page numbers below 1 are read as 1.
    #[must_use]
    pub const fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: if page == 0 { 1 } else { page },
            page_size,
        }
    }

    /// Index of the first row of this page.
    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// `max(1, ceil(total / page_size))`
#[must_use]
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 1;
    }
    let pages = total.div_ceil(u64::from(page_size)).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// A listing page as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub total_pages: u32,
    pub page: u32,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            total_pages: 1,
            page: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct ListQueryEngine {
    page_size: u32,
}

impl Default for ListQueryEngine {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListQueryEngine {
    /// # Errors
    ///
    /// [`CoreError::InvalidConfiguration`] for a zero page size.
    pub fn new(page_size: u32) -> Result<Self, CoreError> {
        if page_size == 0 {
            return Err(CoreError::InvalidConfiguration(
                "listing.page_size must be at least 1".into(),
            ));
        }
        Ok(Self { page_size })
    }

    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Fetch one page. Pages past the end come back empty, not clamped.
    ///
    /// # Errors
    ///
    /// [`CoreError::Connectivity`] when the store fails.
    pub fn query(
        &self,
        store: &dyn RecordStore,
        filter: &ListFilter,
        page: u32,
    ) -> Result<Page<ProcessRecord>, CoreError> {
        let filter = filter.clone().normalized();
        let request = PageRequest::new(page, self.page_size);
        let result = store.fetch_page(&filter, request)?;
        debug!(
            page = request.page,
            total = result.total,
            returned = result.items.len(),
            "listing page fetched"
        );
        Ok(Page {
            items: result.items,
            total_count: result.total,
            total_pages: total_pages(result.total, self.page_size),
            page: request.page,
        })
    }
}
