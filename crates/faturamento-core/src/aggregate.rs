//! Per-collaborator productivity over a date window.
//!
//! The store selects the records (window + finalized partition); this module
//! groups them. Every selected record lands in exactly one group, so the sum
//! of `count` over the result always equals the number of selected records.

use crate::error::CoreError;
use crate::model::{DateBasis, Money, ProcessRecord};
use crate::store::RecordStore;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Display name of the group for records with no assigned collaborator.
/// Reserved: the registry never offers it as a collaborator.
pub const UNASSIGNED_BUCKET: &str = "(sem responsável)";

/// Inclusive date range plus the finalized/open partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// `true` selects only finalized records, `false` everything else.
    pub finalized: bool,
}

impl AggregationWindow {
    /// # Errors
    ///
    /// [`CoreError::InvalidWindow`] when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate, finalized: bool) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidWindow { start, end });
        }
        Ok(Self {
            start,
            end,
            finalized,
        })
    }

    /// First day of `today`'s month through `today`, finalized records only.
    #[must_use]
    pub fn month_to_date(today: NaiveDate) -> Self {
        Self {
            start: today.with_day(1).unwrap_or(today),
            end: today,
            finalized: true,
        }
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether the store should hand `record` to the aggregation.
    #[must_use]
    pub fn selects(&self, record: &ProcessRecord, basis: DateBasis) -> bool {
        record.is_finalized() == self.finalized
            && record
                .relevant_date(basis)
                .is_some_and(|date| self.contains(date))
    }
}

/// Productivity of one collaborator inside a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorAggregate {
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(rename = "qtd")]
    pub count: usize,
    #[serde(rename = "total")]
    pub total_value: Money,
    /// Every record in the group, enough to render a drill-down.
    #[serde(rename = "processos", default)]
    pub matching_records: Vec<ProcessRecord>,
    /// Set only on the bucket of unassigned records. Store data may still
    /// carry a literal assignee equal to [`UNASSIGNED_BUCKET`], so the name
    /// alone does not identify the bucket.
    #[serde(default)]
    pub unassigned: bool,
}

impl CollaboratorAggregate {
    #[must_use]
    pub const fn is_unassigned(&self) -> bool {
        self.unassigned
    }
}

/// Named collaborators sort before the unassigned bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Bucket {
    Named(String),
    Unassigned,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationEngine;

impl AggregationEngine {
    /// Fetch the window from `store` and group it.
    ///
    /// # Errors
    ///
    /// [`CoreError::Connectivity`] when the store fails.
    pub fn aggregate(
        &self,
        store: &dyn RecordStore,
        window: &AggregationWindow,
    ) -> Result<Vec<CollaboratorAggregate>, CoreError> {
        let records = store.fetch_window(window)?;
        debug!(
            start = %window.start,
            end = %window.end,
            finalized = window.finalized,
            records = records.len(),
            "aggregation window fetched"
        );
        Ok(Self::group(records))
    }

    /// Group records by assignee; sorted by name, unassigned last.
    ///
    /// Records inside a group are ordered by NUP so the output depends only
    /// on the input set.
    #[must_use]
    pub fn group(records: Vec<ProcessRecord>) -> Vec<CollaboratorAggregate> {
        let mut groups: BTreeMap<Bucket, Vec<ProcessRecord>> = BTreeMap::new();
        for record in records {
            let bucket = record
                .assignee()
                .map_or(Bucket::Unassigned, |name| Bucket::Named(name.to_string()));
            groups.entry(bucket).or_default().push(record);
        }

        groups
            .into_iter()
            .map(|(bucket, mut matching_records)| {
                matching_records.sort_by(|a, b| a.nup.cmp(&b.nup));
                let (name, unassigned) = match bucket {
                    Bucket::Named(name) => (name, false),
                    Bucket::Unassigned => (UNASSIGNED_BUCKET.to_string(), true),
                };
                CollaboratorAggregate {
                    name,
                    count: matching_records.len(),
                    total_value: matching_records.iter().map(|r| r.valor_capa).sum(),
                    matching_records,
                    unassigned,
                }
            })
            .collect()
    }
}
