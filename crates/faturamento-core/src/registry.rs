//! Known collaborators and record assignment.

use crate::aggregate::UNASSIGNED_BUCKET;
use crate::model::{Principal, ProcessRecord};
use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

/// Collaborators the billing team starts every session with.
pub const DEFAULT_ROSTER: [&str; 12] = [
    "ANA",
    "Andre Falcao",
    "Andressa",
    "Deise",
    "Eduarda",
    "Giselly",
    "Luziane",
    "Marcia",
    "Naila",
    "Tamera",
    "Paulo",
    "Karen",
];

/// The set of collaborator names offered for assignment.
///
/// Names are only ever added, compared case-sensitively, and kept in
/// lexicographic order. The set is shared across edit sessions, so the
/// check-then-insert happens under one lock.
#[derive(Debug)]
pub struct AssignmentRegistry {
    names: Mutex<BTreeSet<String>>,
}

impl Default for AssignmentRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ROSTER)
    }
}

impl AssignmentRegistry {
    pub fn new<I, S>(roster: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = roster
            .into_iter()
            .map(Into::into)
            .filter(|name: &String| is_offerable(name))
            .collect();
        Self {
            names: Mutex::new(names),
        }
    }

    /// Add `name` if it is non-blank, unseen and not the unassigned bucket's
    /// label. Returns whether it was new.
    pub fn register(&self, name: &str) -> bool {
        if !is_offerable(name) {
            return false;
        }
        let inserted = self
            .names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string());
        if inserted {
            info!(collaborator = name, "new collaborator registered");
        }
        inserted
    }

    /// Register every assignee seen in `records`.
    pub fn observe<'a>(&self, records: impl IntoIterator<Item = &'a ProcessRecord>) {
        let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);
        for name in records.into_iter().filter_map(ProcessRecord::assignee) {
            if is_offerable(name) && !names.contains(name) {
                names.insert(name.to_string());
            }
        }
    }

    /// Point `record` at `collaborator`. An empty name clears the assignment.
    ///
    /// Status and history are untouched; reassignment is allowed in any status.
    #[must_use]
    pub fn assign(
        &self,
        record: &ProcessRecord,
        collaborator: &str,
        actor: &Principal,
    ) -> ProcessRecord {
        self.register(collaborator);
        let mut updated = record.clone();
        updated.responsavel = if collaborator.trim().is_empty() {
            None
        } else {
            Some(collaborator.to_string())
        };
        debug!(nup = %record.nup, collaborator, by = %actor.email, "record assigned");
        updated
    }

    /// Snapshot of the known names, sorted.
    #[must_use]
    pub fn known_names(&self) -> Vec<String> {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }
}

fn is_offerable(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && name != UNASSIGNED_BUCKET
}
