//! Per-class request numbering for discarding stale responses.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryClass {
    Listing,
    Dashboard,
}

/// Issued when a query starts; only the newest ticket of a class may apply
/// its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTicket {
    pub class: QueryClass,
    pub seq: u64,
}

#[derive(Debug, Default)]
pub struct QuerySequencer {
    latest: HashMap<QueryClass, u64>,
}

impl QuerySequencer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a query of `class`, superseding every earlier ticket of it.
    pub fn issue(&mut self, class: QueryClass) -> QueryTicket {
        let seq = self.latest.entry(class).or_insert(0);
        *seq += 1;
        QueryTicket { class, seq: *seq }
    }

    #[must_use]
    pub fn is_current(&self, ticket: QueryTicket) -> bool {
        self.latest.get(&ticket.class) == Some(&ticket.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_ticket_supersedes_older() {
        let mut seq = QuerySequencer::new();
        let first = seq.issue(QueryClass::Listing);
        let second = seq.issue(QueryClass::Listing);
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
        assert!(second.seq > first.seq);
    }

    #[test]
    fn classes_do_not_interfere() {
        let mut seq = QuerySequencer::new();
        let listing = seq.issue(QueryClass::Listing);
        let dashboard = seq.issue(QueryClass::Dashboard);
        assert!(seq.is_current(listing));
        assert!(seq.is_current(dashboard));
    }
}
