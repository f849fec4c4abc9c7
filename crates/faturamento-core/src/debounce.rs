//! Debounced task scheduling driven by explicit ticks.
//!
//! The debouncer never reads the clock itself: callers pass `now` to
//! [`Debouncer::schedule`] and [`Debouncer::take_due`], so a UI loop and a
//! test both drive it the same way.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Default quiet period for search text.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// At most one pending task per key; a newer task replaces the older one
/// and restarts its quiet period.
#[derive(Debug)]
pub struct Debouncer<K, T> {
    window: Duration,
    pending: HashMap<K, (T, Instant)>,
}

impl<K: Eq + Hash + Clone, T> Debouncer<K, T> {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `task` to fire `window` after `now`. Returns the task it
    /// replaced, if any.
    pub fn schedule(&mut self, key: K, task: T, now: Instant) -> Option<T> {
        self.pending
            .insert(key, (task, now + self.window))
            .map(|(replaced, _)| replaced)
    }

    pub fn cancel(&mut self, key: &K) -> Option<T> {
        self.pending.remove(key).map(|(task, _)| task)
    }

    /// Remove and return every task whose quiet period has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, T)> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        due.into_iter()
            .filter_map(|key| self.pending.remove(&key).map(|(task, _)| (key, task)))
            .collect()
    }

    #[must_use]
    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Earliest deadline among pending tasks, for sizing a poll timeout.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(_, deadline)| *deadline).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn burst_fires_once_with_latest_task() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(500 * MS);

        assert_eq!(debouncer.schedule("search", "A", t0), None);
        assert_eq!(debouncer.schedule("search", "AB", t0 + 100 * MS), Some("A"));
        assert_eq!(debouncer.schedule("search", "ABC", t0 + 200 * MS), Some("AB"));

        assert!(debouncer.take_due(t0 + 650 * MS).is_empty());
        assert_eq!(debouncer.take_due(t0 + 700 * MS), vec![("search", "ABC")]);
        assert!(debouncer.take_due(t0 + 5_000 * MS).is_empty());
    }

    #[test]
    fn keys_are_independent() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(100 * MS);
        debouncer.schedule(1, 'a', t0);
        debouncer.schedule(2, 'b', t0 + 50 * MS);

        assert_eq!(debouncer.next_deadline(), Some(t0 + 100 * MS));
        assert_eq!(debouncer.take_due(t0 + 100 * MS), vec![(1, 'a')]);
        assert!(debouncer.is_pending(&2));
        assert_eq!(debouncer.take_due(t0 + 150 * MS), vec![(2, 'b')]);
    }

    #[test]
    fn cancel_drops_pending_task() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(100 * MS);
        debouncer.schedule("k", 7, t0);
        assert_eq!(debouncer.cancel(&"k"), Some(7));
        assert!(debouncer.take_due(t0 + 200 * MS).is_empty());
        assert_eq!(debouncer.next_deadline(), None);
    }
}
