//! Per-key write debouncing.
//!
//! Time is injected by the caller rather than read from the system clock, so
//! the scheduling logic is deterministic under test. The store marks a key
//! on every save and periodically drains whatever has gone quiet.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Tracks, per key, the deadline after which a pending write is due. Marking
/// an already-pending key pushes its deadline out again, so a burst of saves
/// collapses into one sync.
#[derive(Debug)]
pub struct Debouncer<K> {
    quiet: Duration,
    deadlines: HashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadlines: HashMap::new(),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Records a write to `key` at time `now`, re-arming its deadline.
    pub fn mark(&mut self, key: K, now: Instant) {
        self.deadlines.insert(key, now + self.quiet);
    }

    /// Drains and returns every key whose deadline has passed by `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let due: Vec<K> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &due {
            self.deadlines.remove(key);
        }
        due
    }

    /// Drops any pending mark for `key`. Returns whether one existed.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.deadlines.remove(key).is_some()
    }

    /// Number of keys still waiting out their quiet period.
    pub fn pending(&self) -> usize {
        self.deadlines.len()
    }

    /// Drops all pending marks without returning them.
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_secs(2);

    #[test]
    fn key_becomes_due_after_quiet_period() {
        let mut debouncer = Debouncer::new(QUIET);
        let start = Instant::now();

        debouncer.mark("a", start);
        assert!(debouncer.take_due(start + Duration::from_secs(1)).is_empty());

        let due = debouncer.take_due(start + QUIET);
        assert_eq!(due, vec!["a"]);
        assert_eq!(debouncer.pending(), 0);
    }

    #[test]
    fn rapid_marks_collapse_into_one() {
        let mut debouncer = Debouncer::new(QUIET);
        let start = Instant::now();

        for i in 0..5 {
            debouncer.mark("a", start + Duration::from_millis(i * 300));
        }
        // The last mark re-armed the deadline past the first ones.
        assert!(debouncer.take_due(start + QUIET).is_empty());
        assert_eq!(
            debouncer.take_due(start + Duration::from_millis(1200) + QUIET),
            vec!["a"]
        );
    }

    #[test]
    fn keys_are_independent() {
        let mut debouncer = Debouncer::new(QUIET);
        let start = Instant::now();

        debouncer.mark("a", start);
        debouncer.mark("b", start + Duration::from_secs(1));

        assert_eq!(debouncer.take_due(start + QUIET), vec!["a"]);
        assert_eq!(debouncer.pending(), 1);
    }

    #[test]
    fn cancel_drops_one_key() {
        let mut debouncer = Debouncer::new(QUIET);
        let start = Instant::now();
        debouncer.mark("a", start);
        debouncer.mark("b", start);

        assert!(debouncer.cancel(&"a"));
        assert!(!debouncer.cancel(&"a"));
        assert_eq!(debouncer.take_due(start + QUIET), vec!["b"]);
    }

    #[test]
    fn clear_drops_pending_marks() {
        let mut debouncer = Debouncer::new(QUIET);
        debouncer.mark("a", Instant::now());
        debouncer.clear();
        assert_eq!(debouncer.pending(), 0);
    }
}
