//! Webhook idempotency.
//!
//! Call platforms retry webhook delivery, so a call ID that was already
//! processed inside the TTL window is acknowledged without re-running the
//! pipeline. Entries expire via a background sweep; the store is advisory
//! and not persisted.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

pub struct DedupeStore {
    seen: RwLock<HashMap<String, Instant>>,
    ttl: Duration,
}

impl DedupeStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            seen: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Record a call ID. Returns `false` when the ID was already recorded
    /// inside the TTL window (a duplicate delivery).
    pub fn check_and_record(&self, call_id: &str) -> bool {
        let mut seen = self.seen.write();
        let now = Instant::now();
        match seen.get(call_id) {
            Some(at) if now.duration_since(*at) < self.ttl => false,
            _ => {
                seen.insert(call_id.to_owned(), now);
                true
            }
        }
    }

    /// Remove a call ID so a resubmission of the same payload reprocesses.
    /// Called when the pipeline fails after the ID was recorded; a call
    /// that never fully persisted must stay resubmittable.
    pub fn forget(&self, call_id: &str) {
        self.seen.write().remove(call_id);
    }

    /// Drop expired entries. Called from a background loop.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.seen
            .write()
            .retain(|_, at| now.duration_since(*at) < self.ttl);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.seen.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_inside_ttl_rejected() {
        let store = DedupeStore::new(60);
        assert!(store.check_and_record("c1"));
        assert!(!store.check_and_record("c1"));
        assert!(store.check_and_record("c2"));
    }

    #[test]
    fn zero_ttl_never_deduplicates() {
        let store = DedupeStore::new(0);
        assert!(store.check_and_record("c1"));
        assert!(store.check_and_record("c1"));
    }

    #[test]
    fn forgotten_id_records_again() {
        let store = DedupeStore::new(60);
        assert!(store.check_and_record("c1"));
        store.forget("c1");
        assert!(store.check_and_record("c1"));
    }

    #[test]
    fn sweep_drops_expired_entries() {
        let store = DedupeStore::new(0);
        store.check_and_record("c1");
        store.sweep();
        assert_eq!(store.len(), 0);
    }
}
