//! Deduplication service (C2): maps an idempotency key to the in-flight job
//! holding it.
//!
//! Grounded in the teacher's `InMemoryJobStore`'s single-writer-lock
//! convention (`store.rs`), simplified to the one table this service needs.

use std::collections::HashMap;

use forgework_core::JobId;
use parking_lot::Mutex;

/// At most one job per key may be non-terminal at a time.
#[derive(Debug, Default)]
pub struct DeduplicationService {
    in_flight: Mutex<HashMap<String, JobId>>,
}

impl DeduplicationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` as held by `job_id`. Fails without mutation if
    /// another job already holds it. A null/empty key is never stored and
    /// registration for one always succeeds without recording anything.
    pub fn register(&self, job_id: JobId, key: &str) -> bool {
        if key.is_empty() {
            return true;
        }
        let mut in_flight = self.in_flight.lock();
        if in_flight.contains_key(key) {
            return false;
        }
        in_flight.insert(key.to_string(), job_id);
        true
    }

    pub fn get_in_flight(&self, key: &str) -> Option<JobId> {
        if key.is_empty() {
            return None;
        }
        self.in_flight.lock().get(key).copied()
    }

    /// Releases every key held by `job_id`. Verifies ownership so a stale
    /// call for a key already released by a different job is a no-op.
    pub fn unregister(&self, job_id: JobId) {
        self.in_flight.lock().retain(|_, holder| *holder != job_id);
    }

    pub fn clear_all(&self) {
        self.in_flight.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_finds_in_flight_key() {
        let dedup = DeduplicationService::new();
        let job_id = JobId::new();
        assert!(dedup.register(job_id, "plan:acme/widgets/issues/1"));
        assert_eq!(
            dedup.get_in_flight("plan:acme/widgets/issues/1"),
            Some(job_id)
        );
    }

    #[test]
    fn second_registration_for_same_key_fails() {
        let dedup = DeduplicationService::new();
        let first = JobId::new();
        let second = JobId::new();
        assert!(dedup.register(first, "k"));
        assert!(!dedup.register(second, "k"));
        assert_eq!(dedup.get_in_flight("k"), Some(first));
    }

    #[test]
    fn empty_key_is_never_stored() {
        let dedup = DeduplicationService::new();
        assert!(dedup.register(JobId::new(), ""));
        assert_eq!(dedup.get_in_flight(""), None);
    }

    #[test]
    fn unregister_verifies_ownership() {
        let dedup = DeduplicationService::new();
        let first = JobId::new();
        let second = JobId::new();
        dedup.register(first, "k");
        // second never held "k"; this must be a no-op.
        dedup.unregister(second);
        assert_eq!(dedup.get_in_flight("k"), Some(first));

        dedup.unregister(first);
        assert_eq!(dedup.get_in_flight("k"), None);
    }

    #[test]
    fn key_is_reusable_once_released() {
        let dedup = DeduplicationService::new();
        let first = JobId::new();
        let second = JobId::new();
        dedup.register(first, "k");
        dedup.unregister(first);
        assert!(dedup.register(second, "k"));
    }
}
