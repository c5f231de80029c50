use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use uuid::Uuid;

/// How long a started authorization may wait for its callback
pub const AUTHORIZATION_TTL: Duration = Duration::from_secs(10 * 60);

/// An authorization redirect awaiting its callback
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub connection_id: Uuid,
    pub code_verifier: String,
    pub token_endpoint: String,
    pub created_at: Instant,
}

/// In-flight authorizations keyed by OAuth `state`
pub struct PendingAuthorizations {
    ttl: Duration,
    entries: Mutex<HashMap<String, PendingAuthorization>>,
}

impl Default for PendingAuthorizations {
    fn default() -> Self {
        Self::new(AUTHORIZATION_TTL)
    }
}

impl PendingAuthorizations {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Remember an authorization; expired entries are dropped on the way
    pub fn insert(&self, state: String, pending: PendingAuthorization) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let ttl = self.ttl;
        entries.retain(|_, p| p.created_at.elapsed() < ttl);
        entries.insert(state, pending);
    }

    /// Remove and return the authorization for `state`.
    ///
    /// A state can be taken once; expired states yield `None`.
    pub fn take(&self, state: &str) -> Option<PendingAuthorization> {
        let pending = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(state)?;
        (pending.created_at.elapsed() < self.ttl).then_some(pending)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> PendingAuthorization {
        PendingAuthorization {
            connection_id: Uuid::new_v4(),
            code_verifier: "verifier".into(),
            token_endpoint: "https://ehr.example/token".into(),
            created_at: Instant::now(),
        }
    }

    #[test]
    fn state_is_single_use() {
        let map = PendingAuthorizations::default();
        map.insert("abc".into(), pending());
        assert!(map.take("abc").is_some());
        assert!(map.take("abc").is_none());
        assert!(map.take("unknown").is_none());
    }

    #[test]
    fn expired_states_are_rejected() {
        let map = PendingAuthorizations::new(Duration::ZERO);
        map.insert("abc".into(), pending());
        assert!(map.take("abc").is_none());
    }

    #[test]
    fn insert_purges_expired_entries() {
        let map = PendingAuthorizations::new(Duration::ZERO);
        map.insert("a".into(), pending());
        map.insert("b".into(), pending());
        assert_eq!(map.len(), 1);
    }
}
