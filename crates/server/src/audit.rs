//! Bounded in-memory record of mutating requests

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

/// Ring buffer of audit events; the oldest event is evicted when full
pub struct AuditLog {
    capacity: usize,
    events: Mutex<VecDeque<AuditEvent>>,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, event: AuditEvent) {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Up to `limit` events, newest first
    pub fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events
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

    fn event(path: &str) -> AuditEvent {
        AuditEvent {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            request_id: "req".into(),
            method: "POST".into(),
            path: path.into(),
            status: 201,
            actor: None,
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let log = AuditLog::new(2);
        log.record(event("/a"));
        log.record(event("/b"));
        log.record(event("/c"));

        let paths: Vec<_> = log.recent(10).into_iter().map(|e| e.path).collect();
        assert_eq!(paths, ["/c", "/b"]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn recent_respects_limit() {
        let log = AuditLog::new(10);
        assert!(log.is_empty());
        for p in ["/a", "/b", "/c"] {
            log.record(event(p));
        }
        assert_eq!(log.recent(1)[0].path, "/c");
    }
}
