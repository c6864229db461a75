//! Short-TTL cache of assembled context blobs.
//!
//! Keyed by `(caller, request kind, department-or-"general")`. Entries expire
//! lazily on lookup; writes only ever replace. Purely an optimization — the
//! engine behaves identically on a cold cache, just slower.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::config::CacheConfig;
use crate::request::{RequestKind, Tier};

/// Cache key. A missing department collapses to `"general"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    caller_id: Uuid,
    kind: RequestKind,
    department: String,
}

impl CacheKey {
    pub fn new(caller_id: Uuid, kind: RequestKind, department: Option<&str>) -> Self {
        Self {
            caller_id,
            kind,
            department: department.unwrap_or("general").to_string(),
        }
    }
}

struct Entry {
    content: String,
    tier: Tier,
    created_at: Instant,
}

/// TTL cache of prepared context blobs.
pub struct ContextCache {
    /// `std::sync::Mutex` (not tokio) — never held across an `.await` point.
    entries: Mutex<HashMap<CacheKey, Entry>>,
    ttl: Duration,
}

impl ContextCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: config.ttl(),
        }
    }

    /// Look up a cached blob for this key and tier. Expired entries are
    /// evicted here; an entry built for a different tier is a miss.
    pub fn get(&self, key: &CacheKey, tier: Tier) -> Option<String> {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match guard.get(key) {
            Some(entry) if entry.created_at.elapsed() >= self.ttl => {
                guard.remove(key);
                None
            }
            Some(entry) if entry.tier != tier => None,
            Some(entry) => Some(entry.content.clone()),
            None => None,
        }
    }

    /// Store a blob, replacing any existing entry for the key.
    pub fn put(&self, key: CacheKey, content: String, tier: Tier) {
        let entry = Entry {
            content,
            tier,
            created_at: Instant::now(),
        };
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
