// Session document store.
//
// The request-handling layer keeps each session's raw vendor documents
// around between the shopping, pricing and booking steps, so follow-up
// calls can re-resolve against the exact document the user selected from.
// Entries live for a short TTL and nothing survives beyond it; durability
// is explicitly not offered. The transformation core never touches this
// store, it only receives documents the caller fetched from it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub default_ttl: Duration,
    pub max_entries: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            max_entries: 10_000,
        }
    }
}

/// Which step of the session flow a stored document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStage {
    Shopping,
    Pricing,
    SeatAvailability,
    ServiceList,
    Order,
}

impl SessionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStage::Shopping => "shopping",
            SessionStage::Pricing => "pricing",
            SessionStage::SeatAvailability => "seat_availability",
            SessionStage::ServiceList => "service_list",
            SessionStage::Order => "order",
        }
    }
}

#[derive(Debug, Default)]
struct StoreStats {
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
    expired_count: AtomicUsize,
    rejected_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub expired_count: usize,
    pub rejected_count: usize,
}

struct StoredDocument {
    document: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl StoredDocument {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() > self.ttl
    }
}

pub struct DocumentStore {
    entries: DashMap<(String, SessionStage), StoredDocument>,
    config: StoreConfig,
    stats: StoreStats,
}

impl DocumentStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: StoreStats::default(),
        }
    }

    /// Stores a raw document for a session step. Returns false when the
    /// store is at capacity and the key is new.
    pub fn put(
        &self,
        session_id: &str,
        stage: SessionStage,
        document: Value,
        ttl: Option<Duration>,
    ) -> bool {
        let key = (session_id.to_string(), stage);
        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(&key) {
            self.stats.rejected_count.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        self.entries.insert(
            key,
            StoredDocument {
                document,
                stored_at: Instant::now(),
                ttl: ttl.unwrap_or(self.config.default_ttl),
            },
        );
        true
    }

    /// Fetches a session step's document if present and not expired.
    /// Expired entries are removed on the way out.
    pub fn get(&self, session_id: &str, stage: SessionStage) -> Option<Value> {
        let key = (session_id.to_string(), stage);

        let expired = match self.entries.get(&key) {
            Some(entry) if entry.is_expired() => true,
            Some(entry) => {
                self.stats.hit_count.fetch_add(1, Ordering::Relaxed);
                return Some(entry.document.clone());
            }
            None => {
                self.stats.miss_count.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired {
            self.entries.remove(&key);
            self.stats.expired_count.fetch_add(1, Ordering::Relaxed);
            self.stats.miss_count.fetch_add(1, Ordering::Relaxed);
        }
        None
    }

    /// Drops every stage stored for one session. Returns how many entries
    /// were removed.
    pub fn invalidate_session(&self, session_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(session, _), _| session != session_id);
        before - self.entries.len()
    }

    /// Sweeps expired entries. The caller decides the cadence.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let purged = before - self.entries.len();
        self.stats
            .expired_count
            .fetch_add(purged, Ordering::Relaxed);
        purged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> StoreStatsReport {
        StoreStatsReport {
            items_count: self.entries.len(),
            hit_count: self.stats.hit_count.load(Ordering::Relaxed),
            miss_count: self.stats.miss_count.load(Ordering::Relaxed),
            expired_count: self.stats.expired_count.load(Ordering::Relaxed),
            rejected_count: self.stats.rejected_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    fn store_with_ttl(ttl: Duration) -> DocumentStore {
        DocumentStore::new(StoreConfig {
            default_ttl: ttl,
            max_entries: 16,
        })
    }

    #[test]
    fn test_round_trip_per_session_and_stage() {
        let store = DocumentStore::new(StoreConfig::default());

        store.put("sess-1", SessionStage::Shopping, json!({"a": 1}), None);
        store.put("sess-1", SessionStage::Pricing, json!({"b": 2}), None);
        store.put("sess-2", SessionStage::Shopping, json!({"c": 3}), None);

        assert_eq!(
            store.get("sess-1", SessionStage::Shopping),
            Some(json!({"a": 1}))
        );
        assert_eq!(
            store.get("sess-1", SessionStage::Pricing),
            Some(json!({"b": 2}))
        );
        assert_eq!(store.get("sess-2", SessionStage::Pricing), None);

        let stats = store.stats();
        assert_eq!(stats.hit_count, 2);
        assert_eq!(stats.miss_count, 1);
    }

    #[test]
    fn test_expired_entries_vanish_on_read() {
        let store = store_with_ttl(Duration::from_millis(30));
        store.put("sess-1", SessionStage::Shopping, json!({}), None);

        assert!(store.get("sess-1", SessionStage::Shopping).is_some());
        thread::sleep(Duration::from_millis(60));
        assert!(store.get("sess-1", SessionStage::Shopping).is_none());

        let stats = store.stats();
        assert_eq!(stats.expired_count, 1);
        assert_eq!(stats.items_count, 0);
    }

    #[test]
    fn test_per_entry_ttl_overrides_default() {
        let store = store_with_ttl(Duration::from_secs(300));
        store.put(
            "sess-1",
            SessionStage::Shopping,
            json!({}),
            Some(Duration::from_millis(30)),
        );
        store.put("sess-1", SessionStage::Pricing, json!({}), None);

        thread::sleep(Duration::from_millis(60));
        assert!(store.get("sess-1", SessionStage::Shopping).is_none());
        assert!(store.get("sess-1", SessionStage::Pricing).is_some());
    }

    #[test]
    fn test_session_invalidation_spares_other_sessions() {
        let store = DocumentStore::new(StoreConfig::default());
        store.put("sess-1", SessionStage::Shopping, json!({}), None);
        store.put("sess-1", SessionStage::Pricing, json!({}), None);
        store.put("sess-2", SessionStage::Shopping, json!({}), None);

        assert_eq!(store.invalidate_session("sess-1"), 2);
        assert!(store.get("sess-1", SessionStage::Shopping).is_none());
        assert!(store.get("sess-2", SessionStage::Shopping).is_some());
    }

    #[test]
    fn test_capacity_rejects_new_keys_but_updates_existing() {
        let store = DocumentStore::new(StoreConfig {
            default_ttl: Duration::from_secs(300),
            max_entries: 2,
        });

        assert!(store.put("sess-1", SessionStage::Shopping, json!(1), None));
        assert!(store.put("sess-2", SessionStage::Shopping, json!(2), None));
        assert!(!store.put("sess-3", SessionStage::Shopping, json!(3), None));
        // Overwriting a resident key is always allowed
        assert!(store.put("sess-1", SessionStage::Shopping, json!(9), None));

        assert_eq!(store.stats().rejected_count, 1);
        assert_eq!(
            store.get("sess-1", SessionStage::Shopping),
            Some(json!(9))
        );
    }

    #[test]
    fn test_purge_expired_sweeps_in_bulk() {
        let store = store_with_ttl(Duration::from_millis(30));
        for i in 0..4 {
            store.put(&format!("sess-{i}"), SessionStage::Shopping, json!(i), None);
        }
        store.put(
            "sess-keep",
            SessionStage::Shopping,
            json!("keep"),
            Some(Duration::from_secs(300)),
        );

        thread::sleep(Duration::from_millis(60));
        assert_eq!(store.purge_expired(), 4);
        assert_eq!(store.len(), 1);
    }
}
