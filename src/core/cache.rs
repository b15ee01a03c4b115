use crate::core::error::ClientError;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::debug;

/// Read-through cache for idempotent tool results.
///
/// Entries expire individually; a disabled cache (or a bypassed read)
/// always invokes the producer and stores nothing. Population is not
/// coalesced: two concurrent reads for the same missing key may both
/// invoke their producers. The underlying reads are idempotent, so this
/// costs a round trip, never correctness.
pub struct ToolCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    enabled: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl ToolCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            enabled: AtomicBool::new(enabled),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Returns the fresh cached value for `key`, or invokes `producer`
    /// once and stores its result with the given TTL. Errors from the
    /// producer are never stored.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        bypass: bool,
        producer: F,
    ) -> Result<Value, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ClientError>>,
    {
        if bypass || !self.is_enabled() {
            return producer().await;
        }

        {
            let mut entries = self.entries.lock().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key, "cache hit");
                    return Ok(entry.value.clone());
                }
                Some(_) => {
                    entries.remove(key);
                }
                None => {}
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key, ttl_secs = ttl.as_secs(), "cache miss");
        let value = producer().await?;

        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(value)
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().await.remove(key).is_some()
    }

    /// Removes every entry whose key matches `pattern` and returns the
    /// removed count.
    pub async fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, _| !pattern.is_match(key));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(pattern = %pattern, removed, "cache entries invalidated");
        }
        removed
    }

    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        CacheStats {
            enabled: self.is_enabled(),
            entries: entries.values().filter(|entry| entry.expires_at > now).count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Derives the cache key for one read operation.
///
/// Arguments are serialized with sorted keys, and operations only insert
/// fields that are actually set, so semantically identical calls produce
/// identical keys no matter how their option objects were assembled.
pub fn cache_key(operation: &str, arguments: &Map<String, Value>) -> String {
    let ordered: BTreeMap<&String, &Value> = arguments.iter().collect();
    let serialized =
        serde_json::to_string(&ordered).unwrap_or_else(|_| "{}".to_string());
    format!("{operation}:{serialized}")
}
