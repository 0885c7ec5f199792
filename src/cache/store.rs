use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::endpoint::EndpointType;
use crate::route::RouteContext;

/// Composite cache key: `"<route context>:<endpoint>"`.
///
/// ```rust
/// # use folio::{EndpointType, RouteContext, cache::cache_key};
/// assert_eq!(cache_key(RouteContext::Skills, EndpointType::Skills), "skills:SKILLS");
/// ```
pub fn cache_key(context: RouteContext, endpoint: EndpointType) -> String {
    format!("{context}:{endpoint}")
}

/// One cached value with its creation time and lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    pub timestamp: Instant,
    pub ttl: Duration,
    /// Insertion sequence; breaks timestamp ties and identifies the entry
    /// for conditional removal.
    pub id: u64,
}

impl<V> CacheEntry<V> {
    /// Fresh while `now - timestamp < ttl`.
    pub fn is_valid(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.timestamp) < self.ttl
    }
}

/// Read-only diagnostic view of a store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub keys: Vec<String>,
    /// Keys belonging to the current route context.
    pub route_keys: Vec<String>,
    /// `size * avg_entry_size`.
    pub estimated_memory_bytes: usize,
    pub hit_rate: f64,
    pub oldest_key: Option<String>,
}

/// Keyed TTL store owned by a single executor.
#[derive(Debug)]
pub struct CacheStore<V> {
    entries: HashMap<String, CacheEntry<V>>,
    next_id: u64,
}

impl<V> Default for CacheStore<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<V: Clone> CacheStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entry's data if it is still fresh.
    ///
    /// A stale entry is removed and reported as a miss.
    pub fn get_fresh(&mut self, key: &str, now: Instant) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.is_valid(now) {
            return Some(entry.data.clone());
        }
        self.entries.remove(key);
        None
    }

    /// Insert (or replace) an entry. Returns the entry id.
    pub fn insert(&mut self, key: String, data: V, ttl: Duration, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            key,
            CacheEntry {
                data,
                timestamp: now,
                ttl,
                id,
            },
        );
        id
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove `key` only if it still holds the entry with `id`.
    ///
    /// A newer entry written under the same key is left alone.
    pub fn remove_if(&mut self, key: &str, id: u64) -> bool {
        if self.entries.get(key).is_some_and(|e| e.id == id) {
            self.entries.remove(key);
            return true;
        }
        false
    }

    /// Remove the route-scoped key for `endpoint` and the bare legacy key.
    pub fn invalidate_endpoint(&mut self, context: RouteContext, endpoint: EndpointType) -> usize {
        let scoped = self.remove(&cache_key(context, endpoint)) as usize;
        let bare = self.remove(endpoint.as_str()) as usize;
        scoped + bare
    }

    /// Remove every entry whose key belongs to `context`.
    pub fn invalidate_route(&mut self, context: RouteContext) -> usize {
        let prefix = format!("{context}:");
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        before - self.entries.len()
    }

    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_valid(now));
        before - self.entries.len()
    }

    /// Evict oldest-by-timestamp entries until at most `max` remain.
    ///
    /// Returns the evicted keys.
    pub fn maintain_size(&mut self, max: usize) -> Vec<String> {
        if self.entries.len() <= max {
            return Vec::new();
        }
        let mut by_age: Vec<(Instant, u64, String)> = self
            .entries
            .iter()
            .map(|(key, e)| (e.timestamp, e.id, key.clone()))
            .collect();
        by_age.sort();
        let excess = self.entries.len() - max;
        let evicted: Vec<String> = by_age
            .into_iter()
            .take(excess)
            .map(|(_, _, key)| key)
            .collect();
        for key in &evicted {
            self.entries.remove(key);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn entry(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    /// Diagnostic snapshot; no side effects.
    pub fn stats(&self, context: RouteContext, avg_entry_size: usize, hit_rate: f64) -> CacheStats {
        let keys = self.keys();
        let prefix = format!("{context}:");
        let route_keys = keys
            .iter()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|(_, e)| (e.timestamp, e.id))
            .map(|(k, _)| k.clone());
        CacheStats {
            size: keys.len(),
            estimated_memory_bytes: keys.len() * avg_entry_size,
            keys,
            route_keys,
            hit_rate,
            oldest_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_secs(60);

    #[test]
    fn entry_is_valid_strictly_before_ttl() {
        let now = Instant::now();
        let entry = CacheEntry {
            data: (),
            timestamp: now,
            ttl: MIN,
            id: 0,
        };
        assert!(entry.is_valid(now));
        assert!(entry.is_valid(now + Duration::from_secs(59)));
        assert!(!entry.is_valid(now + MIN));
    }

    #[test]
    fn stale_get_removes_entry() {
        let now = Instant::now();
        let mut store = CacheStore::new();
        store.insert("home:SKILLS".into(), 1, MIN, now);

        assert_eq!(store.get_fresh("home:SKILLS", now), Some(1));
        assert_eq!(store.get_fresh("home:SKILLS", now + MIN), None);
        assert!(store.is_empty());
    }

    #[test]
    fn invalidate_endpoint_leaves_other_keys() {
        let now = Instant::now();
        let mut store = CacheStore::new();
        store.insert("skills:SKILLS".into(), 1, MIN, now);
        store.insert("SKILLS".into(), 2, MIN, now);
        store.insert("skills:SKILLS_STATS".into(), 3, MIN, now);
        store.insert("home:SKILLS".into(), 4, MIN, now);

        let removed = store.invalidate_endpoint(RouteContext::Skills, EndpointType::Skills);
        assert_eq!(removed, 2);
        assert_eq!(store.keys(), vec!["home:SKILLS", "skills:SKILLS_STATS"]);
    }

    #[test]
    fn invalidate_route_matches_prefix_only() {
        let now = Instant::now();
        let mut store = CacheStore::new();
        store.insert("projects:PROJECTS".into(), 1, MIN, now);
        store.insert("projects:PROJECTS_STATS".into(), 2, MIN, now);
        store.insert("home:PROJECTS".into(), 3, MIN, now);

        assert_eq!(store.invalidate_route(RouteContext::Projects), 2);
        assert_eq!(store.keys(), vec!["home:PROJECTS"]);
    }

    #[test]
    fn maintain_size_evicts_oldest_first() {
        let t0 = Instant::now();
        let mut store = CacheStore::new();
        store.insert("home:C".into(), 3, MIN, t0 + Duration::from_secs(2));
        store.insert("home:A".into(), 1, MIN, t0);
        store.insert("home:B".into(), 2, MIN, t0 + Duration::from_secs(1));

        let evicted = store.maintain_size(1);
        assert_eq!(evicted, vec!["home:A", "home:B"]);
        assert_eq!(store.keys(), vec!["home:C"]);
        assert!(store.maintain_size(1).is_empty());
    }

    #[test]
    fn maintain_size_breaks_ties_by_insertion_order() {
        let now = Instant::now();
        let mut store = CacheStore::new();
        store.insert("home:FIRST".into(), 1, MIN, now);
        store.insert("home:SECOND".into(), 2, MIN, now);

        assert_eq!(store.maintain_size(1), vec!["home:FIRST"]);
    }

    #[test]
    fn sweep_removes_only_expired() {
        let now = Instant::now();
        let mut store = CacheStore::new();
        store.insert("home:SHORT".into(), 1, Duration::from_secs(1), now);
        store.insert("home:LONG".into(), 2, MIN, now);

        assert_eq!(store.sweep(now + Duration::from_secs(5)), 1);
        assert_eq!(store.keys(), vec!["home:LONG"]);
    }

    #[test]
    fn remove_if_ignores_replaced_entry() {
        let now = Instant::now();
        let mut store = CacheStore::new();
        let old = store.insert("home:X".into(), 1, MIN, now);
        store.insert("home:X".into(), 2, MIN, now);

        assert!(!store.remove_if("home:X", old));
        assert_eq!(store.get_fresh("home:X", now), Some(2));
    }

    #[test]
    fn stats_report_route_keys_and_oldest() {
        let t0 = Instant::now();
        let mut store = CacheStore::new();
        store.insert("skills:SKILLS".into(), 1, MIN, t0 + Duration::from_secs(1));
        store.insert("home:SKILLS".into(), 2, MIN, t0);

        let stats = store.stats(RouteContext::Skills, 100, 0.75);
        assert_eq!(stats.size, 2);
        assert_eq!(stats.route_keys, vec!["skills:SKILLS"]);
        assert_eq!(stats.estimated_memory_bytes, 200);
        assert_eq!(stats.oldest_key.as_deref(), Some("home:SKILLS"));
        assert_eq!(stats.hit_rate, 0.75);
    }
}
