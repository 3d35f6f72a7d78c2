use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::{ToolError, ToolResult};
use crate::tiers::Tier;

/// Cache tuning knobs. TTLs count from call completion; `capacity` bounds
/// how many distinct `(tool, args)` entries stay resident.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub short_ttl: Duration,
    pub medium_ttl: Duration,
    pub capacity: usize,
}

impl CacheConfig {
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            short_ttl: Duration::from_secs(5),
            medium_ttl: Duration::from_secs(30),
            capacity: 128,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Served-from-where counters, for logs and diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub bypassed: u64,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    tool: String,
    args: String,
}

impl CacheKey {
    fn new(tool: &str, args: &Value) -> Self {
        // serde_json maps are ordered (BTreeMap-backed), so structurally
        // equal argument objects serialize to identical key strings.
        Self {
            tool: tool.to_string(),
            args: args.to_string(),
        }
    }
}

struct CacheEntry {
    data: Value,
    /// `None` never expires; the entry lives until invalidation or clear.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

struct InFlightSlot {
    /// Ties a leader to its own registration, so a leader that settles
    /// after `clear` cannot tear down a successor's registration.
    generation: u64,
    waiters: Vec<oneshot::Sender<ToolResult>>,
}

/// How a cacheable call enters the in-flight protocol: follow an existing
/// leader, or become the leader for its key.
enum Claim {
    Join(oneshot::Receiver<ToolResult>),
    Lead(u64),
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    // Most recently used keys live at the front.
    order: VecDeque<CacheKey>,
    in_flight: HashMap<CacheKey, InFlightSlot>,
    next_generation: u64,
    stats: CacheStats,
}

impl CacheState {
    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_front(key.clone());
    }

    /// Live entry for `key`, refreshing its LRU position. An expired entry
    /// is discarded by the lookup that notices it.
    fn lookup(&mut self, key: &CacheKey, now: Instant) -> Option<Value> {
        match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => {
                let data = entry.data.clone();
                self.touch(key);
                Some(data)
            }
            Some(_) => {
                self.entries.remove(key);
                self.order.retain(|k| k != key);
                None
            }
            None => None,
        }
    }

    fn insert(&mut self, key: CacheKey, data: Value, expires_at: Option<Instant>, capacity: usize) {
        self.entries.insert(key.clone(), CacheEntry { data, expires_at });
        self.touch(&key);
        while self.order.len() > capacity {
            if let Some(evicted) = self.order.pop_back() {
                self.entries.remove(&evicted);
            }
        }
    }
}

/// Tiered response cache with in-flight deduplication.
///
/// The entire check-cache / check-in-flight / register-leader sequence runs
/// under a single mutex acquisition, and the lock is never held across an
/// await. That is what upholds at-most-one-outstanding-call-per-key on a
/// multi-threaded runtime.
pub struct ToolCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl ToolCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Execute `tool` with `args`, consulting the cache per the tool's tier.
    ///
    /// `remote` is invoked on a miss, or on every call for bypass tools.
    /// Concurrent identical calls share one invocation: followers receive
    /// exactly the leader's settled result, success or failure. Failures are
    /// never stored, so the key is retryable immediately.
    pub async fn call<F, Fut>(&self, tool: &str, args: &Value, remote: F) -> ToolResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ToolResult>,
    {
        let tier = Tier::classify(tool);
        if !tier.is_cacheable() {
            self.lock().stats.bypassed += 1;
            return remote().await;
        }

        let key = CacheKey::new(tool, args);
        let claim = {
            let mut state = self.lock();
            if let Some(data) = state.lookup(&key, Instant::now()) {
                state.stats.hits += 1;
                return Ok(data);
            }
            if let Some(slot) = state.in_flight.get_mut(&key) {
                let (tx, rx) = oneshot::channel();
                slot.waiters.push(tx);
                state.stats.coalesced += 1;
                Claim::Join(rx)
            } else {
                let generation = state.next_generation;
                state.next_generation += 1;
                state.in_flight.insert(
                    key.clone(),
                    InFlightSlot {
                        generation,
                        waiters: Vec::new(),
                    },
                );
                state.stats.misses += 1;
                Claim::Lead(generation)
            }
        };

        match claim {
            // A closed channel means the leader (or `clear`) dropped the
            // registration before settling.
            Claim::Join(rx) => match rx.await {
                Ok(result) => result,
                Err(_) => Err(ToolError::Canceled(tool.to_string())),
            },
            Claim::Lead(generation) => {
                let guard = InFlightGuard {
                    cache: self,
                    key,
                    generation,
                    armed: true,
                };
                let result = remote().await;
                guard.settle(&result, tier);
                result
            }
        }
    }

    /// Remove every cached entry for `tool`. In-flight calls are left to
    /// complete and populate as usual; a caller that must not trust a
    /// result already in flight re-calls after it settles.
    pub fn invalidate_tool(&self, tool: &str) {
        let mut state = self.lock();
        state.entries.retain(|key, _| key.tool != tool);
        state.order.retain(|key| key.tool != tool);
        log::debug!("invalidated cached responses for tool `{tool}`");
    }

    /// Remove every cached entry whose serialized arguments mention `path`.
    /// Coarse by design: one mutated note invalidates everything derived
    /// from it, regardless of which tool produced the entry.
    pub fn invalidate_path(&self, path: &str) {
        let mut state = self.lock();
        state.entries.retain(|key, _| !key.args.contains(path));
        state.order.retain(|key| !key.args.contains(path));
        log::debug!("invalidated cached responses mentioning {path}");
    }

    /// Drop all entries and all in-flight registrations. Coalesced waiters
    /// observe a canceled call; leaders finishing later neither store nor
    /// notify anyone.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
        state.in_flight.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    fn expiry_for(&self, tier: Tier) -> Option<Instant> {
        match tier {
            Tier::Session | Tier::Bypass => None,
            Tier::Short => Some(Instant::now() + self.config.short_ttl),
            Tier::Medium => Some(Instant::now() + self.config.medium_ttl),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().expect("cache mutex poisoned")
    }
}

impl Default for ToolCache {
    fn default() -> Self {
        Self::new(CacheConfig::with_defaults())
    }
}

/// Keeps the in-flight registration tied to the leader's lifetime. If the
/// leader future is dropped mid-call, the registration is removed so the
/// waiters' channels close and the key becomes retryable at once.
struct InFlightGuard<'a> {
    cache: &'a ToolCache,
    key: CacheKey,
    generation: u64,
    armed: bool,
}

impl InFlightGuard<'_> {
    fn settle(mut self, result: &ToolResult, tier: Tier) {
        self.armed = false;
        let waiters = {
            let mut state = self.cache.lock();
            let current = state
                .in_flight
                .get(&self.key)
                .is_some_and(|slot| slot.generation == self.generation);
            if !current {
                // The registration was cleared while the call ran; the
                // result no longer has an owner and must not repopulate
                // the cache.
                return;
            }
            let slot = state.in_flight.remove(&self.key);
            if let Ok(data) = result {
                let expires_at = self.cache.expiry_for(tier);
                let capacity = self.cache.config.capacity;
                state.insert(self.key.clone(), data.clone(), expires_at, capacity);
            }
            slot.map_or_else(Vec::new, |slot| slot.waiters)
        };
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut state) = self.cache.state.lock() {
            let current = state
                .in_flight
                .get(&self.key)
                .is_some_and(|slot| slot.generation == self.generation);
            if current {
                state.in_flight.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheConfig, CacheKey, ToolCache};
    use crate::error::{ToolError, ToolResult};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted<'a>(
        calls: &'a AtomicUsize,
        result: ToolResult,
    ) -> impl FnOnce() -> std::future::Ready<ToolResult> + 'a {
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(result)
        }
    }

    #[test]
    fn structurally_equal_args_share_a_key() {
        let a = json!({ "note": "A.md", "limit": 5 });
        let b = json!({ "limit": 5, "note": "A.md" });
        assert_eq!(CacheKey::new("search_notes", &a), CacheKey::new("search_notes", &b));
        assert_ne!(CacheKey::new("search_notes", &a), CacheKey::new("get_backlinks", &a));
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let cache = ToolCache::default();
        let calls = AtomicUsize::new(0);
        let args = json!({ "note": "A.md" });

        let first = cache
            .call("get_note_links", &args, counted(&calls, Ok(json!(1))))
            .await;
        let second = cache
            .call("get_note_links", &args, counted(&calls, Ok(json!(2))))
            .await;

        assert_eq!(first, Ok(json!(1)));
        assert_eq!(second, Ok(json!(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bypass_tools_always_invoke_remote() {
        let cache = ToolCache::default();
        let calls = AtomicUsize::new(0);
        let args = json!({ "note": "A.md" });

        for _ in 0..3 {
            let result = cache
                .call("update_note", &args, counted(&calls, Ok(Value::Null)))
                .await;
            assert_eq!(result, Ok(Value::Null));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.stats().bypassed, 3);
    }

    #[tokio::test]
    async fn unknown_tools_are_bypass() {
        let cache = ToolCache::default();
        let calls = AtomicUsize::new(0);
        let args = Value::Null;

        for _ in 0..2 {
            cache
                .call("mystery_tool", &args, counted(&calls, Ok(Value::Null)))
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = ToolCache::default();
        let calls = AtomicUsize::new(0);
        let args = json!({ "query": "rollout" });

        let failed = cache
            .call(
                "search_notes",
                &args,
                counted(&calls, Err(ToolError::remote("index offline"))),
            )
            .await;
        assert_eq!(failed, Err(ToolError::remote("index offline")));

        let retried = cache
            .call("search_notes", &args, counted(&calls, Ok(json!("ok"))))
            .await;
        assert_eq!(retried, Ok(json!("ok")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_tool_only_touches_that_tool() {
        let cache = ToolCache::default();
        let calls = AtomicUsize::new(0);
        let args = json!({ "note": "A.md" });

        cache
            .call("get_note_links", &args, counted(&calls, Ok(json!(1))))
            .await
            .unwrap();
        cache
            .call("get_backlinks", &args, counted(&calls, Ok(json!(2))))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cache.invalidate_tool("get_note_links");

        cache
            .call("get_backlinks", &args, counted(&calls, Ok(json!(3))))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2, "other tool stayed cached");

        cache
            .call("get_note_links", &args, counted(&calls, Ok(json!(4))))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3, "invalidated tool refetched");
    }

    #[tokio::test]
    async fn invalidate_path_matches_serialized_args() {
        let cache = ToolCache::default();
        let calls = AtomicUsize::new(0);
        let alpha = json!({ "note": "Notes/Alpha.md" });
        let beta = json!({ "note": "Notes/Beta.md" });

        cache
            .call("get_note_links", &alpha, counted(&calls, Ok(json!(1))))
            .await
            .unwrap();
        cache
            .call("get_note_links", &beta, counted(&calls, Ok(json!(2))))
            .await
            .unwrap();

        cache.invalidate_path("Notes/Alpha.md");

        cache
            .call("get_note_links", &beta, counted(&calls, Ok(json!(3))))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2, "untouched note stayed cached");

        cache
            .call("get_note_links", &alpha, counted(&calls, Ok(json!(4))))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3, "mutated note refetched");
    }

    #[tokio::test]
    async fn clear_empties_everything() {
        let cache = ToolCache::default();
        let calls = AtomicUsize::new(0);
        let args = json!({ "note": "A.md" });

        cache
            .call("get_note_links", &args, counted(&calls, Ok(json!(1))))
            .await
            .unwrap();
        cache.clear();
        cache
            .call("get_note_links", &args, counted(&calls, Ok(json!(2))))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let cache = ToolCache::new(CacheConfig {
            capacity: 2,
            ..CacheConfig::with_defaults()
        });
        let calls = AtomicUsize::new(0);
        let first = json!({ "note": "1.md" });
        let second = json!({ "note": "2.md" });
        let third = json!({ "note": "3.md" });

        for args in [&first, &second, &third] {
            cache
                .call("get_note_links", args, counted(&calls, Ok(json!("x"))))
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Newest two survive, the oldest was evicted.
        cache
            .call("get_note_links", &third, counted(&calls, Ok(json!("y"))))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        cache
            .call("get_note_links", &first, counted(&calls, Ok(json!("z"))))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn stats_track_each_outcome() {
        let cache = ToolCache::default();
        let calls = AtomicUsize::new(0);
        let args = json!({ "note": "A.md" });

        cache
            .call("get_note_links", &args, counted(&calls, Ok(json!(1))))
            .await
            .unwrap();
        cache
            .call("get_note_links", &args, counted(&calls, Ok(json!(2))))
            .await
            .unwrap();
        cache
            .call("update_note", &args, counted(&calls, Ok(Value::Null)))
            .await
            .unwrap();

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.bypassed, 1);
        assert_eq!(stats.coalesced, 0);
    }
}
