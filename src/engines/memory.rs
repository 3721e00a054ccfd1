//! Memory Engine Module
//!
//! HashMap-backed engine. The map lives in a [`MemoryStore`] that outlives
//! any single engine, so closing and reopening an engine on the same store
//! sees the same records.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::{Datum, Engine, EngineCore};
use crate::engines::entry::{live_ttl, StoredEntry};
use crate::error::Result;

// == Memory Store ==
/// Shared backing map. Keys are stored with their engine prefix applied.
///
/// Namespaces are matched as plain string prefixes, so engines sharing a
/// store must use prefixes that do not nest. An `a:` engine also loads,
/// purges and flushes the keys of an `a:b:` engine (seeing them as `b:...`),
/// and an empty prefix reaches every namespace.
pub struct MemoryStore<V> {
    entries: Arc<RwLock<HashMap<String, StoredEntry<V>>>>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of records across every namespace, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<V> Clone for MemoryStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for MemoryStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

// == Memory Engine ==
/// In-memory engine with per-entry TTL.
///
/// Expired entries are purged lazily on access, during `load`, and by
/// [`spawn_purge_task`](crate::tasks::spawn_purge_task).
#[derive(Debug)]
pub struct MemoryEngine<V> {
    core: EngineCore,
    store: MemoryStore<V>,
    namespace: String,
}

impl<V> MemoryEngine<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an engine over a fresh, private store.
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_store(config, MemoryStore::new())
    }

    /// Creates an engine over an existing store.
    pub fn with_store(config: &EngineConfig, store: MemoryStore<V>) -> Self {
        Self::with_core(EngineCore::new(config), store)
    }

    /// Creates an engine from a prepared core, e.g. one with a manual clock.
    pub fn with_core(core: EngineCore, store: MemoryStore<V>) -> Self {
        let namespace = core.prefix().to_string();
        Self {
            core,
            store,
            namespace,
        }
    }

    pub fn store(&self) -> &MemoryStore<V> {
        &self.store
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    fn in_namespace(&self, full_key: &str) -> bool {
        full_key.starts_with(&self.namespace)
    }

    // == Purge Expired ==
    /// Removes expired entries in this engine's namespace.
    ///
    /// Returns the number of entries removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.core.now_ms();
        let mut entries = self.store.entries.write().await;
        let before = entries.len();

        entries.retain(|key, entry| !(self.in_namespace(key) && entry.is_expired(now)));

        before - entries.len()
    }
}

#[async_trait]
impl<V> Engine<V> for MemoryEngine<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn core(&self) -> &EngineCore {
        &self.core
    }

    fn process_prefix(&mut self, prefix: &str) {
        self.namespace = prefix.to_string();
    }

    async fn get(&self, key: &str) -> Result<Option<V>> {
        let full_key = self.full_key(key);
        let now = self.core.now_ms();
        let mut entries = self.store.entries.write().await;

        match entries.get(&full_key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.val.clone())),
            Some(_) => {}
        }

        entries.remove(&full_key);
        debug!(engine = %self.id(), key, "expired entry purged on read");
        Ok(None)
    }

    async fn set(&self, key: &str, val: V, ttl: Option<u64>) -> Result<V> {
        let entry = StoredEntry::new(val.clone(), ttl, self.core.now_ms());
        self.store
            .entries
            .write()
            .await
            .insert(self.full_key(key), entry);
        Ok(val)
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.store.entries.write().await.remove(&self.full_key(key));
        Ok(())
    }

    async fn ttl(&self, key: &str, ttl: u64) -> Result<Option<u64>> {
        let full_key = self.full_key(key);
        let now = self.core.now_ms();
        let mut entries = self.store.entries.write().await;

        match entries.get_mut(&full_key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => {
                entry.reset_ttl(ttl, now);
                return Ok(Some(ttl));
            }
            Some(_) => {}
        }

        entries.remove(&full_key);
        Ok(None)
    }

    async fn load(&self) -> Result<Vec<Datum<V>>> {
        let mut entries = self.store.entries.write().await;
        let mut expired = Vec::new();
        let mut records = Vec::new();

        for (full_key, entry) in entries.iter() {
            let Some(key) = full_key.strip_prefix(self.namespace.as_str()) else {
                continue;
            };
            match live_ttl(self.ts_to_ttl(entry.expires_at)) {
                Some(ttl) => records.push(Datum::new(key, entry.val.clone(), ttl)),
                None => expired.push(full_key.clone()),
            }
        }

        for full_key in &expired {
            entries.remove(full_key);
        }

        records.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(
            engine = %self.id(),
            loaded = records.len(),
            dropped = expired.len(),
            "memory engine loaded"
        );
        Ok(records)
    }

    async fn flush(&self) -> Result<bool> {
        let mut entries = self.store.entries.write().await;
        if self.namespace.is_empty() {
            entries.clear();
        } else {
            entries.retain(|key, _| !key.starts_with(&self.namespace));
        }
        Ok(true)
    }

    async fn close(&self) -> Result<bool> {
        debug!(engine = %self.id(), "memory engine released its store handle");
        Ok(true)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ManualClock;

    fn engine_with_clock(
        prefix: &str,
        store: MemoryStore<i32>,
    ) -> (MemoryEngine<i32>, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let core = EngineCore::builder()
            .prefix(prefix)
            .clock(Arc::new(clock.clone()))
            .build();
        (MemoryEngine::with_core(core, store), clock)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let engine = MemoryEngine::new(&EngineConfig::default());

        assert_eq!(engine.set("k", 42, None).await.unwrap(), 42);
        assert_eq!(engine.get("k").await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let engine: MemoryEngine<i32> = MemoryEngine::new(&EngineConfig::default());
        assert_eq!(engine.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite() {
        let engine = MemoryEngine::new(&EngineConfig::default());

        engine.set("k", 1, None).await.unwrap();
        engine.set("k", 2, None).await.unwrap();

        assert_eq!(engine.get("k").await.unwrap(), Some(2));
        assert_eq!(engine.store().len().await, 1);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let (engine, clock) = engine_with_clock("", MemoryStore::new());

        engine.set("k", 42, Some(1_000)).await.unwrap();
        clock.advance(999);
        assert_eq!(engine.get("k").await.unwrap(), Some(42));

        clock.advance(1);
        assert_eq!(engine.get("k").await.unwrap(), None);
        assert!(engine.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_del_missing_is_ok() {
        let engine: MemoryEngine<i32> = MemoryEngine::new(&EngineConfig::default());
        assert!(engine.del("missing-key").await.is_ok());
    }

    #[tokio::test]
    async fn test_ttl_update() {
        let (engine, clock) = engine_with_clock("", MemoryStore::new());

        engine.set("k", 1, Some(100)).await.unwrap();
        assert_eq!(engine.ttl("k", 5_000).await.unwrap(), Some(5_000));

        clock.advance(4_000);
        assert_eq!(engine.get("k").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_ttl_missing_key_does_not_create_entry() {
        let engine: MemoryEngine<i32> = MemoryEngine::new(&EngineConfig::default());

        assert_eq!(engine.ttl("ghost", 1_000).await.unwrap(), None);
        assert!(engine.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_ttl_on_expired_key() {
        let (engine, clock) = engine_with_clock("", MemoryStore::new());

        engine.set("k", 1, Some(10)).await.unwrap();
        clock.advance(10);
        assert_eq!(engine.ttl("k", 1_000).await.unwrap(), None);
        assert_eq!(engine.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_strips_prefix_and_skips_expired() {
        let store = MemoryStore::new();
        let (engine, clock) = engine_with_clock("app:", store.clone());

        engine.set("a", 1, None).await.unwrap();
        engine.set("b", 2, Some(5_000)).await.unwrap();
        engine.set("c", 3, Some(10)).await.unwrap();
        clock.advance(1_000);

        let records = engine.load().await.unwrap();

        assert_eq!(
            records,
            vec![Datum::new("a", 1, None), Datum::new("b", 2, Some(4_000))]
        );
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_prefixes_share_store() {
        let store = MemoryStore::new();
        let app_config = EngineConfig::default().with_prefix("app:");
        let jobs_config = EngineConfig::default().with_prefix("jobs:");
        let app = MemoryEngine::with_store(&app_config, store.clone());
        let jobs = MemoryEngine::with_store(&jobs_config, store.clone());

        app.set("k", 1, None).await.unwrap();
        jobs.set("k", 2, None).await.unwrap();

        assert_eq!(app.get("k").await.unwrap(), Some(1));
        assert_eq!(jobs.get("k").await.unwrap(), Some(2));

        assert!(app.flush().await.unwrap());
        assert_eq!(app.get("k").await.unwrap(), None);
        assert_eq!(jobs.get("k").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_process_prefix_overrides_namespace() {
        let store = MemoryStore::new();
        let mut engine = MemoryEngine::with_store(&EngineConfig::default(), store.clone());
        engine.process_prefix("tenant:");

        engine.set("k", 1, None).await.unwrap();

        let config = EngineConfig::default().with_prefix("tenant:");
        let namespaced = MemoryEngine::with_store(&config, store);
        assert_eq!(namespaced.get("k").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_flush_without_prefix_clears_all() {
        let engine = MemoryEngine::new(&EngineConfig::default());
        engine.set("a", 1, None).await.unwrap();
        engine.set("b", 2, Some(1)).await.unwrap();

        assert!(engine.flush().await.unwrap());
        assert!(engine.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_close_keeps_records() {
        let store = MemoryStore::new();
        let engine = MemoryEngine::with_store(&EngineConfig::default(), store.clone());
        engine.set("k", 1, None).await.unwrap();

        assert!(engine.close().await.unwrap());
        drop(engine);

        let reopened = MemoryEngine::with_store(&EngineConfig::default(), store);
        assert_eq!(
            reopened.load().await.unwrap(),
            vec![Datum::new("k", 1, None)]
        );
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (engine, clock) = engine_with_clock("", MemoryStore::new());

        engine.set("short", 1, Some(10)).await.unwrap();
        engine.set("long", 2, Some(10_000)).await.unwrap();
        engine.set("forever", 3, None).await.unwrap();
        clock.advance(100);

        assert_eq!(engine.purge_expired().await, 1);
        assert_eq!(engine.store().len().await, 2);
        assert_eq!(engine.get("long").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_nested_prefixes_overlap() {
        let store = MemoryStore::new();
        let outer_config = EngineConfig::default().with_prefix("a:");
        let inner_config = EngineConfig::default().with_prefix("a:b:");
        let outer = MemoryEngine::with_store(&outer_config, store.clone());
        let inner = MemoryEngine::with_store(&inner_config, store);

        inner.set("k", 1, None).await.unwrap();

        assert_eq!(outer.get("b:k").await.unwrap(), Some(1));
        assert_eq!(
            outer.load().await.unwrap(),
            vec![Datum::new("b:k", 1, None)]
        );

        assert!(outer.flush().await.unwrap());
        assert_eq!(inner.get("k").await.unwrap(), None);
    }
}
