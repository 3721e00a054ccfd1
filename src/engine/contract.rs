//! Engine Contract Module
//!
//! The capability set a storage backend must expose to be driven by a cache
//! manager. Memory, disk and network backends all plug in through [`Engine`].

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::engine::base::EngineCore;
use crate::error::Result;

// == Datum ==
/// A persisted record returned in bulk by [`Engine::load`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datum<V> {
    /// Key without the engine prefix
    pub key: String,
    /// Stored value, opaque to the contract
    pub val: V,
    /// Milliseconds until expiry, None = never expires
    pub ttl: Option<u64>,
}

impl<V> Datum<V> {
    pub fn new(key: impl Into<String>, val: V, ttl: Option<u64>) -> Self {
        Self {
            key: key.into(),
            val,
            ttl,
        }
    }
}

// == Operation ==
/// The seven operations of the engine contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Set,
    Del,
    Ttl,
    Load,
    Flush,
    Close,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::Get,
        Operation::Set,
        Operation::Del,
        Operation::Ttl,
        Operation::Load,
        Operation::Flush,
        Operation::Close,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Set => "set",
            Operation::Del => "del",
            Operation::Ttl => "ttl",
            Operation::Load => "load",
            Operation::Flush => "flush",
            Operation::Close => "close",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Engine Trait ==
/// A pluggable storage backend.
///
/// Every data operation is required: an engine that forgets one does not
/// compile. Engines use interior mutability, so all operations take `&self`
/// and a single engine can be shared behind an `Arc`.
///
/// Lifecycle: an engine is constructed, loaded exactly once, used, then
/// closed. [`ManagedEngine`](crate::engine::ManagedEngine) enforces that order
/// for callers that cannot guarantee it themselves.
///
/// No ordering is guaranteed between overlapping calls on the same key; an
/// engine that needs it must serialize internally.
#[async_trait]
pub trait Engine<V>: Send + Sync
where
    V: Send + Sync + 'static,
{
    /// Shared scaffolding for this engine.
    fn core(&self) -> &EngineCore;

    /// Process-unique identifier, fixed at construction.
    fn id(&self) -> &str {
        self.core().id()
    }

    fn prefix(&self) -> &str {
        self.core().prefix()
    }

    /// See [`EngineCore::ts_to_ttl`].
    fn ts_to_ttl(&self, ts: Option<i64>) -> Option<i64> {
        self.core().ts_to_ttl(ts)
    }

    /// Hook receiving the prefix configured by the owning cache.
    ///
    /// Runs once, before `load`. The default ignores it.
    fn process_prefix(&mut self, _prefix: &str) {}

    /// Reads a value. Rarely used, as higher layers keep their own copy.
    async fn get(&self, key: &str) -> Result<Option<V>>;

    /// Stores `val` under `key`, expiring after `ttl` milliseconds if given.
    ///
    /// Returns the stored value.
    async fn set(&self, key: &str, val: V, ttl: Option<u64>) -> Result<V>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn del(&self, key: &str) -> Result<()>;

    /// Replaces the expiry of an existing entry with `ttl` milliseconds from
    /// now. Returns the new TTL, or None if the key is absent.
    async fn ttl(&self, key: &str, ttl: u64) -> Result<Option<u64>>;

    /// Initializes the backend and returns every live persisted record.
    ///
    /// Called exactly once per instance.
    async fn load(&self) -> Result<Vec<Datum<V>>>;

    /// Removes every entry. Always `true` on success.
    async fn flush(&self) -> Result<bool>;

    /// Releases connections and handles without deleting records. Always
    /// `true` on success.
    async fn close(&self) -> Result<bool>;
}

// == Boxed Engines ==
/// Forwards to the boxed engine, so `Box<dyn Engine<V>>` is itself an engine.
#[async_trait]
impl<V, E> Engine<V> for Box<E>
where
    V: Send + Sync + 'static,
    E: Engine<V> + ?Sized,
{
    fn core(&self) -> &EngineCore {
        (**self).core()
    }

    fn id(&self) -> &str {
        (**self).id()
    }

    fn prefix(&self) -> &str {
        (**self).prefix()
    }

    fn ts_to_ttl(&self, ts: Option<i64>) -> Option<i64> {
        (**self).ts_to_ttl(ts)
    }

    fn process_prefix(&mut self, prefix: &str) {
        (**self).process_prefix(prefix)
    }

    async fn get(&self, key: &str) -> Result<Option<V>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, val: V, ttl: Option<u64>) -> Result<V> {
        (**self).set(key, val, ttl).await
    }

    async fn del(&self, key: &str) -> Result<()> {
        (**self).del(key).await
    }

    async fn ttl(&self, key: &str, ttl: u64) -> Result<Option<u64>> {
        (**self).ttl(key, ttl).await
    }

    async fn load(&self) -> Result<Vec<Datum<V>>> {
        (**self).load().await
    }

    async fn flush(&self) -> Result<bool> {
        (**self).flush().await
    }

    async fn close(&self) -> Result<bool> {
        (**self).close().await
    }
}
