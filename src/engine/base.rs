//! Engine Base Module
//!
//! Scaffolding shared by every engine: identity, prefix, owner handle and
//! the clock used for TTL conversion.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use uuid::Uuid;

use crate::config::EngineConfig;
use crate::engine::clock::{Clock, SystemClock};

/// Produces process-unique engine identifiers.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Returns the default generator, backed by random UUIDs.
pub fn default_id_generator() -> IdGenerator {
    Arc::new(|| Uuid::new_v4().simple().to_string())
}

// == Engine Core ==
/// State every engine carries regardless of its backend.
pub struct EngineCore {
    id: String,
    prefix: String,
    owner: Option<Weak<dyn Any + Send + Sync>>,
    clock: Arc<dyn Clock>,
}

impl EngineCore {
    // == Constructor ==
    /// Creates a core with a fresh id and the system clock.
    pub fn new(config: &EngineConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> EngineCoreBuilder {
        EngineCoreBuilder::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Current time in milliseconds according to the engine clock.
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    // == Timestamp To TTL ==
    /// Converts an absolute expiry timestamp (ms since epoch) into the time
    /// left until it, in milliseconds.
    ///
    /// Returns `None` when no timestamp is given. A negative result means the
    /// timestamp is already in the past. `Some(0)` is the epoch, not "absent",
    /// so it yields a large negative TTL. Results saturate at the `i64` bounds.
    pub fn ts_to_ttl(&self, ts: Option<i64>) -> Option<i64> {
        ts.map(|ts| ts.saturating_sub(self.now_ms()))
    }

    // == Owner ==
    /// Returns the owning cache if it is still alive and of type `T`.
    ///
    /// The core only holds a weak handle, so the owner's lifetime is never
    /// extended by its engine.
    pub fn owner<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.owner
            .as_ref()?
            .upgrade()?
            .downcast::<T>()
            .ok()
    }

    pub fn has_owner(&self) -> bool {
        self.owner
            .as_ref()
            .map(|owner| owner.strong_count() > 0)
            .unwrap_or(false)
    }
}

impl fmt::Debug for EngineCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineCore")
            .field("id", &self.id)
            .field("prefix", &self.prefix)
            .field("has_owner", &self.has_owner())
            .field("clock", &self.clock)
            .finish()
    }
}

// == Builder ==
/// Assembles an [`EngineCore`] with injected capabilities.
#[derive(Default)]
pub struct EngineCoreBuilder {
    prefix: Option<String>,
    owner: Option<Weak<dyn Any + Send + Sync>>,
    clock: Option<Arc<dyn Clock>>,
    id_generator: Option<IdGenerator>,
}

impl EngineCoreBuilder {
    pub fn config(mut self, config: &EngineConfig) -> Self {
        self.prefix = Some(config.prefix.clone());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Records a non-owning handle to the cache manager that owns the engine.
    pub fn owner<T: Any + Send + Sync>(mut self, owner: &Arc<T>) -> Self {
        let owner: Arc<dyn Any + Send + Sync> = owner.clone();
        self.owner = Some(Arc::downgrade(&owner));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, id_generator: IdGenerator) -> Self {
        self.id_generator = Some(id_generator);
        self
    }

    pub fn build(self) -> EngineCore {
        let id_generator = self.id_generator.unwrap_or_else(default_id_generator);

        EngineCore {
            id: id_generator(),
            prefix: self.prefix.unwrap_or_default(),
            owner: self.owner,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        }
    }
}
