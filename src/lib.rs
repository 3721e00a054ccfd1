//! Cache Engine - pluggable storage backends for TTL caches
//!
//! Defines the [`Engine`] contract a cache manager drives (get, set, del,
//! ttl, load, flush, close), the shared scaffolding every engine carries,
//! and two reference engines: in-memory and JSON snapshot on disk.

pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod tasks;

pub use config::EngineConfig;
pub use engine::{Datum, Engine, EngineCore, EngineState, ManagedEngine, Operation};
pub use engines::{FileEngine, MemoryEngine, MemoryStore};
pub use error::{EngineError, Result};
pub use tasks::spawn_purge_task;
