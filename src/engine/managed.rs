//! Managed Engine Module
//!
//! Wraps a concrete engine and enforces its lifecycle:
//! uninitialized -> active (after `load`) -> closed (after `close`).

use async_trait::async_trait;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::engine::base::EngineCore;
use crate::engine::contract::{Datum, Engine, Operation};
use crate::error::{EngineError, Result};

// == Engine State ==
/// Logical lifecycle state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed, `load` not yet called
    Uninitialized,
    /// Loaded and serving operations
    Active,
    /// Closed, no further operations accepted
    Closed,
}

// == Managed Engine ==
/// Lifecycle guard around any [`Engine`].
///
/// Data operations take a shared lock on the state, `load` and `close` take
/// it exclusively, so a close waits for in-flight operations to finish.
///
/// Closing is idempotent: only the first close of a loaded engine reaches the
/// backend, later calls return `Ok(true)`.
pub struct ManagedEngine<V> {
    engine: Box<dyn Engine<V>>,
    state: RwLock<EngineState>,
}

impl<V> ManagedEngine<V>
where
    V: Send + Sync + 'static,
{
    // == Constructor ==
    /// Takes ownership of `engine` and hands it its configured prefix.
    pub fn new<E>(mut engine: E) -> Self
    where
        E: Engine<V> + 'static,
    {
        let prefix = engine.prefix().to_string();
        engine.process_prefix(&prefix);
        debug!(engine = %engine.id(), prefix = %prefix, "engine constructed");

        Self {
            engine: Box::new(engine),
            state: RwLock::new(EngineState::Uninitialized),
        }
    }

    pub async fn state(&self) -> EngineState {
        *self.state.read().await
    }

    /// The wrapped engine, bypassing lifecycle checks.
    pub fn inner(&self) -> &dyn Engine<V> {
        self.engine.as_ref()
    }

    async fn active(&self, op: Operation) -> Result<RwLockReadGuard<'_, EngineState>> {
        let state = self.state.read().await;
        match *state {
            EngineState::Active => Ok(state),
            EngineState::Uninitialized => Err(EngineError::NotLoaded(op)),
            EngineState::Closed => Err(EngineError::Closed(op)),
        }
    }
}

#[async_trait]
impl<V> Engine<V> for ManagedEngine<V>
where
    V: Send + Sync + 'static,
{
    fn core(&self) -> &EngineCore {
        self.engine.core()
    }

    async fn get(&self, key: &str) -> Result<Option<V>> {
        let _active = self.active(Operation::Get).await?;
        debug!(engine = %self.id(), key, "get");
        self.engine.get(key).await
    }

    async fn set(&self, key: &str, val: V, ttl: Option<u64>) -> Result<V> {
        let _active = self.active(Operation::Set).await?;
        debug!(engine = %self.id(), key, ttl, "set");
        self.engine.set(key, val, ttl).await
    }

    async fn del(&self, key: &str) -> Result<()> {
        let _active = self.active(Operation::Del).await?;
        debug!(engine = %self.id(), key, "del");
        self.engine.del(key).await
    }

    async fn ttl(&self, key: &str, ttl: u64) -> Result<Option<u64>> {
        let _active = self.active(Operation::Ttl).await?;
        debug!(engine = %self.id(), key, ttl, "ttl");
        self.engine.ttl(key, ttl).await
    }

    async fn load(&self) -> Result<Vec<Datum<V>>> {
        let mut state = self.state.write().await;
        match *state {
            EngineState::Uninitialized => {}
            EngineState::Active => {
                warn!(engine = %self.id(), "load called on an already loaded engine");
                return Err(EngineError::AlreadyLoaded);
            }
            EngineState::Closed => return Err(EngineError::Closed(Operation::Load)),
        }

        let records = self.engine.load().await?;
        *state = EngineState::Active;
        info!(engine = %self.id(), records = records.len(), "engine loaded");
        Ok(records)
    }

    async fn flush(&self) -> Result<bool> {
        let _active = self.active(Operation::Flush).await?;
        let flushed = self.engine.flush().await?;
        info!(engine = %self.id(), "engine flushed");
        Ok(flushed)
    }

    async fn close(&self) -> Result<bool> {
        let mut state = self.state.write().await;
        match *state {
            EngineState::Active => {
                let closed = self.engine.close().await?;
                *state = EngineState::Closed;
                info!(engine = %self.id(), "engine closed");
                Ok(closed)
            }
            EngineState::Uninitialized => {
                *state = EngineState::Closed;
                debug!(engine = %self.id(), "closed before load, backend untouched");
                Ok(true)
            }
            EngineState::Closed => {
                debug!(engine = %self.id(), "engine already closed");
                Ok(true)
            }
        }
    }
}
