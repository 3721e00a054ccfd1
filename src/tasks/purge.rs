//! TTL Purge Task
//!
//! Background task that periodically removes expired memory engine entries.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::engines::MemoryEngine;
use crate::error::Result;

/// Spawns a background task that purges expired entries from `engine`.
///
/// The task sleeps for `config.purge_interval_secs` between runs and never
/// finishes on its own; abort the returned handle once the engine is closed.
/// A zero interval is rejected with `EngineError::InvalidConfig`.
///
/// # Example
/// ```ignore
/// let engine = Arc::new(MemoryEngine::<String>::new(&config));
/// let purge_handle = spawn_purge_task(engine.clone(), &config)?;
/// // Later, during shutdown:
/// purge_handle.abort();
/// ```
pub fn spawn_purge_task<V>(
    engine: Arc<MemoryEngine<V>>,
    config: &EngineConfig,
) -> Result<JoinHandle<()>>
where
    V: Clone + Send + Sync + 'static,
{
    let interval = config.purge_interval()?;

    Ok(tokio::spawn(async move {
        info!(
            engine = %engine.id(),
            "Starting TTL purge task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = engine.purge_expired().await;

            if removed > 0 {
                info!(engine = %engine.id(), "TTL purge: removed {} expired entries", removed);
            } else {
                debug!(engine = %engine.id(), "TTL purge: no expired entries found");
            }
        }
    }))
}
