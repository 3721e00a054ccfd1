//! File Engine Module
//!
//! Persists every record to a single JSON snapshot. Each mutation rewrites
//! the snapshot through a temporary file and a rename, so a crash leaves
//! either the old or the new snapshot on disk.
//!
//! One engine instance should own a snapshot file at a time.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::engine::{Datum, Engine, EngineCore, Operation};
use crate::engines::entry::{live_ttl, StoredEntry};
use crate::error::{EngineError, Result};

const SNAPSHOT_VERSION: u32 = 1;

type Entries<V> = HashMap<String, StoredEntry<V>>;

// == Snapshot Format ==
#[derive(Deserialize)]
struct Snapshot<V> {
    version: u32,
    entries: Entries<V>,
}

#[derive(Serialize)]
struct SnapshotRef<'a, V> {
    version: u32,
    entries: &'a Entries<V>,
}

enum FileState<V> {
    Unloaded,
    Open(Entries<V>),
    Closed,
}

// == File Engine ==
/// Disk-backed engine storing one JSON snapshot per engine.
///
/// Namespaces are matched by plain key prefix, as in
/// [`MemoryStore`](crate::engines::MemoryStore): on a shared snapshot an
/// `"a:"` engine also loads and flushes the keys of an `"a:b:"` engine.
pub struct FileEngine<V> {
    core: EngineCore,
    path: PathBuf,
    namespace: String,
    state: RwLock<FileState<V>>,
}

impl<V> FileEngine<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an engine for the snapshot at `config.path`.
    ///
    /// Nothing is read until `load`.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Self::with_core(EngineCore::new(config), config)
    }

    /// Creates an engine from a prepared core, e.g. one with a manual clock.
    pub fn with_core(core: EngineCore, config: &EngineConfig) -> Result<Self> {
        let path = config.path.clone().ok_or_else(|| {
            EngineError::InvalidConfig("file engine requires a snapshot path".to_string())
        })?;
        let namespace = core.prefix().to_string();

        Ok(Self {
            core,
            path,
            namespace,
            state: RwLock::new(FileState::Unloaded),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    // == Snapshot I/O ==
    async fn read_snapshot(&self) -> Result<Entries<V>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => return Err(err.into()),
        };

        let snapshot: Snapshot<V> = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EngineError::Backend(format!(
                "unsupported snapshot version {} in {}",
                snapshot.version,
                self.path.display()
            )));
        }
        Ok(snapshot.entries)
    }

    async fn write_snapshot(&self, entries: &Entries<V>) -> Result<()> {
        let bytes = serde_json::to_vec(&SnapshotRef {
            version: SNAPSHOT_VERSION,
            entries,
        })?;
        let tmp = self.tmp_path();

        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Persists `next`, then makes it the live copy. A failed write leaves
    /// the live copy untouched so memory never runs ahead of disk.
    async fn commit(&self, state: &mut FileState<V>, next: Entries<V>) -> Result<()> {
        self.write_snapshot(&next).await?;
        *state = FileState::Open(next);
        Ok(())
    }
}

fn open_entries<V>(state: &FileState<V>, op: Operation) -> Result<&Entries<V>> {
    match state {
        FileState::Open(entries) => Ok(entries),
        FileState::Unloaded => Err(EngineError::NotLoaded(op)),
        FileState::Closed => Err(EngineError::Closed(op)),
    }
}

#[async_trait]
impl<V> Engine<V> for FileEngine<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn core(&self) -> &EngineCore {
        &self.core
    }

    fn process_prefix(&mut self, prefix: &str) {
        self.namespace = prefix.to_string();
    }

    /// Expired records read as absent; they are dropped from disk on the next
    /// load rather than on read.
    async fn get(&self, key: &str) -> Result<Option<V>> {
        let state = self.state.read().await;
        let entries = open_entries(&*state, Operation::Get)?;
        let now = self.core.now_ms();

        Ok(entries
            .get(&self.full_key(key))
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.val.clone()))
    }

    async fn set(&self, key: &str, val: V, ttl: Option<u64>) -> Result<V> {
        let mut state = self.state.write().await;
        let mut next = open_entries(&*state, Operation::Set)?.clone();

        let entry = StoredEntry::new(val.clone(), ttl, self.core.now_ms());
        next.insert(self.full_key(key), entry);
        self.commit(&mut *state, next).await?;
        Ok(val)
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let full_key = self.full_key(key);
        let entries = open_entries(&*state, Operation::Del)?;
        if !entries.contains_key(&full_key) {
            return Ok(());
        }

        let mut next = entries.clone();
        next.remove(&full_key);
        self.commit(&mut *state, next).await
    }

    async fn ttl(&self, key: &str, ttl: u64) -> Result<Option<u64>> {
        let mut state = self.state.write().await;
        let mut next = open_entries(&*state, Operation::Ttl)?.clone();
        let now = self.core.now_ms();

        match next.get_mut(&self.full_key(key)) {
            Some(entry) if !entry.is_expired(now) => entry.reset_ttl(ttl, now),
            _ => return Ok(None),
        }

        self.commit(&mut *state, next).await?;
        Ok(Some(ttl))
    }

    async fn load(&self) -> Result<Vec<Datum<V>>> {
        let mut state = self.state.write().await;
        match *state {
            FileState::Unloaded => {}
            FileState::Open(_) => return Err(EngineError::AlreadyLoaded),
            FileState::Closed => return Err(EngineError::Closed(Operation::Load)),
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut entries = self.read_snapshot().await?;
        let mut records = Vec::new();
        let mut expired = Vec::new();

        for (full_key, entry) in &entries {
            let Some(key) = full_key.strip_prefix(self.namespace.as_str()) else {
                continue;
            };
            match live_ttl(self.ts_to_ttl(entry.expires_at)) {
                Some(ttl) => records.push(Datum::new(key, entry.val.clone(), ttl)),
                None => expired.push(full_key.clone()),
            }
        }

        if !expired.is_empty() {
            for full_key in &expired {
                entries.remove(full_key);
            }
            self.write_snapshot(&entries).await?;
        }

        records.sort_by(|a, b| a.key.cmp(&b.key));
        info!(
            engine = %self.id(),
            path = %self.path.display(),
            loaded = records.len(),
            dropped = expired.len(),
            "snapshot loaded"
        );

        *state = FileState::Open(entries);
        Ok(records)
    }

    async fn flush(&self) -> Result<bool> {
        let mut state = self.state.write().await;
        let mut next = open_entries(&*state, Operation::Flush)?.clone();

        if self.namespace.is_empty() {
            next.clear();
        } else {
            next.retain(|key, _| !key.starts_with(&self.namespace));
        }
        self.commit(&mut *state, next).await?;
        Ok(true)
    }

    /// Drops the in-memory copy. The snapshot on disk is left as is.
    async fn close(&self) -> Result<bool> {
        let mut state = self.state.write().await;
        *state = FileState::Closed;
        debug!(engine = %self.id(), path = %self.path.display(), "file engine closed");
        Ok(true)
    }
}
