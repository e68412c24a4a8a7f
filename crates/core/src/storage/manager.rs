use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::CoreError;
use crate::models::ledger::Ledger;

use super::format;

/// Held by a write session from load until commit or drop.
pub type WriteGuard<'a> = MutexGuard<'a, ()>;

/// Durable home of the [`Ledger`].
///
/// Callers never hold a store's contents directly: they open a
/// [`Session`](super::session::Session), which loads a working copy and writes
/// it back only on commit.
pub trait LedgerStore: Send + Sync {
    fn load(&self) -> Result<Ledger, CoreError>;
    fn save(&self, ledger: &Ledger) -> Result<(), CoreError>;

    /// Exclusive write access. While one guard is alive no other writer can
    /// load, so a commit never overwrites a snapshot it has not seen.
    fn lock_writes(&self) -> WriteGuard<'_>;
}

/// The writer mutex guards no data, so a poisoned one is still usable.
fn acquire(writer: &Mutex<()>) -> WriteGuard<'_> {
    writer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot encoding: Ledger ↔ bytes ↔ file.
pub struct StorageManager;

impl StorageManager {
    /// Flow: Ledger → bincode → TWDB header + payload
    pub fn save_to_bytes(ledger: &Ledger) -> Result<Vec<u8>, CoreError> {
        let payload = bincode::serialize(ledger)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize ledger: {e}")))?;
        Ok(format::write_file(format::CURRENT_VERSION, &payload))
    }

    /// Flow: bytes → parse header → bincode → Ledger
    pub fn load_from_bytes(data: &[u8]) -> Result<Ledger, CoreError> {
        let (_header, payload) = format::read_file(data)?;
        bincode::deserialize(payload)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize ledger: {e}")))
    }

    /// Write to a temporary sibling and rename it into place, so a crash mid-write
    /// leaves the previous snapshot intact.
    pub fn save_to_file(ledger: &Ledger, path: &Path) -> Result<(), CoreError> {
        let bytes = Self::save_to_bytes(ledger)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// A missing file is an empty ledger.
    pub fn load_from_file(path: &Path) -> Result<Ledger, CoreError> {
        if !path.exists() {
            return Ok(Ledger::default());
        }
        let bytes = std::fs::read(path)?;
        Self::load_from_bytes(&bytes)
    }
}

/// Ledger kept in process memory. Used by tests and short-lived tools.
#[derive(Default)]
pub struct MemoryStore {
    ledger: Mutex<Ledger>,
    writer: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            writer: Mutex::new(()),
        }
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Ledger, CoreError> {
        let guard = self
            .ledger
            .lock()
            .map_err(|_| CoreError::Storage("memory store lock poisoned".into()))?;
        Ok(guard.clone())
    }

    fn save(&self, ledger: &Ledger) -> Result<(), CoreError> {
        let mut guard = self
            .ledger
            .lock()
            .map_err(|_| CoreError::Storage("memory store lock poisoned".into()))?;
        *guard = ledger.clone();
        Ok(())
    }

    fn lock_writes(&self) -> WriteGuard<'_> {
        acquire(&self.writer)
    }
}

/// Ledger persisted as a snapshot file on disk.
pub struct FileStore {
    path: PathBuf,
    /// Serializes load/save within this process
    lock: Mutex<()>,
    writer: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for FileStore {
    fn load(&self) -> Result<Ledger, CoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| CoreError::Storage("file store lock poisoned".into()))?;
        StorageManager::load_from_file(&self.path)
    }

    fn save(&self, ledger: &Ledger) -> Result<(), CoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| CoreError::Storage("file store lock poisoned".into()))?;
        StorageManager::save_to_file(ledger, &self.path)
    }

    fn lock_writes(&self) -> WriteGuard<'_> {
        acquire(&self.writer)
    }
}
