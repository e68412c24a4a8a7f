use tracing::debug;

use crate::errors::CoreError;
use crate::models::ledger::Ledger;

use super::manager::{LedgerStore, WriteGuard};

/// Scoped handle on a [`LedgerStore`].
///
/// Opening a session loads a working copy of the ledger. Changes reach the
/// store only through [`Session::commit`]; a session dropped on any other path
/// (early return, `?`, panic) discards them.
///
/// A session from [`Session::open`] is a read-only snapshot. Mutations go
/// through [`Session::open_for_write`], which holds the store's write lock
/// until the session is committed or dropped.
pub struct Session<'a> {
    store: &'a dyn LedgerStore,
    ledger: Ledger,
    dirty: bool,
    writer: Option<WriteGuard<'a>>,
}

impl<'a> Session<'a> {
    pub fn open(store: &'a dyn LedgerStore) -> Result<Self, CoreError> {
        let ledger = store.load()?;
        Ok(Self {
            store,
            ledger,
            dirty: false,
            writer: None,
        })
    }

    /// Blocks until no other write session is open on `store`.
    pub fn open_for_write(store: &'a dyn LedgerStore) -> Result<Self, CoreError> {
        let writer = store.lock_writes();
        let ledger = store.load()?;
        Ok(Self {
            store,
            ledger,
            dirty: false,
            writer: Some(writer),
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Mutable access marks the session as having uncommitted changes.
    pub fn ledger_mut(&mut self) -> &mut Ledger {
        self.dirty = true;
        &mut self.ledger
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    /// Write the working copy back. On failure nothing is written and the
    /// working copy is dropped.
    pub fn commit(mut self) -> Result<(), CoreError> {
        if self.dirty {
            if self.writer.is_none() {
                return Err(CoreError::Storage(
                    "Cannot commit changes made in a read-only session".into(),
                ));
            }
            self.store.save(&self.ledger)?;
        }
        self.dirty = false;
        Ok(())
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if self.dirty {
            debug!("Session closed without commit, discarding changes");
        }
    }
}
