use std::{collections::HashMap, fmt::Debug};

use parking_lot::Mutex;
use tracing::debug;

use crate::types::{Rid, error::{DatabaseError, Result}};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Trait for per-record lock acquisition at the query boundary
pub trait LockManager: Send + Sync + Debug {
    /// Try to take `rid` in `mode` without waiting. Returns false on conflict.
    fn try_lock(&self, rid: Rid, mode: LockMode) -> bool;

    /// Release a lock previously granted by `try_lock`.
    fn unlock(&self, rid: Rid, mode: LockMode);
}

#[derive(Debug, Default, Clone, Copy)]
struct LockState {
    shared: usize,
    exclusive: bool,
}

/// No-wait lock table: conflicting requests fail immediately.
#[derive(Debug, Default)]
pub struct RowLockTable {
    locks: Mutex<HashMap<Rid, LockState>>,
}

impl RowLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held(&self) -> usize {
        self.locks.lock().len()
    }
}

impl LockManager for RowLockTable {
    fn try_lock(&self, rid: Rid, mode: LockMode) -> bool {
        let mut locks = self.locks.lock();
        let state = locks.entry(rid).or_default();
        let granted = match mode {
            LockMode::Shared if !state.exclusive => {
                state.shared += 1;
                true
            }
            LockMode::Exclusive if !state.exclusive && state.shared == 0 => {
                state.exclusive = true;
                true
            }
            _ => false,
        };
        if !granted {
            debug!(rid, ?mode, "record lock conflict");
            if state.shared == 0 && !state.exclusive {
                locks.remove(&rid);
            }
        }
        granted
    }

    fn unlock(&self, rid: Rid, mode: LockMode) {
        let mut locks = self.locks.lock();
        let Some(state) = locks.get_mut(&rid) else {
            return;
        };
        match mode {
            LockMode::Shared => state.shared = state.shared.saturating_sub(1),
            LockMode::Exclusive => state.exclusive = false,
        }
        if state.shared == 0 && !state.exclusive {
            locks.remove(&rid);
        }
    }
}

/// Releases its lock when dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct RidLockGuard<'a> {
    manager: &'a dyn LockManager,
    rid: Rid,
    mode: LockMode,
}

impl<'a> RidLockGuard<'a> {
    pub fn acquire(
        manager: &'a dyn LockManager,
        rid: Rid,
        mode: LockMode,
    ) -> Result<Self> {
        if !manager.try_lock(rid, mode) {
            return Err(DatabaseError::RecordLocked { rid });
        }
        Ok(Self { manager, rid, mode })
    }

    pub fn rid(&self) -> Rid {
        self.rid
    }
}

impl Drop for RidLockGuard<'_> {
    fn drop(&mut self) {
        self.manager.unlock(self.rid, self.mode);
    }
}
