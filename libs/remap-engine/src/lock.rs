use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Read-lock a registry, recovering from poisoning.
pub(crate) fn read<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(g) => g,
        Err(poisoned) => {
            tracing::warn!(registry = what, "read lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Write-lock a registry, recovering from poisoning.
pub(crate) fn write<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(g) => g,
        Err(poisoned) => {
            tracing::warn!(registry = what, "write lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}
