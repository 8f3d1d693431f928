use std::sync::{RwLock, RwLockWriteGuard};

use tracing::warn;

/// Acquire a write guard, recovering the data if another holder panicked.
///
/// LRU reads reorder entries, so every access goes through the write side.
pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                result = "poisoned_recovered",
                "Recovered from poisoned cache lock"
            );
            poisoned.into_inner()
        }
    }
}
