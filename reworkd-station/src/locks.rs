//! Per-station serialization.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One async mutex per station id, shared by every controller bound to that
/// id.
///
/// The lock is held for the whole load-decide-persist span of a trigger, so
/// two concurrent triggers against the same station serialize instead of
/// each deciding on the same stale snapshot and overwriting the other's
/// write. Different stations never contend.
#[derive(Clone, Default)]
pub struct StationLocks {
    locks: Arc<DashMap<u32, Arc<Mutex<()>>>>,
}

impl StationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for a station id, creating it on first use.
    pub fn lock_for(&self, station_id: u32) -> Arc<Mutex<()>> {
        self.locks
            .entry(station_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_id_same_lock() {
        let locks = StationLocks::new();
        let a = locks.lock_for(7);
        let b = locks.lock_for(7);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_different_ids_different_locks() {
        let locks = StationLocks::new();
        let a = locks.lock_for(7);
        let b = locks.lock_for(9);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_lock_serializes() {
        let locks = StationLocks::new();
        let lock = locks.lock_for(7);

        let guard = lock.lock().await;
        assert!(locks.lock_for(7).try_lock().is_err());
        drop(guard);
        assert!(locks.lock_for(7).try_lock().is_ok());
    }
}
