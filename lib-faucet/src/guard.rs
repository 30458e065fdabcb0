//! Per-Identity Claim Locks
//!
//! Holds one async mutex per identity with a claim in flight, so two
//! requests for the same fid cannot both pass the cooldown check before
//! either records its claim. Entries are dropped once nobody holds or waits
//! on them, keeping the map bounded by concurrent claimants.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::Fid;

type LockMap = HashMap<Fid, Arc<AsyncMutex<()>>>;

/// Registry of per-identity locks that can be injected as a dependency.
#[derive(Clone, Default)]
pub struct ClaimLocks {
    locks: Arc<Mutex<LockMap>>,
}

impl ClaimLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive claim rights on `fid`.
    pub async fn acquire(&self, fid: Fid) -> ClaimGuard {
        let lock = {
            let mut locks = self.locks.lock();
            // A cancelled acquire leaves its entry behind with no holder or waiter.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(fid).or_default().clone()
        };

        let guard = lock.lock_owned().await;

        ClaimGuard {
            fid,
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Identities currently holding or waiting on a lock.
    pub fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Exclusive claim rights on one identity; released on drop.
pub struct ClaimGuard {
    fid: Fid,
    locks: Arc<Mutex<LockMap>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ClaimGuard {
    pub fn fid(&self) -> Fid {
        self.fid
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        // Release before inspecting the count so the guard's own Arc is gone.
        self.guard.take();
        if let Some(lock) = locks.get(&self.fid) {
            // Only the map still references it: no holder, no waiter.
            if Arc::strong_count(lock) == 1 {
                locks.remove(&self.fid);
            }
        }
    }
}
