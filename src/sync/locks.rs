use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::Id;

/// One async mutex per user, so that two passes for the same user never
/// interleave their load-merge-save cycles.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<Id, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, user_id: &Id) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries only the map refers to are idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(user_id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Users with a pass in flight or queued.
    pub async fn active(&self) -> usize {
        let locks = self.locks.lock().await;
        locks.values().filter(|l| Arc::strong_count(l) > 1).count()
    }
}
