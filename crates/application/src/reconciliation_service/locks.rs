use std::collections::HashMap;
use std::sync::Arc;

use rolegate_core::GroupId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-process registry serializing writes per group.
#[derive(Default)]
pub(crate) struct GroupLockRegistry {
    locks: Mutex<HashMap<GroupId, Arc<Mutex<()>>>>,
}

impl GroupLockRegistry {
    /// Waits for exclusive access to one group.
    pub(crate) async fn acquire(&self, group_id: GroupId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(group_id).or_default())
        };

        lock.lock_owned().await
    }

    /// Drops the lock entry of a deleted group.
    pub(crate) async fn forget(&self, group_id: GroupId) {
        self.locks.lock().await.remove(&group_id);
    }
}
