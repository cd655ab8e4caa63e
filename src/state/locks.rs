use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::state::game::GroupId;

/// Registry of per-group mutexes serialising every mutation of a group.
///
/// Entries are created on first use and dropped by [`GroupLocks::release`]
/// once nobody holds or waits on them.
#[derive(Default)]
pub struct GroupLocks {
    locks: DashMap<GroupId, Arc<Mutex<()>>>,
}

impl GroupLocks {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `group_id`.
    pub async fn acquire(&self, group_id: GroupId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the dashmap shard is not held across the await.
        let lock = self.locks.entry(group_id).or_default().clone();
        lock.lock_owned().await
    }

    /// Forget the mutex of `group_id` unless a guard or a waiter still holds it.
    pub fn release(&self, group_id: GroupId) {
        self.locks
            .remove_if(&group_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of groups with a registered mutex.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no group has a registered mutex.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
