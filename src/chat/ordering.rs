//! Per-conversation send serialization.
//!
//! A send holds its conversation's lock from persistence through broadcast, so
//! every member observes messages in the order they were stored.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct SendOrder {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SendOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive send access to `conversation_id`.
    pub async fn acquire(&self, conversation_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(conversation_id.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry if nobody holds or waits on it.
    pub fn prune(&self, conversation_id: &str) {
        self.locks
            .remove_if(conversation_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
