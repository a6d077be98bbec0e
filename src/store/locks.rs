use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::Document;

/// Logical resources that are locked independently.
///
/// Acquire in this order to avoid deadlocks: `Selection`, then `Day`,
/// then `Document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKey {
    /// Choosing a day's question (ledger record plus used-set)
    Selection,
    /// Votes for one date
    Day(NaiveDate),
    /// Read-modify-write of a single document
    Document(Document),
}

/// Lazily created async mutexes keyed by [`LockKey`]
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: LockKey) -> OwnedMutexGuard<()> {
        let lock = self.locks.lock().await.entry(key).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop day locks for dates before `cutoff` that nobody holds
    pub async fn prune_days(&self, cutoff: NaiveDate) {
        self.locks.lock().await.retain(|key, lock| match key {
            LockKey::Day(date) if *date < cutoff => Arc::strong_count(lock) > 1,
            _ => true,
        });
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}
