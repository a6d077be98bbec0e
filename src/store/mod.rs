//! Persistence for the four game documents.
//!
//! Backends only move raw text; [`Store`] layers JSON encoding, empty
//! defaults for missing documents and the lock registry on top.

mod file;
mod locks;
mod memory;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

use crate::error::{StoreError, StoreResult};
use crate::types::{QuestionPool, Roster, UsedSet, VoteLedger};

pub use file::{FileStore, StorePaths};
pub use locks::{LockKey, LockRegistry};
pub use memory::MemoryStore;

/// The persisted documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    Questions,
    Used,
    Votes,
    Players,
}

impl Document {
    /// Default file name on disk
    pub fn default_file_name(&self) -> &'static str {
        match self {
            Document::Questions => "questions.json",
            Document::Used => "used.json",
            Document::Votes => "votes.json",
            Document::Players => "players.json",
        }
    }
}

/// Raw document storage. Writes must be all-or-nothing.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document, `None` if it does not exist yet
    async fn read(&self, doc: Document) -> StoreResult<Option<String>>;

    /// Replace a document's contents atomically
    async fn write(&self, doc: Document, contents: String) -> StoreResult<()>;

    /// Human-readable location of a document, used in errors and logs
    fn location(&self, doc: Document) -> String;
}

/// Typed access to the documents plus the locks guarding them
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn DocumentStore>,
    locks: Arc<LockRegistry>,
}

impl Store {
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self {
            backend,
            locks: Arc::new(LockRegistry::new()),
        }
    }

    /// Store backed by JSON files on disk
    pub fn files(paths: StorePaths) -> Self {
        Self::new(Arc::new(FileStore::new(paths)))
    }

    /// Store backed by process memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Acquire a logical lock; released when the guard drops
    pub async fn lock(&self, key: LockKey) -> OwnedMutexGuard<()> {
        self.locks.acquire(key).await
    }

    /// Forget idle day locks older than `cutoff`
    pub async fn prune_day_locks(&self, cutoff: chrono::NaiveDate) {
        self.locks.prune_days(cutoff).await;
    }

    /// Load and decode a document, falling back to `T::default()` when missing
    pub async fn load<T>(&self, doc: Document) -> StoreResult<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.backend.read(doc).await? {
            Some(text) if !text.trim().is_empty() => {
                serde_json::from_str(&text).map_err(|source| StoreError::Parse {
                    path: self.backend.location(doc),
                    source,
                })
            }
            _ => Ok(T::default()),
        }
    }

    /// Encode and write a document without taking its lock.
    ///
    /// Callers mutating existing contents should use [`Store::update`].
    pub async fn save<T>(&self, doc: Document, value: &T) -> StoreResult<()>
    where
        T: Serialize,
    {
        let mut text =
            serde_json::to_string_pretty(value).map_err(|source| StoreError::Encode {
                path: self.backend.location(doc),
                source,
            })?;
        text.push('\n');
        self.backend.write(doc, text).await
    }

    /// Read-modify-write a document under its document lock.
    ///
    /// Nothing is written when `f` fails.
    pub async fn update<T, R, E, F>(&self, doc: Document, f: F) -> Result<R, E>
    where
        T: DeserializeOwned + Serialize + Default,
        E: From<StoreError>,
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        let _guard = self.lock(LockKey::Document(doc)).await;
        let mut value: T = self.load(doc).await?;
        let out = f(&mut value)?;
        self.save(doc, &value).await?;
        Ok(out)
    }

    pub async fn questions(&self) -> StoreResult<QuestionPool> {
        self.load(Document::Questions).await
    }

    pub async fn used(&self) -> StoreResult<UsedSet> {
        self.load(Document::Used).await
    }

    pub async fn ledger(&self) -> StoreResult<VoteLedger> {
        self.load(Document::Votes).await
    }

    pub async fn roster(&self) -> StoreResult<Roster> {
        self.load(Document::Players).await
    }
}
