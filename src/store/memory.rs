use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{Document, DocumentStore};
use crate::error::{StoreError, StoreResult};

/// Documents held in process memory.
///
/// Writes can be switched off to simulate a failing disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<Document, String>>,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document before the store is shared
    pub fn with_document(mut self, doc: Document, contents: impl Into<String>) -> Self {
        self.documents.get_mut().insert(doc, contents.into());
        self
    }

    /// Make every subsequent write fail
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Current raw contents of a document
    pub async fn contents(&self, doc: Document) -> Option<String> {
        self.documents.read().await.get(&doc).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, doc: Document) -> StoreResult<Option<String>> {
        Ok(self.documents.read().await.get(&doc).cloned())
    }

    async fn write(&self, doc: Document, contents: String) -> StoreResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::Write {
                path: self.location(doc),
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "store is read-only",
                ),
            });
        }
        self.documents.write().await.insert(doc, contents);
        Ok(())
    }

    fn location(&self, doc: Document) -> String {
        format!("memory:{}", doc.default_file_name())
    }
}
