use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{Document, DocumentStore};
use crate::error::{StoreError, StoreResult};

/// Where each document lives on disk
#[derive(Debug, Clone, PartialEq)]
pub struct StorePaths {
    pub dir: PathBuf,
    pub questions: String,
    pub used: String,
    pub votes: String,
    pub players: String,
}

impl StorePaths {
    /// Default file names inside `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            questions: Document::Questions.default_file_name().to_string(),
            used: Document::Used.default_file_name().to_string(),
            votes: Document::Votes.default_file_name().to_string(),
            players: Document::Players.default_file_name().to_string(),
        }
    }

    pub fn file_name(&self, doc: Document) -> &str {
        match doc {
            Document::Questions => &self.questions,
            Document::Used => &self.used,
            Document::Votes => &self.votes,
            Document::Players => &self.players,
        }
    }

    pub fn path(&self, doc: Document) -> PathBuf {
        self.dir.join(self.file_name(doc))
    }
}

/// JSON documents as plain files.
///
/// Writes go to a uniquely named temp file in the same directory which is
/// synced and then renamed over the target, so readers see either the old
/// or the new document, never a partial one.
#[derive(Debug, Clone)]
pub struct FileStore {
    paths: StorePaths,
}

impl FileStore {
    pub fn new(paths: StorePaths) -> Self {
        Self { paths }
    }

    fn temp_path(&self, doc: Document) -> PathBuf {
        self.paths.dir.join(format!(
            ".{}.{}.tmp",
            self.paths.file_name(doc),
            ulid::Ulid::new()
        ))
    }
}

async fn write_then_rename(tmp: &Path, target: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(tmp, target).await
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn read(&self, doc: Document) -> StoreResult<Option<String>> {
        let path = self.paths.path(doc);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    async fn write(&self, doc: Document, contents: String) -> StoreResult<()> {
        let target = self.paths.path(doc);
        let tmp = self.temp_path(doc);

        if let Err(source) = write_then_rename(&tmp, &target, contents.as_bytes()).await {
            // The target is untouched; only the temp file may be left behind
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove temp file {}: {}", tmp.display(), e);
                }
            }
            return Err(StoreError::Write {
                path: target.display().to_string(),
                source,
            });
        }

        tracing::debug!("Wrote {} ({} bytes)", target.display(), contents.len());
        Ok(())
    }

    fn location(&self, doc: Document) -> String {
        self.paths.path(doc).display().to_string()
    }
}
