/*!
 * # Attachment Storage
 *
 * Stored files are addressed by category and bare filename. Categories map to
 * subdirectories under a configured root: `images/`, `files/`, `contracts/`
 * and `archives/`.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum::Display;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid file name: {0}")]
    InvalidName(String),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FileCategory {
    /// Receipt images of items and bookings
    Images,
    /// Confirmation letters and customer attachments
    Files,
    Contracts,
    /// JSON snapshots of deleted bookings
    Archives,
}

impl FileCategory {
    pub fn dir_name(&self) -> &'static str {
        match self {
            FileCategory::Images => "images",
            FileCategory::Files => "files",
            FileCategory::Contracts => "contracts",
            FileCategory::Archives => "archives",
        }
    }
}

/// Only bare file names are accepted; anything that could escape the category
/// directory is rejected.
pub fn validate_file_name(name: &str) -> Result<(), StorageError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains("..")
        || trimmed.contains('\0')
    {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Writes `bytes` under `category/name`, replacing any existing file.
    async fn put(
        &self,
        category: FileCategory,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<PathBuf, StorageError>;

    async fn read(&self, category: FileCategory, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Removes `category/name`. A file that does not exist counts as removed.
    async fn delete(&self, category: FileCategory, name: &str) -> Result<(), StorageError>;

    fn path(&self, category: FileCategory, name: &str) -> Result<PathBuf, StorageError>;
}

/// Filesystem-backed storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put(
        &self,
        category: FileCategory,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<PathBuf, StorageError> {
        let path = self.path(category, name)?;
        let dir = self.root.join(category.dir_name());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io(&dir, e))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::io(&path, e))?;
        debug!(path = %path.display(), "Stored file");
        Ok(path)
    }

    async fn read(&self, category: FileCategory, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path(category, name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::io(&path, e))
    }

    #[instrument(skip(self))]
    async fn delete(&self, category: FileCategory, name: &str) -> Result<(), StorageError> {
        let path = self.path(category, name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted stored file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    fn path(&self, category: FileCategory, name: &str) -> Result<PathBuf, StorageError> {
        validate_file_name(name)?;
        Ok(self.root.join(category.dir_name()).join(name.trim()))
    }
}
