//! File storage module
//!
//! Flat directory of uploaded files, one file per name.

use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("file name {0:?} is not a single path component")]
    InvalidName(String),

    #[error("file content must be text")]
    NotText,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Storage directory handle
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open the storage directory, creating it if missing
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map a caller-supplied name to a path inside the storage directory.
    ///
    /// Only a single normal component is accepted, so `..`, absolute paths and
    /// nested names never reach the filesystem.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.contains(['/', '\\', '\0']) {
            return Err(StoreError::InvalidName(name.to_string()));
        }

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => Ok(self.dir.join(part)),
            _ => Err(StoreError::InvalidName(name.to_string())),
        }
    }

    /// Write `content` as the full contents of `name`, replacing any previous file
    pub async fn write(&self, name: &str, content: &str) -> Result<(), StoreError> {
        let path = self.resolve(name)?;
        fs::write(path, content).await?;
        Ok(())
    }

    pub async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.resolve(name)?;
        Ok(fs::metadata(path).await.is_ok())
    }

    /// Readiness: the directory is still there
    pub async fn is_ready(&self) -> bool {
        fs::metadata(&self.dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }
}
