//! Write-through JSON snapshots on local disk.

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// A single JSON file holding one table of state.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    path: PathBuf,
}

impl FileSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file contents atomically (temp file + rename).
    pub async fn save<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(value)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!("Saved snapshot ({} bytes) to {:?}", data.len(), self.path);
        Ok(())
    }

    /// Read the file; a missing file yields `T::default()`.
    pub async fn load<T: DeserializeOwned + Default>(&self) -> Result<T, StoreError> {
        if !self.path.exists() {
            info!("Snapshot {:?} not found, starting empty", self.path);
            return Ok(T::default());
        }

        let data = fs::read(&self.path).await?;
        if data.is_empty() {
            return Ok(T::default());
        }

        Ok(serde_json::from_slice(&data)?)
    }
}

/// Storage backend for one owner's state.
#[derive(Debug, Clone)]
pub enum Persistence {
    /// Durable JSON file
    File(FileSnapshot),
    /// Nothing survives a restart
    Memory,
}

impl Persistence {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Persistence::File(FileSnapshot::new(path))
    }

    pub fn memory() -> Self {
        Persistence::Memory
    }

    pub async fn save<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), StoreError> {
        match self {
            Persistence::File(f) => f.save(value).await,
            Persistence::Memory => Ok(()),
        }
    }

    pub async fn load<T: DeserializeOwned + Default>(&self) -> Result<T, StoreError> {
        match self {
            Persistence::File(f) => f.load().await,
            Persistence::Memory => Ok(T::default()),
        }
    }

    /// Load, falling back to an empty value if the snapshot is unreadable.
    pub async fn load_or_default<T: DeserializeOwned + Default>(&self) -> T {
        match self.load().await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to load snapshot {:?}: {}", self.location(), e);
                T::default()
            }
        }
    }

    fn location(&self) -> Option<&Path> {
        match self {
            Persistence::File(f) => Some(f.path()),
            Persistence::Memory => None,
        }
    }
}
