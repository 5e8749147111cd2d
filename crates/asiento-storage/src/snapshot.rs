use crate::memory::{InMemoryRepository, StoreState};
use crate::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// JSON file holding the whole store, rewritten after every mutation so the
/// ledger survives restarts.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn load(&self) -> StorageResult<StoreState> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No snapshot yet, starting empty");
            return Ok(StoreState::default());
        }

        let bytes = fs::read(&self.path).map_err(|e| self.io_error(e))?;
        if bytes.is_empty() {
            return Ok(StoreState::default());
        }
        let state = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Serialization(format!("{}: {e}", self.path.display())))?;
        info!(path = %self.path.display(), bytes = bytes.len(), "Snapshot loaded");
        Ok(state)
    }

    /// Write to a sibling temp file then rename over the target.
    pub(crate) fn write(&self, state: &StoreState) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, &bytes).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Snapshot written");
        Ok(())
    }

    fn io_error(&self, err: std::io::Error) -> StorageError {
        StorageError::Backend(format!("snapshot {}: {err}", self.path.display()))
    }
}

/// Which backend the repository runs on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Volatile; lost on restart.
    #[default]
    Memory,
    /// In-memory with a JSON snapshot at `path`.
    Snapshot { path: PathBuf },
}

impl StorageConfig {
    pub fn open(&self) -> StorageResult<InMemoryRepository> {
        match self {
            StorageConfig::Memory => Ok(InMemoryRepository::new()),
            StorageConfig::Snapshot { path } => {
                InMemoryRepository::with_snapshot(SnapshotFile::new(path.clone()))
            }
        }
    }
}
