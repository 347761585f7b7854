//! Recording store - stable pretty-printed JSON, one recording per file

use crate::events::Recording;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("recording not found: {0}")]
    NotFound(PathBuf),
    #[error("corrupt recording {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StorageError {
    fn corrupt(path: &Path, err: serde_json::Error) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }
}

/// Owns the directory recordings are saved into.
pub struct RecordingStore {
    dir: PathBuf,
}

impl RecordingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map a bare filename onto the store directory; absolute paths and
    /// paths that already exist pass through untouched.
    pub fn resolve(&self, name: &str) -> PathBuf {
        let p = Path::new(name);
        if p.is_absolute() || p.exists() {
            p.to_path_buf()
        } else {
            self.dir.join(name)
        }
    }

    /// Write a frozen recording, creating the directory if absent.
    ///
    /// Pretty-printed so a recording diffs cleanly under version control.
    pub fn save(&self, recording: &Recording, filename: &str) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        let json = serde_json::to_string_pretty(recording).map_err(std::io::Error::other)?;
        fs::write(&path, json)?;
        info!(path = %path.display(), "recording saved");
        Ok(path)
    }

    /// Load a recording from an explicit path.
    pub fn load(path: impl AsRef<Path>) -> Result<Recording, StorageError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StorageError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| StorageError::corrupt(path, e))
    }

    /// Sorted filenames of all recordings in the store.
    pub fn list(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            if let Some(s) = name.to_str() {
                if s.ends_with(".json") {
                    files.push(s.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn delete(&self, filename: &str) -> Result<(), StorageError> {
        fs::remove_file(self.dir.join(filename))?;
        Ok(())
    }
}
