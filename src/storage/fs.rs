// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! Filesystem-backed JSON record storage.
//!
//! Records are plain JSON files under the data directory. Writes go to a
//! temp file first and are renamed into place, so a record is either the
//! old version or the new one, never a torn write. That rename is also
//! what keeps the management-token store at exactly one record: replacing
//! the file IS the delete-then-insert.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use super::StoragePaths;

/// Error type for storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations
    Io(io::Error),
    /// JSON serialization/deserialization error
    Json(serde_json::Error),
    /// Record not found
    NotFound(String),
    /// Record already exists
    AlreadyExists(String),
    /// Storage not initialized
    NotInitialized,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Json(e) => write!(f, "JSON error: {e}"),
            StorageError::NotFound(entity) => write!(f, "Not found: {entity}"),
            StorageError::AlreadyExists(entity) => write!(f, "Already exists: {entity}"),
            StorageError::NotInitialized => write!(f, "Storage not initialized"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// JSON record storage rooted at the data directory.
#[derive(Debug, Clone)]
pub struct DataStorage {
    paths: StoragePaths,
    initialized: bool,
}

impl DataStorage {
    /// Create a new DataStorage instance.
    ///
    /// Does NOT create the directory structure. Call `initialize()` first.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Initialize the storage directory structure.
    ///
    /// Safe to call multiple times (idempotent).
    pub fn initialize(&mut self) -> StorageResult<()> {
        let dirs = [
            self.paths.users_dir(),
            self.paths.ma_token_dir(),
            self.paths.sync_failures_dir(),
        ];

        for dir in dirs {
            fs::create_dir_all(&dir)?;
        }

        self.initialized = true;
        Ok(())
    }

    /// Check that the data directory is writable.
    ///
    /// Performs a write-read-delete round trip, used by the readiness probe.
    pub fn health_check(&self) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let test_file = self.paths.root().join(".health_check");
        let test_data = b"health_check_data";

        fs::write(&test_file, test_data)?;
        let read_data = fs::read(&test_file)?;
        fs::remove_file(&test_file)?;

        if read_data != test_data {
            return Err(StorageError::Io(io::Error::other(
                "health check data mismatch",
            )));
        }

        Ok(())
    }

    /// Read a JSON record and deserialize it.
    pub fn read_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StorageResult<T> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let value = serde_json::from_reader(reader)?;
        Ok(value)
    }

    /// Write a JSON record (atomic write via rename).
    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Check if a record exists.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }

    /// Delete a record.
    pub fn delete(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }
        fs::remove_file(path.as_ref())?;
        Ok(())
    }

    /// List record ids (file stems) in a directory with the given extension.
    pub fn list_files(&self, dir: impl AsRef<Path>, extension: &str) -> StorageResult<Vec<String>> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file()
                && path.extension().is_some_and(|ext| ext == extension)
            {
                if let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) {
                    ids.push(id.to_string());
                }
            }
        }
        Ok(ids)
    }
}
