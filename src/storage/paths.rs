// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! Path constants and utilities for the durable storage layout.

use std::path::{Path, PathBuf};

/// Base directory for all persistent data.
pub const DATA_ROOT: &str = "/data";

/// Storage path utilities for the data directory.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all persistent data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== User Paths ==========

    /// Directory containing all user records.
    pub fn users_dir(&self) -> PathBuf {
        self.root.join("users")
    }

    /// Path to a specific user record.
    pub fn user(&self, user_id: &str) -> PathBuf {
        self.users_dir().join(format!("{user_id}.json"))
    }

    // ========== Management Token Paths ==========

    /// Directory holding the management-API credential.
    pub fn ma_token_dir(&self) -> PathBuf {
        self.root.join("ma_token")
    }

    /// Path to the single active management-API credential record.
    pub fn ma_token(&self) -> PathBuf {
        self.ma_token_dir().join("current.json")
    }

    // ========== Metadata Sync Failure Paths ==========

    /// Directory containing journaled metadata-sync failures.
    pub fn sync_failures_dir(&self) -> PathBuf {
        self.root.join("sync_failures")
    }

    /// Path to a journaled sync failure for a given user.
    pub fn sync_failure(&self, user_id: &str) -> PathBuf {
        self.sync_failures_dir().join(format!("{user_id}.json"))
    }
}
