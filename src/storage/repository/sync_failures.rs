// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! Journal of failed account-metadata syncs.
//!
//! When a user is created locally but the provider-side metadata update
//! fails, local state and provider state disagree. The creation is never
//! rolled back; the failure is journaled here with enough information for
//! a reconciliation pass to retry the patch later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::{DataStorage, StorageResult};

/// A journaled metadata-sync failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncFailure {
    /// Provider subject whose account metadata is missing the internal id.
    pub subject: String,
    /// Internal user id that should be mirrored into the account.
    pub user_id: Uuid,
    /// Error message from the failed attempt.
    pub error: String,
    /// When the failure occurred.
    pub occurred_at: DateTime<Utc>,
}

/// Repository for journaled sync failures, keyed by internal user id.
pub struct SyncFailureRepository<'a> {
    storage: &'a DataStorage,
}

impl<'a> SyncFailureRepository<'a> {
    /// Create repository.
    pub fn new(storage: &'a DataStorage) -> Self {
        Self { storage }
    }

    /// Record a failed sync. A later failure for the same user replaces
    /// the earlier entry; one pending retry per user is enough.
    pub fn record(&self, subject: &str, user_id: Uuid, error: &str) -> StorageResult<()> {
        let failure = SyncFailure {
            subject: subject.to_string(),
            user_id,
            error: error.to_string(),
            occurred_at: Utc::now(),
        };
        self.storage.write_json(
            self.storage.paths().sync_failure(&user_id.to_string()),
            &failure,
        )
    }

    /// List all pending failures.
    pub fn pending(&self) -> StorageResult<Vec<SyncFailure>> {
        let ids = self
            .storage
            .list_files(self.storage.paths().sync_failures_dir(), "json")?;

        let mut failures = Vec::with_capacity(ids.len());
        for id in ids {
            failures.push(
                self.storage
                    .read_json(self.storage.paths().sync_failure(&id))?,
            );
        }
        Ok(failures)
    }

    /// Remove a journal entry after a successful retry.
    pub fn resolve(&self, user_id: &Uuid) -> StorageResult<()> {
        let path = self.storage.paths().sync_failure(&user_id.to_string());
        if self.storage.exists(&path) {
            self.storage.delete(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;

    fn test_storage() -> (DataStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut storage = DataStorage::new(StoragePaths::new(dir.path()));
        storage.initialize().expect("initialize test storage");
        (storage, dir)
    }

    #[test]
    fn record_and_list_pending() {
        let (storage, _dir) = test_storage();
        let repo = SyncFailureRepository::new(&storage);
        let user_id = Uuid::new_v4();

        repo.record("auth0|abc123", user_id, "HTTP 503").unwrap();

        let pending = repo.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].subject, "auth0|abc123");
        assert_eq!(pending[0].user_id, user_id);
        assert_eq!(pending[0].error, "HTTP 503");
    }

    #[test]
    fn repeated_failure_keeps_one_entry_per_user() {
        let (storage, _dir) = test_storage();
        let repo = SyncFailureRepository::new(&storage);
        let user_id = Uuid::new_v4();

        repo.record("auth0|abc123", user_id, "timeout").unwrap();
        repo.record("auth0|abc123", user_id, "HTTP 500").unwrap();

        let pending = repo.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].error, "HTTP 500");
    }

    #[test]
    fn resolve_clears_entry() {
        let (storage, _dir) = test_storage();
        let repo = SyncFailureRepository::new(&storage);
        let user_id = Uuid::new_v4();

        repo.record("auth0|abc123", user_id, "timeout").unwrap();
        repo.resolve(&user_id).unwrap();
        assert!(repo.pending().unwrap().is_empty());

        // Resolving twice is fine.
        repo.resolve(&user_id).unwrap();
    }
}
