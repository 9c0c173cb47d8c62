// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! Repository for the management-API (M2M) credential.
//!
//! The store holds at most one record. `replace()` writes the new record
//! over the fixed path with an atomic rename, which supersedes the
//! previous credential in the same step — there is no window in which
//! zero or two records exist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::{DataStorage, StorageError, StorageResult};

/// The persisted machine-to-machine credential.
///
/// The access token is itself a signed JWT issued by the identity
/// provider; `expires_at` is derived from the token response at issuance
/// and rechecked against the embedded claims on every use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagementToken {
    /// Record identifier.
    pub id: Uuid,
    /// Opaque access token for the management API.
    pub access_token: String,
    /// Expiration instant.
    pub expires_at: DateTime<Utc>,
    /// Creation instant.
    pub created: DateTime<Utc>,
}

impl ManagementToken {
    /// Whether the credential has passed its expiration instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Repository for the single active management credential.
pub struct ManagementTokenRepository<'a> {
    storage: &'a DataStorage,
}

impl<'a> ManagementTokenRepository<'a> {
    /// Create repository.
    pub fn new(storage: &'a DataStorage) -> Self {
        Self { storage }
    }

    /// Load the currently stored credential, if any.
    pub fn get(&self) -> StorageResult<Option<ManagementToken>> {
        let path = self.storage.paths().ma_token();
        if !self.storage.exists(&path) {
            return Ok(None);
        }
        match self.storage.read_json(&path) {
            Ok(token) => Ok(Some(token)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replace the stored credential with a newly obtained one.
    ///
    /// Called only after the exchange succeeded; a failed refresh never
    /// reaches this point, so the previous record survives it.
    pub fn replace(&self, token: &ManagementToken) -> StorageResult<()> {
        self.storage
            .write_json(self.storage.paths().ma_token(), token)
    }

    /// Remove the stored credential.
    pub fn clear(&self) -> StorageResult<()> {
        let path = self.storage.paths().ma_token();
        if self.storage.exists(&path) {
            self.storage.delete(&path)?;
        }
        Ok(())
    }
}
