// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! Repository for local user records.

use chrono::Utc;
use uuid::Uuid;

use crate::models::{NewUser, User};

use super::super::{DataStorage, StorageError, StorageResult};

/// Repository for user records keyed by internal id.
pub struct UserRepository<'a> {
    storage: &'a DataStorage,
}

impl<'a> UserRepository<'a> {
    /// Create repository.
    pub fn new(storage: &'a DataStorage) -> Self {
        Self { storage }
    }

    /// Load a user by internal id.
    pub fn get(&self, user_id: &Uuid) -> StorageResult<User> {
        let path = self.storage.paths().user(&user_id.to_string());
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("user {user_id}")));
        }
        self.storage.read_json(path)
    }

    /// Find a user by provider-assigned id.
    pub fn find_by_auth0_id(&self, auth0_id: &str) -> StorageResult<User> {
        let ids = self
            .storage
            .list_files(self.storage.paths().users_dir(), "json")?;

        for id in ids {
            let user: User = self.storage.read_json(self.storage.paths().user(&id))?;
            if user.auth0_id == auth0_id {
                return Ok(user);
            }
        }

        Err(StorageError::NotFound(format!("user auth0:{auth0_id}")))
    }

    /// Create a user record for the given provider id.
    ///
    /// A provider id maps to at most one local user.
    pub fn create(&self, auth0_id: &str, nu: NewUser) -> StorageResult<User> {
        if self.find_by_auth0_id(auth0_id).is_ok() {
            return Err(StorageError::AlreadyExists(format!(
                "user auth0:{auth0_id}"
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            auth0_id: auth0_id.to_string(),
            email: nu.email,
            first_name: nu.first_name,
            last_name: nu.last_name,
            picture: nu.picture,
            created: Utc::now(),
        };

        self.storage
            .write_json(self.storage.paths().user(&user.id.to_string()), &user)?;

        Ok(user)
    }
}
