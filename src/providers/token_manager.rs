// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! Lifecycle of the machine-to-machine management credential.
//!
//! The credential moves through `absent → active → expired → active`
//! and is refreshed through the client-credentials exchange. Reads are
//! fully concurrent; refreshes serialize behind a single gate so that
//! any number of callers racing an absent or expired credential produce
//! exactly one token-endpoint call and exactly one persisted record.
//!
//! The stored token is itself a JWT signed by the identity provider, so
//! it is validated the same way inbound tokens are: signature against
//! the published key set, expiry with leeway, management-API audience.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::auth::TokenVerifier;
use crate::storage::{DataStorage, ManagementToken, ManagementTokenRepository};

use super::auth0::{ManagementApiClient, ManagementApiError};

/// Local expiry margin: a credential this close to expiry is refreshed
/// rather than handed out mid-request.
const EXPIRY_LEEWAY_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error(transparent)]
    Exchange(#[from] ManagementApiError),

    #[error("failed to persist management credential: {0}")]
    Storage(String),

    #[error("credential refresh task failed")]
    RefreshTask,
}

/// Owner of the single active management credential.
///
/// No other component writes the persisted record; consumers receive a
/// clone of the active credential and treat it as read-only.
pub struct ManagementTokenManager {
    client: Arc<ManagementApiClient>,
    storage: Arc<DataStorage>,
    verifier: TokenVerifier,
    cached: Arc<RwLock<Option<ManagementToken>>>,
    refresh_gate: Mutex<()>,
}

impl ManagementTokenManager {
    /// Create a manager.
    ///
    /// `verifier` must be bound to the management-API audience, not the
    /// end-user API audience.
    pub fn new(
        client: Arc<ManagementApiClient>,
        storage: Arc<DataStorage>,
        verifier: TokenVerifier,
    ) -> Self {
        Self {
            client,
            storage,
            verifier,
            cached: Arc::new(RwLock::new(None)),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Return the active credential, refreshing it if absent or expired.
    ///
    /// Concurrent callers coalesce: whoever wins the refresh gate runs
    /// the exchange, everyone else re-checks the published result after
    /// the gate opens and reuses it.
    pub async fn get_or_refresh(&self) -> Result<ManagementToken, CredentialError> {
        if let Some(token) = self.current_valid().await {
            return Ok(token);
        }

        let _gate = self.refresh_gate.lock().await;

        // A racing caller may have refreshed while this one waited.
        if let Some(token) = self.current_valid().await {
            return Ok(token);
        }

        self.refresh().await
    }

    /// Run the exchange and replace the stored credential.
    ///
    /// The exchange runs on its own task: a caller whose request is
    /// cancelled mid-refresh does not abort work that waiters behind the
    /// gate are going to reuse. The previous record is only replaced
    /// after the new credential is confirmed obtained.
    async fn refresh(&self) -> Result<ManagementToken, CredentialError> {
        let client = Arc::clone(&self.client);
        let storage = Arc::clone(&self.storage);
        let cached = Arc::clone(&self.cached);

        let handle = tokio::spawn(async move {
            let response = client.request_token().await?;

            let now = Utc::now();
            let token = ManagementToken {
                id: Uuid::new_v4(),
                access_token: response.access_token,
                expires_at: now + Duration::seconds(response.expires_in),
                created: now,
            };

            ManagementTokenRepository::new(&storage)
                .replace(&token)
                .map_err(|e| CredentialError::Storage(e.to_string()))?;

            *cached.write().await = Some(token.clone());

            tracing::info!(
                expires_at = %token.expires_at,
                "management credential refreshed"
            );

            Ok::<ManagementToken, CredentialError>(token)
        });

        handle.await.map_err(|_| CredentialError::RefreshTask)?
    }

    /// The active credential, if one exists and still validates.
    async fn current_valid(&self) -> Option<ManagementToken> {
        // Snapshot the cache; the guard must not be held across the
        // write below.
        let snapshot = self.cached.read().await.clone();

        let token = match snapshot {
            Some(token) => Some(token),
            // Cold start: adopt a previously persisted credential.
            None => match ManagementTokenRepository::new(&self.storage).get() {
                Ok(Some(token)) => {
                    *self.cached.write().await = Some(token.clone());
                    Some(token)
                }
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read stored management credential");
                    None
                }
            },
        }?;

        if token.is_expired(Utc::now() + Duration::seconds(EXPIRY_LEEWAY_SECS)) {
            return None;
        }

        // The cheap clock check passed; confirm the token itself still
        // verifies against the provider's keys.
        match self.verifier.verify(&token.access_token).await {
            Ok(_) => Some(token),
            Err(e) => {
                tracing::debug!(error = %e, "stored management credential failed validation");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwksManager;
    use crate::storage::StoragePaths;

    fn test_manager(base_url: &str) -> (ManagementTokenManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut storage = DataStorage::new(StoragePaths::new(dir.path()));
        storage.initialize().expect("initialize test storage");
        let storage = Arc::new(storage);

        let client = ManagementApiClient::new(
            "devpie.eu.auth0.com",
            "client-id",
            "client-secret",
            "https://devpie.eu.auth0.com/api/v2/",
        )
        .unwrap()
        .with_base_url(base_url);

        let jwks = Arc::new(JwksManager::for_domain("devpie.eu.auth0.com"));
        let verifier = TokenVerifier::new(
            jwks,
            "devpie.eu.auth0.com",
            "https://devpie.eu.auth0.com/api/v2/",
        );

        (
            ManagementTokenManager::new(Arc::new(client), storage, verifier),
            dir,
        )
    }

    #[tokio::test]
    async fn failed_exchange_leaves_store_untouched() {
        // Unreachable token endpoint: refresh fails, nothing persisted.
        let (manager, _dir) = test_manager("http://127.0.0.1:9");

        let result = manager.get_or_refresh().await;
        assert!(matches!(result, Err(CredentialError::Exchange(_))));

        let stored = ManagementTokenRepository::new(&manager.storage)
            .get()
            .unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn expired_stored_credential_is_not_served() {
        let (manager, _dir) = test_manager("http://127.0.0.1:9");

        let now = Utc::now();
        ManagementTokenRepository::new(&manager.storage)
            .replace(&ManagementToken {
                id: Uuid::new_v4(),
                access_token: "stale".to_string(),
                expires_at: now - Duration::hours(1),
                created: now - Duration::hours(25),
            })
            .unwrap();

        // The stored credential is expired, so the manager must attempt a
        // refresh; with the endpoint unreachable that fails...
        let result = manager.get_or_refresh().await;
        assert!(matches!(result, Err(CredentialError::Exchange(_))));

        // ...and the failure must not have clobbered the stored record.
        let stored = ManagementTokenRepository::new(&manager.storage)
            .get()
            .unwrap()
            .expect("previous record preserved");
        assert_eq!(stored.access_token, "stale");
    }
}
