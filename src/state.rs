// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! Shared application state.

use std::sync::Arc;

use crate::auth::{JwksManager, TokenVerifier};
use crate::config::AppConfig;
use crate::providers::{ManagementApiClient, ManagementApiError, ManagementTokenManager};
use crate::storage::{DataStorage, StorageError, StoragePaths};

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("storage initialization failed: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    ManagementApi(#[from] ManagementApiError),
}

/// State shared by every handler.
///
/// Two verifiers share one JWKS cache: `verifier` checks inbound
/// end-user tokens against the API audience, while the credential
/// manager holds its own instance bound to the management audience.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<DataStorage>,
    pub jwks: Arc<JwksManager>,
    pub verifier: Arc<TokenVerifier>,
    pub management: Arc<ManagementTokenManager>,
    pub management_api: Arc<ManagementApiClient>,
}

impl AppState {
    /// Build state from configuration.
    pub fn new(config: &AppConfig) -> Result<Self, StateError> {
        let mut storage = DataStorage::new(StoragePaths::new(&config.data_dir));
        storage.initialize()?;
        let storage = Arc::new(storage);

        let jwks = Arc::new(JwksManager::for_domain(&config.auth0_domain));
        let verifier = Arc::new(TokenVerifier::new(
            Arc::clone(&jwks),
            &config.auth0_domain,
            &config.audience,
        ));

        let management_api = Arc::new(ManagementApiClient::new(
            &config.auth0_domain,
            &config.m2m_client_id,
            &config.m2m_client_secret,
            &config.mapi_audience,
        )?);

        let mapi_verifier = TokenVerifier::new(
            Arc::clone(&jwks),
            &config.auth0_domain,
            &config.mapi_audience,
        );
        let management = Arc::new(ManagementTokenManager::new(
            Arc::clone(&management_api),
            Arc::clone(&storage),
            mapi_verifier,
        ));

        Ok(Self {
            storage,
            jwks,
            verifier,
            management,
            management_api,
        })
    }

    /// Assemble state from already-built components.
    ///
    /// Integration tests use this to point the JWKS and management
    /// endpoints at local mocks.
    pub fn from_parts(
        storage: Arc<DataStorage>,
        jwks: Arc<JwksManager>,
        verifier: Arc<TokenVerifier>,
        management: Arc<ManagementTokenManager>,
        management_api: Arc<ManagementApiClient>,
    ) -> Self {
        Self {
            storage,
            jwks,
            verifier,
            management,
            management_api,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn state_builds_from_config() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = AppConfig {
            auth0_domain: "devpie.eu.auth0.com".to_string(),
            audience: "https://api.devpie.io".to_string(),
            mapi_audience: "https://devpie.eu.auth0.com/api/v2/".to_string(),
            m2m_client_id: "client".to_string(),
            m2m_client_secret: "secret".to_string(),
            data_dir: PathBuf::from(dir.path()),
            host: "127.0.0.1".to_string(),
            port: 8080,
        };

        let state = AppState::new(&config).expect("state builds");
        assert_eq!(
            state.jwks.jwks_url(),
            "https://devpie.eu.auth0.com/.well-known/jwks.json"
        );
        assert!(state.storage.paths().users_dir().exists());
    }
}
