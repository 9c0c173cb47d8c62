// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! Auth0 management-API integration.
//!
//! Two outbound calls live here: the client-credentials exchange that
//! mints the backend's machine-to-machine token, and the account-metadata
//! patch that mirrors a newly created internal user id into the user's
//! Auth0 account. Credential lifecycle (caching, expiry, refresh) is the
//! token manager's job; this client only speaks the wire protocol.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;
use uuid::Uuid;

/// Timeout for management-API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum ManagementApiError {
    #[error("management API configuration invalid: {0}")]
    Config(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("token response was invalid: {0}")]
    InvalidResponse(String),

    #[error("management API request failed: {0}")]
    Request(String),
}

/// Response from the `/oauth/token` client-credentials exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The machine-to-machine access token (itself a signed JWT).
    pub access_token: String,
    /// Token type, `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: i64,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Client for the Auth0 management API.
#[derive(Debug, Clone)]
pub struct ManagementApiClient {
    base_url: String,
    client_id: String,
    client_secret: String,
    mapi_audience: String,
    http: Client,
}

impl ManagementApiClient {
    /// Create a client for a tenant domain (no scheme).
    pub fn new(
        domain: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        mapi_audience: impl Into<String>,
    ) -> Result<Self, ManagementApiError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ManagementApiError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: format!("https://{domain}"),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            mapi_audience: mapi_audience.into(),
            http,
        })
    }

    /// Override the base URL (tests point this at a local mock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Exchange the service's client credentials for a management token.
    ///
    /// `POST /oauth/token` with a form-encoded `client_credentials` grant
    /// bound to the management-API audience.
    pub async fn request_token(&self) -> Result<TokenResponse, ManagementApiError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("audience", self.mapi_audience.as_str()),
        ];

        let response = self
            .http
            .post(format!(
                "{}/oauth/token",
                self.base_url.trim_end_matches('/')
            ))
            .form(&form)
            .send()
            .await
            .map_err(|e| ManagementApiError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ManagementApiError::TokenExchange(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ManagementApiError::InvalidResponse(e.to_string()))?;

        if token.access_token.trim().is_empty() {
            return Err(ManagementApiError::InvalidResponse(
                "token response did not include access_token".to_string(),
            ));
        }

        Ok(token)
    }

    /// Mirror an internal user id into the subject's account metadata.
    ///
    /// `PATCH /api/v2/users/{subject}` setting
    /// `{"app_metadata": {"id": "<user_id>"}}`. Repeating the patch with
    /// the same id leaves the account unchanged, so retries are safe.
    pub async fn update_app_metadata(
        &self,
        access_token: &str,
        subject: &str,
        user_id: Uuid,
    ) -> Result<(), ManagementApiError> {
        let url = self.user_url(subject)?;
        let body = json!({ "app_metadata": { "id": user_id } });

        let response = self
            .http
            .patch(url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ManagementApiError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ManagementApiError::Request(format!(
                "PATCH users/{subject} returned {status}: {body}"
            )));
        }

        Ok(())
    }

    /// Build the account-management URL for a subject.
    ///
    /// RFC 3986 leaves `|` out of pchar, and every subject carries one as
    /// its connection separator, so it is percent-encoded explicitly.
    fn user_url(&self, subject: &str) -> Result<Url, ManagementApiError> {
        let encoded = subject.replace('%', "%25").replace('|', "%7C");
        Url::parse(&format!(
            "{}/api/v2/users/{encoded}",
            self.base_url.trim_end_matches('/')
        ))
        .map_err(|e| ManagementApiError::Config(format!("invalid management URL: {e}")))
    }
}
