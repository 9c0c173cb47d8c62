// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```
//!
//! Handlers that guard fine-grained permissions follow up with
//! [`AuthenticatedUser::require_scope`] on the extracted principal.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::middleware::extract_bearer_token;
use super::{AuthError, AuthenticatedUser};
use crate::state::AppState;

/// Extractor for authenticated users.
///
/// The authentication middleware runs ahead of the protected routes and
/// stores the verified principal in request extensions; this extractor
/// hands it to the handler. When a route is wired without the middleware
/// it verifies the bearer token itself, so a handler can never observe
/// an unauthenticated request.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let token = extract_bearer_token(&parts.headers)?;
        let user = state.verifier.verify(token).await?;

        Ok(Auth(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::http::Request;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = AppConfig {
            auth0_domain: "devpie.eu.auth0.com".to_string(),
            audience: "https://api.devpie.io".to_string(),
            mapi_audience: "https://devpie.eu.auth0.com/api/v2/".to_string(),
            m2m_client_id: "client".to_string(),
            m2m_client_secret: "secret".to_string(),
            data_dir: dir.path().to_path_buf(),
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        (AppState::new(&config).expect("build state"), dir)
    }

    fn request_parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn test_user() -> AuthenticatedUser {
        AuthenticatedUser {
            subject: "auth0|abc123".to_string(),
            internal_user_id: None,
            scope: None,
            expires_at: 0,
        }
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _dir) = test_state();
        let mut parts = request_parts(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_rejects_malformed_header() {
        let (state, _dir) = test_state();
        let mut parts = request_parts(Some("Token abc"));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_prefers_extensions() {
        let (state, _dir) = test_state();
        let mut parts = request_parts(None);
        parts.extensions.insert(test_user());

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert_eq!(result.unwrap().0.subject, "auth0|abc123");
    }
}
