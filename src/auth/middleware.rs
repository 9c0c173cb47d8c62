// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! Authentication middleware for Axum.
//!
//! Applied to the protected router subtree, ahead of every resource
//! handler: the bearer token is verified once, the typed
//! [`AuthenticatedUser`](super::AuthenticatedUser) is stored in request
//! extensions, and handlers pick it up through the
//! [`Auth`](super::Auth) extractor. Which check failed is logged here;
//! the response body stays generic.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::error::AuthError;
use crate::state::AppState;

/// Pull the bearer token out of the Authorization header.
pub fn extract_bearer_token(headers: &axum::http::HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

/// Authentication middleware function.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match extract_bearer_token(request.headers()) {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, "request rejected: no usable bearer token");
            return e.into_response();
        }
    };

    match state.verifier.verify(token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "request rejected: token verification failed");
            e.into_response()
        }
    }
}
