// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! Bearer-token verification against the provider's published keys.

use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};

use super::claims::{Auth0Claims, AuthenticatedUser};
use super::error::AuthError;
use super::jwks::JwksManager;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Verifies bearer tokens issued by the identity provider.
///
/// One instance per expected audience: the API verifier checks inbound
/// end-user tokens, the credential manager holds a second instance bound
/// to the management-API audience for validating its own M2M token.
#[derive(Clone)]
pub struct TokenVerifier {
    jwks: Arc<JwksManager>,
    issuer: String,
    audience: String,
}

impl TokenVerifier {
    /// Create a verifier.
    ///
    /// `domain` is the provider tenant domain (no scheme); the expected
    /// issuer is derived from it as `https://{domain}/`.
    pub fn new(jwks: Arc<JwksManager>, domain: &str, audience: impl Into<String>) -> Self {
        Self {
            jwks,
            issuer: format!("https://{domain}/"),
            audience: audience.into(),
        }
    }

    /// The expected issuer.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Verify a bearer token and extract the authenticated principal.
    ///
    /// Checks, in order: token structure, signing algorithm (RS256 only —
    /// tokens claiming symmetric or no signing never reach key lookup),
    /// key resolution by kid, signature, audience, issuer, and the
    /// time-based claims with 60 s leeway.
    pub async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidAlgorithm);
        }

        let kid = header.kid.as_deref().ok_or(AuthError::KeyNotFound)?;
        let decoding_key = self.jwks.decoding_key(kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_nbf = true;
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);

        let token_data =
            decode::<Auth0Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                jsonwebtoken::errors::ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => AuthError::InvalidAlgorithm,
                _ => AuthError::MalformedToken,
            })?;

        Ok(AuthenticatedUser::from_claims(token_data.claims))
    }
}
