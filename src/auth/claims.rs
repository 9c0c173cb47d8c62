// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Namespaced custom claim carrying the internal user id.
///
/// Set by an Auth0 rule after the first login; absent until then.
pub const USER_ID_CLAIM: &str = "https://client.devpie.io/claims/user_id";

/// Connection types recognized in provider subjects (`<connection>|<id>`).
const KNOWN_CONNECTIONS: &[&str] = &[
    "auth0",
    "google-oauth2",
    "github",
    "facebook",
    "apple",
    "windowslive",
];

/// Claims decoded from an Auth0 access token.
#[derive(Debug, Clone, Deserialize)]
pub struct Auth0Claims {
    /// Subject — the provider's stable identifier for the principal.
    pub sub: String,

    /// Expiration timestamp.
    pub exp: i64,

    /// Issued at timestamp.
    #[serde(default)]
    pub iat: Option<i64>,

    /// Not before timestamp.
    #[serde(default)]
    pub nbf: Option<i64>,

    /// Issuer.
    pub iss: String,

    /// Audience — string or array; matched by the validation step, not
    /// read directly.
    #[serde(default)]
    #[allow(dead_code)]
    pub aud: Option<serde_json::Value>,

    /// Space-delimited granted scopes.
    #[serde(default)]
    pub scope: Option<String>,

    /// Internal user id, when the provider was configured to embed one.
    #[serde(default, rename = "https://client.devpie.io/claims/user_id")]
    pub internal_user_id: Option<String>,
}

/// Authenticated principal extracted from a verified token.
///
/// Constructed once by the verifier and passed through request extensions
/// to handlers; downstream code never touches raw claim maps.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    /// Provider subject (`<connection>|<id>` in practice).
    pub subject: String,

    /// Internal user id claim, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_user_id: Option<String>,

    /// Granted scopes (not serialized).
    #[serde(skip)]
    pub scope: Option<String>,

    /// Token expiration (Unix timestamp, not serialized).
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Create from verified claims.
    pub fn from_claims(claims: Auth0Claims) -> Self {
        Self {
            subject: claims.sub,
            internal_user_id: claims.internal_user_id,
            scope: claims.scope,
            expires_at: claims.exp,
        }
    }

    /// The internal user id, when the custom claim was present.
    ///
    /// Absence is a valid state: it means "internal id unknown, resolve
    /// by subject instead".
    pub fn internal_user_id(&self) -> Option<&str> {
        self.internal_user_id.as_deref()
    }

    /// Provider-assigned id parsed out of the subject.
    ///
    /// Subject parsing rule, v1: the subject must be
    /// `<connection>|<opaque-id>` where `<connection>` is one of the
    /// recognized connection types and `<opaque-id>` is non-empty.
    /// Anything else is rejected rather than guessed at.
    pub fn provider_id(&self) -> Result<&str, AuthError> {
        parse_provider_id(&self.subject)
    }

    /// Check the space-delimited `scope` claim for a required permission.
    pub fn has_scope(&self, required: &str) -> bool {
        self.scope
            .as_deref()
            .map(|scopes| scopes.split(' ').any(|s| s == required))
            .unwrap_or(false)
    }

    /// Require a scope, for handlers guarding fine-grained permissions.
    pub fn require_scope(&self, required: &str) -> Result<(), AuthError> {
        if self.has_scope(required) {
            Ok(())
        } else {
            Err(AuthError::InsufficientScope)
        }
    }
}

/// Parse the opaque provider id from a subject string.
fn parse_provider_id(subject: &str) -> Result<&str, AuthError> {
    let (connection, id) = subject
        .split_once('|')
        .ok_or_else(|| AuthError::InvalidSubject(subject.to_string()))?;

    if id.is_empty() || !KNOWN_CONNECTIONS.contains(&connection) {
        return Err(AuthError::InvalidSubject(subject.to_string()));
    }

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, internal_user_id: Option<&str>) -> Auth0Claims {
        Auth0Claims {
            sub: sub.to_string(),
            exp: 1700003600,
            iat: Some(1700000000),
            nbf: None,
            iss: "https://devpie.eu.auth0.com/".to_string(),
            aud: None,
            scope: Some("openid profile read:users".to_string()),
            internal_user_id: internal_user_id.map(str::to_string),
        }
    }

    #[test]
    fn provider_id_strips_connection_prefix() {
        let user = AuthenticatedUser::from_claims(claims("auth0|abc123", None));
        assert_eq!(user.provider_id().unwrap(), "abc123");
        assert!(user.internal_user_id().is_none());
    }

    #[test]
    fn internal_user_id_preferred_when_present() {
        let user = AuthenticatedUser::from_claims(claims("auth0|abc123", Some("u-1")));
        assert_eq!(user.internal_user_id(), Some("u-1"));
    }

    #[test]
    fn custom_claim_deserializes_from_namespace() {
        let json = format!(
            r#"{{"sub":"auth0|abc123","exp":1700003600,"iss":"https://devpie.eu.auth0.com/","{USER_ID_CLAIM}":"u-1"}}"#
        );
        let claims: Auth0Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(claims.internal_user_id.as_deref(), Some("u-1"));
    }

    #[test]
    fn unrecognized_subject_shapes_are_rejected() {
        for sub in ["abc123", "auth0|", "|abc123", "smtp|abc123", ""] {
            let user = AuthenticatedUser::from_claims(claims(sub, None));
            assert!(
                matches!(user.provider_id(), Err(AuthError::InvalidSubject(_))),
                "subject {sub:?} should be rejected"
            );
        }
    }

    #[test]
    fn google_connection_is_recognized() {
        let user = AuthenticatedUser::from_claims(claims("google-oauth2|118", None));
        assert_eq!(user.provider_id().unwrap(), "118");
    }

    #[test]
    fn scope_check_matches_whole_tokens_only() {
        let user = AuthenticatedUser::from_claims(claims("auth0|abc123", None));
        assert!(user.has_scope("read:users"));
        assert!(user.has_scope("openid"));
        assert!(!user.has_scope("read:user"));
        assert!(!user.has_scope("write:users"));
    }

    #[test]
    fn missing_scope_claim_grants_nothing() {
        let mut c = claims("auth0|abc123", None);
        c.scope = None;
        let user = AuthenticatedUser::from_claims(c);
        assert!(!user.has_scope("openid"));
        assert!(user.require_scope("openid").is_err());
    }
}
