// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// The variant records which check failed for logging; the HTTP response
/// collapses all token-validation failures into one generic rejection so
/// a caller cannot probe which check it tripped.
#[derive(Debug)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token is malformed
    MalformedToken,
    /// Token signature is invalid
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// Token is not yet valid
    TokenNotYetValid,
    /// Token issuer is invalid
    InvalidIssuer,
    /// Token audience is invalid
    InvalidAudience,
    /// Token signed with an unexpected algorithm
    InvalidAlgorithm,
    /// Signing key set could not be fetched
    JwksFetch(String),
    /// No key in the published set matches the token's key id
    KeyNotFound,
    /// Subject does not match any recognized connection format
    InvalidSubject(String),
    /// Token lacks a required scope
    InsufficientScope,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code exposed to the caller.
    ///
    /// Everything that means "the token failed validation" maps to the
    /// same code; the distinguishing variant goes to the log only.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InsufficientScope => "insufficient_scope",
            _ => "invalid_token",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InsufficientScope => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenNotYetValid => write!(f, "Token is not yet valid"),
            AuthError::InvalidIssuer => write!(f, "Token issuer is invalid"),
            AuthError::InvalidAudience => write!(f, "Token audience is invalid"),
            AuthError::InvalidAlgorithm => write!(f, "Token signing algorithm is not accepted"),
            AuthError::JwksFetch(msg) => write!(f, "Failed to fetch signing keys: {msg}"),
            AuthError::KeyNotFound => write!(f, "No matching signing key found"),
            AuthError::InvalidSubject(sub) => {
                write!(f, "Subject {sub:?} does not match any recognized connection format")
            }
            AuthError::InsufficientScope => {
                write!(f, "Token lacks the required scope")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self.error_code() {
            // Pre-validation failures can be specific; no token was inspected.
            "missing_auth_header" | "invalid_auth_header" => self.to_string(),
            "insufficient_scope" => self.to_string(),
            _ => "Authentication failed".to_string(),
        };
        let body = Json(AuthErrorBody {
            error: message,
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
