// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! # Authentication Module
//!
//! Auth0 bearer-token authentication for the Devpie API.
//!
//! ## Auth Flow
//!
//! 1. Client authenticates with Auth0 and obtains an access token
//! 2. Client sends `Authorization: Bearer <token>` on every API call
//! 3. Backend:
//!    - Resolves the signing key from the tenant's published JWKS
//!    - Verifies signature, algorithm, audience, issuer, expiry
//!    - Extracts the subject and, when present, the namespaced
//!      internal-user-id claim
//!
//! ## Security
//!
//! - All non-health endpoints require authentication
//! - Only RS256-signed tokens are accepted; symmetric and unsigned
//!   algorithms are rejected before any key lookup
//! - The key set is cached with a bounded TTL and refetched on
//!   unknown key ids
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod verifier;

pub use claims::{Auth0Claims, AuthenticatedUser, USER_ID_CLAIM};
pub use error::AuthError;
pub use extractor::Auth;
pub use jwks::{Jwk, JwksManager};
pub use verifier::TokenVerifier;
