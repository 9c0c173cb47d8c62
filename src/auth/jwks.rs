// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! The identity provider publishes its signing keys at
//! `https://{domain}/.well-known/jwks.json`. Keys rotate rarely, so the
//! set is held in a read-through cache keyed by key id: a lookup within
//! the TTL is served from memory, a miss (unknown kid or stale cache)
//! refetches the set once before giving up.
//!
//! "Key id not found" and "key set unreachable" are distinct failures:
//! the former rejects the token, the latter is a transient fetch error
//! and is never cached.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::error::AuthError;

/// Default key-set cache TTL (10 minutes).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Timeout for key-set fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A single published signing key.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (`RSA` for Auth0 signing keys).
    pub kty: String,
    /// Key id referenced by token headers.
    pub kid: String,
    /// Intended key use (`sig`).
    #[serde(rename = "use", default)]
    pub key_use: Option<String>,
    /// RSA modulus, base64url.
    pub n: String,
    /// RSA public exponent, base64url.
    pub e: String,
    /// X.509 certificate chain, DER base64.
    #[serde(default)]
    pub x5c: Vec<String>,
}

impl Jwk {
    /// Build a verification key from the RSA components.
    pub fn decoding_key(&self) -> Result<DecodingKey, AuthError> {
        if self.kty != "RSA" {
            return Err(AuthError::KeyNotFound);
        }
        DecodingKey::from_rsa_components(&self.n, &self.e)
            .map_err(|_| AuthError::KeyNotFound)
    }

    /// The leaf certificate in PEM framing, as published in `x5c`.
    ///
    /// This is the provider's wire form of the same key material; the
    /// verifier itself works from the RSA components.
    pub fn pem_certificate(&self) -> Option<String> {
        self.x5c.first().map(|der| {
            format!("-----BEGIN CERTIFICATE-----\n{der}\n-----END CERTIFICATE-----")
        })
    }
}

/// The published key set.
#[derive(Debug, Clone, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Key-set cache entry.
struct CacheEntry {
    keys: Vec<Jwk>,
    fetched_at: Instant,
}

/// JWKS manager with a read-through, TTL-bounded cache.
#[derive(Clone)]
pub struct JwksManager {
    /// JWKS endpoint URL
    jwks_url: String,
    /// Cache TTL
    cache_ttl: Duration,
    /// Cached key set
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// HTTP client
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a manager for a provider domain (no scheme), e.g.
    /// `devpie.eu.auth0.com`.
    pub fn for_domain(domain: &str) -> Self {
        Self::new(format!("https://{domain}/.well-known/jwks.json"))
    }

    /// Create a manager for an explicit JWKS endpoint URL.
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Resolve the signing key for a key id.
    ///
    /// Served from the cached set when fresh; a miss triggers one
    /// refetch before the kid is declared unknown.
    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    if let Some(jwk) = find_key(&entry.keys, kid) {
                        return jwk.decoding_key();
                    }
                    // Fresh cache without the kid: fall through and
                    // refetch, the provider may have rotated keys.
                }
            }
        }

        let keys = self.refresh().await?;
        match find_key(&keys, kid) {
            Some(jwk) => jwk.decoding_key(),
            None => Err(AuthError::KeyNotFound),
        }
    }

    /// Force-refresh the cached key set and return it.
    pub async fn refresh(&self) -> Result<Vec<Jwk>, AuthError> {
        let keys = self.fetch_keys().await?;
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }

    /// Check if a fresh key set is currently cached.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        match &*cache {
            Some(entry) => entry.fetched_at.elapsed() < self.cache_ttl,
            None => false,
        }
    }

    /// Fetch the key set from the endpoint.
    async fn fetch_keys(&self) -> Result<Vec<Jwk>, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?;

        Ok(set.keys)
    }
}

/// Linear scan of the published set for a key id.
fn find_key<'a>(keys: &'a [Jwk], kid: &str) -> Option<&'a Jwk> {
    keys.iter().find(|k| k.kid == kid)
}
