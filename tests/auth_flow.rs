// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! End-to-end token verification against a mock tenant.
//!
//! A token signed by the published key with matching audience, issuer,
//! and expiry verifies; breaking any single one of those conditions is
//! enough to fail the whole check.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;
use wiremock::MockServer;

use devpie_api::api::router;
use devpie_api::auth::{AuthError, TokenVerifier};

use common::*;

async fn verifier_for(server: &MockServer) -> TokenVerifier {
    mount_jwks(server).await;
    TokenVerifier::new(jwks_for(server), TEST_DOMAIN, TEST_AUDIENCE)
}

#[tokio::test]
async fn well_formed_token_verifies() {
    let server = MockServer::start().await;
    let verifier = verifier_for(&server).await;

    let token = sign(&user_claims("auth0|abc123"));
    let user = verifier.verify(&token).await.expect("token verifies");

    assert_eq!(user.subject, "auth0|abc123");
    assert_eq!(user.provider_id().unwrap(), "abc123");
    assert!(user.internal_user_id().is_none());
}

#[tokio::test]
async fn internal_id_claim_is_surfaced() {
    let server = MockServer::start().await;
    let verifier = verifier_for(&server).await;

    let mut claims = user_claims("auth0|abc123");
    claims["https://client.devpie.io/claims/user_id"] = json!("u-1");

    let token = sign(&claims);
    let user = verifier.verify(&token).await.expect("token verifies");

    assert_eq!(user.internal_user_id(), Some("u-1"));
}

#[tokio::test]
async fn wrong_audience_fails() {
    let server = MockServer::start().await;
    let verifier = verifier_for(&server).await;

    let mut claims = user_claims("auth0|abc123");
    claims["aud"] = json!("https://other-api.example.com");

    let result = verifier.verify(&sign(&claims)).await;
    assert!(matches!(result, Err(AuthError::InvalidAudience)));
}

#[tokio::test]
async fn wrong_issuer_fails() {
    let server = MockServer::start().await;
    let verifier = verifier_for(&server).await;

    let mut claims = user_claims("auth0|abc123");
    claims["iss"] = json!("https://evil.example.com/");

    let result = verifier.verify(&sign(&claims)).await;
    assert!(matches!(result, Err(AuthError::InvalidIssuer)));
}

#[tokio::test]
async fn expired_token_fails() {
    let server = MockServer::start().await;
    let verifier = verifier_for(&server).await;

    let mut claims = user_claims("auth0|abc123");
    claims["exp"] = json!(now() - 3600);

    let result = verifier.verify(&sign(&claims)).await;
    assert!(matches!(result, Err(AuthError::TokenExpired)));
}

#[tokio::test]
async fn token_signed_by_unpublished_key_fails() {
    let server = MockServer::start().await;
    let verifier = verifier_for(&server).await;

    // Same kid, different private key: the signature cannot match the
    // published modulus.
    let token = sign_with(WRONG_KEY_PEM, Some(TEST_KID), &user_claims("auth0|abc123"));

    let result = verifier.verify(&token).await;
    assert!(matches!(result, Err(AuthError::InvalidSignature)));
}

#[tokio::test]
async fn unknown_kid_fails_after_refetch() {
    let server = MockServer::start().await;
    let verifier = verifier_for(&server).await;

    // Warm the key-set cache with a good token first.
    let good = sign(&user_claims("auth0|abc123"));
    verifier.verify(&good).await.expect("good token verifies");

    // An unknown kid misses the fresh cache, triggers one refetch, and
    // is then rejected rather than trusted.
    let token = sign_with(SIGNING_KEY_PEM, Some("rotated-away"), &user_claims("auth0|abc123"));

    let result = verifier.verify(&token).await;
    assert!(matches!(result, Err(AuthError::KeyNotFound)));
}

#[tokio::test]
async fn symmetric_token_fails_without_touching_jwks() {
    // No JWKS mock mounted: an HS256 token must be rejected before any
    // key fetch happens.
    let server = MockServer::start().await;
    let verifier = TokenVerifier::new(jwks_for(&server), TEST_DOMAIN, TEST_AUDIENCE);

    let key = jsonwebtoken::EncodingKey::from_secret(b"shared-secret");
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &user_claims("auth0|abc123"),
        &key,
    )
    .unwrap();

    let result = verifier.verify(&token).await;
    assert!(matches!(result, Err(AuthError::InvalidAlgorithm)));
}

#[tokio::test]
async fn protected_routes_reject_unauthenticated_requests() {
    let server = MockServer::start().await;
    mount_jwks(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let app = router(state_for(&server, dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/users/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tampered_token_is_rejected_with_generic_body() {
    let server = MockServer::start().await;
    mount_jwks(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let app = router(state_for(&server, dir.path()));

    let mut token = sign(&user_claims("auth0|abc123"));
    token.replace_range(token.len() - 4.., "AAAA");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/users/me")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error_code"], "invalid_token");
    assert_eq!(body["error"], "Authentication failed");
}

#[tokio::test]
async fn authenticated_request_reaches_handler() {
    let server = MockServer::start().await;
    mount_jwks(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let app = router(state_for(&server, dir.path()));

    let token = sign(&user_claims("auth0|abc123"));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/users/me")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Authentication passed; there is just no record for the subject yet.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_endpoints_skip_authentication() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let app = router(state_for(&server, dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
