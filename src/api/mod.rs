// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::middleware::authenticate,
    models::{NewUser, User},
    state::AppState,
};

pub mod health;
pub mod users;

pub fn router(state: AppState) -> Router {
    // Every /v1 route sits behind the authentication middleware; the
    // verified principal reaches handlers through request extensions.
    let v1_routes = Router::new()
        .route("/users", post(users::create_user))
        .route("/users/me", get(users::get_current_user))
        .route("/users/syncs/retry", post(users::retry_pending_syncs))
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::ready,
        users::create_user,
        users::get_current_user,
        users::retry_pending_syncs
    ),
    components(
        schemas(
            User,
            NewUser,
            users::CreateUserResponse,
            users::MetadataSyncStatus,
            users::RetrySyncResponse,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Users", description = "User records and provider metadata sync")
    )
)]
struct ApiDoc;
