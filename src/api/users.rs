// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! User endpoints.
//!
//! Creation is the one flow that crosses the trust boundary twice: the
//! local record is committed first, then the backend uses its
//! machine-to-machine credential to mirror the new internal id into the
//! subject's provider account. The local commit is the system of record;
//! a failed mirror never rolls it back, it is journaled and reported as
//! `metadata_sync: "pending"`.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{NewUser, User};
use crate::state::AppState;
use crate::storage::{SyncFailureRepository, UserRepository};

/// Outcome of the provider-side metadata update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSyncStatus {
    /// The provider account now carries the internal id.
    Ok,
    /// The update failed and is journaled for a reconciliation retry.
    Pending,
}

/// Response for POST /v1/users.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateUserResponse {
    /// The created user.
    #[serde(flatten)]
    pub user: User,
    /// Whether the provider account was updated with the internal id.
    pub metadata_sync: MetadataSyncStatus,
}

/// Create the local user record for the authenticated subject.
///
/// The record is committed before the provider sync runs; a sync failure
/// still yields 201 with `metadata_sync: "pending"`.
#[utoipa::path(
    post,
    path = "/v1/users",
    tag = "Users",
    security(("bearer" = [])),
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = CreateUserResponse),
        (status = 400, description = "Unrecognized subject format"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 409, description = "User already exists for this subject"),
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(nu): Json<NewUser>,
) -> Result<(StatusCode, Json<CreateUserResponse>), ApiError> {
    let auth0_id = user.provider_id().map_err(|e| {
        tracing::warn!(error = %e, "user creation rejected");
        ApiError::bad_request("unrecognized subject format")
    })?;

    let created = UserRepository::new(&state.storage).create(auth0_id, nu)?;

    tracing::info!(user_id = %created.id, "user created");

    let metadata_sync = sync_account_metadata(&state, &user.subject, &created).await;

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            user: created,
            metadata_sync,
        }),
    ))
}

/// Get the current authenticated user's record.
///
/// Prefers the internal-id claim when the provider embedded one; falls
/// back to looking the record up by the provider id parsed from the
/// subject.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User record", body = User),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "No local record for this subject"),
    )
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<User>, ApiError> {
    let repo = UserRepository::new(&state.storage);

    let record = match user.internal_user_id() {
        Some(id) => {
            let id = Uuid::parse_str(id)
                .map_err(|_| ApiError::bad_request("invalid user id claim"))?;
            repo.get(&id)?
        }
        None => {
            let provider_id = user
                .provider_id()
                .map_err(|_| ApiError::bad_request("unrecognized subject format"))?;
            repo.find_by_auth0_id(provider_id)?
        }
    };

    Ok(Json(record))
}

/// Mirror the internal user id into the subject's provider account.
///
/// Uses the managed M2M credential; on any failure the attempt is
/// journaled with enough context to retry later.
async fn sync_account_metadata(
    state: &AppState,
    subject: &str,
    user: &User,
) -> MetadataSyncStatus {
    let result = async {
        let credential = state
            .management
            .get_or_refresh()
            .await
            .map_err(|e| e.to_string())?;
        state
            .management_api
            .update_app_metadata(&credential.access_token, subject, user.id)
            .await
            .map_err(|e| e.to_string())
    }
    .await;

    match result {
        Ok(()) => MetadataSyncStatus::Ok,
        Err(error) => {
            tracing::warn!(
                subject = %subject,
                user_id = %user.id,
                error = %error,
                "account metadata sync failed; journaled for retry"
            );
            if let Err(e) = SyncFailureRepository::new(&state.storage).record(subject, user.id, &error)
            {
                tracing::error!(error = %e, "failed to journal metadata-sync failure");
            }
            MetadataSyncStatus::Pending
        }
    }
}

/// Response for POST /v1/users/syncs/retry.
#[derive(Debug, Serialize, ToSchema)]
pub struct RetrySyncResponse {
    /// Journal entries resolved by this pass.
    pub resolved: usize,
    /// Entries still pending after this pass.
    pub pending: usize,
}

/// Retry journaled metadata syncs.
///
/// Reconciliation pass over the sync-failure journal; resolved entries
/// are removed, still-failing ones stay journaled. Requires the
/// `update:users` scope on the caller's token.
#[utoipa::path(
    post,
    path = "/v1/users/syncs/retry",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Reconciliation pass completed", body = RetrySyncResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Token lacks the update:users scope"),
    )
)]
pub async fn retry_pending_syncs(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<RetrySyncResponse>, ApiError> {
    user.require_scope("update:users")
        .map_err(|_| ApiError::new(StatusCode::FORBIDDEN, "update:users scope required"))?;

    let failures = SyncFailureRepository::new(&state.storage).pending()?;
    if failures.is_empty() {
        return Ok(Json(RetrySyncResponse {
            resolved: 0,
            pending: 0,
        }));
    }

    let credential = state.management.get_or_refresh().await?;

    let mut resolved = 0;
    let mut pending = 0;
    for failure in failures {
        match state
            .management_api
            .update_app_metadata(&credential.access_token, &failure.subject, failure.user_id)
            .await
        {
            Ok(()) => {
                SyncFailureRepository::new(&state.storage).resolve(&failure.user_id)?;
                resolved += 1;
            }
            Err(e) => {
                pending += 1;
                tracing::warn!(
                    subject = %failure.subject,
                    user_id = %failure.user_id,
                    error = %e,
                    "metadata sync retry failed; entry kept"
                );
            }
        }
    }

    Ok(Json(RetrySyncResponse { resolved, pending }))
}
