// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! Typed repositories over the JSON record storage.

pub mod management_token;
pub mod sync_failures;
pub mod users;

pub use management_token::{ManagementToken, ManagementTokenRepository};
pub use sync_failures::{SyncFailure, SyncFailureRepository};
pub use users::UserRepository;
