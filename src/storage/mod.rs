// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! # Storage Module
//!
//! Durable storage for the backend's own records. Business entities live
//! in the relational store this service fronts; what is persisted here is
//! the small set of records the service itself owns:
//!
//! ```text
//! /data/
//!   users/{user_id}.json          # Local user records
//!   ma_token/current.json         # The single active M2M credential
//!   sync_failures/{user_id}.json  # Journaled metadata-sync failures
//! ```
//!
//! The management-token store deliberately holds at most one record; see
//! [`repository::ManagementTokenRepository`].

pub mod fs;
pub mod paths;
pub mod repository;

pub use fs::{DataStorage, StorageError, StorageResult};
pub use paths::StoragePaths;
pub use repository::{
    ManagementToken, ManagementTokenRepository, SyncFailure, SyncFailureRepository, UserRepository,
};
