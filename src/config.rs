// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Devpie

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH0_DOMAIN` | Auth0 tenant domain (no scheme) | Required |
//! | `AUTH0_AUDIENCE` | Expected audience of inbound API tokens | Required |
//! | `AUTH0_MAPI_AUDIENCE` | Management-API audience for the M2M exchange | Required |
//! | `AUTH0_M2M_CLIENT_ID` | Client id of the backend's M2M application | Required |
//! | `AUTH0_M2M_CLIENT_SECRET` | Client secret of the M2M application | Required |
//! | `DATA_DIR` | Root directory for persistent records | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;

use crate::storage::paths::DATA_ROOT;

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the log format switch.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Auth0 tenant domain, e.g. `devpie.eu.auth0.com`.
    pub auth0_domain: String,
    /// Expected audience of inbound end-user tokens.
    pub audience: String,
    /// Audience for the management-API credential exchange.
    pub mapi_audience: String,
    /// M2M application client id.
    pub m2m_client_id: String,
    /// M2M application client secret.
    pub m2m_client_secret: String,
    /// Root directory for persistent records.
    pub data_dir: PathBuf,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            auth0_domain: env_required("AUTH0_DOMAIN")?,
            audience: env_required("AUTH0_AUDIENCE")?,
            mapi_audience: env_required("AUTH0_MAPI_AUDIENCE")?,
            m2m_client_id: env_required("AUTH0_M2M_CLIENT_ID")?,
            m2m_client_secret: env_required("AUTH0_M2M_CLIENT_SECRET")?,
            data_dir: PathBuf::from(env_or_default(DATA_DIR_ENV, DATA_ROOT)),
            host: env_or_default("HOST", "0.0.0.0"),
            port: env_or_default("PORT", "8080").parse().map_err(|e| {
                ConfigError::Invalid {
                    name: "PORT",
                    reason: format!("{e}"),
                }
            })?,
        })
    }
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_required(name: &'static str) -> Result<String, ConfigError> {
    env_optional(name).ok_or(ConfigError::Missing(name))
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}
