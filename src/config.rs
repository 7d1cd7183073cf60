// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the service. Configuration is loaded from the environment once
//! at startup; any unparseable value aborts startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SALES_WEB_API_HOST` | API bind address | `0.0.0.0:3000` |
//! | `SALES_WEB_SHUTDOWN_TIMEOUT_SECS` | Grace period for in-flight requests | `20` |
//! | `SALES_AUTH_KEYS_FOLDER` | Directory of `<kid>.pem` private keys | `zarf/keys/` |
//! | `SALES_AUTH_ACTIVE_KID` | Key id used to sign new tokens | `54bb2165-71e1-41a6-af3e-7da4a0e1e2c1` |
//! | `SALES_AUTH_ISSUER` | `iss` claim of issued tokens | `service project` |
//! | `SALES_AUTH_TOKEN_TTL_SECS` | Lifetime of issued tokens, at most 30 days | `3600` |
//! | `SALES_AUTH_SEED_EMAIL` | Email of a seeded account | Optional |
//! | `SALES_AUTH_SEED_PASSWORD` | Password of the seeded account | Required with seed email |
//! | `SALES_AUTH_SEED_ROLES` | Comma-separated roles of the seeded account | `ADMIN,USER` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::auth::Role;

pub const API_HOST_ENV: &str = "SALES_WEB_API_HOST";
pub const SHUTDOWN_TIMEOUT_ENV: &str = "SALES_WEB_SHUTDOWN_TIMEOUT_SECS";
pub const KEYS_FOLDER_ENV: &str = "SALES_AUTH_KEYS_FOLDER";
pub const ACTIVE_KID_ENV: &str = "SALES_AUTH_ACTIVE_KID";
pub const ISSUER_ENV: &str = "SALES_AUTH_ISSUER";
pub const TOKEN_TTL_ENV: &str = "SALES_AUTH_TOKEN_TTL_SECS";
pub const SEED_EMAIL_ENV: &str = "SALES_AUTH_SEED_EMAIL";
pub const SEED_PASSWORD_ENV: &str = "SALES_AUTH_SEED_PASSWORD";
pub const SEED_ROLES_ENV: &str = "SALES_AUTH_SEED_ROLES";

/// Environment variable selecting the log output format.
///
/// # Values
/// - `json` - one JSON object per line, for log shippers
/// - `pretty` - human-readable, for local development
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const DEFAULT_API_PORT: u16 = 3000;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_KEYS_FOLDER: &str = "zarf/keys/";
pub const DEFAULT_ACTIVE_KID: &str = "54bb2165-71e1-41a6-af3e-7da4a0e1e2c1";
pub const DEFAULT_ISSUER: &str = "service project";
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;
/// Longest accepted token lifetime (30 days).
pub const MAX_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;
pub const DEFAULT_SEED_ROLES: &str = "ADMIN,USER";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub api_host: SocketAddr,
    pub shutdown_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub keys_folder: PathBuf,
    pub active_kid: String,
    pub issuer: String,
    pub token_ttl: chrono::Duration,
}

/// Account registered at startup with the in-memory credential verifier.
#[derive(Clone)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
    pub roles: Vec<Role>,
}

impl std::fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedUser")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub web: WebConfig,
    pub auth: AuthConfig,
    pub seed_user: Option<SeedUser>,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// or `None` when unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_host = parse_var(&get, API_HOST_ENV)?
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_API_PORT)));
        let shutdown_secs =
            parse_var(&get, SHUTDOWN_TIMEOUT_ENV)?.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS);

        let token_ttl_secs = parse_var(&get, TOKEN_TTL_ENV)?.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        let token_ttl = (1..=MAX_TOKEN_TTL_SECS)
            .contains(&token_ttl_secs)
            .then(|| chrono::TimeDelta::try_seconds(token_ttl_secs))
            .flatten()
            .ok_or_else(|| ConfigError::Invalid {
                name: TOKEN_TTL_ENV,
                message: format!("must be between 1 and {MAX_TOKEN_TTL_SECS} seconds"),
            })?;

        let auth = AuthConfig {
            keys_folder: get(KEYS_FOLDER_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_KEYS_FOLDER)),
            active_kid: get(ACTIVE_KID_ENV).unwrap_or_else(|| DEFAULT_ACTIVE_KID.into()),
            issuer: get(ISSUER_ENV).unwrap_or_else(|| DEFAULT_ISSUER.into()),
            token_ttl,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    message: format!("'{other}' is not one of json, pretty"),
                })
            }
        };

        Ok(Self {
            web: WebConfig {
                api_host,
                shutdown_timeout: Duration::from_secs(shutdown_secs),
            },
            auth,
            seed_user: seed_user(&get)?,
            log_format,
        })
    }
}

fn parse_var<T, G>(get: &G, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|value| {
            value.trim().parse().map_err(|e| ConfigError::Invalid {
                name,
                message: format!("'{value}': {e}"),
            })
        })
        .transpose()
}

fn seed_user<G>(get: &G) -> Result<Option<SeedUser>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(email) = get(SEED_EMAIL_ENV) else {
        return Ok(None);
    };
    let password = get(SEED_PASSWORD_ENV).ok_or(ConfigError::Missing(SEED_PASSWORD_ENV))?;

    let roles = get(SEED_ROLES_ENV)
        .unwrap_or_else(|| DEFAULT_SEED_ROLES.into())
        .split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(|role| {
            Role::parse(role).ok_or_else(|| ConfigError::Invalid {
                name: SEED_ROLES_ENV,
                message: format!("unknown role '{role}'"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if roles.is_empty() {
        return Err(ConfigError::Invalid {
            name: SEED_ROLES_ENV,
            message: "at least one role is required".to_string(),
        });
    }

    Ok(Some(SeedUser {
        email,
        password,
        roles,
    }))
}
