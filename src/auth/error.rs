// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::http::StatusCode;
use thiserror::Error;

use super::keystore::KeyStoreError;
use super::roles::Role;

/// Authentication and authorization error type.
///
/// Authentication failures map to 401, authorization failures to 403 and
/// key/signing faults to 500 (see [`AuthError::status_code`]).
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid authorization header format
    #[error("expected authorization header format: bearer <token>")]
    InvalidAuthHeader,

    /// Token cannot be decoded
    #[error("Token is malformed: {0}")]
    MalformedToken(String),

    /// Token header carries no key identifier
    #[error("missing key id (kid) in token header")]
    MissingKeyId,

    /// Header algorithm is not the configured one
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// No key registered for the token's key identifier
    #[error("Signing key not found: {kid}")]
    KeyNotFound {
        /// Key ID that was not found.
        kid: String,
    },

    /// Token signature is invalid
    #[error("Token signature is invalid")]
    InvalidSignature,

    /// Token has expired
    #[error("Token has expired")]
    TokenExpired,

    /// Token is not yet valid
    #[error("Token is not yet valid")]
    TokenNotYetValid,

    /// The active signing key can no longer be resolved
    #[error("active KID does not exist in store: {kid}")]
    ActiveKeyMissing {
        /// The configured active key ID.
        kid: String,
    },

    /// Serializing or signing the token failed
    #[error("signing token: {0}")]
    Signing(String),

    /// Key store failure other than a missing key
    #[error("Key store error: {0}")]
    KeyStore(#[source] KeyStoreError),

    /// Authorization ran without authenticated claims in the request context
    #[error("you are not authorized for that action, no claims")]
    MissingClaims,

    /// The caller holds none of the required roles
    #[error(
        "you are not authorized for that action, claims{} roles{}",
        role_list(.roles),
        role_list(.required)
    )]
    Forbidden {
        /// Roles held by the caller.
        roles: Vec<Role>,
        /// Roles accepted by the route.
        required: Vec<Role>,
    },
}

fn role_list(roles: &[Role]) -> String {
    let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
    format!("[{}]", names.join(" "))
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::MissingKeyId => "missing_key_id",
            AuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            AuthError::KeyNotFound { .. } => "key_not_found",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::ActiveKeyMissing { .. } => "active_key_missing",
            AuthError::Signing(_) => "signing_error",
            AuthError::KeyStore(_) => "key_store_error",
            AuthError::MissingClaims => "missing_claims",
            AuthError::Forbidden { .. } => "insufficient_permissions",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidAuthHeader
            | AuthError::MalformedToken(_)
            | AuthError::MissingKeyId
            | AuthError::UnsupportedAlgorithm(_)
            | AuthError::KeyNotFound { .. }
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::TokenNotYetValid => StatusCode::UNAUTHORIZED,
            AuthError::MissingClaims | AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AuthError::ActiveKeyMissing { .. } | AuthError::Signing(_) | AuthError::KeyStore(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to the client.
    ///
    /// Token failures collapse to a fixed text; decoder and key store
    /// details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::InvalidAuthHeader
            | AuthError::MissingClaims
            | AuthError::Forbidden { .. } => self.to_string(),
            AuthError::TokenExpired => "token has expired".to_string(),
            AuthError::TokenNotYetValid => "token is not yet valid".to_string(),
            AuthError::MalformedToken(_)
            | AuthError::MissingKeyId
            | AuthError::UnsupportedAlgorithm(_)
            | AuthError::KeyNotFound { .. }
            | AuthError::InvalidSignature => "invalid token".to_string(),
            AuthError::ActiveKeyMissing { .. } | AuthError::Signing(_) | AuthError::KeyStore(_) => {
                "Internal Server Error".to_string()
            }
        }
    }

    /// Whether the error is a key lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AuthError::KeyNotFound { .. })
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                AuthError::UnsupportedAlgorithm("algorithm not allowed".into())
            }
            _ => AuthError::MalformedToken(err.to_string()),
        }
    }
}

impl From<KeyStoreError> for AuthError {
    fn from(err: KeyStoreError) -> Self {
        match err {
            KeyStoreError::NotFound { kid } => AuthError::KeyNotFound { kid },
            other => AuthError::KeyStore(other),
        }
    }
}
