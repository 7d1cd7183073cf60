// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the authorization predicate.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::roles::Role;

/// Claims signed into every token issued by the service.
///
/// Registered fields follow RFC 7519 naming; timestamps are unix seconds.
/// `roles` defaults to empty when absent from the payload, so a decoded
/// `Claims` never lacks a role set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer
    pub iss: String,

    /// Subject - the authenticated user's identifier
    pub sub: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Roles granted to the subject
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Claims {
    /// Build claims for `subject`, issued at `now` and valid for `ttl`.
    ///
    /// Expiry saturates at the largest representable time instead of
    /// overflowing.
    pub fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        roles: Vec<Role>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
                .timestamp(),
            roles,
        }
    }

    /// Returns true iff the caller holds at least one of the `required` roles.
    ///
    /// An empty `required` list is never satisfied.
    pub fn authorized(&self, required: &[Role]) -> bool {
        required.iter().any(|want| self.roles.contains(want))
    }

    /// Issued-at as a UTC timestamp.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }
}
