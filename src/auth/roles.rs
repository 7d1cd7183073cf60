// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};

/// User roles carried in token claims.
///
/// ## Vocabulary
///
/// - `Admin` - Administrative access
/// - `User` - Normal authenticated user
///
/// Roles are flat: there is no hierarchy, an `Admin` token does not
/// implicitly satisfy a `User` requirement unless it also carries `USER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Administrative access
    Admin,
    /// Normal user
    User,
}

impl Role {
    /// Wire name of the role as it appears in the `roles` claim.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }

    /// Parse role from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Role> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
