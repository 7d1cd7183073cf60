// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User credential verification.
//!
//! The token endpoint depends only on [`CredentialVerifier`]. Persistent
//! user storage lives outside this crate; [`InMemoryUsers`] is the
//! process-local implementation used for seeded accounts and tests.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock};

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::{Claims, Role};
use crate::error::FieldErrors;
use crate::validate::{is_email, Validate};

/// Why a credential check failed.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("user not found")]
    NotFound,

    #[error("authentication failed")]
    AuthenticationFailure,

    #[error("credential store: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("password hash: {0}")]
    Hash(#[source] password_hash::Error),
}

/// Future returned by [`CredentialVerifier::authenticate`].
pub type VerifyFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Claims, CredentialError>> + Send + 'a>>;

/// Checks an email/password pair and produces the claims to sign.
pub trait CredentialVerifier: Send + Sync {
    fn authenticate<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
        now: DateTime<Utc>,
    ) -> VerifyFuture<'a>;
}

/// Body of `POST /v1/users/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Validate for Credentials {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut fields = FieldErrors::new();
        if !is_email(&self.email) {
            fields.add("email", "must be a valid email address");
        }
        if self.password.is_empty() {
            fields.add("password", "is required");
        }
        fields.into_result()
    }
}

struct UserRecord {
    id: String,
    roles: Vec<Role>,
    /// Argon2id hash in PHC string format.
    password_hash: String,
}

/// Process-local user table.
///
/// Passwords are kept as Argon2id PHC strings with a random salt per user.
pub struct InMemoryUsers {
    issuer: String,
    ttl: Duration,
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUsers {
    /// Empty table issuing claims from `issuer`, valid for `ttl`.
    pub fn new(issuer: impl Into<String>, ttl: Duration) -> Self {
        Self {
            issuer: issuer.into(),
            ttl,
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) a user keyed by `email`.
    pub fn insert(
        &self,
        id: impl Into<String>,
        email: &str,
        password: &str,
        roles: Vec<Role>,
    ) -> Result<(), CredentialError> {
        let salt = SaltString::generate(&mut rand::rngs::OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(CredentialError::Hash)?
            .to_string();

        let record = UserRecord {
            id: id.into(),
            roles,
            password_hash,
        };

        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(email.to_ascii_lowercase(), record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn verify(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims, CredentialError> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        let user = users
            .get(&email.to_ascii_lowercase())
            .ok_or(CredentialError::NotFound)?;

        let parsed = PasswordHash::new(&user.password_hash).map_err(CredentialError::Hash)?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => {}
            Err(password_hash::Error::Password) => {
                return Err(CredentialError::AuthenticationFailure)
            }
            Err(err) => return Err(CredentialError::Hash(err)),
        }

        Ok(Claims::new(
            self.issuer.clone(),
            user.id.clone(),
            user.roles.clone(),
            now,
            self.ttl,
        ))
    }
}

impl CredentialVerifier for InMemoryUsers {
    fn authenticate<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
        now: DateTime<Utc>,
    ) -> VerifyFuture<'a> {
        Box::pin(async move { self.verify(email, password, now) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> InMemoryUsers {
        let users = InMemoryUsers::new("service project", Duration::hours(1));
        users
            .insert("u1", "admin@example.com", "gophers", vec![Role::Admin, Role::User])
            .unwrap();
        users
    }

    #[tokio::test]
    async fn correct_password_yields_claims() {
        let now = Utc::now();
        let claims = users()
            .authenticate("admin@example.com", "gophers", now)
            .await
            .unwrap();

        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.iss, "service project");
        assert_eq!(claims.roles, vec![Role::Admin, Role::User]);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[tokio::test]
    async fn email_lookup_ignores_case() {
        let claims = users()
            .authenticate("Admin@Example.com", "gophers", Utc::now())
            .await
            .unwrap();
        assert_eq!(claims.sub, "u1");
    }

    #[tokio::test]
    async fn wrong_password_fails() {
        let err = users()
            .authenticate("admin@example.com", "rustaceans", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::AuthenticationFailure));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let err = users()
            .authenticate("nobody@example.com", "gophers", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::NotFound));
    }

    #[test]
    fn passwords_are_stored_as_salted_argon2id() {
        let users = users();
        users
            .insert("u2", "user@example.com", "gophers", vec![Role::User])
            .unwrap();
        assert_eq!(users.len(), 2);

        let table = users.users.read().unwrap();
        let a = &table["admin@example.com"].password_hash;
        let b = &table["user@example.com"].password_hash;
        assert!(a.starts_with("$argon2id$"), "{a}");
        assert!(!a.contains("gophers"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn corrupt_stored_hash_is_a_hash_error() {
        let users = users();
        users
            .users
            .write()
            .unwrap()
            .get_mut("admin@example.com")
            .unwrap()
            .password_hash = "not a phc string".into();

        let err = users
            .authenticate("admin@example.com", "gophers", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Hash(_)));
    }

    #[test]
    fn credentials_validation_reports_each_field() {
        let creds = Credentials {
            email: "not-an-email".into(),
            password: String::new(),
        };
        let fields = creds.validate().unwrap_err();
        let names: Vec<&str> = fields.0.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["email", "password"]);

        let ok = Credentials {
            email: "admin@example.com".into(),
            password: "gophers".into(),
        };
        assert!(ok.validate().is_ok());
    }
}
