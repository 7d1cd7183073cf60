// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token generation and validation.

use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, encode, Algorithm, Header, Validation};

use super::claims::Claims;
use super::error::AuthError;
use super::keystore::KeyLookup;

/// The only algorithm tokens are signed and accepted with.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::EdDSA;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Issues and verifies bearer tokens.
///
/// Bound to one active key id at construction; new tokens are always signed
/// with that key, while verification resolves whichever `kid` the token
/// header names. Read-only after construction.
pub struct Authenticator {
    active_kid: String,
    keys: Arc<dyn KeyLookup>,
    validation: Validation,
}

impl Authenticator {
    /// Create an authenticator signing with `active_kid`.
    ///
    /// Fails if `active_kid` cannot be resolved to a private key.
    pub fn new(active_kid: impl Into<String>, keys: Arc<dyn KeyLookup>) -> Result<Self, AuthError> {
        let active_kid = active_kid.into();

        keys.private_key(&active_kid)
            .map_err(|_| AuthError::ActiveKeyMissing {
                kid: active_kid.clone(),
            })?;

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            active_kid,
            keys,
            validation,
        })
    }

    /// The key id new tokens are signed with.
    pub fn active_kid(&self) -> &str {
        &self.active_kid
    }

    /// Sign `claims` with the active key.
    pub fn generate_token(&self, claims: &Claims) -> Result<String, AuthError> {
        let mut header = Header::new(SIGNING_ALGORITHM);
        header.kid = Some(self.active_kid.clone());

        let key = self
            .keys
            .private_key(&self.active_kid)
            .map_err(|_| AuthError::ActiveKeyMissing {
                kid: self.active_kid.clone(),
            })?;

        encode(&header, claims, &key).map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify `token` and recover the claims it was generated from.
    ///
    /// The header algorithm is checked against [`SIGNING_ALGORITHM`] before any
    /// key lookup, so unsigned or differently-signed tokens never reach the
    /// key store.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::MalformedToken(format!("decoding header: {e}")))?;

        if header.alg != SIGNING_ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let key = self.keys.public_key(&kid)?;

        let token_data = decode::<Claims>(token, &key, &self.validation)?;

        tracing::debug!(kid = %kid, sub = %token_data.claims.sub, "Token validated");

        Ok(token_data.claims)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("active_kid", &self.active_kid)
            .field("algorithm", &SIGNING_ALGORITHM)
            .finish()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::auth::keystore::{KeyStore, PrivateKey};
    use crate::auth::Role;
    use chrono::{DateTime, Duration, Utc};
    use proptest::prelude::*;

    fn claims() -> impl Strategy<Value = Claims> {
        let now = Utc::now().timestamp();
        (
            "[a-zA-Z0-9 _.-]{1,32}",
            "[a-zA-Z0-9_-]{1,40}",
            prop::collection::vec(prop_oneof![Just(Role::Admin), Just(Role::User)], 0..4),
            (now - 3_000)..(now + 3_000),
            3_600i64..86_400,
        )
            .prop_map(|(iss, sub, roles, iat, ttl)| {
                let issued = DateTime::from_timestamp(iat, 0).unwrap_or_else(Utc::now);
                Claims::new(iss, sub, roles, issued, Duration::seconds(ttl))
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Any claims signed with the active key validate back unchanged.
        #[test]
        fn generate_then_validate_is_identity(claims in claims()) {
            let store = Arc::new(KeyStore::new());
            store.add("k1", PrivateKey::generate());
            let auth = Authenticator::new("k1", store).unwrap();

            let token = auth.generate_token(&claims).unwrap();
            prop_assert_eq!(auth.validate_token(&token).unwrap(), claims);
        }
    }
}
