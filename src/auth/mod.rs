// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Token issuing and verification for the Sales API.
//!
//! ## Auth Flow
//!
//! 1. A client exchanges credentials for a token (`POST /v1/users/token`)
//! 2. The service signs [`Claims`] with the active key and stamps its `kid`
//! 3. The client sends `Authorization: Bearer <token>` on later requests
//! 4. The service:
//!    - Resolves the public key named by the token's `kid`
//!    - Verifies signature, algorithm and expiry
//!    - Places the claims in the request context for authorization
//!
//! ## Security
//!
//! - Only EdDSA (Ed25519) tokens are issued or accepted
//! - `none` and symmetric algorithms are rejected before key lookup
//! - Clock skew tolerance is 60 seconds
//! - No session state: every decision rests on the signed token

pub mod authenticator;
pub mod claims;
pub mod error;
pub mod keystore;
pub mod roles;

pub use authenticator::{Authenticator, SIGNING_ALGORITHM};
pub use claims::Claims;
pub use error::AuthError;
pub use keystore::{KeyLookup, KeyStore, KeyStoreError, PrivateKey};
pub use roles::Role;
