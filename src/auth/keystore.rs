// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing key lookup.
//!
//! ## Key Material
//!
//! - One Ed25519 private key per key identifier (`kid`)
//! - Public keys are derived from the private key on lookup
//! - Directory-backed stores read PKCS#8 PEM files named `<kid>.pem`
//!
//! ## Concurrency
//!
//! `KeyStore` guards its map with a read-write lock: lookups happen on every
//! authenticated request and share the lock, `add`/`remove` take it
//! exclusively.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use base64ct::{Base64UrlUnpadded, Encoding};
use ed25519_dalek::pkcs8::DecodePrivateKey;
use ed25519_dalek::SigningKey;
use jsonwebtoken::{DecodingKey, EncodingKey};
use thiserror::Error;

/// Upper bound on the size of a single key file (1 MiB).
pub const MAX_KEY_FILE_SIZE: u64 = 1024 * 1024;

/// File extension of key files scanned by [`KeyStore::from_dir`].
const KEY_FILE_EXTENSION: &str = "pem";

/// PEM tag of a PKCS#8 private key.
const PKCS8_PEM_TAG: &str = "PRIVATE KEY";

/// PKCS#8 v1 prefix for an Ed25519 private key (RFC 8410).
const ED25519_PKCS8_PREFIX: [u8; 16] = [
    0x30, 0x2e, // SEQUENCE, 46 bytes
    0x02, 0x01, 0x00, // INTEGER version 0
    0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
    0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
    0x04, 0x22, // OCTET STRING, 34 bytes
    0x04, 0x20, // OCTET STRING, 32 bytes (the actual key)
];

/// Key store errors.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// No key is registered under the identifier.
    #[error("kid lookup failed: {kid}")]
    NotFound {
        /// The requested key ID.
        kid: String,
    },

    /// Reading key material from disk failed.
    #[error("reading key file {path}: {source}")]
    Io {
        /// File or directory being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Key file exceeds [`MAX_KEY_FILE_SIZE`].
    #[error("key file {path} exceeds {MAX_KEY_FILE_SIZE} bytes")]
    FileTooLarge {
        /// Offending file.
        path: PathBuf,
    },

    /// Key material could not be parsed.
    #[error("parsing private key: {0}")]
    InvalidKey(String),
}

/// Capability to resolve key identifiers to signing and verification keys.
///
/// Implementations must be safe to share across request tasks.
pub trait KeyLookup: Send + Sync {
    /// Private key for signing, used for the active key only.
    fn private_key(&self, kid: &str) -> Result<EncodingKey, KeyStoreError>;

    /// Public key for verifying a token whose header names `kid`.
    fn public_key(&self, kid: &str) -> Result<DecodingKey, KeyStoreError>;
}

/// An Ed25519 private key.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Parse a PKCS#8 PEM-encoded private key.
    pub fn from_pem(input: &[u8]) -> Result<Self, KeyStoreError> {
        let block = pem::parse(input).map_err(|e| KeyStoreError::InvalidKey(e.to_string()))?;
        if block.tag() != PKCS8_PEM_TAG {
            return Err(KeyStoreError::InvalidKey(format!(
                "unexpected PEM block '{}', expected '{PKCS8_PEM_TAG}'",
                block.tag()
            )));
        }

        SigningKey::from_pkcs8_der(block.contents())
            .map(Self)
            .map_err(|e| KeyStoreError::InvalidKey(e.to_string()))
    }

    /// PKCS#8 PEM encoding of the key.
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(PKCS8_PEM_TAG, self.pkcs8_der()))
    }

    /// Signing key in the form expected by `jsonwebtoken`.
    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_ed_der(&self.pkcs8_der())
    }

    /// Verification key in the form expected by `jsonwebtoken`.
    pub fn decoding_key(&self) -> Result<DecodingKey, KeyStoreError> {
        let x = Base64UrlUnpadded::encode_string(self.0.verifying_key().as_bytes());
        DecodingKey::from_ed_components(&x).map_err(|e| KeyStoreError::InvalidKey(e.to_string()))
    }

    fn pkcs8_der(&self) -> Vec<u8> {
        let mut der = Vec::with_capacity(ED25519_PKCS8_PREFIX.len() + 32);
        der.extend_from_slice(&ED25519_PKCS8_PREFIX);
        der.extend_from_slice(&self.0.to_bytes());
        der
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PrivateKey").field(&"<redacted>").finish()
    }
}

/// In-memory key store implementing [`KeyLookup`].
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: RwLock<HashMap<String, PrivateKey>>,
}

impl KeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding an initial set of keys.
    pub fn from_map(keys: HashMap<String, PrivateKey>) -> Self {
        Self {
            keys: RwLock::new(keys),
        }
    }

    /// Create a store from a directory of `<kid>.pem` files.
    ///
    /// Subdirectories are scanned recursively; files without the `.pem`
    /// extension are ignored. Any unreadable, oversized or unparseable key
    /// file aborts loading.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, KeyStoreError> {
        let mut keys = HashMap::new();
        load_dir(dir.as_ref(), &mut keys)?;

        tracing::info!(
            dir = %dir.as_ref().display(),
            count = keys.len(),
            "Loaded signing keys"
        );

        Ok(Self::from_map(keys))
    }

    /// Add (or replace) the key registered under `kid`.
    pub fn add(&self, kid: impl Into<String>, key: PrivateKey) {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        keys.insert(kid.into(), key);
    }

    /// Remove the key registered under `kid`, returning it if present.
    pub fn remove(&self, kid: &str) -> Option<PrivateKey> {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        keys.remove(kid)
    }

    /// Whether a key is registered under `kid`.
    pub fn contains(&self, kid: &str) -> bool {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        keys.contains_key(kid)
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        keys.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, kid: &str) -> Result<PrivateKey, KeyStoreError> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        keys.get(kid).cloned().ok_or_else(|| KeyStoreError::NotFound {
            kid: kid.to_string(),
        })
    }
}

impl KeyLookup for KeyStore {
    fn private_key(&self, kid: &str) -> Result<EncodingKey, KeyStoreError> {
        self.lookup(kid).map(|key| key.encoding_key())
    }

    fn public_key(&self, kid: &str) -> Result<DecodingKey, KeyStoreError> {
        self.lookup(kid)?.decoding_key()
    }
}

fn load_dir(dir: &Path, keys: &mut HashMap<String, PrivateKey>) -> Result<(), KeyStoreError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| KeyStoreError::Io { path, source }
    };

    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_err(&path))?;

        if file_type.is_dir() {
            load_dir(&path, keys)?;
            continue;
        }

        if path.extension().and_then(|ext| ext.to_str()) != Some(KEY_FILE_EXTENSION) {
            continue;
        }
        let Some(kid) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };

        if keys.contains_key(kid) {
            return Err(KeyStoreError::InvalidKey(format!(
                "duplicate kid {kid}: {}",
                path.display()
            )));
        }

        let contents = read_key_file(&path)?;
        let key = PrivateKey::from_pem(&contents).map_err(|e| {
            KeyStoreError::InvalidKey(format!("{}: {e}", path.display()))
        })?;

        tracing::debug!(kid, path = %path.display(), "Loaded signing key");
        keys.insert(kid.to_string(), key);
    }

    Ok(())
}

fn read_key_file(path: &Path) -> Result<Vec<u8>, KeyStoreError> {
    let file = File::open(path).map_err(|source| KeyStoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // Read one byte past the limit so oversized files (or endless devices)
    // are detected without buffering them.
    let mut contents = Vec::new();
    file.take(MAX_KEY_FILE_SIZE + 1)
        .read_to_end(&mut contents)
        .map_err(|source| KeyStoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    if contents.len() as u64 > MAX_KEY_FILE_SIZE {
        return Err(KeyStoreError::FileTooLarge {
            path: path.to_path_buf(),
        });
    }

    Ok(contents)
}
