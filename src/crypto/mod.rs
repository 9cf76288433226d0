// ABOUTME: Master-key envelope for private JWK material at rest
// ABOUTME: Authenticated symmetric encryption with a random nonce prefix (secretbox layout)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Master-key envelope.
//!
//! Private key material is serialized as canonical JSON and sealed with
//! XSalsa20-Poly1305 under a process-wide 32-byte secret. The output layout
//! is `nonce(24) ∥ ciphertext‖tag(16)`, nonce emitted verbatim.
//!
//! Nonce randomness (instead of a counter) keeps encryption stateless across
//! restarts and multiple writers; the 24-byte extended nonce makes collision
//! probability negligible at any realistic rotation volume.

use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Key, Nonce, XSalsa20Poly1305};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroize;

use crate::errors::{Error, Result};

/// Master key length in bytes.
pub const MASTER_KEY_LEN: usize = 32;

/// Nonce prefix length in bytes.
pub const NONCE_LEN: usize = 24;

/// Poly1305 authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Minimum length of a valid encrypted blob.
pub const MIN_CIPHERTEXT_LEN: usize = NONCE_LEN + TAG_LEN;

/// Process-wide symmetric secret protecting private JWK payloads.
///
/// Loaded once at startup and shared immutably afterwards.
#[derive(Clone)]
pub struct MasterKey {
    key: [u8; MASTER_KEY_LEN],
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key bytes.
        f.write_str("MasterKey(..)")
    }
}

impl MasterKey {
    /// Create a master key from raw bytes - primarily for testing.
    #[must_use]
    pub const fn from_bytes(key: [u8; MASTER_KEY_LEN]) -> Self {
        Self { key }
    }

    /// Parse a master key from its 64-character hex encoding.
    ///
    /// Inputs that decode to anything other than exactly 32 bytes are
    /// rejected; the key is never padded or truncated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMasterKey`] if the input is empty, not valid
    /// hex, or of the wrong decoded length.
    pub fn from_hex(encoded: &str) -> Result<Self> {
        if encoded.is_empty() {
            return Err(Error::InvalidMasterKey("missing value".to_owned()));
        }

        let mut bytes = hex::decode(encoded)
            .map_err(|err| Error::InvalidMasterKey(format!("invalid hex encoding: {err}")))?;

        if bytes.len() != MASTER_KEY_LEN {
            let got = bytes.len();
            bytes.zeroize();
            return Err(Error::InvalidMasterKey(format!(
                "expected {MASTER_KEY_LEN} bytes, got {got}"
            )));
        }

        let mut key = [0u8; MASTER_KEY_LEN];
        key.copy_from_slice(&bytes);
        bytes.zeroize();

        Ok(Self { key })
    }

    /// Encrypt a serializable value under this key.
    ///
    /// The value is serialized as canonical JSON, a fresh 24-byte nonce is
    /// drawn from the OS RNG, and the result is `nonce ∥ sealed`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or sealing fails.
    pub fn encrypt<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let mut plaintext = serde_json::to_vec(value)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let cipher = XSalsa20Poly1305::new(Key::from_slice(&self.key));
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_slice())
            .map_err(|_| Error::internal("seal private key payload"))?;

        // The serialized plaintext holds private key material.
        plaintext.zeroize();

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&sealed);

        Ok(blob)
    }

    /// Decrypt a blob produced by [`MasterKey::encrypt`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCiphertext`] when the blob is too short to hold a
    ///   nonce and an authentication tag.
    /// - [`Error::InvalidSecret`] when authentication fails.
    /// - [`Error::Serialization`] when the decrypted payload is not valid
    ///   JSON for `T`.
    pub fn decrypt<T: DeserializeOwned>(&self, blob: &[u8]) -> Result<T> {
        if blob.len() < MIN_CIPHERTEXT_LEN {
            return Err(Error::InvalidCiphertext {
                len: blob.len(),
                min: MIN_CIPHERTEXT_LEN,
            });
        }

        let (nonce_bytes, sealed) = blob.split_at(NONCE_LEN);

        let cipher = XSalsa20Poly1305::new(Key::from_slice(&self.key));
        let mut plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| Error::InvalidSecret)?;

        let value = serde_json::from_slice(&plaintext)?;
        plaintext.zeroize();

        Ok(value)
    }
}
