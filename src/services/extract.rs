// ABOUTME: Decodes stored key rows back into typed JWK values
// ABOUTME: Decrypts the private branch, plain-decodes the public branch
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::crypto::MasterKey;
use crate::database::Key;
use crate::errors::{Error, Result};
use crate::jwk::Jwk;

/// Turns persisted rows back into [`Jwk`] values.
#[derive(Clone)]
pub struct ExtractKeyService {
    master_key: MasterKey,
}

impl ExtractKeyService {
    /// Bind the extraction service to the process master key.
    #[must_use]
    pub const fn new(master_key: MasterKey) -> Self {
        Self { master_key }
    }

    /// Decode a stored row into a JWK.
    ///
    /// The public column is used only when the caller wants the public half
    /// and the row has one; symmetric rows always fall back to the private
    /// branch, whatever `want_private` says.
    ///
    /// # Errors
    ///
    /// Returns decoding failures ([`Error::InvalidKey`]), decryption
    /// failures ([`Error::InvalidSecret`], [`Error::InvalidCiphertext`]) and
    /// JSON failures.
    pub fn consume(&self, key: &Key, want_private: bool) -> Result<Jwk> {
        let (encoded, private) = match (&key.public_key, want_private) {
            (Some(public_key), false) => (public_key.as_str(), false),
            _ => (key.private_key.as_str(), true),
        };

        let decoded = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|err| Error::InvalidKey(format!("decode stored key: {err}")))?;

        if private {
            self.master_key.decrypt(&decoded)
        } else {
            serde_json::from_slice(&decoded).map_err(Error::from)
        }
    }
}
