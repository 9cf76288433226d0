// ABOUTME: Token producer - signs claims envelopes with the usage's main key
// ABOUTME: Emits compact JWS with the signing row id stamped as kid
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use super::claims::Claims;
use super::source::CachingKeySource;
use crate::errors::Result;
use crate::jws;
use crate::jwk::{Algorithm, SigningKey};

/// Per-usage signer bound to a caching source of private keys.
pub struct Producer {
    alg: Algorithm,
    source: Arc<CachingKeySource>,
}

impl Producer {
    /// Bind a producer to its algorithm preset and key source.
    #[must_use]
    pub fn new(alg: Algorithm, source: Arc<CachingKeySource>) -> Self {
        Self { alg, source }
    }

    /// Sign a claims envelope into a compact JWS.
    ///
    /// The main key (newest active) of the usage signs; its id becomes the
    /// token's `kid` header.
    ///
    /// # Errors
    ///
    /// Propagates fetch failures, [`crate::errors::Error::KeyNotFound`] on an
    /// empty active set, and signing failures.
    pub async fn issue(&self, claims: &Claims) -> Result<String> {
        let key = self.source.main_key().await?;
        let kid = key.kid()?.to_owned();

        let signing = SigningKey::from_jwk(self.alg, &key)?;

        let header = jws::encode_segment(&jws::Header::new(self.alg, kid))?;
        let payload = jws::encode_segment(claims)?;
        let signing_input = format!("{header}.{payload}");

        let signature = signing.sign(signing_input.as_bytes())?;

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }
}
