// ABOUTME: Token recipient - verifies compact JWS against the usage's active key set
// ABOUTME: Resolves the signing key by kid through the caching source, then runs claim checks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;

use super::claims::ClaimsChecker;
use super::source::CachingKeySource;
use crate::errors::{Error, Result};
use crate::jws;
use crate::jwk::{Algorithm, VerifyingKey};

/// Per-usage verifier bound to a caching source of keys.
///
/// Recipients accept the union of active keys, so tokens signed by a legacy
/// key keep verifying for that key's full lifetime.
pub struct Recipient {
    alg: Algorithm,
    source: Arc<CachingKeySource>,
}

impl Recipient {
    /// Bind a recipient to its algorithm preset and key source.
    #[must_use]
    pub fn new(alg: Algorithm, source: Arc<CachingKeySource>) -> Self {
        Self { alg, source }
    }

    /// Verify a compact JWS and deserialize its payload.
    ///
    /// Order of operations: parse, pin the header algorithm to this usage,
    /// resolve the key by `kid`, verify the signature, run the claim checks,
    /// deserialize.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidToken`] on a malformed token, missing `kid`, or an
    ///   algorithm mismatch.
    /// - [`Error::KeyNotFound`] when no active key carries the token's kid.
    /// - [`Error::InvalidSignature`] on signature failure.
    /// - [`Error::TokenExpired`] / [`Error::ClaimsRejected`] from the checks.
    pub async fn consume<Out: DeserializeOwned>(
        &self,
        token: &str,
        checker: &ClaimsChecker,
    ) -> Result<Out> {
        let parsed = jws::parse_compact(token)?;

        if parsed.header.alg != self.alg {
            return Err(Error::InvalidToken(format!(
                "algorithm mismatch: token {}, usage {}",
                parsed.header.alg, self.alg
            )));
        }

        let kid = parsed
            .header
            .kid
            .as_deref()
            .ok_or_else(|| Error::InvalidToken("missing kid header".to_owned()))?;

        let key = self.source.find(kid).await?;
        let verifying = VerifyingKey::from_jwk(self.alg, &key)?;

        verifying.verify(parsed.signing_input().as_bytes(), &parsed.signature)?;

        let claims: serde_json::Value = jws::decode_segment(parsed.payload_b64)?;
        checker.check(&claims, Utc::now())?;

        serde_json::from_value(claims).map_err(Error::from)
    }
}
