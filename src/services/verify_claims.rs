// ABOUTME: Token verification - recipient selection, claim checks, payload deserialization
// ABOUTME: ignore_expired skips the timestamp window but never the signature or target binding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::UsageConfig;
use crate::errors::{Error, Result};
use crate::token::{ClaimsChecker, Recipient};

/// Verifies tokens for configured usages.
///
/// Works identically inside the custodian (private key source) and inside
/// downstream consumers (remote public key source); only the assembled
/// recipients differ.
pub struct VerifyClaimsService {
    usages: Arc<HashMap<String, UsageConfig>>,
    recipients: HashMap<String, Recipient>,
}

impl VerifyClaimsService {
    /// Bind the service to the usage presets and the assembled recipients.
    #[must_use]
    pub fn new(
        usages: Arc<HashMap<String, UsageConfig>>,
        recipients: HashMap<String, Recipient>,
    ) -> Self {
        Self { usages, recipients }
    }

    /// Verify a compact token and deserialize its payload into `Out`.
    ///
    /// `ignore_expired` waives only the timestamp check, so refresh flows
    /// can introspect a recently expired access token; signature and
    /// issuer/audience/subject binding always apply.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigNotFound`] when the usage has no preset or no
    /// assembled recipient; otherwise propagates verification failures.
    pub async fn verify<Out: DeserializeOwned>(
        &self,
        token: &str,
        usage: &str,
        ignore_expired: bool,
    ) -> Result<Out> {
        let cfg = self
            .usages
            .get(usage)
            .ok_or_else(|| Error::ConfigNotFound(usage.to_owned()))?;

        let recipient = self
            .recipients
            .get(usage)
            .ok_or_else(|| Error::ConfigNotFound(usage.to_owned()))?;

        let checker = ClaimsChecker::new(&cfg.token, ignore_expired);

        recipient.consume(token, &checker).await
    }
}
