// ABOUTME: Token issuance - wraps arbitrary claims in the usage's envelope and signs
// ABOUTME: Producer selection and target binding come from the usage presets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::UsageConfig;
use crate::errors::{Error, Result};
use crate::token::{Claims, Producer};

/// Issues signed tokens for configured usages.
pub struct SignClaimsService {
    usages: Arc<HashMap<String, UsageConfig>>,
    producers: HashMap<String, Producer>,
}

impl SignClaimsService {
    /// Bind the service to the usage presets and the assembled producers.
    #[must_use]
    pub fn new(
        usages: Arc<HashMap<String, UsageConfig>>,
        producers: HashMap<String, Producer>,
    ) -> Self {
        Self { usages, producers }
    }

    /// Wrap a payload in the usage's claims envelope and sign it.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigNotFound`] when the usage has no preset or no
    /// assembled producer; otherwise propagates issuance failures.
    pub async fn sign(&self, claims: Map<String, Value>, usage: &str) -> Result<String> {
        let cfg = self
            .usages
            .get(usage)
            .ok_or_else(|| Error::ConfigNotFound(usage.to_owned()))?;

        let producer = self
            .producers
            .get(usage)
            .ok_or_else(|| Error::ConfigNotFound(usage.to_owned()))?;

        let envelope = Claims::new(claims, &cfg.token, Utc::now());

        let token = producer.issue(&envelope).await?;

        debug!(usage, jti = %envelope.jti, "issued token");

        Ok(token)
    }
}
