// ABOUTME: Rotation engine - decides whether a usage is due and mints its next key
// ABOUTME: Generates, encrypts, inserts and returns the decoded main key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration as ChronoDuration, Utc};
use tracing::info;

use super::extract::ExtractKeyService;
use crate::config::UsageConfig;
use crate::crypto::MasterKey;
use crate::database::{InsertKey, KeyStore};
use crate::errors::{Error, Result};
use crate::jwk::{self, Jwk};

/// Atomic per-usage rotation step.
///
/// Called once per usage per rotation cycle. When the main key is younger
/// than the usage's rotation interval the step is a no-op returning the
/// existing key, which makes the engine idempotent within a cycle and keeps
/// concurrent replicas from piling up near-duplicate keys.
pub struct GenerateKeyService {
    store: Arc<dyn KeyStore>,
    extract: ExtractKeyService,
    master_key: MasterKey,
    usages: Arc<HashMap<String, UsageConfig>>,
}

impl GenerateKeyService {
    /// Bind the engine to its store, master key and usage presets.
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyStore>,
        extract: ExtractKeyService,
        master_key: MasterKey,
        usages: Arc<HashMap<String, UsageConfig>>,
    ) -> Self {
        Self {
            store,
            extract,
            master_key,
            usages,
        }
    }

    /// Run one rotation step for a usage, returning the decoded private JWK
    /// of the resulting main key (fresh or pre-existing).
    ///
    /// # Errors
    ///
    /// - [`Error::ConfigNotFound`] when the usage has no preset.
    /// - [`Error::UnknownKeyUsage`] when the preset's rotation interval or
    ///   TTL cannot be represented.
    /// - Store, generation and encryption failures.
    pub async fn generate(&self, usage: &str) -> Result<Jwk> {
        let cfg = self
            .usages
            .get(usage)
            .ok_or_else(|| Error::ConfigNotFound(usage.to_owned()))?;

        let keys = self.store.search_keys(usage).await?;
        let now = Utc::now();

        // The newest key decides whether this usage is due for rotation.
        if let Some(newest) = keys.first() {
            let rotation = ChronoDuration::from_std(cfg.key.rotation)
                .map_err(|_| Error::UnknownKeyUsage(usage.to_owned()))?;

            if now.signed_duration_since(newest.created_at) < rotation {
                info!(usage, key.id = %newest.id, "rotation skipped: main key is recent");
                return self.extract.consume(newest, true);
            }
        }

        let generated = jwk::generate(cfg.alg)?;

        let encrypted = self.master_key.encrypt(&generated.private)?;
        let private_key = URL_SAFE_NO_PAD.encode(encrypted);

        let public_key = generated
            .public
            .as_ref()
            .map(|public| serde_json::to_vec(public).map(|json| URL_SAFE_NO_PAD.encode(json)))
            .transpose()?;

        let ttl = ChronoDuration::from_std(cfg.key.ttl)
            .map_err(|_| Error::UnknownKeyUsage(usage.to_owned()))?;

        let row = self
            .store
            .insert_key(InsertKey {
                id: generated.kid,
                private_key,
                public_key,
                usage: usage.to_owned(),
                now,
                expires_at: now + ttl,
            })
            .await?;

        info!(usage, key.id = %row.id, alg = %cfg.alg, "generated new key");

        self.extract.consume(&row, true)
    }
}
