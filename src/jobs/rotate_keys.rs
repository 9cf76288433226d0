// ABOUTME: Rotation job driver - one generation step per configured usage, then a view refresh
// ABOUTME: Joins per-usage failures so one bad usage never masks the rotation of the others
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::UsageConfig;
use crate::database::KeyStore;
use crate::errors::{Error, Result};
use crate::services::GenerateKeyService;

/// One rotation cycle over every configured usage.
///
/// Usages rotate independently: a failure is recorded and the cycle moves
/// on, so the combined error reported at the end never hides partial
/// success. The `active_keys` view refresh happens once, after all usages,
/// outside any per-usage step - reads between a commit and the refresh
/// observe the pre-rotation set, which stays valid for its full TTL.
pub struct RotateKeysJob {
    generate: GenerateKeyService,
    store: Arc<dyn KeyStore>,
    usages: Arc<HashMap<String, UsageConfig>>,
}

impl RotateKeysJob {
    /// Bind the job to the rotation engine and the store.
    #[must_use]
    pub fn new(
        generate: GenerateKeyService,
        store: Arc<dyn KeyStore>,
        usages: Arc<HashMap<String, UsageConfig>>,
    ) -> Self {
        Self {
            generate,
            store,
            usages,
        }
    }

    /// Run one full rotation cycle.
    ///
    /// # Errors
    ///
    /// Returns the joined failures of every usage (and of the view refresh)
    /// once the whole cycle has been attempted.
    pub async fn run(&self) -> Result<()> {
        let mut failures = Vec::new();

        let mut usages: Vec<&String> = self.usages.keys().collect();
        usages.sort();

        for usage in usages {
            match self.generate.generate(usage).await {
                Ok(key) => {
                    info!(usage, kid = ?key.kid, "usage rotated");
                }
                Err(err) => {
                    error!(usage, error = %err, "usage rotation failed");
                    failures.push(format!("{usage}: {err}"));
                }
            }
        }

        // Newly inserted keys become visible to readers here.
        if let Err(err) = self.store.refresh_active_keys().await {
            error!(error = %err, "failed to refresh active_keys");
            failures.push(format!("refresh active_keys: {err}"));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Internal(format!(
                "rotate keys: {}",
                failures.join("; ")
            )))
        }
    }
}
