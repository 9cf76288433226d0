// ABOUTME: Ordered retrieval of the active key set for one usage
// ABOUTME: Store lookup piped through extraction, first result is the main key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use tracing::error;

use super::extract::ExtractKeyService;
use crate::database::KeyStore;
use crate::errors::Result;
use crate::jwk::Jwk;

/// Lists the active keys of a usage as decoded JWKs, newest first.
pub struct SearchKeysService {
    store: Arc<dyn KeyStore>,
    extract: ExtractKeyService,
}

impl SearchKeysService {
    /// Bind the service to its store and extraction dependency.
    #[must_use]
    pub fn new(store: Arc<dyn KeyStore>, extract: ExtractKeyService) -> Self {
        Self { store, extract }
    }

    /// Retrieve and decode the active batch for a usage.
    ///
    /// Repository ordering is preserved: `result[0]` is the main key. A
    /// decode failure on any row aborts the whole batch, with the failing
    /// key id recorded for the logs.
    ///
    /// # Errors
    ///
    /// Propagates store and extraction failures.
    pub async fn search(&self, usage: &str, want_private: bool) -> Result<Vec<Jwk>> {
        let rows = self.store.search_keys(usage).await?;

        rows.iter()
            .map(|row| {
                self.extract.consume(row, want_private).map_err(|err| {
                    error!(usage, key.id = %row.id, error = %err, "failed to decode stored key");
                    err
                })
            })
            .collect()
    }
}
