// ABOUTME: Single-key retrieval by id, decoded to a JWK
// ABOUTME: Backs the kid-based public key endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use tracing::error;
use uuid::Uuid;

use super::extract::ExtractKeyService;
use crate::database::KeyStore;
use crate::errors::Result;
use crate::jwk::Jwk;

/// Fetches one active key by id as a decoded JWK.
pub struct SelectKeyService {
    store: Arc<dyn KeyStore>,
    extract: ExtractKeyService,
}

impl SelectKeyService {
    /// Bind the service to its store and extraction dependency.
    #[must_use]
    pub fn new(store: Arc<dyn KeyStore>, extract: ExtractKeyService) -> Self {
        Self { store, extract }
    }

    /// Retrieve and decode one active key. The id matches the `kid` header
    /// of tokens signed with it.
    ///
    /// # Errors
    ///
    /// [`crate::errors::Error::KeyNotFound`] when no active row carries the
    /// id, plus extraction failures.
    pub async fn select(&self, id: Uuid, want_private: bool) -> Result<Jwk> {
        let row = self.store.select_key(id).await?;

        self.extract.consume(&row, want_private).map_err(|err| {
            error!(key.id = %row.id, error = %err, "failed to decode stored key");
            err
        })
    }
}
