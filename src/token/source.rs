// ABOUTME: Time-limited caching key source with single-flight refresh
// ABOUTME: Feeds producers and recipients from a local repository or a remote custodian
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Caching key source.
//!
//! Producers and recipients for one usage share a [`CachingKeySource`]
//! wrapping a [`KeyFetcher`]. The source re-fetches lazily once the cached
//! set is older than the usage's `key.cache` duration.
//!
//! Refreshes are single-flight: the cache state sits behind one async mutex
//! that is held across the fetch, so a cold-start stampede of verifiers
//! results in exactly one fetch while the rest wait and then read the fresh
//! value. A failed refresh keeps the previous value in place (the cache is
//! never poisoned) and surfaces the error to the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::errors::{Error, Result};
use crate::jwk::Jwk;

/// Supplier of the ordered active key set for one usage.
///
/// `keys[0]` is the main key; the rest are legacy keys kept for
/// verification during rotation windows.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    /// Fetch the current active key set, newest first.
    async fn fetch_keys(&self) -> Result<Vec<Jwk>>;
}

#[derive(Default)]
struct CacheState {
    keys: Option<Arc<Vec<Jwk>>>,
    fetched_at: Option<Instant>,
}

/// Time-limited cache over a [`KeyFetcher`].
pub struct CachingKeySource {
    fetcher: Box<dyn KeyFetcher>,
    cache_ttl: Duration,
    state: Mutex<CacheState>,
}

impl CachingKeySource {
    /// Wrap a fetcher with the given cache duration.
    #[must_use]
    pub fn new(fetcher: Box<dyn KeyFetcher>, cache_ttl: Duration) -> Self {
        Self {
            fetcher,
            cache_ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Current key set, refreshed through the fetcher when stale.
    ///
    /// # Errors
    ///
    /// Propagates fetcher failures; the previously cached value stays in
    /// place for the next call.
    pub async fn keys(&self) -> Result<Arc<Vec<Jwk>>> {
        // Holding the lock across the fetch is what makes refreshes
        // single-flight; waiters observe the fresh value on wake-up.
        let mut state = self.state.lock().await;

        if let (Some(keys), Some(fetched_at)) = (&state.keys, state.fetched_at) {
            if fetched_at.elapsed() < self.cache_ttl {
                return Ok(Arc::clone(keys));
            }
        }

        let fresh = Arc::new(self.fetcher.fetch_keys().await?);
        state.keys = Some(Arc::clone(&fresh));
        state.fetched_at = Some(Instant::now());

        Ok(fresh)
    }

    /// The main key for this usage.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`] when the active set is empty, plus fetcher
    /// failures.
    pub async fn main_key(&self) -> Result<Jwk> {
        let keys = self.keys().await?;
        keys.first().cloned().ok_or(Error::KeyNotFound)
    }

    /// Look a key up by id in the cached set.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`] when no active key carries the id, plus
    /// fetcher failures.
    pub async fn find(&self, kid: &str) -> Result<Jwk> {
        let keys = self.keys().await?;
        keys.iter()
            .find(|key| key.kid.as_deref() == Some(kid))
            .cloned()
            .ok_or(Error::KeyNotFound)
    }
}
