// ABOUTME: Startup assembly of per-usage producers and recipients
// ABOUTME: Binds each usage's algorithm preset to a caching key source over a fetcher
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Producer / recipient assembly.
//!
//! Built once at startup for every configured usage. The custodian's own
//! producer side fetches private keys through the local search service;
//! recipient pools take whatever fetcher the caller supplies, which is how
//! downstream consumers plug in the HTTP public-key fetcher.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::search_keys::SearchKeysService;
use crate::config::UsageConfig;
use crate::errors::Result;
use crate::jwk::Jwk;
use crate::token::{CachingKeySource, KeyFetcher, Producer, Recipient};

/// Fetcher over the custodian's own search service.
pub struct LocalKeyFetcher {
    search: Arc<SearchKeysService>,
    usage: String,
    want_private: bool,
}

impl LocalKeyFetcher {
    /// Bind a fetcher to one usage of the local search service.
    #[must_use]
    pub fn new(search: Arc<SearchKeysService>, usage: String, want_private: bool) -> Self {
        Self {
            search,
            usage,
            want_private,
        }
    }
}

#[async_trait]
impl KeyFetcher for LocalKeyFetcher {
    async fn fetch_keys(&self) -> Result<Vec<Jwk>> {
        self.search.search(&self.usage, self.want_private).await
    }
}

/// Assemble the producer map over local private key sources.
#[must_use]
pub fn build_producers(
    usages: &HashMap<String, UsageConfig>,
    search: &Arc<SearchKeysService>,
) -> HashMap<String, Producer> {
    usages
        .iter()
        .map(|(usage, cfg)| {
            let fetcher = LocalKeyFetcher::new(Arc::clone(search), usage.clone(), true);
            let source = Arc::new(CachingKeySource::new(Box::new(fetcher), cfg.key.cache));

            (usage.clone(), Producer::new(cfg.alg, source))
        })
        .collect()
}

/// Assemble the recipient map from caller-supplied fetchers.
///
/// The factory receives each usage label so it can bind the fetcher to the
/// right key set (local private keys inside the custodian, remote public
/// keys inside a consumer).
pub fn build_recipients<F>(
    usages: &HashMap<String, UsageConfig>,
    make_fetcher: F,
) -> HashMap<String, Recipient>
where
    F: Fn(&str) -> Box<dyn KeyFetcher>,
{
    usages
        .iter()
        .map(|(usage, cfg)| {
            let source = Arc::new(CachingKeySource::new(make_fetcher(usage), cfg.key.cache));

            (usage.clone(), Recipient::new(cfg.alg, source))
        })
        .collect()
}
