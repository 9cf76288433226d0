// ABOUTME: Caching key source tests - TTL expiry, single-flight refresh, failure retention
// ABOUTME: Uses the paused tokio clock to drive cache age deterministically
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jwk_custodian::errors::{Error, Result};
use jwk_custodian::jwk::{generate, Algorithm, Jwk};
use jwk_custodian::token::{CachingKeySource, KeyFetcher};

struct CountingFetcher {
    keys: Vec<Jwk>,
    calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

#[async_trait]
impl KeyFetcher for CountingFetcher {
    async fn fetch_keys(&self) -> Result<Vec<Jwk>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::internal("backing store unavailable"));
        }

        Ok(self.keys.clone())
    }
}

fn fixture() -> (Vec<Jwk>, Arc<AtomicUsize>, Arc<AtomicBool>, CachingKeySource) {
    let keys = vec![generate(Algorithm::EdDSA).unwrap().private];
    let calls = Arc::new(AtomicUsize::new(0));
    let fail = Arc::new(AtomicBool::new(false));

    let fetcher = CountingFetcher {
        keys: keys.clone(),
        calls: Arc::clone(&calls),
        fail: Arc::clone(&fail),
    };

    let source = CachingKeySource::new(Box::new(fetcher), Duration::from_secs(60));

    (keys, calls, fail, source)
}

#[tokio::test(start_paused = true)]
async fn test_cache_hit_within_ttl() {
    let (keys, calls, _fail, source) = fixture();

    let first = source.keys().await.unwrap();
    let second = source.keys().await.unwrap();

    assert_eq!(*first, keys);
    assert_eq!(*second, keys);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cache_refetches_after_ttl() {
    let (_keys, calls, _fail, source) = fixture();

    source.keys().await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    source.keys().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_surfaces_error_then_recovers() {
    let (keys, calls, fail, source) = fixture();

    source.keys().await.unwrap();

    tokio::time::advance(Duration::from_secs(61)).await;
    fail.store(true, Ordering::SeqCst);

    // The refresh failure reaches the caller; the cache is not poisoned.
    let result = source.keys().await;
    assert!(result.is_err());

    fail.store(false, Ordering::SeqCst);
    let recovered = source.keys().await.unwrap();
    assert_eq!(*recovered, keys);

    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_concurrent_cold_start_is_single_flight() {
    let (_keys, calls, _fail, source) = fixture();
    let source = Arc::new(source);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let source = Arc::clone(&source);
            tokio::spawn(async move { source.keys().await.map(|keys| keys.len()) })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 1);
    }

    // The stampede coalesced into one fetch.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_lookup_helpers() {
    let (keys, _calls, _fail, source) = fixture();
    let kid = keys[0].kid.clone().unwrap();

    let main = source.main_key().await.unwrap();
    assert_eq!(main.kid.as_deref(), Some(kid.as_str()));

    let found = source.find(&kid).await.unwrap();
    assert_eq!(found, keys[0]);

    let missing = source.find("00000000-0000-0000-0000-000000000000").await;
    assert!(matches!(missing, Err(Error::KeyNotFound)));
}

#[tokio::test(start_paused = true)]
async fn test_empty_set_reports_key_not_found() {
    let calls = Arc::new(AtomicUsize::new(0));
    let fetcher = CountingFetcher {
        keys: Vec::new(),
        calls,
        fail: Arc::new(AtomicBool::new(false)),
    };
    let source = CachingKeySource::new(Box::new(fetcher), Duration::from_secs(60));

    let result = source.main_key().await;
    assert!(matches!(result, Err(Error::KeyNotFound)));
}
