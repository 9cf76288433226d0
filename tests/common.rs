// ABOUTME: Shared test fixtures - in-memory key store and a fully wired custodian
// ABOUTME: The memory store mirrors the active view semantics of the Postgres store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs, dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use jwk_custodian::config::{KeyLifetimes, TokenBinding, UsageConfig};
use jwk_custodian::crypto::MasterKey;
use jwk_custodian::database::{InsertKey, Key, KeyStore, KEYS_MAX_BATCH_SIZE};
use jwk_custodian::errors::{Error, Result};
use jwk_custodian::jwk::Algorithm;
use jwk_custodian::services::{
    build_producers, build_recipients, ExtractKeyService, GenerateKeyService, LocalKeyFetcher,
    SearchKeysService, SelectKeyService, SignClaimsService, VerifyClaimsService,
};

/// In-memory key store with the same visibility semantics as the Postgres
/// implementation: a row is active iff it is neither soft-deleted nor
/// expired. Visibility is computed directly, so no view refresh is needed.
#[derive(Default)]
pub struct MemoryKeyStore {
    rows: Mutex<Vec<Key>>,
}

impl MemoryKeyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of every row, active or not.
    pub fn rows(&self) -> Vec<Key> {
        self.rows.lock().unwrap().clone()
    }

    /// Rewrite a row's creation timestamp, for rotation-interval tests.
    pub fn backdate(&self, id: Uuid, created_at: DateTime<Utc>) {
        let mut rows = self.rows.lock().unwrap();
        for row in rows.iter_mut() {
            if row.id == id {
                row.created_at = created_at;
            }
        }
    }

    /// Force a row past its expiration.
    pub fn expire(&self, id: Uuid) {
        let mut rows = self.rows.lock().unwrap();
        for row in rows.iter_mut() {
            if row.id == id {
                row.expires_at = Utc::now() - chrono::Duration::seconds(1);
            }
        }
    }

    fn visible(row: &Key, now: DateTime<Utc>) -> bool {
        row.deleted_at.is_none() && row.expires_at > now
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn insert_key(&self, data: InsertKey) -> Result<Key> {
        let mut rows = self.rows.lock().unwrap();

        if rows.iter().any(|row| row.id == data.id) {
            return Err(Error::internal(format!("duplicate key id: {}", data.id)));
        }

        let row = Key {
            id: data.id,
            private_key: data.private_key,
            public_key: data.public_key,
            usage: data.usage,
            created_at: data.now,
            expires_at: data.expires_at,
            deleted_at: None,
            deleted_comment: None,
        };

        rows.push(row.clone());

        Ok(row)
    }

    async fn select_key(&self, id: Uuid) -> Result<Key> {
        let now = Utc::now();
        let rows = self.rows.lock().unwrap();

        rows.iter()
            .find(|row| row.id == id && Self::visible(row, now))
            .cloned()
            .ok_or(Error::KeyNotFound)
    }

    async fn search_keys(&self, usage: &str) -> Result<Vec<Key>> {
        let now = Utc::now();
        let rows = self.rows.lock().unwrap();

        let mut batch: Vec<Key> = rows
            .iter()
            .filter(|row| row.usage == usage && Self::visible(row, now))
            .cloned()
            .collect();

        batch.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        batch.truncate(KEYS_MAX_BATCH_SIZE);

        Ok(batch)
    }

    async fn delete_key(&self, id: Uuid, now: DateTime<Utc>, comment: &str) -> Result<Key> {
        let mut rows = self.rows.lock().unwrap();

        let row = rows
            .iter_mut()
            .find(|row| row.id == id && Self::visible(row, now))
            .ok_or(Error::KeyNotFound)?;

        row.deleted_at = Some(now);
        row.deleted_comment = Some(comment.to_owned());

        Ok(row.clone())
    }

    async fn refresh_active_keys(&self) -> Result<()> {
        // Visibility is computed on read; nothing to materialize.
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Usage preset with test-friendly defaults: 24h key TTL, 1h rotation
/// interval, 1m cache, 24h token TTL, 5m leeway, `test-*` target binding.
pub fn usage_config(alg: Algorithm) -> UsageConfig {
    UsageConfig {
        alg,
        key: KeyLifetimes {
            ttl: Duration::from_secs(24 * 3600),
            rotation: Duration::from_secs(3600),
            cache: Duration::from_secs(60),
        },
        token: TokenBinding {
            ttl: Duration::from_secs(24 * 3600),
            issuer: "test-issuer".to_owned(),
            audience: "test-audience".to_owned(),
            subject: "test-subject".to_owned(),
            leeway: Duration::from_secs(300),
        },
    }
}

pub fn master_key() -> MasterKey {
    MasterKey::from_bytes([7u8; 32])
}

/// A fully wired custodian over the in-memory store.
pub struct TestCustodian {
    pub store: Arc<MemoryKeyStore>,
    pub usages: Arc<HashMap<String, UsageConfig>>,
    pub search: Arc<SearchKeysService>,
    pub select: Arc<SelectKeyService>,
    pub generate: GenerateKeyService,
    pub sign: SignClaimsService,
    pub verify: VerifyClaimsService,
}

pub fn custodian(usages: HashMap<String, UsageConfig>) -> TestCustodian {
    let store = MemoryKeyStore::new();
    let store_dyn: Arc<dyn KeyStore> = Arc::clone(&store) as Arc<dyn KeyStore>;
    let usages = Arc::new(usages);
    let master_key = master_key();

    let extract = ExtractKeyService::new(master_key.clone());
    let search = Arc::new(SearchKeysService::new(
        Arc::clone(&store_dyn),
        extract.clone(),
    ));
    let select = Arc::new(SelectKeyService::new(
        Arc::clone(&store_dyn),
        extract.clone(),
    ));

    let generate = GenerateKeyService::new(
        Arc::clone(&store_dyn),
        extract,
        master_key,
        Arc::clone(&usages),
    );

    let producers = build_producers(&usages, &search);
    let sign = SignClaimsService::new(Arc::clone(&usages), producers);

    // The custodian's own verify path reads the local private key set.
    let recipients = build_recipients(&usages, |usage| {
        Box::new(LocalKeyFetcher::new(
            Arc::clone(&search),
            usage.to_owned(),
            true,
        ))
    });
    let verify = VerifyClaimsService::new(Arc::clone(&usages), recipients);

    TestCustodian {
        store,
        usages,
        search,
        select,
        generate,
        sign,
        verify,
    }
}
