// ABOUTME: PostgreSQL implementation of the key store
// ABOUTME: Hand-written SQL against the keys table and the active_keys materialized view
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::{InsertKey, Key, KeyStore, KEYS_MAX_BATCH_SIZE};
use crate::errors::{Error, Result};

/// `PostgreSQL` key store.
#[derive(Clone)]
pub struct PostgresKeyStore {
    pool: PgPool,
}

impl PostgresKeyStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl KeyStore for PostgresKeyStore {
    async fn insert_key(&self, data: InsertKey) -> Result<Key> {
        let key = sqlx::query_as::<_, Key>(
            r"
            INSERT INTO keys (id, private_key, public_key, usage, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            ",
        )
        .bind(data.id)
        .bind(&data.private_key)
        .bind(data.public_key.as_deref())
        .bind(&data.usage)
        .bind(data.now)
        .bind(data.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(key)
    }

    async fn select_key(&self, id: Uuid) -> Result<Key> {
        sqlx::query_as::<_, Key>("SELECT * FROM active_keys WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::KeyNotFound)
    }

    async fn search_keys(&self, usage: &str) -> Result<Vec<Key>> {
        // Fetch one row past the cap to tell "limit reached" (fine) apart
        // from "limit exceeded" (misconfiguration).
        let limit = i64::try_from(KEYS_MAX_BATCH_SIZE + 1).unwrap_or(i64::MAX);

        let mut keys = sqlx::query_as::<_, Key>(
            r"
            SELECT * FROM active_keys
            WHERE usage = $1
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(usage)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        if keys.len() > KEYS_MAX_BATCH_SIZE {
            error!(
                usage,
                max_batch_size = KEYS_MAX_BATCH_SIZE,
                "more than the maximum batch size of active keys found, truncating"
            );
            keys.truncate(KEYS_MAX_BATCH_SIZE);
        }

        Ok(keys)
    }

    async fn delete_key(&self, id: Uuid, now: DateTime<Utc>, comment: &str) -> Result<Key> {
        // The visibility predicate lives inside the UPDATE so a success means
        // the row was active at the moment of deletion: repeat deletes and
        // deletes of expired rows report KeyNotFound.
        sqlx::query_as::<_, Key>(
            r"
            UPDATE keys
            SET deleted_at = $2, deleted_comment = $3
            WHERE id = $1 AND deleted_at IS NULL AND expires_at > $2
            RETURNING *
            ",
        )
        .bind(id)
        .bind(now)
        .bind(comment)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::KeyNotFound)
    }

    async fn refresh_active_keys(&self) -> Result<()> {
        sqlx::query("REFRESH MATERIALIZED VIEW active_keys")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;

        Ok(())
    }
}
