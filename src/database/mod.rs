// ABOUTME: Key persistence seam - row model, store trait and Postgres pool setup
// ABOUTME: Reads go through the active_keys view, writes hit the keys base table
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Key persistence.
//!
//! All read operations query the `active_keys` materialized view (rows that
//! are neither soft-deleted nor expired); writes touch the `keys` base table
//! and the rotation job refreshes the view afterwards. The [`KeyStore`]
//! trait is the seam between the services and the backing store, so tests
//! can substitute an in-memory implementation with the same visibility
//! semantics.

pub mod postgres;

pub use postgres::PostgresKeyStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;

/// Upper bound on keys served for a single usage.
///
/// Regular rotation and expiration keep the active set in single digits;
/// this cap guards against misconfiguration ballooning a batch. Exceeding it
/// is logged and truncated, not fatal.
pub const KEYS_MAX_BATCH_SIZE: usize = 100;

/// Embedded schema migrations, applied by the `migrations` subcommand.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// One key version, as persisted.
///
/// Rows are never updated after insertion; they either expire naturally or
/// are soft-deleted, and are retained indefinitely for auditing.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Key {
    /// Row id; equals the `kid` inside both serialized JWK halves.
    pub id: Uuid,
    /// Encrypted private JWK, base64-url-unpadded.
    pub private_key: String,
    /// Plain public JWK, base64-url-unpadded. Null for symmetric keys.
    pub public_key: Option<String>,
    /// Usage label grouping this key with its configuration.
    pub usage: String,
    /// Insertion timestamp; the newest active row per usage is the main key.
    pub created_at: DateTime<Utc>,
    /// Moment the key stops being active.
    pub expires_at: DateTime<Utc>,
    /// Soft-deletion timestamp, never cleared once set.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Mandatory-at-delete justification.
    pub deleted_comment: Option<String>,
}

/// Input for a key insertion.
#[derive(Debug, Clone)]
pub struct InsertKey {
    /// Row id, minted by the generator.
    pub id: Uuid,
    /// Encrypted private JWK, base64-url-unpadded.
    pub private_key: String,
    /// Plain public JWK, base64-url-unpadded. `None` for symmetric keys.
    pub public_key: Option<String>,
    /// Usage label.
    pub usage: String,
    /// Creation timestamp.
    pub now: DateTime<Utc>,
    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

/// Persistence operations over the key table and the active view.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Insert a new key row. Id collisions are programming errors and
    /// propagate as constraint violations.
    async fn insert_key(&self, data: InsertKey) -> Result<Key>;

    /// Fetch one active key by id. Missing rows report
    /// [`crate::errors::Error::KeyNotFound`].
    async fn select_key(&self, id: Uuid) -> Result<Key>;

    /// List active keys for a usage, newest first, capped at
    /// [`KEYS_MAX_BATCH_SIZE`].
    async fn search_keys(&self, usage: &str) -> Result<Vec<Key>>;

    /// Soft-delete an active key. Succeeds iff the row was visible, so a
    /// success means exactly one invalidation was performed.
    async fn delete_key(&self, id: Uuid, now: DateTime<Utc>, comment: &str) -> Result<Key>;

    /// Refresh the `active_keys` materialized view after writes.
    async fn refresh_active_keys(&self) -> Result<()>;

    /// Connectivity probe for the healthcheck.
    async fn ping(&self) -> Result<()>;
}

/// Open a Postgres connection pool.
///
/// # Errors
///
/// Returns an error if the pool cannot be established.
pub async fn connect(dsn: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(dsn)
        .await?;

    Ok(pool)
}
