// ABOUTME: CLI entry point - api server, schema migrations and the rotation job
// ABOUTME: Loads env configuration, wires the service graph and dispatches on the subcommand
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![forbid(unsafe_code)]

//! # JWK Custodian Binary
//!
//! Three entry points over one configuration surface:
//!
//! - `jwk-custodian api`: serve the HTTP API until a signal arrives
//! - `jwk-custodian migrations`: apply the embedded schema migrations
//! - `jwk-custodian rotate-keys`: run one rotation cycle over all usages,
//!   exit non-zero iff any usage failed

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use jwk_custodian::api::{self, ApiState};
use jwk_custodian::config::{AppConfig, UsageConfig};
use jwk_custodian::database::{self, KeyStore, PostgresKeyStore};
use jwk_custodian::jobs::RotateKeysJob;
use jwk_custodian::logging;
use jwk_custodian::services::{
    build_producers, ExtractKeyService, GenerateKeyService, SearchKeysService, SelectKeyService,
    SignClaimsService,
};

#[derive(Parser)]
#[command(name = "jwk-custodian")]
#[command(about = "JSON Web Key custodian - key lifecycle, rotation and JWT issuance")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Api,
    /// Apply the embedded schema migrations.
    Migrations,
    /// Run one key rotation cycle over all configured usages.
    RotateKeys,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_from_env()?;

    let config = AppConfig::from_env()?;
    config.summary();

    match cli.command {
        Command::Api => run_api(config).await,
        Command::Migrations => run_migrations(&config).await,
        Command::RotateKeys => run_rotate_keys(config).await,
    }
}

/// Connect the store shared by every subcommand.
async fn connect_store(config: &AppConfig) -> Result<Arc<dyn KeyStore>> {
    let pool = database::connect(&config.postgres_dsn).await?;

    Ok(Arc::new(PostgresKeyStore::new(pool)))
}

async fn run_api(config: AppConfig) -> Result<()> {
    let store = connect_store(&config).await?;
    let usages: Arc<HashMap<String, UsageConfig>> = Arc::new(config.usages.clone());

    let extract = ExtractKeyService::new(config.master_key.clone());
    let search = Arc::new(SearchKeysService::new(Arc::clone(&store), extract.clone()));
    let select = Arc::new(SelectKeyService::new(Arc::clone(&store), extract));

    let producers = build_producers(&usages, &search);
    let sign = Arc::new(SignClaimsService::new(Arc::clone(&usages), producers));

    let state = ApiState {
        store,
        select,
        search,
        sign,
    };

    api::serve(state, &config.api).await?;

    Ok(())
}

async fn run_migrations(config: &AppConfig) -> Result<()> {
    let pool = database::connect(&config.postgres_dsn).await?;

    database::MIGRATOR.run(&pool).await?;
    info!("migrations applied");

    Ok(())
}

async fn run_rotate_keys(config: AppConfig) -> Result<()> {
    let store = connect_store(&config).await?;
    let usages: Arc<HashMap<String, UsageConfig>> = Arc::new(config.usages.clone());

    let extract = ExtractKeyService::new(config.master_key.clone());
    let generate = GenerateKeyService::new(
        Arc::clone(&store),
        extract,
        config.master_key,
        Arc::clone(&usages),
    );

    let job = RotateKeysJob::new(generate, store, usages);
    job.run().await?;

    info!("rotation cycle complete");

    Ok(())
}
