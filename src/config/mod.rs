// ABOUTME: Environment-based configuration management for deployment settings
// ABOUTME: Master key, database DSN, API/CORS tuning and per-usage key presets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Environment-based configuration.
//!
//! Everything deployment-specific comes from environment variables; the
//! per-usage key presets ship embedded (`usages.yaml`) and can be replaced
//! wholesale with `KEYS_CONFIG_PATH`. Durations are humantime strings
//! (`"720h"`, `"15m"`, `"90s"`).

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::crypto::MasterKey;
use crate::errors::{Error, Result};
use crate::jwk::Algorithm;

/// Embedded default usage presets, the equivalent of a checked-in
/// deployment profile.
const DEFAULT_USAGES: &str = include_str!("usages.yaml");

/// Humantime-encoded durations in YAML and env values.
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

/// Key lifetime parameters for one usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyLifetimes {
    /// How long a key stays active after creation.
    #[serde(with = "duration_str")]
    pub ttl: Duration,
    /// Minimum age of the main key before a new one is generated.
    /// Must be shorter than `ttl` so verifiers can bridge the transition.
    #[serde(with = "duration_str")]
    pub rotation: Duration,
    /// Maximum age of the cached key set in producers and recipients.
    /// Must be shorter than `ttl`.
    #[serde(with = "duration_str")]
    pub cache: Duration,
}

/// Token binding parameters for one usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBinding {
    /// Token lifetime from issuance.
    #[serde(with = "duration_str")]
    pub ttl: Duration,
    /// `iss` claim stamped on issuance and required on verification.
    pub issuer: String,
    /// `aud` claim stamped on issuance and required on verification.
    pub audience: String,
    /// `sub` claim stamped on issuance and required on verification.
    pub subject: String,
    /// Tolerance applied to `exp` and `nbf` checks.
    #[serde(with = "duration_str")]
    pub leeway: Duration,
}

/// Configuration for one key usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Signature algorithm pinned to this usage.
    pub alg: Algorithm,
    /// Key lifetime parameters.
    pub key: KeyLifetimes,
    /// Token binding parameters.
    pub token: TokenBinding,
}

/// CORS settings for the HTTP API.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins; `["*"]` allows any.
    pub allowed_origins: Vec<String>,
    /// Allowed request headers; empty allows any.
    pub allowed_headers: Vec<String>,
    /// Whether to send `Access-Control-Allow-Credentials`.
    pub allow_credentials: bool,
    /// Preflight cache duration.
    pub max_age: Duration,
}

/// HTTP API settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Listen port.
    pub port: u16,
    /// Per-request deadline enforced by the router.
    pub request_timeout: Duration,
    /// Socket read timeout (deployment-level knob, surfaced for parity).
    pub read_timeout: Duration,
    /// Header read timeout (deployment-level knob).
    pub read_header_timeout: Duration,
    /// Socket write timeout (deployment-level knob).
    pub write_timeout: Duration,
    /// Keep-alive idle timeout (deployment-level knob).
    pub idle_timeout: Duration,
    /// Maximum request body size in bytes.
    pub max_request_size: usize,
    /// CORS settings.
    pub cors: CorsConfig,
}

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name used in logs.
    pub app_name: String,
    /// Process-wide master key protecting private key material.
    pub master_key: MasterKey,
    /// Postgres connection string.
    pub postgres_dsn: String,
    /// HTTP API settings.
    pub api: ApiConfig,
    /// Per-usage key presets.
    pub usages: HashMap<String, UsageConfig>,
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when required variables are missing, the master key
    /// is malformed, a duration or number fails to parse, or a usage preset
    /// violates the lifetime invariants.
    pub fn from_env() -> Result<Self> {
        let app_name = env_or("APP_NAME", "jwk-custodian");

        let master_key = MasterKey::from_hex(&env::var("APP_MASTER_KEY").unwrap_or_default())?;

        let postgres_dsn = env::var("POSTGRES_DSN")
            .map_err(|_| Error::Config("POSTGRES_DSN is required".to_owned()))?;

        let api = ApiConfig {
            port: env_parse("API_PORT", 4001)?,
            request_timeout: env_duration("API_TIMEOUT_REQUEST", Duration::from_secs(60))?,
            read_timeout: env_duration("API_TIMEOUT_READ", Duration::from_secs(15))?,
            read_header_timeout: env_duration("API_TIMEOUT_READ_HEADER", Duration::from_secs(5))?,
            write_timeout: env_duration("API_TIMEOUT_WRITE", Duration::from_secs(15))?,
            idle_timeout: env_duration("API_TIMEOUT_IDLE", Duration::from_secs(60))?,
            max_request_size: env_parse("API_MAX_REQUEST_SIZE", 2 * 1024 * 1024)?,
            cors: CorsConfig {
                allowed_origins: env_list("API_CORS_ALLOWED_ORIGINS", &["*"]),
                allowed_headers: env_list("API_CORS_ALLOWED_HEADERS", &[]),
                allow_credentials: env_parse("API_CORS_ALLOW_CREDENTIALS", false)?,
                max_age: env_duration("API_CORS_MAX_AGE", Duration::from_secs(3600))?,
            },
        };

        if api.cors.allow_credentials && api.cors.allowed_origins.iter().any(|o| o == "*") {
            return Err(Error::Config(
                "API_CORS_ALLOW_CREDENTIALS cannot be combined with a wildcard origin".to_owned(),
            ));
        }

        let usages = load_usages()?;

        Ok(Self {
            app_name,
            master_key,
            postgres_dsn,
            api,
            usages,
        })
    }

    /// Log a redacted summary of the loaded configuration.
    pub fn summary(&self) {
        let usages: Vec<&String> = self.usages.keys().collect();
        info!(
            app = %self.app_name,
            api.port = self.api.port,
            usages = ?usages,
            "configuration loaded"
        );
    }
}

/// Load usage presets, embedded by default, from `KEYS_CONFIG_PATH` when set.
///
/// # Errors
///
/// Returns an error on unreadable files, YAML failures, unknown algorithms,
/// or lifetime invariant violations (`rotation < ttl`, `cache < ttl`).
pub fn load_usages() -> Result<HashMap<String, UsageConfig>> {
    let raw = match env::var("KEYS_CONFIG_PATH") {
        Ok(path) => std::fs::read_to_string(&path)
            .map_err(|err| Error::Config(format!("read {path}: {err}")))?,
        Err(_) => DEFAULT_USAGES.to_owned(),
    };

    let usages: HashMap<String, UsageConfig> = serde_yaml::from_str(&raw)
        .map_err(|err| Error::Config(format!("parse usage presets: {err}")))?;

    for (usage, cfg) in &usages {
        if cfg.key.rotation >= cfg.key.ttl {
            return Err(Error::Config(format!(
                "usage {usage}: key.rotation must be shorter than key.ttl"
            )));
        }
        if cfg.key.cache >= cfg.key.ttl {
            return Err(Error::Config(format!(
                "usage {usage}: key.cache must be shorter than key.ttl"
            )));
        }
    }

    Ok(usages)
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|err| Error::Config(format!("parse {name}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn env_duration(name: &str, default: Duration) -> Result<Duration> {
    match env::var(name) {
        Ok(raw) => humantime::parse_duration(&raw)
            .map_err(|err| Error::Config(format!("parse {name}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn env_list(name: &str, default: &[&str]) -> Vec<String> {
    env::var(name).map_or_else(
        |_| default.iter().map(|&item| item.to_owned()).collect(),
        |raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_owned)
                .collect()
        },
    )
}
