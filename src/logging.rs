// ABOUTME: Logging configuration and structured logging setup for observability
// ABOUTME: Configures log levels and output formats from environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Production logging configuration with structured output.
//!
//! `RUST_LOG` (or `LOG_LEVEL` as a fallback) selects the filter directives,
//! `LOG_FORMAT=json` switches to newline-delimited JSON for log collectors.

use std::env;

use tracing_subscriber::EnvFilter;

use crate::errors::{Error, Result};

/// Initialize the global tracing subscriber from environment variables.
///
/// # Errors
///
/// Returns an error if a subscriber was already installed.
pub fn init_from_env() -> Result<()> {
    let directives = env::var("RUST_LOG")
        .or_else(|_| env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| "info".to_owned());
    let filter = EnvFilter::new(directives);

    let json = env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let result = if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|err| Error::Config(format!("install tracing subscriber: {err}")))
}
