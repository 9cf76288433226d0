// ABOUTME: Centralized error handling and error types for the JWK custodian
// ABOUTME: Defines the domain error kinds shared by services, jobs, API and client layers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Unified Error Handling System
//!
//! One error enum carries every failure kind the custodian can produce, so
//! callers can pattern-match on the root cause no matter how deep it
//! originated. Layers attach context through tracing events rather than by
//! re-wrapping, which keeps kinds matchable end to end: a `KeyNotFound`
//! raised by the repository is still a `KeyNotFound` when it reaches a
//! handler or an RPC adapter.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Domain errors for the key custodian.
#[derive(Debug, Error)]
pub enum Error {
    /// No active row matches the lookup (missing, soft-deleted or expired).
    #[error("key not found")]
    KeyNotFound,

    /// The requested usage has no configuration entry, or no producer or
    /// recipient was assembled for it at startup.
    #[error("no key configuration for usage: {0}")]
    ConfigNotFound(String),

    /// The usage's configured algorithm is not in the supported set.
    #[error("unknown algorithm for usage: {0}")]
    UnknownKeyUsage(String),

    /// The process-scope master key is absent or malformed.
    #[error("invalid master key: {0}")]
    InvalidMasterKey(String),

    /// Authenticated decryption failed. Either the master key changed or the
    /// stored blob was tampered with.
    #[error("invalid secret")]
    InvalidSecret,

    /// The stored blob is too short to hold a nonce and an authentication tag.
    #[error("invalid ciphertext: {len} bytes, minimum {min} required")]
    InvalidCiphertext {
        /// Actual blob length.
        len: usize,
        /// Minimum valid length (nonce + tag).
        min: usize,
    },

    /// Key material could not be decoded into a usable signing or verifying
    /// key (bad base64, wrong member set, wrong sizes).
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The token is not a well-formed compact JWS, or its header does not
    /// match the recipient it was handed to.
    #[error("malformed token: {0}")]
    InvalidToken(String),

    /// Signature verification failed.
    #[error("signature verification failed")]
    InvalidSignature,

    /// The token is outside its validity window, leeway included.
    #[error("token expired")]
    TokenExpired,

    /// A registered claim did not match the expected target binding.
    #[error("claims rejected: {0}")]
    ClaimsRejected(String),

    /// Configuration error (environment variables, usage presets).
    #[error("configuration error: {0}")]
    Config(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error while talking to a remote custodian.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO failure (listener binding, signal handling).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything that has no dedicated kind. The message keeps enough context
    /// for the logs; clients only ever see a generic failure.
    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Internal error with a free-form message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Invalid key material with a free-form message.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey(message.into())
    }
}

/// HTTP mapping for handler failures.
///
/// Only `KeyNotFound` has a dedicated client-visible status; every other
/// failure collapses to a generic 500 so that no key material, ciphertext or
/// internal detail ever leaks through the API. Full details are logged
/// server-side before sanitizing.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::KeyNotFound => (StatusCode::NOT_FOUND, "key not found"),
            _ => {
                tracing::error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<uuid::Error> for Error {
    fn from(error: uuid::Error) -> Self {
        Self::InvalidKey(format!("invalid key id: {error}"))
    }
}
