// ABOUTME: JSON Web Key model per RFC 7517 with the members this service persists
// ABOUTME: Parent module for algorithm presets, key generation and typed key material
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! JSON Web Key (JWK) representation and key material handling.
//!
//! A single [`Jwk`] struct covers every key type the custodian stores
//! (`OKP`, `oct`, `EC`, `RSA`); absent members are skipped during
//! serialization so the stored JSON stays canonical. The `kid` member always
//! equals the owning database row id in string form.

pub mod alg;
pub mod generate;
pub mod material;

pub use alg::Algorithm;
pub use generate::{generate, GeneratedKey};
pub use material::{SigningKey, VerifyingKey};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// JSON Web Key per RFC 7517.
///
/// Private representations carry the public members too, so a private JWK
/// can always serve verification without a second lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type: `OKP`, `oct`, `EC` or `RSA`.
    pub kty: String,
    /// Intended algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<Algorithm>,
    /// Public key use (always `sig` here).
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// Key identifier; equals the row id in string form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Curve name for `OKP` and `EC` keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// Public coordinate (`OKP`: the public key, `EC`: affine x).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// EC affine y coordinate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// Private member (`OKP`: seed, `EC`: scalar, `RSA`: private exponent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// RSA modulus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA public exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// RSA first prime factor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    /// RSA second prime factor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// Symmetric key value for `oct` keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
}

impl Jwk {
    /// Key identifier, required on every key this service produces.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] when the member is absent.
    pub fn kid(&self) -> Result<&str> {
        self.kid
            .as_deref()
            .ok_or_else(|| Error::invalid_key("missing kid member"))
    }

    /// Decode a base64-url-unpadded member, named for error context.
    pub(crate) fn member(&self, name: &'static str) -> Result<Vec<u8>> {
        let value = match name {
            "x" => self.x.as_deref(),
            "y" => self.y.as_deref(),
            "d" => self.d.as_deref(),
            "n" => self.n.as_deref(),
            "e" => self.e.as_deref(),
            "p" => self.p.as_deref(),
            "q" => self.q.as_deref(),
            "k" => self.k.as_deref(),
            _ => None,
        };

        let encoded = value.ok_or_else(|| Error::InvalidKey(format!("missing {name} member")))?;

        URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|err| Error::InvalidKey(format!("decode {name} member: {err}")))
    }
}

/// Base64-url-unpadded encoding used for every binary JWK member.
pub(crate) fn encode_member(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
