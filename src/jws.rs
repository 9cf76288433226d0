// ABOUTME: Compact JWS serialization primitives shared by producers and recipients
// ABOUTME: Protected header model plus base64url segment encoding, assembly and splitting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Compact JWS plumbing.
//!
//! A signed token is `BASE64URL(header) "." BASE64URL(payload) "."
//! BASE64URL(signature)` with unpadded url-safe base64. The protected header
//! carries `alg` (the usage's configured algorithm) and `kid` (the signing
//! row id in string form).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::jwk::Algorithm;

/// Protected JWS header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Signature algorithm.
    pub alg: Algorithm,
    /// Token type, `JWT` on everything this service issues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Identifier of the signing key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Header {
    /// Header for a token issued with the given algorithm and key id.
    #[must_use]
    pub fn new(alg: Algorithm, kid: String) -> Self {
        Self {
            alg,
            typ: Some("JWT".to_owned()),
            kid: Some(kid),
        }
    }
}

/// A compact token split into its three segments, header decoded.
#[derive(Debug)]
pub struct ParsedToken<'a> {
    /// Decoded protected header.
    pub header: Header,
    /// Raw header segment, as signed.
    pub header_b64: &'a str,
    /// Raw payload segment, as signed.
    pub payload_b64: &'a str,
    /// Decoded signature bytes.
    pub signature: Vec<u8>,
}

impl ParsedToken<'_> {
    /// The signing input: `header "." payload`.
    #[must_use]
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.header_b64, self.payload_b64)
    }
}

/// Serialize a value and encode it as an unpadded base64url segment.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn encode_segment<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decode an unpadded base64url segment into a value.
///
/// # Errors
///
/// Returns [`Error::InvalidToken`] on base64 or JSON failure.
pub fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|err| Error::InvalidToken(format!("invalid segment encoding: {err}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|err| Error::InvalidToken(format!("invalid segment payload: {err}")))
}

/// Split a compact token and decode its header and signature.
///
/// # Errors
///
/// Returns [`Error::InvalidToken`] unless the token has exactly three
/// decodable segments.
pub fn parse_compact(token: &str) -> Result<ParsedToken<'_>> {
    let mut segments = token.split('.');

    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(Error::InvalidToken(
            "expected three dot-separated segments".to_owned(),
        ));
    };

    let header: Header = decode_segment(header_b64)?;

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|err| Error::InvalidToken(format!("invalid signature encoding: {err}")))?;

    Ok(ParsedToken {
        header,
        header_b64,
        payload_b64,
        signature,
    })
}
