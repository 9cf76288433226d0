// ABOUTME: JWT claims envelope and registered-claim checks
// ABOUTME: Issuer/audience/subject binding plus leeway-tolerant timestamp validation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::TokenBinding;
use crate::errors::{Error, Result};

/// Claims envelope for every token this service issues.
///
/// The user payload is flattened next to the registered claims; collisions
/// resolve in favor of the registered members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer, from the usage's token binding.
    pub iss: String,
    /// Audience, from the usage's token binding.
    pub aud: String,
    /// Subject, from the usage's token binding.
    pub sub: String,
    /// Issuance time, unix seconds.
    pub iat: i64,
    /// Expiration time, unix seconds.
    pub exp: i64,
    /// Not-before, unix seconds. Checked when present, never emitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    /// Unique token id.
    pub jti: String,
    /// User-supplied payload fields.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Registered claim names, always owned by the envelope.
const REGISTERED: [&str; 7] = ["iss", "aud", "sub", "iat", "exp", "nbf", "jti"];

impl Claims {
    /// Build an envelope around a payload, stamped with the usage's target
    /// binding and a fresh token id.
    ///
    /// Registered claim names in the payload are dropped; the envelope's
    /// values always win, so callers cannot spoof the target binding.
    #[must_use]
    pub fn new(mut payload: Map<String, Value>, binding: &TokenBinding, now: DateTime<Utc>) -> Self {
        for name in REGISTERED {
            payload.remove(name);
        }

        let ttl = i64::try_from(binding.ttl.as_secs()).unwrap_or(i64::MAX);

        Self {
            iss: binding.issuer.clone(),
            aud: binding.audience.clone(),
            sub: binding.subject.clone(),
            iat: now.timestamp(),
            exp: now.timestamp().saturating_add(ttl),
            nbf: None,
            jti: Uuid::new_v4().to_string(),
            payload,
        }
    }
}

/// Registered-claim validation for one verification call.
///
/// The target binding is always enforced; the timestamp check is optional so
/// refresh flows can introspect a recently expired token without waiving
/// signature or target validation.
#[derive(Debug, Clone)]
pub struct ClaimsChecker {
    /// Expected `iss` value.
    pub issuer: String,
    /// Expected `aud` value.
    pub audience: String,
    /// Expected `sub` value.
    pub subject: String,
    /// Leeway applied to `exp` and `nbf`; `None` skips the timestamp check.
    pub leeway: Option<Duration>,
}

impl ClaimsChecker {
    /// Build a checker from a usage's token binding.
    #[must_use]
    pub fn new(binding: &TokenBinding, ignore_expired: bool) -> Self {
        Self {
            issuer: binding.issuer.clone(),
            audience: binding.audience.clone(),
            subject: binding.subject.clone(),
            leeway: (!ignore_expired).then_some(binding.leeway),
        }
    }

    /// Validate the registered claims of a decoded payload.
    ///
    /// # Errors
    ///
    /// - [`Error::ClaimsRejected`] on a target binding mismatch or a missing
    ///   required claim.
    /// - [`Error::TokenExpired`] when `exp` (plus leeway) has passed.
    pub fn check(&self, claims: &Value, now: DateTime<Utc>) -> Result<()> {
        check_target(claims, "iss", &self.issuer)?;
        check_target(claims, "aud", &self.audience)?;
        check_target(claims, "sub", &self.subject)?;

        let Some(leeway) = self.leeway else {
            return Ok(());
        };
        let leeway = i64::try_from(leeway.as_secs()).unwrap_or(i64::MAX);
        let now = now.timestamp();

        let exp = claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::ClaimsRejected("missing exp claim".to_owned()))?;

        if now > exp.saturating_add(leeway) {
            return Err(Error::TokenExpired);
        }

        if let Some(nbf) = claims.get("nbf").and_then(Value::as_i64) {
            if now < nbf.saturating_sub(leeway) {
                return Err(Error::ClaimsRejected("token not yet valid".to_owned()));
            }
        }

        Ok(())
    }
}

fn check_target(claims: &Value, name: &'static str, expected: &str) -> Result<()> {
    let actual = claims
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::ClaimsRejected(format!("missing {name} claim")))?;

    if actual == expected {
        Ok(())
    } else {
        Err(Error::ClaimsRejected(format!("{name} mismatch")))
    }
}
