// ABOUTME: Claims sign/verify tests - round-trips, target binding, expiry windows, tampering
// ABOUTME: Exercises producers and recipients end to end over the in-memory custodian
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use jwk_custodian::errors::Error;
use jwk_custodian::jwk::Algorithm;
use jwk_custodian::jws;
use jwk_custodian::services::LocalKeyFetcher;
use jwk_custodian::token::{CachingKeySource, Claims, Producer};

use common::{custodian, usage_config, TestCustodian};

fn auth_usages(alg: Algorithm) -> HashMap<String, jwk_custodian::config::UsageConfig> {
    HashMap::from([("auth".to_owned(), usage_config(alg))])
}

fn payload() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("foo".to_owned(), json!("bar"));
    map
}

/// Producer over the custodian's private key set, for tests that need to
/// control the issuance timestamp.
fn producer_for(custodian: &TestCustodian, usage: &str) -> Producer {
    let cfg = &custodian.usages[usage];
    let fetcher = LocalKeyFetcher::new(Arc::clone(&custodian.search), usage.to_owned(), true);
    let source = Arc::new(CachingKeySource::new(Box::new(fetcher), cfg.key.cache));

    Producer::new(cfg.alg, source)
}

#[tokio::test]
async fn test_sign_verify_round_trip() {
    let custodian = custodian(auth_usages(Algorithm::EdDSA));
    custodian.generate.generate("auth").await.unwrap();

    let token = custodian.sign.sign(payload(), "auth").await.unwrap();

    let claims: Value = custodian.verify.verify(&token, "auth", false).await.unwrap();

    assert_eq!(claims["foo"], json!("bar"));
    assert_eq!(claims["iss"], json!("test-issuer"));
    assert_eq!(claims["aud"], json!("test-audience"));
    assert_eq!(claims["sub"], json!("test-subject"));
    assert!(claims["exp"].as_i64().unwrap() > claims["iat"].as_i64().unwrap());
    assert!(Uuid::parse_str(claims["jti"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_token_kid_matches_main_key_row() {
    let custodian = custodian(auth_usages(Algorithm::EdDSA));
    custodian.generate.generate("auth").await.unwrap();

    let token = custodian.sign.sign(payload(), "auth").await.unwrap();
    let parsed = jws::parse_compact(&token).unwrap();

    assert_eq!(parsed.header.alg, Algorithm::EdDSA);

    let main = &custodian.store.rows()[0];
    assert_eq!(parsed.header.kid.as_deref(), Some(main.id.to_string().as_str()));
}

#[tokio::test]
async fn test_sign_without_active_key_fails() {
    let custodian = custodian(auth_usages(Algorithm::EdDSA));

    let result = custodian.sign.sign(payload(), "auth").await;
    assert!(matches!(result, Err(Error::KeyNotFound)));
}

#[tokio::test]
async fn test_sign_unknown_usage() {
    let custodian = custodian(auth_usages(Algorithm::EdDSA));

    let result = custodian.sign.sign(payload(), "nope").await;
    assert!(matches!(result, Err(Error::ConfigNotFound(_))));

    let result = custodian.verify.verify::<Value>("x.y.z", "nope", false).await;
    assert!(matches!(result, Err(Error::ConfigNotFound(_))));
}

#[tokio::test]
async fn test_verify_with_other_usage_fails() {
    let mut other = usage_config(Algorithm::EdDSA);
    other.token.issuer = "other-issuer".to_owned();

    let usages = HashMap::from([
        ("auth".to_owned(), usage_config(Algorithm::EdDSA)),
        ("other".to_owned(), other),
    ]);
    let custodian = custodian(usages);
    custodian.generate.generate("auth").await.unwrap();

    let token = custodian.sign.sign(payload(), "auth").await.unwrap();

    let result = custodian.verify.verify::<Value>(&token, "other", false).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_tampered_audience_fails_signature() {
    let custodian = custodian(auth_usages(Algorithm::EdDSA));
    custodian.generate.generate("auth").await.unwrap();

    let token = custodian.sign.sign(payload(), "auth").await.unwrap();

    let segments: Vec<&str> = token.split('.').collect();
    let mut claims: Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segments[1]).unwrap()).unwrap();
    claims["aud"] = json!("forged-audience");
    let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());

    let forged = format!("{}.{}.{}", segments[0], forged_payload, segments[2]);

    let result = custodian.verify.verify::<Value>(&forged, "auth", false).await;
    assert!(matches!(result, Err(Error::InvalidSignature)));
}

#[tokio::test]
async fn test_any_segment_tampering_fails() {
    let custodian = custodian(auth_usages(Algorithm::EdDSA));
    custodian.generate.generate("auth").await.unwrap();

    let token = custodian.sign.sign(payload(), "auth").await.unwrap();
    let segments: Vec<String> = token.split('.').map(str::to_owned).collect();

    for index in 0..3 {
        let mut tampered = segments.clone();
        // Flip one character, keeping the segment base64url-decodable in
        // most cases; any failure mode is acceptable as long as it fails.
        let replacement = if tampered[index].starts_with('A') { "B" } else { "A" };
        tampered[index].replace_range(0..1, replacement);

        let forged = tampered.join(".");
        let result = custodian.verify.verify::<Value>(&forged, "auth", false).await;
        assert!(result.is_err(), "tampered segment {index} was accepted");
    }

    let result = custodian
        .verify
        .verify::<Value>("not-even-a-token", "auth", false)
        .await;
    assert!(matches!(result, Err(Error::InvalidToken(_))));
}

#[tokio::test]
async fn test_expiry_window_with_leeway() {
    let custodian = custodian(auth_usages(Algorithm::EdDSA));
    custodian.generate.generate("auth").await.unwrap();

    let binding = custodian.usages["auth"].token.clone();
    let ttl = Duration::from_std(binding.ttl).unwrap();
    let leeway = Duration::from_std(binding.leeway).unwrap();
    let producer = producer_for(&custodian, "auth");

    // Expired one minute less than the leeway ago: still accepted.
    let issued = Utc::now() - ttl - leeway + Duration::minutes(1);
    let claims = Claims::new(payload(), &binding, issued);
    let token = producer.issue(&claims).await.unwrap();
    custodian
        .verify
        .verify::<Value>(&token, "auth", false)
        .await
        .unwrap();

    // Expired one minute more than the leeway ago: rejected.
    let issued = Utc::now() - ttl - leeway - Duration::minutes(1);
    let claims = Claims::new(payload(), &binding, issued);
    let token = producer.issue(&claims).await.unwrap();
    let result = custodian.verify.verify::<Value>(&token, "auth", false).await;
    assert!(matches!(result, Err(Error::TokenExpired)));
}

#[tokio::test]
async fn test_ignore_expired_waives_only_the_timestamp_check() {
    let custodian = custodian(auth_usages(Algorithm::EdDSA));
    custodian.generate.generate("auth").await.unwrap();

    let binding = custodian.usages["auth"].token.clone();
    let ttl = Duration::from_std(binding.ttl).unwrap();
    let producer = producer_for(&custodian, "auth");

    // Long expired.
    let issued = Utc::now() - ttl - Duration::days(30);
    let claims = Claims::new(payload(), &binding, issued);
    let token = producer.issue(&claims).await.unwrap();

    let result = custodian.verify.verify::<Value>(&token, "auth", false).await;
    assert!(matches!(result, Err(Error::TokenExpired)));

    let claims: Value = custodian.verify.verify(&token, "auth", true).await.unwrap();
    assert_eq!(claims["foo"], json!("bar"));

    // Target binding still applies with ignore_expired.
    let mut forged_binding = binding;
    forged_binding.issuer = "forged-issuer".to_owned();
    let claims = Claims::new(payload(), &forged_binding, issued);
    let token = producer.issue(&claims).await.unwrap();

    let result = custodian.verify.verify::<Value>(&token, "auth", true).await;
    assert!(matches!(result, Err(Error::ClaimsRejected(_))));
}

#[tokio::test]
async fn test_legacy_key_still_verifies_after_rotation() {
    let custodian = custodian(auth_usages(Algorithm::EdDSA));
    let rotation = Duration::from_std(custodian.usages["auth"].key.rotation).unwrap();

    let first = custodian.generate.generate("auth").await.unwrap();
    let first_id = Uuid::parse_str(first.kid.as_deref().unwrap()).unwrap();

    let token = custodian.sign.sign(payload(), "auth").await.unwrap();

    custodian
        .store
        .backdate(first_id, Utc::now() - rotation - Duration::minutes(1));
    custodian.generate.generate("auth").await.unwrap();

    // The old token's kid now points at a legacy key; recipients accept the
    // whole active set.
    let claims: Value = custodian.verify.verify(&token, "auth", false).await.unwrap();
    assert_eq!(claims["foo"], json!("bar"));
}

#[tokio::test]
async fn test_hmac_sign_verify_round_trip() {
    let custodian = custodian(auth_usages(Algorithm::HS256));
    custodian.generate.generate("auth").await.unwrap();

    let token = custodian.sign.sign(payload(), "auth").await.unwrap();
    let parsed = jws::parse_compact(&token).unwrap();
    assert_eq!(parsed.header.alg, Algorithm::HS256);

    let claims: Value = custodian.verify.verify(&token, "auth", false).await.unwrap();
    assert_eq!(claims["foo"], json!("bar"));
}

#[tokio::test]
async fn test_registered_claims_override_payload_fields() {
    let custodian = custodian(auth_usages(Algorithm::EdDSA));
    custodian.generate.generate("auth").await.unwrap();

    let mut claims = payload();
    claims.insert("iss".to_owned(), json!("spoofed-issuer"));

    let token = custodian.sign.sign(claims, "auth").await.unwrap();

    let verified: Value = custodian.verify.verify(&token, "auth", false).await.unwrap();
    assert_eq!(verified["iss"], json!("test-issuer"));
}
