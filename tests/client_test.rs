// ABOUTME: Consumer client tests - HTTP adapter contract and remote verification flow
// ABOUTME: Serves the custodian surface from wiremock and verifies tokens against it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Map, Value};
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jwk_custodian::client::{Client, ClaimsVerifier};
use jwk_custodian::errors::Error;
use jwk_custodian::jwk::Algorithm;

use common::{custodian, usage_config};

async fn client_for(server: &MockServer) -> Client {
    Client::new(Url::parse(&server.uri()).unwrap(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_ping() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .mount(&server)
        .await;

    client_for(&server).await.ping().await.unwrap();
}

#[tokio::test]
async fn test_get_public_key_not_found_maps_to_key_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/public-keys"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "key not found"})))
        .mount(&server)
        .await;

    let result = client_for(&server).await.get_public_key(Uuid::new_v4()).await;
    assert!(matches!(result, Err(Error::KeyNotFound)));
}

#[tokio::test]
async fn test_list_public_keys() {
    let server = MockServer::start().await;

    let keys = json!([{"kty": "OKP", "crv": "Ed25519", "kid": "abc", "x": "AA"}]);

    Mock::given(method("GET"))
        .and(path("/v1/public-keys/list"))
        .and(query_param("usage", "auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&keys))
        .mount(&server)
        .await;

    let listed = client_for(&server).await.list_public_keys("auth").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].kid.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_sign_claims_round_trips_the_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/payload/sign"))
        .and(query_param("usage", "auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "a.b.c"})))
        .mount(&server)
        .await;

    let mut claims = Map::new();
    claims.insert("foo".to_owned(), json!("bar"));

    let token = client_for(&server)
        .await
        .sign_claims("auth", claims)
        .await
        .unwrap();
    assert_eq!(token, "a.b.c");
}

#[tokio::test]
async fn test_remote_verifier_against_published_public_keys() {
    // A custodian signs locally; the consumer only ever sees the public
    // key list endpoint.
    let usages = HashMap::from([("auth".to_owned(), usage_config(Algorithm::EdDSA))]);
    let custodian = custodian(usages.clone());
    custodian.generate.generate("auth").await.unwrap();

    let public_keys = custodian.search.search("auth", false).await.unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/public-keys/list"))
        .and(query_param("usage", "auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&public_keys))
        .expect(1) // the caching source coalesces every verification into one fetch
        .mount(&server)
        .await;

    let mut payload = Map::new();
    payload.insert("foo".to_owned(), json!("bar"));
    let token = custodian.sign.sign(payload, "auth").await.unwrap();

    let verifier = ClaimsVerifier::new(&client_for(&server).await, usages);

    let claims: Value = verifier.verify(&token, "auth", false).await.unwrap();
    assert_eq!(claims["foo"], json!("bar"));
    assert_eq!(claims["iss"], json!("test-issuer"));

    // Second verification hits the cache, not the server.
    let again: Value = verifier.verify(&token, "auth", false).await.unwrap();
    assert_eq!(again["foo"], json!("bar"));

    // Tampering still fails against the cached public keys.
    let mut tampered = token.clone();
    tampered.replace_range(0..1, if token.starts_with('A') { "B" } else { "A" });
    assert!(verifier.verify::<Value>(&tampered, "auth", false).await.is_err());
}

#[tokio::test]
async fn test_remote_fetch_failure_surfaces() {
    let usages = HashMap::from([("auth".to_owned(), usage_config(Algorithm::EdDSA))]);

    // A structurally valid token, so verification reaches the key fetch.
    let custodian = custodian(usages.clone());
    custodian.generate.generate("auth").await.unwrap();
    let token = custodian.sign.sign(Map::new(), "auth").await.unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/public-keys/list"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "internal server error"})))
        .mount(&server)
        .await;

    let verifier = ClaimsVerifier::new(&client_for(&server).await, usages);

    let result = verifier.verify::<Value>(&token, "auth", false).await;
    assert!(matches!(result, Err(Error::Http(_))));
}
