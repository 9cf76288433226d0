// ABOUTME: Configuration tests - embedded usage presets and lifetime invariants
// ABOUTME: The presets must parse and respect rotation < ttl and cache < ttl
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use jwk_custodian::config::load_usages;
use jwk_custodian::jwk::Algorithm;

#[test]
fn test_embedded_presets_parse() {
    let usages = load_usages().unwrap();

    assert!(usages.contains_key("auth"));
    assert!(usages.contains_key("auth-refresh"));

    let auth = &usages["auth"];
    assert_eq!(auth.alg, Algorithm::EdDSA);
    assert_eq!(auth.token.subject, "access");

    let refresh = &usages["auth-refresh"];
    assert_eq!(refresh.token.subject, "refresh");
    assert!(refresh.token.ttl > auth.token.ttl);
}

#[test]
fn test_embedded_presets_respect_lifetime_invariants() {
    let usages = load_usages().unwrap();

    for (usage, cfg) in &usages {
        // A key must outlive its rotation interval so verifiers can accept
        // tokens signed right before a successor appeared.
        assert!(cfg.key.rotation < cfg.key.ttl, "{usage}: rotation >= ttl");
        assert!(cfg.key.cache < cfg.key.ttl, "{usage}: cache >= ttl");
        assert!(!cfg.token.issuer.is_empty(), "{usage}: empty issuer");
        assert!(!cfg.token.audience.is_empty(), "{usage}: empty audience");
        assert!(!cfg.token.subject.is_empty(), "{usage}: empty subject");
    }
}
