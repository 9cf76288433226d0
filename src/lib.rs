// ABOUTME: Main library entry point for the JWK custodian service
// ABOUTME: Key lifecycle, rotation, public-key distribution and JWT issuance/verification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![deny(unsafe_code)]

//! # JWK Custodian
//!
//! A custodian service for the JSON Web Keys a fleet of cooperating services
//! uses to sign and verify JWTs. It owns key generation, encrypted
//! persistence, rotation, public-key distribution and token issuance;
//! downstream services embed the thin [`client`] layer to verify tokens
//! locally against cached public keys.
//!
//! ## Architecture
//!
//! - **`crypto`**: master-key envelope sealing private JWK material at rest
//! - **`database`**: key registry with soft deletion and an `active_keys`
//!   view; reads always see the active set ordered newest-first
//! - **`jwk` / `jws`**: RFC 7517 key model, per-algorithm generation, typed
//!   signing/verifying unions and compact JWS plumbing
//! - **`token`**: caching key sources (single-flight), producers bound to
//!   the main key, recipients accepting the whole active set
//! - **`services`**: the operations behind every entry point, including the
//!   rotation engine
//! - **`jobs`**: the rotation cycle run by `jwk-custodian rotate-keys`
//! - **`api`**: the HTTP surface (ping, healthcheck, public keys, signing)
//!
//! ## Key lifecycle
//!
//! A key is created by the rotation engine, never updated, then either
//! soft-deleted or expires naturally. For every usage the newest active key
//! is the **main key** used by producers; older active keys stay around as
//! **legacy** keys so recipients keep accepting tokens signed before a
//! rotation.

/// HTTP surface: ping, healthcheck, public key distribution, signing
pub mod api;

/// Consumer-side client, remote key fetcher and local claims verifier
pub mod client;

/// Environment configuration and per-usage key presets
pub mod config;

/// Master-key envelope for private key material at rest
pub mod crypto;

/// Key registry persistence and the `active_keys` view
pub mod database;

/// Error kinds shared across every layer
pub mod errors;

/// Scheduled jobs (key rotation)
pub mod jobs;

/// JSON Web Key model, generation and typed key material
pub mod jwk;

/// Compact JWS serialization primitives
pub mod jws;

/// Structured logging setup
pub mod logging;

/// Services: extraction, search/select, rotation, claims sign/verify
pub mod services;

/// Token plumbing: claims, caching sources, producers, recipients
pub mod token;
