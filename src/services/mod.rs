// ABOUTME: Service layer - the operations behind every API, job and client entry point
// ABOUTME: Extraction, search/select, rotation, claims sign/verify and startup assembly
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Service layer.
//!
//! Services are constructed once at startup with their dependencies
//! injected (store handle, master key, usage presets) and shared behind
//! `Arc` afterwards; none of them keeps mutable state of its own.

pub mod assembly;
pub mod extract;
pub mod generate_key;
pub mod search_keys;
pub mod select_key;
pub mod sign_claims;
pub mod verify_claims;

pub use assembly::{build_producers, build_recipients, LocalKeyFetcher};
pub use extract::ExtractKeyService;
pub use generate_key::GenerateKeyService;
pub use search_keys::SearchKeysService;
pub use select_key::SelectKeyService;
pub use sign_claims::SignClaimsService;
pub use verify_claims::VerifyClaimsService;
