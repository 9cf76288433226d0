// ABOUTME: Token plumbing - claims envelope, caching key sources, producers and recipients
// ABOUTME: Everything between a claims payload and a compact JWS, minus persistence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Token plumbing.
//!
//! Producers sign with the main key of their usage, recipients accept the
//! whole active set; both sides read key material through a time-limited
//! caching source so the backing store (local repository or remote
//! custodian) is only consulted when the cache goes stale.

pub mod claims;
pub mod producer;
pub mod recipient;
pub mod source;

pub use claims::{Claims, ClaimsChecker};
pub use producer::Producer;
pub use recipient::Recipient;
pub use source::{CachingKeySource, KeyFetcher};
