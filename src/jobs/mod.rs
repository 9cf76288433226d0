// ABOUTME: Scheduled jobs run from the CLI
// ABOUTME: Currently the key rotation cycle
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

pub mod rotate_keys;

pub use rotate_keys::RotateKeysJob;
