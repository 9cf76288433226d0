// ABOUTME: Consumer-side layer - HTTP client, remote key fetcher and local claims verifier
// ABOUTME: Lets downstream services verify tokens against cached public keys without a custodian round-trip
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Downstream consumer layer.
//!
//! A verifier process embeds the same read path as the custodian, except the
//! repository is this HTTP client. [`ClaimsVerifier`] assembles per-usage
//! recipients over [`HttpKeyFetcher`]s, so token verification happens
//! locally against cached public keys; only cache refreshes touch the
//! network. Signing always round-trips to the custodian, which never shares
//! private keys.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use url::Url;
use uuid::Uuid;

use crate::api::{Health, SignedToken};
use crate::config::UsageConfig;
use crate::errors::{Error, Result};
use crate::jwk::Jwk;
use crate::services::{build_recipients, VerifyClaimsService};
use crate::token::KeyFetcher;

/// Usage label for access-token signing keys in the default presets.
pub const USAGE_AUTH: &str = "auth";

/// Usage label for refresh-token signing keys in the default presets.
pub const USAGE_AUTH_REFRESH: &str = "auth-refresh";

/// HTTP client for one custodian deployment.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
}

impl Client {
    /// Build a client for the custodian at `base_url`.
    ///
    /// The timeout applies per request and doubles as the deadline
    /// propagated into cache refreshes.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|err| Error::Config(format!("invalid custodian url: {err}")))
    }

    /// Liveness probe against the custodian.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn ping(&self) -> Result<()> {
        let response = self.http.get(self.endpoint("v1/ping")?).send().await?;
        response.error_for_status()?;

        Ok(())
    }

    /// Fetch the custodian's dependency report.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an undecodable body.
    pub async fn healthcheck(&self) -> Result<Health> {
        let response = self
            .http
            .get(self.endpoint("v1/healthcheck")?)
            .send()
            .await?;

        Ok(response.error_for_status()?.json().await?)
    }

    /// Fetch one public key by id.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`] when the custodian reports 404; transport and
    /// decoding failures otherwise.
    pub async fn get_public_key(&self, kid: Uuid) -> Result<Jwk> {
        let response = self
            .http
            .get(self.endpoint("v1/public-keys")?)
            .query(&[("kid", kid.to_string())])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::KeyNotFound);
        }

        Ok(response.error_for_status()?.json().await?)
    }

    /// Fetch the active public key set of a usage, main key first.
    ///
    /// # Errors
    ///
    /// Returns transport and decoding failures.
    pub async fn list_public_keys(&self, usage: &str) -> Result<Vec<Jwk>> {
        let response = self
            .http
            .get(self.endpoint("v1/public-keys/list")?)
            .query(&[("usage", usage)])
            .send()
            .await?;

        Ok(response.error_for_status()?.json().await?)
    }

    /// Have the custodian sign a claims payload under a usage.
    ///
    /// # Errors
    ///
    /// Returns transport and decoding failures; custodian-side failures
    /// surface as error statuses.
    pub async fn sign_claims(&self, usage: &str, claims: Map<String, Value>) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint("v1/payload/sign")?)
            .query(&[("usage", usage)])
            .json(&claims)
            .send()
            .await?;

        let signed: SignedToken = response.error_for_status()?.json().await?;

        Ok(signed.token)
    }
}

/// [`KeyFetcher`] over the custodian's public key list endpoint.
pub struct HttpKeyFetcher {
    client: Client,
    usage: String,
}

impl HttpKeyFetcher {
    /// Bind a fetcher to one usage of a custodian client.
    #[must_use]
    pub fn new(client: Client, usage: String) -> Self {
        Self { client, usage }
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch_keys(&self) -> Result<Vec<Jwk>> {
        self.client.list_public_keys(&self.usage).await
    }
}

/// Local token verification for downstream services.
pub struct ClaimsVerifier {
    service: VerifyClaimsService,
}

impl ClaimsVerifier {
    /// Assemble per-usage recipients over the custodian's public keys.
    ///
    /// The usage presets must match the custodian's configuration for the
    /// usages this consumer cares about.
    #[must_use]
    pub fn new(client: &Client, usages: HashMap<String, UsageConfig>) -> Self {
        let usages = Arc::new(usages);

        let recipients = build_recipients(&usages, |usage| {
            Box::new(HttpKeyFetcher::new(client.clone(), usage.to_owned()))
        });

        Self {
            service: VerifyClaimsService::new(usages, recipients),
        }
    }

    /// Verify a token locally against cached public keys.
    ///
    /// # Errors
    ///
    /// Same contract as [`VerifyClaimsService::verify`].
    pub async fn verify<Out: DeserializeOwned>(
        &self,
        token: &str,
        usage: &str,
        ignore_expired: bool,
    ) -> Result<Out> {
        self.service.verify(token, usage, ignore_expired).await
    }
}
