// ABOUTME: HTTP surface - ping, healthcheck, public key distribution and payload signing
// ABOUTME: Thin axum handlers over the service layer with CORS/timeout/body-limit middleware
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! HTTP API.
//!
//! Five endpoints, all under `/v1`:
//!
//! - `GET /v1/ping` → `200 "pong"`
//! - `GET /v1/healthcheck` → `200 {"postgres": {"name", "status"}}`
//! - `GET /v1/public-keys?kid=<uuid>` → `200 JWK` | `404`
//! - `GET /v1/public-keys/list?usage=<usage>` → `200 [JWK]`
//! - `POST /v1/payload/sign?usage=<usage>` → `200 {"token"}`
//!
//! Failures other than a missing key collapse to
//! `500 {"error":"internal server error"}`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::config::{ApiConfig, CorsConfig};
use crate::database::KeyStore;
use crate::errors::{Error, Result};
use crate::jwk::Jwk;
use crate::services::{SearchKeysService, SelectKeyService, SignClaimsService};

/// Shared state behind every handler.
#[derive(Clone)]
pub struct ApiState {
    /// Store handle, used by the healthcheck probe.
    pub store: Arc<dyn KeyStore>,
    /// Single-key retrieval service.
    pub select: Arc<SelectKeyService>,
    /// Batch retrieval service.
    pub search: Arc<SearchKeysService>,
    /// Token issuance service.
    pub sign: Arc<SignClaimsService>,
}

/// Bare router without middleware, shared by the server and the tests.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/healthcheck", get(healthcheck))
        .route("/v1/public-keys", get(get_public_key))
        .route("/v1/public-keys/list", get(list_public_keys))
        .route("/v1/payload/sign", post(sign_claims))
        .with_state(state)
}

/// Full application router with the configured middleware stack.
///
/// # Errors
///
/// Returns a configuration error when CORS origins or headers are not valid
/// header values.
pub fn app(state: ApiState, config: &ApiConfig) -> Result<Router> {
    Ok(router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors)?)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(RequestBodyLimitLayer::new(config.max_request_size)))
}

/// Serve the API until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error on listen failure; a signal shuts the server down
/// gracefully and returns `Ok`.
pub async fn serve(state: ApiState, config: &ApiConfig) -> Result<()> {
    let app = app(state, config)?;

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
    let mut layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .max_age(config.max_age);

    if config.allowed_origins.iter().any(|origin| origin == "*") {
        layer = layer.allow_origin(AllowOrigin::any());
    } else {
        let origins = config
            .allowed_origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .map_err(|err| Error::Config(format!("invalid CORS origin {origin}: {err}")))
            })
            .collect::<Result<Vec<_>>>()?;
        layer = layer.allow_origin(AllowOrigin::list(origins));
    }

    if config.allowed_headers.is_empty() {
        // Mirroring stays valid when credentials are allowed, unlike a
        // wildcard.
        layer = layer.allow_headers(AllowHeaders::mirror_request());
    } else {
        let headers = config
            .allowed_headers
            .iter()
            .map(|header| {
                header
                    .parse::<HeaderName>()
                    .map_err(|err| Error::Config(format!("invalid CORS header {header}: {err}")))
            })
            .collect::<Result<Vec<_>>>()?;
        layer = layer.allow_headers(AllowHeaders::list(headers));
    }

    if config.allow_credentials {
        layer = layer.allow_credentials(true);
    }

    Ok(layer)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let Ok(mut terminate) = signal(SignalKind::terminate()) else {
            let _ = ctrl_c.await;
            return;
        };

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}

/// Liveness probe.
async fn ping() -> &'static str {
    "pong"
}

/// Dependency status in the healthcheck response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    /// Dependency reachable.
    Up,
    /// Dependency unreachable or failing.
    Down,
}

/// One reported dependency.
#[derive(Debug, Serialize, Deserialize)]
pub struct Dependency {
    /// Dependency name.
    pub name: String,
    /// Probe outcome.
    pub status: DependencyStatus,
}

/// Healthcheck response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    /// Postgres connectivity report.
    pub postgres: Dependency,
}

/// Readiness probe. Always 200; dependency failures show up as `down`.
async fn healthcheck(State(state): State<ApiState>) -> Json<Health> {
    let status = match state.store.ping().await {
        Ok(()) => DependencyStatus::Up,
        Err(err) => {
            tracing::warn!(error = %err, "postgres healthcheck failed");
            DependencyStatus::Down
        }
    };

    Json(Health {
        postgres: Dependency {
            name: "postgres".to_owned(),
            status,
        },
    })
}

#[derive(Debug, Deserialize)]
struct GetPublicKeyParams {
    kid: Uuid,
}

/// Serve one public key by id.
async fn get_public_key(
    State(state): State<ApiState>,
    Query(params): Query<GetPublicKeyParams>,
) -> Result<Json<Jwk>> {
    let key = state.select.select(params.kid, false).await?;

    Ok(Json(key))
}

#[derive(Debug, Deserialize)]
struct ListPublicKeysParams {
    usage: String,
}

/// Serve the active public key set of a usage, main key first.
///
/// Symmetric usages have no public half, so this serves their `oct` JWK -
/// the shared secret itself. Do not expose such usages to untrusted callers.
async fn list_public_keys(
    State(state): State<ApiState>,
    Query(params): Query<ListPublicKeysParams>,
) -> Result<Json<Vec<Jwk>>> {
    let keys = state.search.search(&params.usage, false).await?;

    Ok(Json(keys))
}

#[derive(Debug, Deserialize)]
struct SignClaimsParams {
    usage: String,
}

/// Token issuance response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignedToken {
    /// Compact JWS.
    pub token: String,
}

/// Sign an arbitrary JSON claims object under a usage.
async fn sign_claims(
    State(state): State<ApiState>,
    Query(params): Query<SignClaimsParams>,
    Json(claims): Json<Map<String, Value>>,
) -> Result<Json<SignedToken>> {
    let token = state.sign.sign(claims, &params.usage).await?;

    Ok(Json(SignedToken { token }))
}
