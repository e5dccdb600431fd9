// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod auth;
pub mod chat;
pub mod notifications;
pub mod profile;
pub mod summary;

use crate::config::APP_VERSION;
use crate::middleware::auth::{optional_auth, require_auth};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::http::{header, HeaderValue, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub build_id: String,
    pub timestamp: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: APP_VERSION.to_string(),
        build_id,
        timestamp: now_rfc3339(),
    })
}

async fn banner() -> String {
    format!("Wellness Coach API v{} - AI wellness coaching", APP_VERSION)
}

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::OPTIONS,
    ];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT];

    let Some(allowed) = allowed_origin.map(str::to_string) else {
        // Bearer tokens travel in headers, so any origin may call without credentials.
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers);
    };

    // Configured frontend only, exact match
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request_parts: &axum::http::request::Parts| {
                origin.as_bytes() == allowed.as_bytes()
            },
        ))
        .allow_credentials(true)
        .allow_methods(methods)
        .allow_headers(headers)
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(banner))
        .route("/api/health", get(health_check))
        .merge(auth::routes())
        .merge(notifications::routes());

    // Summary works anonymously, personalized when the caller is known
    let optional_auth_routes = summary::routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    // Protected routes (auth required)
    let protected_routes = profile::routes()
        .merge(chat::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(optional_auth_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
