// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ID token authentication middleware.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user extracted from a verified ID token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Caller identity on routes where authentication is optional.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

/// Middleware that requires a valid bearer ID token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or(AppError::Unauthorized)?
        .to_string();

    let verified = state.identity.verify_id_token(&token).await?;

    request.extensions_mut().insert(AuthUser {
        user_id: verified.user_id,
    });

    Ok(next.run(request).await)
}

/// Middleware that attaches the caller's identity when a valid token is sent.
///
/// Missing or invalid tokens fall through as anonymous.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(request.headers()).map(str::to_string);

    let user = match token {
        Some(token) => match state.identity.verify_id_token(&token).await {
            Ok(verified) => Some(AuthUser {
                user_id: verified.user_id,
            }),
            Err(e) => {
                tracing::debug!(error = ?e, "Ignoring unverifiable token on optional-auth route");
                None
            }
        },
        None => None,
    };

    request.extensions_mut().insert(OptionalAuthUser(user));
    next.run(request).await
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
