// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account registration and ID token sign-in.

use crate::config::APP_VERSION;
use crate::error::{AppError, Result};
use crate::models::{PersonalInfo, UserRecord, UserUpdate};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Auth routes (public).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/register", post(register))
        .route("/api/auth/verify-token", post(verify_token))
        .route("/api/login", post(verify_token))
}

// ─── Registration ────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub name: String,
    pub phone: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

impl RegisterRequest {
    fn check_required(&self) -> Result<()> {
        let fields = [
            ("email", &self.email),
            ("password", &self.password),
            ("name", &self.name),
            ("phone", &self.phone),
            ("city", &self.city),
            ("state", &self.state),
            ("country", &self.country),
        ];

        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(AppError::BadRequest(format!(
                "Missing required field: {}",
                field
            ))),
            None => Ok(()),
        }
    }

    fn personal_info(&self) -> PersonalInfo {
        PersonalInfo {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            country: self.country.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RegisterResponse {
    pub success: bool,
    pub user_id: String,
    pub message: String,
}

/// Create an identity account and its user record.
async fn register(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let Json(req) = payload?;
    req.check_required()?;
    req.validate()?;

    let personal_info = req.personal_info();

    if state.store.email_registered(&personal_info.email).await? {
        return Err(AppError::Conflict("Email already in use".to_string()));
    }

    let user_id = state
        .identity
        .create_account(&personal_info.email, &req.password, &personal_info.name)
        .await?;

    let record = UserRecord::new(user_id.clone(), personal_info, &now_rfc3339(), APP_VERSION);

    // No rollback of the identity account if this write fails.
    if let Err(e) = state.store.create_user(&record).await {
        tracing::error!(
            user_id = %user_id,
            error = %e,
            "User record write failed after account creation; identity account is orphaned"
        );
        return Err(e);
    }

    tracing::info!(user_id = %user_id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            user_id,
            message: "User registered successfully".to_string(),
        }),
    ))
}

// ─── Sign-in ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyTokenRequest {
    pub id_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VerifyTokenResponse {
    pub success: bool,
    pub user_id: String,
    pub user_data: UserRecord,
}

/// Verify an ID token, record the login and return the user record.
async fn verify_token(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<VerifyTokenRequest>, JsonRejection>,
) -> Result<Json<VerifyTokenResponse>> {
    let Json(req) = payload?;

    let token = req
        .id_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Token not provided".to_string()))?;

    let verified = state.identity.verify_id_token(token.trim()).await?;
    let mut user = state.store.get_user(&verified.user_id).await?;

    let now = now_rfc3339();
    state
        .store
        .update_user(
            &verified.user_id,
            &UserUpdate::new().set("account_info.last_login", now.clone()),
        )
        .await?;
    user.account_info.last_login = now;

    tracing::info!(user_id = %verified.user_id, "User signed in");

    Ok(Json(VerifyTokenResponse {
        success: true,
        user_id: verified.user_id,
        user_data: user,
    }))
}
