// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification dispatch routes.

use crate::error::{AppError, Result};
use crate::services::notifications::{Channel, DispatchResults, NotificationStatus, Recipient};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Notification routes (public).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/send-wellness-summary", post(send_wellness_summary))
        .route("/api/test-notifications", post(test_notifications))
        .route("/api/notification-status", get(notification_status))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DispatchResponse {
    pub success: bool,
    pub results: DispatchResults,
}

// ─── Summary Delivery ────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SendSummaryRequest {
    user_data: Recipient,
    summary_text: String,
    channels: Option<Vec<String>>,
}

fn parse_channels(requested: Option<&[String]>) -> Result<Vec<Channel>> {
    match requested {
        None => Ok(vec![Channel::Email]),
        Some(names) => names.iter().map(|name| name.parse()).collect(),
    }
}

async fn send_wellness_summary(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<SendSummaryRequest>, JsonRejection>,
) -> Result<Json<DispatchResponse>> {
    let Json(req) = payload?;

    if req.summary_text.trim().is_empty() {
        return Err(AppError::BadRequest("Summary text is required".to_string()));
    }
    if req.user_data.email().is_none() && req.user_data.phone().is_none() {
        return Err(AppError::BadRequest(
            "User email or phone is required".to_string(),
        ));
    }

    let channels = parse_channels(req.channels.as_deref())?;
    tracing::info!(channels = ?channels, "Dispatching wellness summary");

    let results = state
        .notifications
        .send_wellness_summary(&req.user_data, &req.summary_text, &channels)
        .await;

    Ok(Json(DispatchResponse {
        success: true,
        results,
    }))
}

// ─── Test Delivery ───────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TestNotificationsRequest {
    phone: Option<String>,
    email: Option<String>,
}

async fn test_notifications(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<TestNotificationsRequest>, JsonRejection>,
) -> Result<Json<DispatchResponse>> {
    let Json(req) = payload?;

    let phone = req.phone.as_deref().filter(|p| !p.trim().is_empty());
    let email = req.email.as_deref().filter(|e| !e.trim().is_empty());
    if phone.is_none() && email.is_none() {
        return Err(AppError::BadRequest(
            "Phone or email is required for testing".to_string(),
        ));
    }

    let results = state
        .notifications
        .send_test_notifications(phone, email)
        .await;

    Ok(Json(DispatchResponse {
        success: true,
        results,
    }))
}

async fn notification_status(State(state): State<Arc<AppState>>) -> Json<NotificationStatus> {
    Json(state.notifications.status())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_default_to_email() {
        assert_eq!(parse_channels(None).unwrap(), vec![Channel::Email]);
    }

    #[test]
    fn unknown_channel_rejected() {
        let names = vec!["sms".to_string(), "fax".to_string()];
        assert!(matches!(
            parse_channels(Some(&names)),
            Err(AppError::BadRequest(_))
        ));
    }
}
