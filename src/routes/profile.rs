// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile and summary-history routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{AnalysisRecord, HealthMetrics, UserRecord, UserUpdate};
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Profile routes (require authentication).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user/profile", get(get_profile).put(update_profile))
        .route("/api/user/history", get(get_history))
}

// ─── User Profile ────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileResponse {
    pub success: bool,
    pub user_data: UserRecord,
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let user_data = state.store.get_user(&user.user_id).await?;
    Ok(Json(ProfileResponse {
        success: true,
        user_data,
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UpdateProfileResponse {
    pub success: bool,
    pub message: String,
}

/// Optional object under `key`; anything else but `null` is rejected.
fn section<'a>(body: &'a Value, key: &str) -> Result<Option<&'a Map<String, Value>>> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(AppError::BadRequest(format!("'{}' must be an object", key))),
    }
}

/// Merge supplied `profile` / `preferences` keys into the stored record.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<UpdateProfileResponse>> {
    let Json(body) = payload?;
    if !body.is_object() {
        return Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    }

    let update = UserUpdate::from_sections(section(&body, "profile")?, section(&body, "preferences")?)?;

    if !update.is_empty() {
        // Reject values the stored schema can't hold before writing anything.
        let current = state.store.get_user(&user.user_id).await?;
        update.apply_to(&current)?;

        state.store.update_user(&user.user_id, &update).await?;
        tracing::info!(
            user_id = %user.user_id,
            fields = ?update.paths().collect::<Vec<_>>(),
            "Profile updated"
        );
    }

    Ok(Json(UpdateProfileResponse {
        success: true,
        message: "Profile updated successfully".to_string(),
    }))
}

// ─── History ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
}

fn default_limit() -> u32 {
    20
}

const MAX_LIMIT: u32 = 100;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: String,
    pub summary: String,
    pub health_data: HealthMetrics,
}

impl From<AnalysisRecord> for HistoryEntry {
    fn from(record: AnalysisRecord) -> Self {
        Self {
            id: record.id,
            timestamp: record.timestamp,
            summary: record.ai_analysis,
            health_data: record.health_data,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<HistoryEntry>,
    pub count: usize,
}

/// The caller's past summaries, newest first.
async fn get_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    query: std::result::Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>> {
    let Query(params) = query?;
    let limit = params.limit.min(MAX_LIMIT);

    tracing::debug!(
        user_id = %user.user_id,
        limit,
        offset = params.offset,
        "Fetching summary history"
    );

    let history: Vec<HistoryEntry> = state
        .store
        .list_analyses(&user.user_id, limit, params.offset)
        .await?
        .into_iter()
        .map(HistoryEntry::from)
        .collect();

    Ok(Json(HistoryResponse {
        success: true,
        count: history.len(),
        history,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn section_accepts_objects_and_absence() {
        let body = json!({"profile": {"age": 30}, "preferences": null});
        assert_eq!(section(&body, "profile").unwrap().unwrap().len(), 1);
        assert!(section(&body, "preferences").unwrap().is_none());
        assert!(section(&body, "missing").unwrap().is_none());
    }

    #[test]
    fn section_rejects_non_objects() {
        let body = json!({"profile": ["age", 30]});
        assert!(matches!(
            section(&body, "profile"),
            Err(AppError::BadRequest(_))
        ));
    }
}
