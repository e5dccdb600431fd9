// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Health summary generation.

use crate::config::APP_VERSION;
use crate::error::{AppError, Result};
use crate::middleware::auth::OptionalAuthUser;
use crate::models::{AnalysisRecord, HealthMetrics};
use crate::services::completion::SUMMARY_PARAMS;
use crate::services::prompts::{build_summary_prompt, CoachingProfile, COACH_SYSTEM_PROMPT};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Summary route. Optional auth is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/generate-summary", post(generate_summary))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SummaryResponse {
    pub summary: String,
}

/// Turn a metrics snapshot into a coaching summary.
///
/// Known callers get a personalized prompt and the result is appended to
/// their history.
async fn generate_summary(
    State(state): State<Arc<AppState>>,
    Extension(OptionalAuthUser(caller)): Extension<OptionalAuthUser>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<SummaryResponse>> {
    // An unreadable body is reported the same as an empty one.
    let body = payload.map(|Json(v)| v).unwrap_or(Value::Null);
    let metrics = HealthMetrics::from_json(&body)?;

    let profile = match &caller {
        Some(user) => match state.store.get_user(&user.user_id).await {
            Ok(record) => Some(CoachingProfile::from(&record)),
            Err(AppError::NotFound(_)) => {
                tracing::warn!(user_id = %user.user_id, "Verified caller has no user record");
                None
            }
            Err(e) => return Err(e),
        },
        None => None,
    };

    let prompt = build_summary_prompt(&metrics, profile.as_ref(), &state.config.summary_language);
    let summary = state
        .completion
        .complete(COACH_SYSTEM_PROMPT, &prompt, SUMMARY_PARAMS)
        .await?;

    if let Some(user) = &caller {
        let record = AnalysisRecord::new(
            &user.user_id,
            metrics,
            summary.clone(),
            now_rfc3339(),
            APP_VERSION,
        );
        state.store.insert_analysis(&record).await?;
        tracing::info!(
            user_id = %user.user_id,
            analysis_id = %record.id,
            personalized = profile.is_some(),
            "Summary generated and stored"
        );
    } else {
        tracing::info!("Anonymous summary generated");
    }

    Ok(Json(SummaryResponse { summary }))
}
