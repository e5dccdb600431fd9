// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Onboarding conversation routes.
//!
//! The client drives the step counter; each turn is logged, and completion
//! extracts a structured profile from the logged transcript.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::user::PROFILE_FIELDS;
use crate::models::{OnboardingTurn, UserUpdate};
use crate::services::completion::{EXTRACTION_PARAMS, ONBOARDING_PARAMS};
use crate::services::prompts::{
    build_extraction_prompt, build_onboarding_prompt, EXTRACTION_SYSTEM_PROMPT, ONBOARDING_STEPS,
};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Onboarding routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/chat/onboarding", post(onboarding_turn))
        .route("/api/chat/complete-onboarding", post(complete_onboarding))
}

// ─── Conversation ────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OnboardingRequest {
    message: String,
    step: Option<i64>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OnboardingResponse {
    pub success: bool,
    pub ai_response: String,
    pub next_step: i64,
    pub completed: bool,
}

/// Reply to one onboarding message and log the exchange.
async fn onboarding_turn(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<OnboardingRequest>, JsonRejection>,
) -> Result<Json<OnboardingResponse>> {
    let Json(req) = payload?;
    let step = req.step.unwrap_or(1);

    let record = state.store.get_user(&user.user_id).await?;

    let system = build_onboarding_prompt(
        step,
        &record.personal_info.name,
        &state.config.summary_language,
    );
    let ai_response = state
        .completion
        .complete(&system, &req.message, ONBOARDING_PARAMS)
        .await?;

    let turn = OnboardingTurn::new(
        &user.user_id,
        step,
        req.message,
        ai_response.clone(),
        now_rfc3339(),
    );
    state.store.insert_onboarding_turn(&turn).await?;

    tracing::info!(user_id = %user.user_id, step, "Onboarding turn recorded");

    Ok(Json(OnboardingResponse {
        success: true,
        ai_response,
        next_step: step.saturating_add(1),
        completed: step >= ONBOARDING_STEPS,
    }))
}

// ─── Completion ──────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CompleteOnboardingResponse {
    pub success: bool,
    pub message: String,
    pub extracted_profile: Map<String, Value>,
}

/// Extract a profile from the logged transcript and mark onboarding done.
async fn complete_onboarding(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CompleteOnboardingResponse>> {
    let current = state.store.get_user(&user.user_id).await?;

    let turns = state.store.list_onboarding_turns(&user.user_id).await?;
    if turns.is_empty() {
        tracing::warn!(user_id = %user.user_id, "Completing onboarding with no recorded turns");
    }

    let prompt = build_extraction_prompt(&turns);
    let raw = state
        .completion
        .complete(EXTRACTION_SYSTEM_PROMPT, &prompt, EXTRACTION_PARAMS)
        .await?;

    let extracted = extract_profile(&raw);

    let mut update = UserUpdate::new()
        .set("account_info.onboarding_completed", true)
        .set("account_info.onboarding_completed_at", now_rfc3339());
    for (key, value) in &extracted {
        update.insert(format!("profile.{}", key), value.clone());
    }

    update.apply_to(&current)?;
    state.store.update_user(&user.user_id, &update).await?;

    tracing::info!(
        user_id = %user.user_id,
        turns = turns.len(),
        extracted = extracted.len(),
        "Onboarding completed"
    );

    Ok(Json(CompleteOnboardingResponse {
        success: true,
        message: "Onboarding completed successfully".to_string(),
        extracted_profile: extracted,
    }))
}

const LIST_FIELDS: &[&str] = &["exercise_preferences", "health_goals"];

/// Parse the extractor's reply into known profile fields.
///
/// Anything unparseable yields an empty map. Values are coerced to the
/// stored field types; values that can't be coerced are dropped.
fn extract_profile(raw: &str) -> Map<String, Value> {
    let parsed = serde_json::from_str::<Value>(strip_code_fence(raw));

    let Ok(Value::Object(obj)) = parsed else {
        tracing::warn!("Profile extraction reply was not a JSON object");
        return Map::new();
    };

    PROFILE_FIELDS
        .iter()
        .filter_map(|&key| {
            let value = obj.get(key)?;
            let coerced = match key {
                "age" => coerce_age(value),
                k if LIST_FIELDS.contains(&k) => coerce_list(value),
                _ => coerce_text(value),
            }?;
            Some((key.to_string(), coerced))
        })
        .collect()
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. "json") on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().trim_end_matches("```").trim()
}

fn coerce_age(value: &Value) -> Option<Value> {
    let age = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if !age.is_finite() || age < 0.0 || age > f64::from(u32::MAX) {
        return None;
    }
    Some(Value::from(age.round() as u32))
}

fn coerce_text(value: &Value) -> Option<Value> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(Value::String(text))
}

fn coerce_list(value: &Value) -> Option<Value> {
    match value {
        Value::Array(items) => Some(Value::Array(
            items.iter().filter_map(coerce_text).collect(),
        )),
        Value::String(_) => coerce_text(value).map(|v| Value::Array(vec![v])),
        _ => None,
    }
}
