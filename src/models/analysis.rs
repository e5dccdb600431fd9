// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Append-only records: summary analyses and onboarding conversation turns.

use serde::{Deserialize, Serialize};

use crate::models::HealthMetrics;

/// A generated summary, stored once per authenticated summary request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Document ID
    pub id: String,
    pub user_id: String,
    pub health_data: HealthMetrics,
    /// Generated summary text
    pub ai_analysis: String,
    /// RFC 3339 UTC, fixed precision (sort key)
    pub timestamp: String,
    pub app_version: String,
}

impl AnalysisRecord {
    pub fn new(
        user_id: &str,
        health_data: HealthMetrics,
        ai_analysis: String,
        timestamp: String,
        app_version: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            health_data,
            ai_analysis,
            timestamp,
            app_version: app_version.to_string(),
        }
    }
}

/// One exchange of the onboarding dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingTurn {
    /// Document ID
    pub id: String,
    pub user_id: String,
    /// Step as sent by the client (may be outside 1..=5)
    pub step: i64,
    pub user_message: String,
    pub ai_response: String,
    pub timestamp: String,
}

impl OnboardingTurn {
    pub fn new(
        user_id: &str,
        step: i64,
        user_message: String,
        ai_response: String,
        timestamp: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            step,
            user_message,
            ai_response,
            timestamp,
        }
    }
}
