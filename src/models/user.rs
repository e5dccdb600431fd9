// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User record model and partial updates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::AppError;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Keys accepted under `profile.*` in partial updates.
pub const PROFILE_FIELDS: &[&str] = &[
    "age",
    "profession",
    "work_schedule",
    "sleep_time",
    "exercise_preferences",
    "exercise_frequency",
    "health_goals",
    "lifestyle",
];

/// Keys accepted under `preferences.*` in partial updates.
pub const PREFERENCE_FIELDS: &[&str] = &[
    "notification_times",
    "communication_style",
    "notification_enabled",
];

/// Top-level sections that may be addressed by a [`UserUpdate`].
const UPDATABLE_SECTIONS: &[&str] = &["profile", "preferences", "account_info"];

/// User record stored in the `users` collection, keyed by user ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserRecord {
    pub personal_info: PersonalInfo,
    pub account_info: AccountInfo,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PersonalInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AccountInfo {
    /// Identity-provider UID (also used as document ID)
    pub user_id: String,
    /// Lower-cased email used for uniqueness lookups
    #[serde(default)]
    pub email_normalized: String,
    pub created_at: String,
    pub last_login: String,
    pub app_version: String,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_completed_at: Option<String>,
}

/// Profile fields collected during onboarding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Profile {
    pub age: Option<u32>,
    pub profession: Option<String>,
    pub work_schedule: Option<String>,
    pub sleep_time: Option<String>,
    #[serde(default)]
    pub exercise_preferences: Vec<String>,
    pub exercise_frequency: Option<String>,
    #[serde(default)]
    pub health_goals: Vec<String>,
    pub lifestyle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Preferences {
    pub notification_times: Vec<String>,
    pub communication_style: String,
    pub notification_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notification_times: vec!["18:00".to_string(), "21:00".to_string()],
            communication_style: "motivational".to_string(),
            notification_enabled: true,
        }
    }
}

impl UserRecord {
    /// Fresh record for a newly registered account.
    pub fn new(user_id: String, personal_info: PersonalInfo, now: &str, app_version: &str) -> Self {
        let email_normalized = normalize_email(&personal_info.email);
        Self {
            personal_info,
            account_info: AccountInfo {
                user_id,
                email_normalized,
                created_at: now.to_string(),
                last_login: now.to_string(),
                app_version: app_version.to_string(),
                onboarding_completed: false,
                onboarding_completed_at: None,
            },
            profile: Profile::default(),
            preferences: Preferences::default(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.account_info.user_id
    }
}

/// Canonical form used for email uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Partial update addressed by dotted field paths such as `profile.age`.
///
/// Only the named leaves change; sibling fields keep their stored values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    fields: BTreeMap<String, Value>,
}

impl UserUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`UserUpdate::insert`].
    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(path, value);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(path.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Build an update from the `profile` / `preferences` objects of a
    /// client request, rejecting keys outside the known field sets.
    pub fn from_sections(
        profile: Option<&Map<String, Value>>,
        preferences: Option<&Map<String, Value>>,
    ) -> Result<Self, AppError> {
        let mut update = Self::new();

        for (section, map, allowed) in [
            ("profile", profile, PROFILE_FIELDS),
            ("preferences", preferences, PREFERENCE_FIELDS),
        ] {
            let Some(map) = map else { continue };
            for (key, value) in map {
                if !allowed.contains(&key.as_str()) {
                    return Err(AppError::BadRequest(format!(
                        "Unknown {} field: {}",
                        section, key
                    )));
                }
                update.insert(format!("{}.{}", section, key), value.clone());
            }
        }

        Ok(update)
    }

    /// Nested document containing only the updated leaves.
    ///
    /// `{"profile.age": 31}` becomes `{"profile": {"age": 31}}`.
    pub fn to_document(&self) -> Value {
        let mut doc = Value::Object(Map::new());
        for (path, value) in &self.fields {
            set_path(&mut doc, path, value.clone());
        }
        doc
    }

    /// Apply the update to a record, returning the merged copy.
    ///
    /// Fails if a path names an unsupported section or the merged document
    /// no longer matches the record schema (e.g. `profile.age = "old"`).
    pub fn apply_to(&self, record: &UserRecord) -> Result<UserRecord, AppError> {
        let mut doc = serde_json::to_value(record)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Serialize user: {}", e)))?;

        for (path, value) in &self.fields {
            let section = path.split('.').next().unwrap_or_default();
            if !UPDATABLE_SECTIONS.contains(&section) || !path.contains('.') {
                return Err(AppError::BadRequest(format!(
                    "Field path cannot be updated: {}",
                    path
                )));
            }
            set_path(&mut doc, path, value.clone());
        }

        serde_json::from_value(doc)
            .map_err(|e| AppError::BadRequest(format!("Invalid field value: {}", e)))
    }
}

/// Set a dotted path inside a JSON object, creating intermediate objects.
fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut current = doc;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            unreachable!("current was just made an object");
        };

        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}
