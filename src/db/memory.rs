// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local profile store. Nothing survives a restart.

use crate::db::{normalize_email, ProfileStore};
use crate::error::AppError;
use crate::models::{AnalysisRecord, OnboardingTurn, UserRecord, UserUpdate};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// In-memory store backed by concurrent maps.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, UserRecord>,
    /// Normalized email -> user ID
    emails: DashMap<String, String>,
    analyses: DashMap<String, AnalysisRecord>,
    turns: DashMap<String, OnboardingTurn>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn create_user(&self, user: &UserRecord) -> Result<(), AppError> {
        let user_id = user.user_id().to_string();
        if self.users.contains_key(&user_id) {
            return Err(AppError::Conflict(format!("User {} already exists", user_id)));
        }

        let email = normalize_email(&user.personal_info.email);
        match self.emails.entry(email.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict("Email already in use".to_string())),
            Entry::Vacant(slot) => {
                slot.insert(user_id.clone());
                let mut user = user.clone();
                user.account_info.email_normalized = email;
                self.users.insert(user_id, user);
                Ok(())
            }
        }
    }

    async fn email_registered(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.emails.contains_key(&normalize_email(email)))
    }

    async fn get_user(&self, user_id: &str) -> Result<UserRecord, AppError> {
        self.users
            .get(user_id)
            .map(|u| u.clone())
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<(), AppError> {
        let mut entry = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let merged = update.apply_to(&entry)?;
        *entry = merged;
        Ok(())
    }

    async fn insert_analysis(&self, record: &AnalysisRecord) -> Result<(), AppError> {
        match self.analyses.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "Analysis {} already exists",
                record.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn list_analyses(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<AnalysisRecord>, AppError> {
        let mut records: Vec<AnalysisRecord> = self
            .analyses
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.clone())
            .collect();

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));

        Ok(records
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn insert_onboarding_turn(&self, turn: &OnboardingTurn) -> Result<(), AppError> {
        match self.turns.entry(turn.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "Onboarding turn {} already exists",
                turn.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(turn.clone());
                Ok(())
            }
        }
    }

    async fn list_onboarding_turns(&self, user_id: &str) -> Result<Vec<OnboardingTurn>, AppError> {
        let mut turns: Vec<OnboardingTurn> = self
            .turns
            .iter()
            .filter(|t| t.user_id == user_id)
            .map(|t| t.clone())
            .collect();

        turns.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HealthMetrics, PersonalInfo};

    fn user(user_id: &str, email: &str) -> UserRecord {
        UserRecord::new(
            user_id.to_string(),
            PersonalInfo {
                name: "Test".to_string(),
                email: email.to_string(),
                phone: "+15550001111".to_string(),
                city: "Recife".to_string(),
                state: "PE".to_string(),
                country: "Brazil".to_string(),
            },
            "2026-01-01T00:00:00.000000Z",
            "1.1",
        )
    }

    fn analysis(user_id: &str, minute: u32) -> AnalysisRecord {
        AnalysisRecord::new(
            user_id,
            HealthMetrics::default(),
            format!("summary {}", minute),
            format!("2026-02-01T10:{:02}:00.000000Z", minute),
            "1.1",
        )
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(&user("a", "same@example.com")).await.unwrap();

        let err = store
            .create_user(&user("b", "Same@Example.com "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(store.email_registered("SAME@example.com").await.unwrap());
        assert!(matches!(
            store.get_user("b").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let store = MemoryStore::new();
        let update = UserUpdate::new().set("profile.age", 40);
        assert!(matches!(
            store.update_user("ghost", &update).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_update_leaves_other_fields() {
        let store = MemoryStore::new();
        store.create_user(&user("a", "a@example.com")).await.unwrap();
        store
            .update_user(
                "a",
                &UserUpdate::new().set("preferences.communication_style", "direct"),
            )
            .await
            .unwrap();

        store
            .update_user("a", &UserUpdate::new().set("profile.age", 29))
            .await
            .unwrap();

        let stored = store.get_user("a").await.unwrap();
        assert_eq!(stored.profile.age, Some(29));
        assert_eq!(stored.preferences.communication_style, "direct");
        assert!(stored.preferences.notification_enabled);
    }

    #[tokio::test]
    async fn test_list_analyses_newest_first_with_paging() {
        let store = MemoryStore::new();
        for minute in 1..=5 {
            store.insert_analysis(&analysis("a", minute)).await.unwrap();
        }
        store.insert_analysis(&analysis("other", 59)).await.unwrap();

        let page = store.list_analyses("a", 2, 0).await.unwrap();
        let summaries: Vec<&str> = page.iter().map(|r| r.ai_analysis.as_str()).collect();
        assert_eq!(summaries, vec!["summary 5", "summary 4"]);

        let page = store.list_analyses("a", 2, 4).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].ai_analysis, "summary 1");
    }

    #[tokio::test]
    async fn test_onboarding_turns_oldest_first() {
        let store = MemoryStore::new();
        for (step, ts) in [(2, "2026-01-01T00:02:00.000000Z"), (1, "2026-01-01T00:01:00.000000Z")] {
            store
                .insert_onboarding_turn(&OnboardingTurn::new(
                    "a",
                    step,
                    "hi".to_string(),
                    "hello".to_string(),
                    ts.to_string(),
                ))
                .await
                .unwrap();
        }

        let turns = store.list_onboarding_turns("a").await.unwrap();
        let steps: Vec<i64> = turns.iter().map(|t| t.step).collect();
        assert_eq!(steps, vec![1, 2]);
    }
}
