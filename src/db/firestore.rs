// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (personal info, profile, preferences)
//! - Health analyses (append-only summary history)
//! - Onboarding conversations (append-only dialogue log)

use crate::db::{collections, normalize_email, ProfileStore};
use crate::error::AppError;
use crate::models::{AnalysisRecord, OnboardingTurn, UserRecord, UserUpdate};
use async_trait::async_trait;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a disconnected client (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl ProfileStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn create_user(&self, user: &UserRecord) -> Result<(), AppError> {
        if self.email_registered(&user.personal_info.email).await? {
            return Err(AppError::Conflict("Email already in use".to_string()));
        }

        // Lookups key on the normalized email, so it must match personal_info.
        let mut user = user.clone();
        user.account_info.email_normalized = normalize_email(&user.personal_info.email);

        // Insert (not upsert): fails if the document ID already exists.
        let _: UserRecord = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(user.user_id())
            .object(&user)
            .execute()
            .await
            .map_err(|e| AppError::Database(format!("Failed to create user: {}", e)))?;

        tracing::info!(user_id = user.user_id(), "User record created");
        Ok(())
    }

    async fn email_registered(&self, email: &str) -> Result<bool, AppError> {
        let email = normalize_email(email);

        let matches: Vec<UserRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.field("account_info.email_normalized").eq(email.as_str()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(!matches.is_empty())
    }

    async fn get_user(&self, user_id: &str) -> Result<UserRecord, AppError> {
        self.find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<(), AppError> {
        if update.is_empty() {
            return Ok(());
        }

        // A masked write would otherwise create a partial document.
        self.get_user(user_id).await?;

        let paths: Vec<String> = update.paths().map(str::to_string).collect();
        let doc = update.to_document();

        let _: UserRecord = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths)
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(user_id, fields = update.len(), "User record updated");
        Ok(())
    }

    // ─── Analysis History ────────────────────────────────────────

    async fn insert_analysis(&self, record: &AnalysisRecord) -> Result<(), AppError> {
        let _: AnalysisRecord = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::HEALTH_ANALYSES)
            .document_id(&record.id)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_analyses(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<AnalysisRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::HEALTH_ANALYSES)
            .filter(|q| q.field("user_id").eq(user_id))
            .order_by([("timestamp", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .offset(offset)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Onboarding Conversations ────────────────────────────────

    async fn insert_onboarding_turn(&self, turn: &OnboardingTurn) -> Result<(), AppError> {
        let _: OnboardingTurn = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::ONBOARDING_CONVERSATIONS)
            .document_id(&turn.id)
            .object(turn)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_onboarding_turns(&self, user_id: &str) -> Result<Vec<OnboardingTurn>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ONBOARDING_CONVERSATIONS)
            .filter(|q| q.field("user_id").eq(user_id))
            .order_by([("timestamp", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_client_returns_database_error() {
        let db = FirestoreDb::new_mock();

        assert!(matches!(
            db.get_user("anyone").await,
            Err(AppError::Database(_))
        ));
        assert!(matches!(
            db.list_analyses("anyone", 20, 0).await,
            Err(AppError::Database(_))
        ));
    }
}
