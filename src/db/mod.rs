// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: the profile store capability and its backends.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::config::{Config, StorageBackend};
use crate::error::AppError;
use crate::models::{AnalysisRecord, OnboardingTurn, UserRecord, UserUpdate};

pub use crate::models::user::normalize_email;
use async_trait::async_trait;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const HEALTH_ANALYSES: &str = "health_analyses";
    pub const ONBOARDING_CONVERSATIONS: &str = "onboarding_conversations";
}

/// Storage for user records and their append-only history.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Create a user record keyed by its user ID.
    ///
    /// Fails with [`AppError::Conflict`] if the email is already registered.
    async fn create_user(&self, user: &UserRecord) -> Result<(), AppError>;

    /// Whether any user record carries this email (case-insensitive).
    async fn email_registered(&self, email: &str) -> Result<bool, AppError>;

    /// Fails with [`AppError::NotFound`] if absent.
    async fn get_user(&self, user_id: &str) -> Result<UserRecord, AppError>;

    /// Merge the update's leaves into an existing record.
    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<(), AppError>;

    async fn insert_analysis(&self, record: &AnalysisRecord) -> Result<(), AppError>;

    /// A user's analyses, newest first.
    async fn list_analyses(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<AnalysisRecord>, AppError>;

    async fn insert_onboarding_turn(&self, turn: &OnboardingTurn) -> Result<(), AppError>;

    /// A user's onboarding turns, oldest first.
    async fn list_onboarding_turns(&self, user_id: &str) -> Result<Vec<OnboardingTurn>, AppError>;
}

/// Open the configured backend. Called once at process start.
pub async fn open_store(config: &Config) -> Result<Arc<dyn ProfileStore>, AppError> {
    match config.storage_backend {
        StorageBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            Ok(Arc::new(db))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
