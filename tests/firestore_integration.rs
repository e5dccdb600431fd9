// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). They are skipped otherwise.

use wellness_coach::db::ProfileStore;
use wellness_coach::error::AppError;
use wellness_coach::models::{
    AnalysisRecord, HealthMetrics, OnboardingTurn, PersonalInfo, UserRecord, UserUpdate,
};

mod common;
use common::test_db;

/// Unique suffix for test isolation.
fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

fn test_user(user_id: &str, email: &str) -> UserRecord {
    UserRecord::new(
        user_id.to_string(),
        PersonalInfo {
            name: "Test User".to_string(),
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

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_roundtrip_and_duplicate_email() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_id("user");
    let email = format!("{}@Example.COM", user_id);

    assert!(matches!(
        db.get_user(&user_id).await,
        Err(AppError::NotFound(_))
    ));

    let user = test_user(&user_id, &email);
    db.create_user(&user).await.expect("create user");
    assert_eq!(db.get_user(&user_id).await.unwrap(), user);
    assert!(db.email_registered(&email).await.unwrap());
    assert!(db.email_registered(&email.to_lowercase()).await.unwrap());

    let other = test_user(&unique_id("user"), &format!(" {} ", email.to_uppercase()));
    assert!(matches!(
        db.create_user(&other).await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        db.get_user(other.user_id()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_partial_update_merges_nested_fields() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_id("update");
    db.create_user(&test_user(&user_id, &format!("{}@example.com", user_id)))
        .await
        .unwrap();

    db.update_user(
        &user_id,
        &UserUpdate::new()
            .set("profile.age", 41)
            .set("preferences.communication_style", "direct"),
    )
    .await
    .unwrap();

    let stored = db.get_user(&user_id).await.unwrap();
    assert_eq!(stored.profile.age, Some(41));
    assert_eq!(stored.preferences.communication_style, "direct");
    assert_eq!(stored.preferences.notification_times, vec!["18:00", "21:00"]);
    assert_eq!(stored.personal_info.name, "Test User");

    assert!(matches!(
        db.update_user(&unique_id("ghost"), &UserUpdate::new().set("profile.age", 1))
            .await,
        Err(AppError::NotFound(_))
    ));
}

// ═══════════════════════════════════════════════════════════════════════════
// HISTORY TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_analyses_newest_first_with_paging() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_id("history");

    for day in 1..=5 {
        let record = AnalysisRecord::new(
            &user_id,
            HealthMetrics::default(),
            format!("summary {}", day),
            format!("2026-04-{:02}T09:30:00.000000Z", day),
            "1.1",
        );
        db.insert_analysis(&record).await.unwrap();
    }

    let page = db.list_analyses(&user_id, 2, 0).await.unwrap();
    let summaries: Vec<&str> = page.iter().map(|r| r.ai_analysis.as_str()).collect();
    assert_eq!(summaries, vec!["summary 5", "summary 4"]);

    let page = db.list_analyses(&user_id, 10, 3).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[1].ai_analysis, "summary 1");
}

#[tokio::test]
async fn test_onboarding_turns_oldest_first() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_id("turns");

    for (step, minute) in [(2, 20), (1, 10), (3, 30)] {
        let turn = OnboardingTurn::new(
            &user_id,
            step,
            format!("message {}", step),
            format!("reply {}", step),
            format!("2026-04-01T10:{:02}:00.000000Z", minute),
        );
        db.insert_onboarding_turn(&turn).await.unwrap();
    }

    let steps: Vec<i64> = db
        .list_onboarding_turns(&user_id)
        .await
        .unwrap()
        .iter()
        .map(|t| t.step)
        .collect();
    assert_eq!(steps, vec![1, 2, 3]);
}
