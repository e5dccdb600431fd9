// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod analysis;
pub mod health;
pub mod user;

pub use analysis::{AnalysisRecord, OnboardingTurn};
pub use health::HealthMetrics;
pub use user::{PersonalInfo, Preferences, Profile, UserRecord, UserUpdate};
