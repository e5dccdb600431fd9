// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wellness Coach: personalized health summaries and coaching
//!
//! This crate provides the backend API that turns daily health metrics into
//! motivational summaries, runs a short onboarding conversation to build a
//! user profile, and delivers summaries over SMS, WhatsApp and email.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::ProfileStore;
use services::{CompletionClient, IdentityService, NotificationService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ProfileStore>,
    pub completion: CompletionClient,
    pub identity: Arc<IdentityService>,
    pub notifications: NotificationService,
}

impl AppState {
    /// Wire up the provider clients for an already-opened store.
    pub fn new(config: Config, store: Arc<dyn ProfileStore>, identity: Arc<IdentityService>) -> Self {
        Self {
            completion: CompletionClient::new(&config),
            notifications: NotificationService::new(&config),
            config,
            store,
            identity,
        }
    }
}
