// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Provider credentials are optional at startup. A missing completion key
//! surfaces as a `not_configured` error when an endpoint needs it, and a
//! missing messaging key disables the matching notification channels.

use std::env;

pub const APP_VERSION: &str = "1.1";

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SUMMARY_LANGUAGE: &str = "Brazilian Portuguese";
const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com";
const DEFAULT_TWILIO_PHONE_NUMBER: &str = "+14155238886";
const DEFAULT_WHATSAPP_NUMBER: &str = "whatsapp:+14155238886";
const DEFAULT_SENDGRID_BASE_URL: &str = "https://api.sendgrid.com";
const DEFAULT_FROM_EMAIL: &str = "wellness@example.com";

/// Which document store backs user and analysis records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    /// Process-local maps, lost on restart.
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid("STORAGE_BACKEND", other.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Restrict CORS to this origin; any origin when unset
    pub cors_allowed_origin: Option<String>,
    pub storage_backend: StorageBackend,
    /// GCP/Firebase project ID (Firestore + ID token audience)
    pub gcp_project_id: String,
    /// Identity Toolkit key used for account creation
    pub firebase_api_key: Option<String>,

    // --- Completion provider ---
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    /// Language the coach answers in
    pub summary_language: String,

    // --- Messaging providers ---
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_phone_number: String,
    pub whatsapp_from_number: String,
    pub twilio_base_url: String,
    pub sendgrid_api_key: Option<String>,
    pub from_email: String,
    pub sendgrid_base_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let storage_backend = match optional_var("STORAGE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StorageBackend::Firestore,
        };

        let gcp_project_id = match (optional_var("GCP_PROJECT_ID"), storage_backend) {
            (Some(id), _) => id,
            (None, StorageBackend::Firestore) => return Err(ConfigError::Missing("GCP_PROJECT_ID")),
            (None, StorageBackend::Memory) => "local-dev".to_string(),
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            cors_allowed_origin: optional_var("CORS_ALLOWED_ORIGIN"),
            storage_backend,
            gcp_project_id,
            firebase_api_key: optional_var("FIREBASE_API_KEY"),

            openai_api_key: optional_var("OPENAI_API_KEY"),
            openai_base_url: var_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            openai_model: var_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            summary_language: var_or("SUMMARY_LANGUAGE", DEFAULT_SUMMARY_LANGUAGE),

            twilio_account_sid: optional_var("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: optional_var("TWILIO_AUTH_TOKEN"),
            twilio_phone_number: var_or("TWILIO_PHONE_NUMBER", DEFAULT_TWILIO_PHONE_NUMBER),
            whatsapp_from_number: var_or("WHATSAPP_SANDBOX_NUMBER", DEFAULT_WHATSAPP_NUMBER),
            twilio_base_url: var_or("TWILIO_BASE_URL", DEFAULT_TWILIO_BASE_URL),
            sendgrid_api_key: optional_var("SENDGRID_API_KEY"),
            from_email: var_or("FROM_EMAIL", DEFAULT_FROM_EMAIL),
            sendgrid_base_url: var_or("SENDGRID_BASE_URL", DEFAULT_SENDGRID_BASE_URL),
        })
    }

    /// Offline configuration for tests: in-memory storage, no provider keys.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            cors_allowed_origin: None,
            storage_backend: StorageBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            firebase_api_key: None,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            summary_language: DEFAULT_SUMMARY_LANGUAGE.to_string(),
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_phone_number: DEFAULT_TWILIO_PHONE_NUMBER.to_string(),
            whatsapp_from_number: DEFAULT_WHATSAPP_NUMBER.to_string(),
            twilio_base_url: DEFAULT_TWILIO_BASE_URL.to_string(),
            sendgrid_api_key: None,
            from_email: DEFAULT_FROM_EMAIL.to_string(),
            sendgrid_base_url: DEFAULT_SENDGRID_BASE_URL.to_string(),
        }
    }
}

/// Read a variable, treating empty or whitespace-only values as unset.
fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    optional_var(name).unwrap_or_else(|| default.to_string())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
