// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase identity: account creation and ID token verification.

use crate::config::Config;
use crate::error::AppError;
use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const SIGN_UP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signUp";
const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;
const MAX_UID_LEN: usize = 128;

/// Identity extracted from a valid ID token.
#[derive(Debug, Clone)]
pub struct VerifiedUser {
    pub user_id: String,
    pub email: Option<String>,
}

/// Token verification error categories.
#[derive(Debug, Clone)]
pub enum IdentityError {
    /// The token is malformed, expired, or its claims do not match.
    Invalid(String),
    /// Key material could not be fetched.
    Transient(String),
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Invalid(reason) => {
                tracing::debug!(reason = %reason, "Rejected ID token");
                AppError::InvalidToken
            }
            IdentityError::Transient(reason) => AppError::Identity(reason),
        }
    }
}

#[derive(Clone)]
enum VerifierMode {
    Firebase,
    /// Fixed signing key; accounts are minted locally.
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Identity provider adapter.
pub struct IdentityService {
    http_client: reqwest::Client,
    project_id: String,
    api_key: Option<String>,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl IdentityService {
    /// Create a production adapter that fetches and caches Firebase signing keys.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let service = Self::build(config, VerifierMode::Firebase)?;

        tracing::info!(
            project = %service.project_id,
            account_creation = service.api_key.is_some(),
            "Initialized Firebase identity service"
        );

        Ok(service)
    }

    /// Create an adapter with a static RSA public key.
    ///
    /// This is intended for local development and integration tests.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static key kid must not be empty");
        }

        Self::build(
            config,
            VerifierMode::StaticKey {
                kid,
                decoding_key: Arc::new(decoding_key),
            },
        )
    }

    fn build(config: &Config, mode: VerifierMode) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building identity HTTP client")?;

        Ok(Self {
            http_client,
            project_id: config.gcp_project_id.clone(),
            api_key: config.firebase_api_key.clone(),
            mode,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Issuer every accepted token must carry.
    pub fn expected_issuer(&self) -> String {
        format!("{}{}", ISSUER_PREFIX, self.project_id)
    }

    // ─── Account Creation ────────────────────────────────────────

    /// Create an email/password account and return its UID.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<String, AppError> {
        if let VerifierMode::StaticKey { .. } = self.mode {
            let uid = uuid::Uuid::new_v4().simple().to_string();
            tracing::debug!(uid = %uid, "Minted local account");
            return Ok(uid);
        }

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::NotConfigured("identity provider API key".to_string()))?;

        let response = self
            .http_client
            .post(SIGN_UP_URL)
            .query(&[("key", api_key)])
            .json(&SignUpRequest {
                email,
                password,
                display_name,
                return_secure_token: false,
            })
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Sign-up request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body: SignUpErrorResponse = response.json().await.unwrap_or_default();
            return Err(map_sign_up_error(status.as_u16(), &body.error.message));
        }

        let created: SignUpResponse = response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("Invalid sign-up response: {}", e)))?;

        Ok(created.local_id)
    }

    // ─── Token Verification ──────────────────────────────────────

    /// Verify a Firebase ID token and return the user it identifies.
    pub async fn verify_id_token(&self, token: &str) -> Result<VerifiedUser, IdentityError> {
        let header = decode_header(token)
            .map_err(|e| IdentityError::Invalid(format!("invalid JWT header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::Invalid(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| IdentityError::Invalid("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let issuer = self.expected_issuer();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<FirebaseIdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| IdentityError::Invalid(format!("JWT validation failed: {e}")))?
            .claims;

        validate_iat(claims.iat)?;

        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
            return Err(IdentityError::Invalid("invalid sub claim".to_string()));
        }

        Ok(VerifiedUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, IdentityError> {
        match &self.mode {
            VerifierMode::StaticKey {
                kid: static_kid,
                decoding_key,
            } => {
                if kid == static_kid {
                    return Ok(decoding_key.clone());
                }

                return Err(IdentityError::Invalid(format!(
                    "unknown JWT kid for static verifier: {kid}"
                )));
            }
            VerifierMode::Firebase => {}
        }

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(IdentityError::Invalid(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), IdentityError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        tracing::debug!(jwks_uri = JWKS_URL, "Refreshing securetoken JWKS cache");

        let response = self
            .http_client
            .get(JWKS_URL)
            .send()
            .await
            .map_err(|e| IdentityError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IdentityError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| IdentityError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let mut keys_by_kid: HashMap<String, Arc<DecodingKey>> = HashMap::new();

        for jwk in jwks.keys {
            if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
                continue;
            }

            if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
                continue;
            }

            if jwk.use_.as_deref().is_some_and(|use_| use_ != "sig") {
                continue;
            }

            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys_by_kid.insert(jwk.kid, Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
                }
            }
        }

        if keys_by_kid.is_empty() {
            return Err(IdentityError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "Securetoken JWKS cache refreshed");
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
}

#[derive(Deserialize, Default)]
struct SignUpErrorResponse {
    #[serde(default)]
    error: SignUpErrorBody,
}

#[derive(Deserialize, Default)]
struct SignUpErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseIdTokenClaims {
    sub: String,
    iat: Option<u64>,
    email: Option<String>,
}

/// Map an Identity Toolkit error message (e.g. `WEAK_PASSWORD : ...`) to an API error.
fn map_sign_up_error(status: u16, message: &str) -> AppError {
    let code = message.split(':').next().unwrap_or_default().trim();
    match code {
        "EMAIL_EXISTS" => AppError::Conflict("Email already in use".to_string()),
        "INVALID_EMAIL" | "WEAK_PASSWORD" | "MISSING_PASSWORD" | "MISSING_EMAIL" => {
            AppError::BadRequest(message.to_string())
        }
        _ => AppError::Identity(format!("Sign-up failed (HTTP {}): {}", status, message)),
    }
}

fn validate_iat(iat: Option<u64>) -> Result<(), IdentityError> {
    let Some(iat) = iat else {
        return Err(IdentityError::Invalid("missing iat claim".to_string()));
    };

    if iat > now_unix_secs() + CLOCK_SKEW_SECS {
        return Err(IdentityError::Invalid(
            "iat claim is in the future".to_string(),
        ));
    }

    Ok(())
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|raw| raw.trim_matches('"').parse::<u64>().ok())
    })
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
