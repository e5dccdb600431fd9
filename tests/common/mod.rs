// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::extract::{Form, State};
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{body::Body, Json, Router};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;
use wellness_coach::config::Config;
use wellness_coach::db::{FirestoreDb, MemoryStore};
use wellness_coach::routes::create_router;
use wellness_coach::services::prompts::EXTRACTION_SYSTEM_PROMPT;
use wellness_coach::services::IdentityService;
use wellness_coach::AppState;

pub const TEST_KID: &str = "test-kid";
pub const TEST_PROJECT: &str = "test-project";
const TEST_PRIVATE_KEY_PEM: &str = include_str!("../fixtures/test_rsa_private.pem");
const TEST_PUBLIC_KEY_PEM: &str = include_str!("../fixtures/test_rsa_public.pem");

/// Reply the mock completion provider gives to every non-extraction prompt.
#[allow(dead_code)]
pub const MOCK_COACH_REPLY: &str = "Great work today, keep moving!";

/// Reply the mock completion provider gives to the profile extractor.
#[allow(dead_code)]
pub const MOCK_EXTRACTION_REPLY: &str = "```json\n{\"age\": \"34\", \"profession\": \"nurse\", \
\"exercise_preferences\": [\"running\", \"yoga\"], \"health_goals\": [\"sleep better\"], \
\"lifestyle\": null, \"favorite_color\": \"green\"}\n```";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new(TEST_PROJECT)
        .await
        .expect("Failed to connect to Firestore emulator")
}

// ─── Mock Providers ──────────────────────────────────────────────

/// One request received by the mock provider server.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum ProviderCall {
    Completion(Value),
    Message(HashMap<String, String>),
    Email(Value),
}

/// Local stand-in for the completion, Twilio and SendGrid APIs.
#[derive(Clone)]
pub struct MockProviders {
    pub base_url: String,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
}

#[allow(dead_code)]
impl MockProviders {
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn completion_calls(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ProviderCall::Completion(body) => Some(body),
                _ => None,
            })
            .collect()
    }

    pub fn message_calls(&self) -> Vec<HashMap<String, String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ProviderCall::Message(form) => Some(form),
                _ => None,
            })
            .collect()
    }

    pub fn email_calls(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ProviderCall::Email(body) => Some(body),
                _ => None,
            })
            .collect()
    }
}

type Calls = Arc<Mutex<Vec<ProviderCall>>>;

async fn mock_completion(State(calls): State<Calls>, Json(body): Json<Value>) -> Json<Value> {
    let is_extraction = body["messages"][0]["content"] == EXTRACTION_SYSTEM_PROMPT;
    calls.lock().unwrap().push(ProviderCall::Completion(body));

    let content = if is_extraction {
        MOCK_EXTRACTION_REPLY
    } else {
        MOCK_COACH_REPLY
    };

    Json(json!({
        "id": "chatcmpl-test",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    }))
}

async fn mock_twilio(
    State(calls): State<Calls>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    calls.lock().unwrap().push(ProviderCall::Message(form));
    (
        StatusCode::CREATED,
        Json(json!({ "sid": "SM0123456789", "status": "queued" })),
    )
}

async fn mock_sendgrid(State(calls): State<Calls>, Json(body): Json<Value>) -> impl IntoResponse {
    calls.lock().unwrap().push(ProviderCall::Email(body));
    (StatusCode::ACCEPTED, [("X-Message-Id", "mock-message-id")])
}

/// Start the mock provider server on an ephemeral local port.
pub async fn start_mock_providers() -> MockProviders {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));

    let app = Router::new()
        .route("/v1/chat/completions", post(mock_completion))
        .route(
            "/2010-04-01/Accounts/{sid}/Messages.json",
            post(mock_twilio),
        )
        .route("/v3/mail/send", post(mock_sendgrid))
        .with_state(calls.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock provider port");
    let addr = listener.local_addr().expect("mock provider address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock provider server");
    });

    MockProviders {
        base_url: format!("http://{}", addr),
        calls,
    }
}

// ─── Test App ────────────────────────────────────────────────────

/// Router, shared state and (optionally) the mock providers behind it.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub providers: Option<MockProviders>,
}

#[allow(dead_code)]
impl TestApp {
    pub fn providers(&self) -> &MockProviders {
        self.providers.as_ref().expect("test app has no mock providers")
    }

    /// Send a request and decode the JSON response body.
    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

fn static_identity(config: &Config) -> Arc<IdentityService> {
    let key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY_PEM.as_bytes()).expect("test public key");
    Arc::new(IdentityService::new_with_static_key(config, TEST_KID, key).expect("identity"))
}

fn build_app(config: Config, providers: Option<MockProviders>) -> TestApp {
    let identity = static_identity(&config);
    let state = Arc::new(AppState::new(config, Arc::new(MemoryStore::new()), identity));

    TestApp {
        router: create_router(state.clone()),
        state,
        providers,
    }
}

/// Test app with an in-memory store and no provider credentials.
#[allow(dead_code)]
pub fn create_offline_test_app() -> TestApp {
    build_app(Config::test_default(), None)
}

/// Offline test app built from a caller-adjusted config.
#[allow(dead_code)]
pub fn create_offline_test_app_with(config: Config) -> TestApp {
    build_app(config, None)
}

/// Test app whose completion, Twilio and SendGrid calls go to local mocks.
#[allow(dead_code)]
pub async fn create_test_app() -> TestApp {
    let providers = start_mock_providers().await;

    let mut config = Config::test_default();
    config.openai_api_key = Some("test-openai-key".to_string());
    config.openai_base_url = format!("{}/v1", providers.base_url);
    config.twilio_account_sid = Some("ACtest".to_string());
    config.twilio_auth_token = Some("twilio-token".to_string());
    config.twilio_base_url = providers.base_url.clone();
    config.sendgrid_api_key = Some("SG.test".to_string());
    config.sendgrid_base_url = providers.base_url.clone();

    build_app(config, Some(providers))
}

// ─── Tokens & Requests ───────────────────────────────────────────

#[derive(Serialize)]
struct TestClaims<'a> {
    iss: String,
    aud: &'a str,
    sub: &'a str,
    iat: u64,
    exp: u64,
}

/// Mint an ID token the static-key identity service accepts.
#[allow(dead_code)]
pub fn create_test_token(user_id: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    sign_claims(user_id, TEST_PROJECT, now, now + 3600)
}

/// Mint a token with explicit audience and timing.
#[allow(dead_code)]
pub fn sign_claims(user_id: &str, audience: &str, iat: u64, exp: u64) -> String {
    let claims = TestClaims {
        iss: format!("https://securetoken.google.com/{}", TEST_PROJECT),
        aud: audience,
        sub: user_id,
        iat,
        exp,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());

    encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY_PEM.as_bytes()).unwrap(),
    )
    .unwrap()
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Registration body with every required field.
#[allow(dead_code)]
pub fn registration(email: &str) -> Value {
    json!({
        "email": email,
        "password": "secret123",
        "name": "Maria",
        "phone": "5581999990000",
        "city": "Recife",
        "state": "PE",
        "country": "Brazil"
    })
}

/// Register a user through the API and return a token for them.
#[allow(dead_code)]
pub async fn register_user(app: &TestApp, email: &str) -> (String, String) {
    let (status, body) = app
        .request(json_request("POST", "/api/auth/register", registration(email), None))
        .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");

    let user_id = body["user_id"].as_str().unwrap().to_string();
    let token = create_test_token(&user_id);
    (user_id, token)
}
