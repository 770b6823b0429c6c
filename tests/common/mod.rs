// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use mockable::Clock;
use serde_json::{json, Value};
use shacharit_breakfast::config::Config;
use shacharit_breakfast::db::{FirestoreDb, MemoryDb, Store};
use shacharit_breakfast::models::User;
use shacharit_breakfast::routes::create_router;
use shacharit_breakfast::services::FirebaseVerifier;
use shacharit_breakfast::AppState;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

pub const TEST_KID: &str = "test-key-1";
const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_rsa_private.pem");
const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/test_rsa_public.pem");

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
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Clock the tests can move.
pub struct TestClock(Mutex<DateTime<Utc>>);

#[allow(dead_code)]
impl TestClock {
    pub fn set(&self, rfc3339: &str) {
        *self.0.lock().unwrap() = parse_time(rfc3339);
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for TestClock {
    fn local(&self) -> DateTime<chrono::Local> {
        self.utc().with_timezone(&chrono::Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub fn parse_time(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

/// Test app backed by an in-memory store and a static-key token verifier.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: Arc<MemoryDb>,
    pub clock: Arc<TestClock>,
}

/// 2024-06-01 09:30 in New York.
pub const DEFAULT_NOW: &str = "2024-06-01T13:30:00Z";

#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default(), DEFAULT_NOW)
}

pub fn create_test_app_with(config: Config, now: &str) -> TestApp {
    let db = Arc::new(MemoryDb::new());
    let clock = Arc::new(TestClock(Mutex::new(parse_time(now))));

    let decoding_key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap();
    let identity = Arc::new(
        FirebaseVerifier::new_with_static_key(&config.gcp_project_id, TEST_KID, decoding_key)
            .unwrap(),
    );

    let state = Arc::new(AppState::new(config, db.clone(), identity, clock.clone()));

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        clock,
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Sign arbitrary claims with the test key.
#[allow(dead_code)]
pub fn sign_claims(claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());
    let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Claims of a valid Firebase ID token for `test-project`.
#[allow(dead_code)]
pub fn valid_claims(uid: &str, email: &str) -> Value {
    let now = now_unix();
    json!({
        "iss": "https://securetoken.google.com/test-project",
        "aud": "test-project",
        "sub": uid,
        "iat": now,
        "auth_time": now,
        "exp": now + 3600,
        "email": email,
    })
}

#[allow(dead_code)]
pub fn create_test_jwt(uid: &str, email: &str) -> String {
    sign_claims(&valid_claims(uid, email))
}

/// Store an admin user and return a token for them.
#[allow(dead_code)]
pub async fn seed_admin(app: &TestApp, uid: &str) -> String {
    let email = format!("{uid}@example.com");
    let mut admin = User::first_login(
        uid,
        Some(email.as_str()),
        Some("Gabbai"),
        None,
        app.clock.utc(),
    );
    admin.is_admin = true;
    app.db.upsert_user(&admin).await.unwrap();
    create_test_jwt(uid, &email)
}

/// Build a request with an optional bearer token and JSON body.
#[allow(dead_code)]
pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send a request and decode the JSON response body.
#[allow(dead_code)]
pub async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
