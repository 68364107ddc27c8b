#![allow(dead_code)]

use axum::extract::{Multipart, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use golbucks_client::{
    ApiClient, ClientConfig, MemoryStore, Preferences, SecretStore, StorageError, TokenPair,
    TokenStore,
};
use reqwest::Url;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const REFRESHED_TOKEN: &str = "t2";

type Reply = (StatusCode, Json<Value>);

/// Server-side view of the session plus counters the tests assert on.
#[derive(Default)]
pub struct MockState {
    valid_token: Mutex<Option<String>>,
    pub refresh_calls: AtomicUsize,
    pub refresh_fails: AtomicBool,
    refresh_delay_ms: AtomicUsize,
    auth_headers: Mutex<Vec<Option<String>>>,
    upload_fields: Mutex<Vec<String>>,
    upload_bytes: AtomicUsize,
}

impl MockState {
    pub fn accept_token(&self, token: Option<&str>) {
        *self.valid_token.lock().unwrap() = token.map(str::to_string);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.refresh_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.auth_headers.lock().unwrap().clone()
    }

    pub fn upload_fields(&self) -> Vec<String> {
        self.upload_fields.lock().unwrap().clone()
    }

    pub fn upload_bytes(&self) -> usize {
        self.upload_bytes.load(Ordering::SeqCst)
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let header = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.auth_headers.lock().unwrap().push(header.clone());
        let valid = self.valid_token.lock().unwrap().clone();
        match (header, valid) {
            (Some(h), Some(v)) => h == format!("Bearer {v}"),
            _ => false,
        }
    }
}

fn ok(data: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "success": true, "data": data })))
}

fn unauthorized() -> Reply {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": "Invalid or expired token" })),
    )
}

fn guarded(state: &MockState, headers: &HeaderMap, data: Value) -> Reply {
    if state.authorized(headers) {
        ok(data)
    } else {
        unauthorized()
    }
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Reply {
    if body["password"] != "secret" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Invalid credentials" })),
        );
    }
    state.accept_token(Some("t1"));
    ok(json!({
        "user": { "id": 1, "email": body["email"], "first_name": "Ayşe", "golbucks": 40 },
        "tokens": { "accessToken": "t1", "refreshToken": "r1" }
    }))
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Reply {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = state.refresh_delay_ms.load(Ordering::SeqCst) as u64;
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if state.refresh_fails.load(Ordering::SeqCst) || body["refreshToken"] != "r1" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Refresh token expired" })),
        );
    }
    state.accept_token(Some(REFRESHED_TOKEN));
    ok(json!({ "accessToken": REFRESHED_TOKEN }))
}

async fn protected(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Reply {
    guarded(&state, &headers, json!({ "foo": 1 }))
}

async fn always_unauthorized(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Reply {
    state.authorized(&headers);
    unauthorized()
}

async fn invalid() -> Reply {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "success": false,
            "message": "X",
            "errors": { "title": "Title is required" }
        })),
    )
}

async fn slow() -> Reply {
    tokio::time::sleep(Duration::from_secs(3)).await;
    ok(json!({}))
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Reply {
    guarded(
        &state,
        &headers,
        json!({ "user": { "id": "1", "email": "ayse@example.com", "golbucks_balance": 40 } }),
    )
}

async fn balance(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Reply {
    guarded(&state, &headers, json!({ "golbucks": 120 }))
}

async fn events(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    let limit: u32 = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(0);
    let offset: u32 = query.get("offset").and_then(|o| o.parse().ok()).unwrap_or(0);
    guarded(
        &state,
        &headers,
        json!({
            "events": [
                { "id": 1, "title": "Temizlik günü", "category": query.get("category"), "capacity": 2, "registered_count": 2 },
                { "id": 2, "title": "Konser" }
            ],
            "total": 5,
            "limit": limit,
            "offset": offset
        }),
    )
}

async fn applications(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Reply {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let mut title = String::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let data = field.bytes().await.unwrap();
        if name == "title" {
            title = String::from_utf8_lossy(&data).into_owned();
        }
        if name == "image" {
            state.upload_bytes.store(data.len(), Ordering::SeqCst);
        }
        state.upload_fields.lock().unwrap().push(name);
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": { "application": {
                "id": 77,
                "title": title,
                "status": "pending",
                "image_url": "https://cdn.example.com/77.jpg"
            } }
        })),
    )
}

async fn news_categories() -> Reply {
    ok(json!([{ "id": 1, "name": "Ulaşım" }, { "id": "kultur", "name": "Kültür" }]))
}

async fn claim_daily(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Reply {
    guarded(&state, &headers, json!({ "amount": 5, "streak": 3, "new_balance": 125 }))
}

pub struct MockApi {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockApi {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/refresh", post(refresh))
            .route("/auth/me", get(me))
            .route("/protected", get(protected))
            .route("/always-401", get(always_unauthorized))
            .route("/invalid", post(invalid))
            .route("/slow", get(slow))
            .route("/users/golbucks", get(balance))
            .route("/events", get(events))
            .route("/applications", post(applications))
            .route("/news/categories", get(news_categories))
            .route("/daily-reward/claim", post(claim_daily))
            .with_state(state.clone());
        let app = Router::new().nest("/api", api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/api"),
            state,
        }
    }
}

/// Token storage that refuses every write, like a locked keyring.
pub struct ReadOnlySecrets;

impl SecretStore for ReadOnlySecrets {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }
    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Keyring("keyring is locked".into()))
    }
    fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// A client wired to in-memory tokens and a throwaway preferences file.
pub struct Harness {
    pub client: Arc<ApiClient>,
    pub preferences: Arc<Preferences>,
    _dir: TempDir,
}

impl Harness {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(5))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        Self::build(base_url, timeout, Arc::new(MemoryStore::new()))
    }

    pub fn with_secret_store(base_url: &str, secrets: Arc<dyn SecretStore>) -> Self {
        Self::build(base_url, Duration::from_secs(5), secrets)
    }

    fn build(base_url: &str, timeout: Duration, secrets: Arc<dyn SecretStore>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::new(Url::parse(base_url).unwrap())
            .with_timeout(timeout)
            .with_data_dir(dir.path());
        let preferences = Arc::new(Preferences::in_dir(&config.data_dir));
        let tokens = Arc::new(TokenStore::new(secrets));
        let client = ApiClient::new(&config, tokens)
            .unwrap()
            .with_preferences(preferences.clone());
        Self {
            client: Arc::new(client),
            preferences,
            _dir: dir,
        }
    }

    pub fn sign_in_as(&self, access: &str, refresh: &str) {
        self.client
            .tokens()
            .set_tokens(&TokenPair {
                access_token: access.to_string(),
                refresh_token: refresh.to_string(),
                expires_at: None,
            })
            .unwrap();
    }
}
