//! Common test helpers: an app wired to the in-memory store, seeded
//! principals and assets, and request plumbing.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::{NaiveDate, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use api_lib::adapters::MemoryStore;
use api_lib::config::{BuiltinUser, Config};
use api_lib::fanout::ScanHub;
use api_lib::security::{hash_password, TokenSigner};
use api_lib::web::build_router;
use api_lib::web::state::AppState;
use meams_core::domain::{Equipment, Principal, Role, Supply, TransactionEntry};

pub const TEST_SECRET: &str = "test-secret";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

/// Builds the full router over a fresh in-memory store.
pub fn create_test_app() -> TestApp {
    create_test_app_with_builtins(Vec::new())
}

pub fn create_test_app_with_builtins(builtin_users: Vec<BuiltinUser>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let config = Arc::new(Config {
        bind_address: "127.0.0.1:8000".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        base_url: "http://localhost:8000".to_string(),
        token_secret: TEST_SECRET.to_string(),
        token_ttl_minutes: 30,
        allowed_origins: Vec::new(),
        builtin_users,
    });
    let state = AppState {
        assets: store.clone(),
        accounts: store.clone(),
        audit: store.clone(),
        signer: TokenSigner::new(TEST_SECRET, 30),
        hub: ScanHub::new(),
        config,
    };
    TestApp {
        router: build_router(state.clone()),
        store,
        state,
    }
}

pub fn seed_account(store: &MemoryStore, username: &str, password: &str, role: Role) {
    store.insert_account(Principal {
        username: username.to_string(),
        email: format!("{}@hospital.test", username),
        full_name: None,
        role,
        active: true,
        password_hash: hash_password(password).unwrap(),
        first_login: false,
        last_login: None,
        created_at: Utc::now(),
    });
}

pub fn seed_supply(store: &MemoryStore, transactions: usize) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    store.insert_supply(Supply {
        id,
        item_code: "SUP-001".to_string(),
        name: "Surgical Gloves".to_string(),
        category: "Consumables".to_string(),
        location: "Storeroom A".to_string(),
        status: "Available".to_string(),
        quantity: 7,
        unit: Some("box".to_string()),
        image: None,
        documents: Vec::new(),
        transactions: (0..transactions)
            .map(|i| TransactionEntry {
                date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                receipt_qty: 10,
                issue_qty: 3,
                balance: 7,
            })
            .collect(),
        tracking_id: None,
        created_at: now,
        updated_at: now,
    });
    id
}

pub fn seed_equipment(store: &MemoryStore, purchase_date: NaiveDate) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    store.insert_equipment(Equipment {
        id,
        item_code: "EQ-001".to_string(),
        name: "Infusion Pump".to_string(),
        category: "Therapy".to_string(),
        location: "Ward 3".to_string(),
        status: "In Service".to_string(),
        useful_life_years: 5.0,
        purchase_amount: 100_000.0,
        purchase_date,
        open_report: None,
        repairs: Vec::new(),
        image: None,
        documents: Vec::new(),
        tracking_id: None,
        created_at: now,
        updated_at: now,
    });
    id
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    send(
        router,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn get_with_token(router: &Router, uri: &str, token: &str) -> Response<Body> {
    send(
        router,
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn post_json(router: &Router, uri: &str, body: Value) -> Response<Body> {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn post_json_with_token(
    router: &Router,
    uri: &str,
    token: &str,
    body: Value,
) -> Response<Body> {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

/// Logs in through the real endpoint and returns the bearer token.
pub async fn login(router: &Router, username: &str, password: &str) -> String {
    let response = post_json(
        router,
        "/login",
        json!({ "username": username, "password": password }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["access_token"].as_str().unwrap().to_string()
}
