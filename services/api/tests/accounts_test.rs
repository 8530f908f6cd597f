//! End-to-end tests for admin account management and password changes.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;

use common::*;
use meams_core::domain::Role;
use meams_core::ports::AccountStore;

async fn patch_json_with_token(
    router: &axum::Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> axum::http::Response<Body> {
    send(
        router,
        Request::builder()
            .method("PATCH")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

#[tokio::test]
async fn admin_creates_account_with_generated_password() {
    let app = create_test_app();
    seed_account(&app.store, "admin1", "p@ss", Role::Admin);
    let token = login(&app.router, "admin1", "p@ss").await;

    let response = post_json_with_token(
        &app.router,
        "/api/accounts",
        &token,
        json!({ "username": "tech2", "email": "tech2@hospital.test", "role": "staff" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let generated = body["generated_password"].as_str().unwrap().to_string();
    assert_eq!(generated.len(), 12);

    // The returned password works exactly once-issued credentials should.
    let token = login(&app.router, "tech2", &generated).await;
    assert!(!token.is_empty());

    let entries = app.store.audit_entries();
    assert!(entries
        .iter()
        .any(|e| e.username == "admin1" && e.action == "created account"));
}

#[tokio::test]
async fn duplicate_username_or_email_conflicts() {
    let app = create_test_app();
    seed_account(&app.store, "admin1", "p@ss", Role::Admin);
    seed_account(&app.store, "tech1", "p@ss", Role::Staff);
    let token = login(&app.router, "admin1", "p@ss").await;

    let response = post_json_with_token(
        &app.router,
        "/api/accounts",
        &token,
        json!({ "username": "tech1", "email": "new@hospital.test", "role": "staff" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_with_token(
        &app.router,
        "/api/accounts",
        &token,
        json!({ "username": "fresh", "email": "tech1@hospital.test", "role": "staff" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_accounts_never_exposes_hashes() {
    let app = create_test_app();
    seed_account(&app.store, "admin1", "p@ss", Role::Admin);
    seed_account(&app.store, "tech1", "p@ss", Role::Staff);
    let token = login(&app.router, "admin1", "p@ss").await;

    let response = get_with_token(&app.router, "/api/accounts", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let raw = body_string(response).await;
    assert!(raw.contains("tech1"));
    assert!(!raw.contains("password_hash"));
    assert!(!raw.contains("$argon2"));
}

#[tokio::test]
async fn deactivation_locks_the_account_out() {
    let app = create_test_app();
    seed_account(&app.store, "admin1", "p@ss", Role::Admin);
    seed_account(&app.store, "tech1", "p@ss", Role::Staff);
    let admin_token = login(&app.router, "admin1", "p@ss").await;
    let tech_token = login(&app.router, "tech1", "p@ss").await;

    let response = patch_json_with_token(
        &app.router,
        "/api/accounts/tech1/active",
        &admin_token,
        json!({ "active": false }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The still-valid token no longer passes the gateway.
    let response = post_json_with_token(&app.router, "/logout", &tech_token, json!({})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let entries = app.store.audit_entries();
    assert!(entries.iter().any(|e| e.action == "deactivated account"));
}

#[tokio::test]
async fn change_password_verifies_current_and_clears_first_login() {
    let app = create_test_app();
    seed_account(&app.store, "tech1", "old-pass", Role::Staff);
    let mut principal = app
        .store
        .find_by_username("tech1")
        .await
        .unwrap()
        .unwrap();
    principal.first_login = true;
    app.store.insert_account(principal);
    let token = login(&app.router, "tech1", "old-pass").await;

    let response = post_json_with_token(
        &app.router,
        "/api/accounts/change-password",
        &token,
        json!({ "current_password": "wrong", "new_password": "new-pass" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json_with_token(
        &app.router,
        "/api/accounts/change-password",
        &token,
        json!({ "current_password": "old-pass", "new_password": "new-pass" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Old password dead, new one live, first-login cleared.
    let response = post_json(
        &app.router,
        "/login",
        json!({ "username": "tech1", "password": "old-pass" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(
        &app.router,
        "/login",
        json!({ "username": "tech1", "password": "new-pass" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["first_login"], false);
}
