//! services/api/src/web/accounts.rs
//!
//! Admin-only account management: creation, listing, and the active-flag
//! toggle. Credential hashes never leave the store layer.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::security::{generate_secure_password, hash_password};
use crate::web::state::{AppState, CurrentUser};
use meams_core::domain::{Principal, Role};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    #[schema(value_type = String, example = "staff")]
    pub role: Role,
    /// When omitted, a secure password is generated and returned once.
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AccountResponse {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    #[schema(value_type = String, example = "staff")]
    pub role: Role,
    pub active: bool,
    pub first_login: bool,
}

#[derive(Serialize, ToSchema)]
pub struct CreatedAccountResponse {
    pub username: String,
    pub email: String,
    #[schema(value_type = String, example = "staff")]
    pub role: Role,
    /// Present only when the password was generated server-side.
    pub generated_password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub active: bool,
}

fn to_response(p: &Principal) -> AccountResponse {
    AccountResponse {
        username: p.username.clone(),
        email: p.email.clone(),
        full_name: p.full_name.clone(),
        role: p.role,
        active: p.active,
        first_login: p.first_login,
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/accounts - Create a new account
#[utoipa::path(
    post,
    path = "/api/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = CreatedAccountResponse),
        (status = 400, description = "Username or email already exists"),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn create_account_handler(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (password, generated) = match req.password {
        Some(p) => (p, None),
        None => {
            let p = generate_secure_password(12);
            (p.clone(), Some(p))
        }
    };
    let now = Utc::now();
    let principal = Principal {
        username: req.username.clone(),
        email: req.email.clone(),
        full_name: req.full_name,
        role: req.role,
        active: true,
        password_hash: hash_password(&password)?,
        first_login: true,
        last_login: None,
        created_at: now,
    };

    state.accounts.create_account(principal).await?;
    state
        .audit(
            &admin.username,
            "created account",
            &format!("username={}", req.username),
            &headers,
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(CreatedAccountResponse {
            username: req.username,
            email: req.email,
            role: req.role,
            generated_password: generated,
        }),
    ))
}

/// GET /api/accounts - List all accounts
#[utoipa::path(
    get,
    path = "/api/accounts",
    responses(
        (status = 200, description = "Account list", body = [AccountResponse]),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_accounts_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let accounts = state.accounts.list_accounts().await?;
    let payload: Vec<AccountResponse> = accounts.iter().map(to_response).collect();
    Ok(Json(payload))
}

/// PATCH /api/accounts/{username}/active - Toggle the active flag
#[utoipa::path(
    patch,
    path = "/api/accounts/{username}/active",
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Flag updated"),
        (status = 404, description = "Account not found"),
        (status = 403, description = "Administrator privileges required")
    ),
    params(("username" = String, Path, description = "Account username"))
)]
pub async fn set_active_handler(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(username): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SetActiveRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.accounts.set_active(&username, req.active).await?;
    let action = if req.active {
        "activated account"
    } else {
        "deactivated account"
    };
    state
        .audit(
            &admin.username,
            action,
            &format!("username={}", username),
            &headers,
        )
        .await;
    Ok(Json(json!({ "detail": "Account updated" })))
}
