//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: login, logout, token refresh, the scan-access
//! credential exchange, and self-service password change.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json},
    Extension,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::security::{authenticate, hash_password, resolve_principal, verify_password};
use crate::web::middleware::bearer_token;
use crate::web::state::{AppState, CurrentUser};
use meams_core::domain::Role;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ScanAccessRequest {
    /// Username or email.
    pub identifier: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub username: String,
    #[schema(value_type = String, example = "staff")]
    pub role: Role,
    pub first_login: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ScanAccessResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /login - Authenticate and issue a bearer token
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account deactivated")
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = authenticate(
        &state.config.builtin_users,
        state.accounts.as_ref(),
        &req.username,
        &req.password,
    )
    .await?;

    let principal = match principal {
        Some(p) => p,
        None => {
            state
                .audit(&req.username, "login failed", "invalid credentials", &headers)
                .await;
            return Err(AppError::InvalidCredentials);
        }
    };
    if !principal.active {
        state
            .audit(
                &principal.username,
                "login rejected",
                "account deactivated",
                &headers,
            )
            .await;
        return Err(AppError::AccountDeactivated);
    }

    let token = state.signer.issue(&principal.username, principal.role)?;
    if !principal.builtin {
        if let Err(e) = state.accounts.touch_last_login(&principal.username).await {
            tracing::warn!("failed to record last login: {}", e);
        }
    }
    state
        .audit(&principal.username, "login", "issued bearer token", &headers)
        .await;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        username: principal.username,
        role: principal.role,
        first_login: principal.first_login,
    }))
}

/// POST /logout - Record the end of a session
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Logout recorded"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    // Tokens are stateless; logout is an audit event only.
    state
        .audit(&user.username, "logout", "session ended", &headers)
        .await;
    Ok(Json(json!({ "detail": "Logged out" })))
}

/// POST /auth/refresh - Re-issue a token with a fresh expiry
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token issued", body = TokenResponse),
        (status = 401, description = "Invalid or expired token"),
        (status = 403, description = "Account deactivated"),
        (status = 404, description = "Principal no longer exists")
    )
)]
pub async fn refresh_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::InvalidCredentials)?;
    let claims = state.signer.verify(token)?;

    // The principal must still exist and be active before a new expiry is
    // granted; a deleted account distinguishes itself from a revoked one.
    let principal = resolve_principal(
        &state.config.builtin_users,
        state.accounts.as_ref(),
        &claims.sub,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    if !principal.active {
        return Err(AppError::AccountDeactivated);
    }

    let token = state.signer.issue(&principal.username, principal.role)?;
    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        username: principal.username,
        role: principal.role,
        first_login: principal.first_login,
    }))
}

/// POST /verify-scan-access - Credential exchange for the supply scan challenge
#[utoipa::path(
    post,
    path = "/verify-scan-access",
    request_body = ScanAccessRequest,
    responses(
        (status = 200, description = "Access granted", body = ScanAccessResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account deactivated")
    )
)]
pub async fn verify_scan_access_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ScanAccessRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = authenticate(
        &state.config.builtin_users,
        state.accounts.as_ref(),
        &req.identifier,
        &req.password,
    )
    .await?
    .ok_or_else(|| AppError::InvalidCredentials)?;

    if !principal.active {
        return Err(AppError::AccountDeactivated);
    }

    let token = state.signer.issue(&principal.username, principal.role)?;
    state
        .audit(
            &principal.username,
            "scan access granted",
            "issued scan token",
            &headers,
        )
        .await;

    Ok(Json(ScanAccessResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

/// POST /api/accounts/change-password - Self-service password change
#[utoipa::path(
    post,
    path = "/api/accounts/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 401, description = "Current password is incorrect")
    )
)]
pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = state
        .accounts
        .find_by_username(&user.username)
        .await?
        // Built-in identities have no stored credential to rotate.
        .ok_or_else(|| AppError::Conflict("Account does not support password change".to_string()))?;

    if !verify_password(&req.current_password, &principal.password_hash) {
        return Err(AppError::WrongCurrentPassword);
    }

    let new_hash = hash_password(&req.new_password)?;
    state
        .accounts
        .update_password(&user.username, &new_hash)
        .await?;
    state
        .audit(&user.username, "password changed", "self-service", &headers)
        .await;

    Ok(Json(json!({ "detail": "Password updated" })))
}
