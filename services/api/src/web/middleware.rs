//! services/api/src/web/middleware.rs
//!
//! Authorization gateway for protected routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::AppError;
use crate::security::{resolve_principal, ResolvedPrincipal};
use crate::web::state::{AppState, CurrentUser};
use meams_core::domain::Role;

/// Pulls the bearer token out of the `Authorization` header.
pub fn bearer_token(req_headers: &axum::http::HeaderMap) -> Option<&str> {
    req_headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verifies a bearer token and resolves its principal against the built-in
/// set and the account store. Declared failures keep their own status; any
/// other failure collapses to 401.
async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<ResolvedPrincipal, AppError> {
    let token = bearer_token(headers).ok_or(AppError::InvalidCredentials)?;
    let claims = state.signer.verify(token)?;

    let principal = resolve_principal(
        &state.config.builtin_users,
        state.accounts.as_ref(),
        &claims.sub,
    )
    .await
    .map_err(|e| match e {
        AppError::Upstream(detail) => {
            warn!("principal lookup failed during auth: {}", detail);
            AppError::InvalidCredentials
        }
        other => other,
    })?
    .ok_or(AppError::InvalidCredentials)?;

    if !principal.active {
        state
            .audit(
                &principal.username,
                "auth rejected",
                "deactivated account presented a valid token",
                headers,
            )
            .await;
        return Err(AppError::AccountDeactivated);
    }
    Ok(principal)
}

/// Middleware that validates the bearer token and extracts the caller.
///
/// If valid, inserts a [`CurrentUser`] into request extensions for handlers
/// to use. If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = authorize(&state, req.headers()).await?;
    req.extensions_mut().insert(CurrentUser {
        username: principal.username,
        role: principal.role,
    });
    Ok(next.run(req).await)
}

/// Middleware for admin-only routes: everything `require_auth` does, plus a
/// role check.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = authorize(&state, req.headers()).await?;
    if principal.role != Role::Admin {
        return Err(AppError::AdminRequired);
    }
    req.extensions_mut().insert(CurrentUser {
        username: principal.username,
        role: principal.role,
    });
    Ok(next.run(req).await)
}
