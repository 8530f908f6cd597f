//! services/api/src/web/mod.rs
//!
//! HTTP surface: route table, OpenAPI master definition, and the handler
//! modules.

pub mod accounts;
pub mod auth;
pub mod html;
pub mod middleware;
pub mod qr;
pub mod scan;
pub mod sse;
pub mod state;

use axum::{
    middleware as axum_middleware,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde_json::json;
use utoipa::OpenApi;

pub use middleware::{require_admin, require_auth};
use state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::logout_handler,
        auth::refresh_handler,
        auth::verify_scan_access_handler,
        auth::change_password_handler,
        accounts::create_account_handler,
        accounts::list_accounts_handler,
        accounts::set_active_handler,
        qr::qr_generate_handler,
        qr::qr_image_handler,
        scan::lcc_handler,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::ScanAccessRequest,
            auth::TokenResponse,
            auth::ScanAccessResponse,
            auth::ChangePasswordRequest,
            accounts::CreateAccountRequest,
            accounts::AccountResponse,
            accounts::CreatedAccountResponse,
            accounts::SetActiveRequest,
            qr::QrGenerateResponse,
        )
    ),
    tags(
        (name = "MEAMS API", description = "Medical equipment and supplies management backend.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router Assembly
//=========================================================================================

/// GET /healthz - Liveness probe
async fn healthz_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the full application router over a prepared [`AppState`].
///
/// Three tiers: public endpoints (scan flows resolve their own credentials),
/// authenticated endpoints, and admin-only account management.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/verify-scan-access", post(auth::verify_scan_access_handler))
        .route("/track/{tracking_id}", get(qr::track_handler))
        .route("/scan/supply/{asset_id}", get(scan::scan_supply_handler))
        .route("/scan/equipment/{asset_id}", get(scan::scan_equipment_handler))
        .route("/stock-card/{supply_id}", get(scan::stock_card_handler))
        .route("/healthz", get(healthz_handler));

    let protected_routes = Router::new()
        .route("/logout", post(auth::logout_handler))
        .route("/api/qr/generate/{asset_id}", get(qr::qr_generate_handler))
        .route("/api/qr/image/{asset_id}", get(qr::qr_image_handler))
        .route("/listen/equipment/{asset_id}", get(sse::listen_equipment_handler))
        .route("/lcc/{equipment_id}", get(scan::lcc_handler))
        .route(
            "/api/accounts/change-password",
            post(auth::change_password_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let admin_routes = Router::new()
        .route(
            "/api/accounts",
            post(accounts::create_account_handler).get(accounts::list_accounts_handler),
        )
        .route(
            "/api/accounts/{username}/active",
            patch(accounts::set_active_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .with_state(state)
}
