//! services/api/src/web/scan.rs
//!
//! The scan gateway: resolves scan URLs hit from printed QR labels into
//! either a credential challenge or a live asset view, publishes scan events
//! for equipment, and serves the stock-card history and LCC views.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::security::resolve_principal;
use crate::web::html;
use crate::web::middleware::bearer_token;
use crate::web::state::AppState;
use meams_core::lcc;
use meams_core::ports::PortError;
use meams_core::protocol::ScanEvent;

#[derive(Deserialize)]
pub struct ScanQuery {
    /// Scanners that cannot set headers pass the bearer token here.
    pub token: Option<String>,
    /// Set by the challenge page after a failed credential submission.
    pub error: Option<String>,
}

fn parse_asset_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| {
        (StatusCode::BAD_REQUEST, Html(html::bad_request_page())).into_response()
    })
}

/// True when the request carries a token that verifies and resolves to an
/// active principal. Any failure means "not authorized", never an error:
/// the challenge page is the fallback.
async fn scan_token_authorized(state: &AppState, headers: &HeaderMap, query: &ScanQuery) -> bool {
    let token = match bearer_token(headers).or(query.token.as_deref()) {
        Some(t) => t,
        None => return false,
    };
    let claims = match state.signer.verify(token) {
        Ok(c) => c,
        Err(_) => return false,
    };
    matches!(
        resolve_principal(
            &state.config.builtin_users,
            state.accounts.as_ref(),
            &claims.sub,
        )
        .await,
        Ok(Some(p)) if p.active
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /scan/supply/{asset_id} - Credentialed supply scan
///
/// Without a valid token this returns the challenge page with status 200,
/// never 401; the challenge is the response.
pub async fn scan_supply_handler(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
    Query(query): Query<ScanQuery>,
    headers: HeaderMap,
) -> Response {
    let asset_id = match parse_asset_id(&asset_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if !scan_token_authorized(&state, &headers, &query).await {
        let inline_error = if query.error.is_some() {
            Some("Invalid username or password.")
        } else if query.token.is_some() || bearer_token(&headers).is_some() {
            Some("Your session has expired. Please sign in again.")
        } else {
            None
        };
        return Html(html::supply_challenge_page(asset_id, inline_error)).into_response();
    }

    match state.assets.get_supply(asset_id).await {
        Ok(supply) => Html(html::supply_page(&supply)).into_response(),
        Err(PortError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, Html(html::not_found_page())).into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

/// GET /scan/equipment/{asset_id} - Open equipment scan
///
/// No credential challenge: equipment scans are for field technicians and
/// show physical-care data only. Each resolved scan is published to the
/// listeners subscribed to this asset.
pub async fn scan_equipment_handler(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> Response {
    let asset_id = match parse_asset_id(&asset_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let equipment = match state.assets.get_equipment(asset_id).await {
        Ok(equipment) => equipment,
        Err(PortError::NotFound(_)) => {
            return (StatusCode::NOT_FOUND, Html(html::not_found_page())).into_response();
        }
        Err(e) => return AppError::from(e).into_response(),
    };

    state
        .hub
        .publish(asset_id, ScanEvent::from_equipment(&equipment, Utc::now()));

    Html(html::equipment_page(&equipment)).into_response()
}

/// GET /stock-card/{supply_id} - Full transaction history
pub async fn stock_card_handler(
    State(state): State<AppState>,
    Path(supply_id): Path<String>,
) -> Response {
    let supply_id = match parse_asset_id(&supply_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.assets.get_supply(supply_id).await {
        Ok(supply) => Html(html::stock_card_page(&supply)).into_response(),
        Err(PortError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, Html(html::not_found_page())).into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

/// GET /lcc/{equipment_id} - Life-Cycle Cost analysis
#[utoipa::path(
    get,
    path = "/lcc/{equipment_id}",
    responses(
        (status = 200, description = "LCC classification"),
        (status = 400, description = "Malformed equipment ID"),
        (status = 404, description = "Equipment not found")
    ),
    params(("equipment_id" = String, Path, description = "Equipment ID"))
)]
pub async fn lcc_handler(
    State(state): State<AppState>,
    Path(equipment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let equipment_id = Uuid::parse_str(&equipment_id).map_err(|_| AppError::InvalidIdFormat)?;
    let equipment = state.assets.get_equipment(equipment_id).await?;
    let result = lcc::analyze(&equipment, Utc::now().date_naive());
    Ok(Json(result))
}
