//! services/api/src/web/qr.rs
//!
//! QR identity registry: stable tracking-ID issuance, printable QR image
//! rendering, and the public tracking view a printed code resolves to.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json},
};
use qrcode::{EcLevel, QrCode};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::web::html;
use crate::web::state::AppState;
use meams_core::domain::Asset;

//=========================================================================================
// Tracking-ID Issuance
//=========================================================================================

/// Returns the asset's tracking ID, issuing one on first request.
///
/// The candidate is bound through the store's conditional claim, so
/// concurrent calls for the same asset converge on a single winner; losers
/// read back the winner's ID. Once printed, the ID never changes for the
/// asset's lifetime.
pub async fn ensure_tracking_id(state: &AppState, asset_id: Uuid) -> Result<String, AppError> {
    let asset = state
        .assets
        .find_asset(asset_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Asset".to_string()))?;

    if let Some(existing) = asset.tracking_id() {
        return Ok(existing.to_string());
    }

    // 122 bits of entropy, hex-simple form: opaque and URL-safe.
    let candidate = Uuid::new_v4().simple().to_string();
    let bound = state
        .assets
        .claim_tracking_id(asset.kind(), asset_id, &candidate)
        .await?;
    Ok(bound)
}

fn parse_asset_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidIdFormat)
}

//=========================================================================================
// Handlers
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct QrGenerateResponse {
    pub tracking_id: String,
    pub tracking_url: String,
    pub qr_image_url: String,
}

/// GET /api/qr/generate/{asset_id} - Issue (or return) the tracking identity
#[utoipa::path(
    get,
    path = "/api/qr/generate/{asset_id}",
    responses(
        (status = 200, description = "Tracking identity", body = QrGenerateResponse),
        (status = 400, description = "Malformed asset ID"),
        (status = 404, description = "Asset not found")
    ),
    params(("asset_id" = String, Path, description = "Asset ID"))
)]
pub async fn qr_generate_handler(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let asset_id = parse_asset_id(&asset_id)?;
    let tracking_id = ensure_tracking_id(&state, asset_id).await?;
    Ok(Json(QrGenerateResponse {
        tracking_url: state.config.tracking_url(&tracking_id),
        qr_image_url: format!("{}/api/qr/image/{}", state.config.base_url, asset_id),
        tracking_id,
    }))
}

/// GET /api/qr/image/{asset_id} - Printable QR label
#[utoipa::path(
    get,
    path = "/api/qr/image/{asset_id}",
    responses(
        (status = 200, description = "PNG image", content_type = "image/png"),
        (status = 400, description = "Malformed asset ID"),
        (status = 404, description = "Asset not found")
    ),
    params(("asset_id" = String, Path, description = "Asset ID"))
)]
pub async fn qr_image_handler(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let asset_id = parse_asset_id(&asset_id)?;
    let tracking_id = ensure_tracking_id(&state, asset_id).await?;
    let url = state.config.tracking_url(&tracking_id);
    let png = render_qr_png(&url)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// Encodes `data` as a QR symbol at the fixed label size and error
/// correction level, returned as PNG bytes.
pub fn render_qr_png(data: &str) -> Result<Vec<u8>, AppError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)
        .map_err(|e| AppError::Upstream(format!("qr encode failed: {}", e)))?;
    let image = code
        .render::<image::Luma<u8>>()
        .min_dimensions(300, 300)
        .build();
    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(image)
        .write_to(
            &mut std::io::Cursor::new(&mut png),
            image::ImageFormat::Png,
        )
        .map_err(|e| AppError::Upstream(format!("png encode failed: {}", e)))?;
    Ok(png)
}

/// GET /track/{tracking_id} - Public tracking view for a printed code
pub async fn track_handler(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> impl IntoResponse {
    match state.assets.find_by_tracking_id(&tracking_id).await {
        Ok(Some(asset)) => render_track(&asset),
        Ok(None) => (StatusCode::NOT_FOUND, Html(html::not_found_page())),
        Err(e) => {
            tracing::error!("tracking lookup failed: {}", e);
            (StatusCode::NOT_FOUND, Html(html::not_found_page()))
        }
    }
}

fn render_track(asset: &Asset) -> (StatusCode, Html<String>) {
    (StatusCode::OK, Html(html::track_page(asset)))
}
