//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-request identity
//! extension inserted by the auth middleware.

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::config::Config;
use crate::fanout::ScanHub;
use crate::security::TokenSigner;
use meams_core::domain::{AuditRecord, Role};
use meams_core::ports::{AccountStore, AssetStore, AuditLog};

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub assets: Arc<dyn AssetStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub audit: Arc<dyn AuditLog>,
    pub config: Arc<Config>,
    pub signer: TokenSigner,
    pub hub: ScanHub,
}

impl AppState {
    /// Writes an audit entry, swallowing failures: a broken audit sink must
    /// never fail the operation it annotates.
    pub async fn audit(&self, username: &str, action: &str, details: &str, headers: &HeaderMap) {
        let entry = AuditRecord::new(username, action, details, client_ip(headers));
        if let Err(e) = self.audit.record(entry).await {
            tracing::warn!("audit write failed: {}", e);
        }
    }
}

//=========================================================================================
// CurrentUser (Per-Request, Inserted by the Auth Middleware)
//=========================================================================================

/// The authenticated identity for the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
    pub role: Role,
}

/// Best-effort client address for audit entries, taken from the forwarding
/// header the reverse proxy sets.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
