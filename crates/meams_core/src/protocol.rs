//! crates/meams_core/src/protocol.rs
//!
//! Defines the scan-event protocol between the server and dashboard
//! listeners on the equipment event stream.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{AssetKind, Equipment};

//=========================================================================================
// Events Published by Scan Endpoints
//=========================================================================================

/// A snapshot of an asset's state taken at the moment its scan URL was
/// resolved. Never persisted; pushed through listener queues only.
#[derive(Serialize, Debug, Clone)]
pub struct ScanEvent {
    pub scan_type: AssetKind,
    pub equipment_id: Uuid,
    pub item_code: String,
    pub name: String,
    pub category: String,
    pub status: String,
    pub location: String,
    pub useful_life_years: f64,
    pub purchase_amount: f64,
    pub timestamp: DateTime<Utc>,
}

impl ScanEvent {
    pub fn from_equipment(equipment: &Equipment, timestamp: DateTime<Utc>) -> Self {
        Self {
            scan_type: AssetKind::Equipment,
            equipment_id: equipment.id,
            item_code: equipment.item_code.clone(),
            name: equipment.name.clone(),
            category: equipment.category.clone(),
            status: equipment.status.clone(),
            location: equipment.location.clone(),
            useful_life_years: equipment.useful_life_years,
            purchase_amount: equipment.purchase_amount,
            timestamp,
        }
    }
}

//=========================================================================================
// Frames Sent FROM the Server TO a Listener
//=========================================================================================

/// The structured frames a listener connection can receive. Keepalives are
/// SSE comments and never appear here.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanFrame {
    /// First frame on every stream, confirming the subscription.
    Connected { equipment_id: Uuid },

    /// A scan was resolved for the subscribed asset.
    Scan(ScanEvent),
}
