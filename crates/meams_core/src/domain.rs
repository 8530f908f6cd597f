//! crates/meams_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format
//! beyond the serde derives needed for the wire and JSONB representations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Principals
//=========================================================================================

/// The role attached to an authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "staff" => Some(Role::Staff),
            _ => None,
        }
    }
}

/// An account holder. The credential hash lives here because the store is
/// the only component that ever sees it; response payloads use a projection
/// that omits it.
#[derive(Debug, Clone)]
pub struct Principal {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub active: bool,
    pub password_hash: String,
    pub first_login: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Assets
//=========================================================================================

/// Which collection an asset lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Supply,
    Equipment,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Supply => "supply",
            AssetKind::Equipment => "equipment",
        }
    }
}

/// One stock-card movement on a supply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub receipt_qty: i64,
    #[serde(default)]
    pub issue_qty: i64,
    pub balance: i64,
}

/// One repair performed on a piece of equipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairEntry {
    pub date: NaiveDate,
    pub details: String,
    #[serde(default)]
    pub amount_used: f64,
}

/// An unresolved problem report attached to equipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenReport {
    pub date: NaiveDate,
    pub details: String,
}

/// An image embedded on an asset record, stored as base64 so it can be
/// inlined into rendered pages as a data URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub content_type: String,
    pub data_base64: String,
}

/// A document embedded on an asset record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAttachment {
    pub file_name: String,
    pub content_type: String,
    pub data_base64: String,
}

/// A consumable stock item.
#[derive(Debug, Clone)]
pub struct Supply {
    pub id: Uuid,
    pub item_code: String,
    pub name: String,
    pub category: String,
    pub location: String,
    pub status: String,
    pub quantity: i64,
    pub unit: Option<String>,
    pub image: Option<ImageAttachment>,
    pub documents: Vec<DocumentAttachment>,
    /// Ordered oldest-first, as appended by stock movements.
    pub transactions: Vec<TransactionEntry>,
    pub tracking_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A durable piece of equipment.
#[derive(Debug, Clone)]
pub struct Equipment {
    pub id: Uuid,
    pub item_code: String,
    pub name: String,
    pub category: String,
    pub location: String,
    pub status: String,
    pub useful_life_years: f64,
    pub purchase_amount: f64,
    pub purchase_date: NaiveDate,
    pub open_report: Option<OpenReport>,
    /// Ordered oldest-first, as appended by repair intake.
    pub repairs: Vec<RepairEntry>,
    pub image: Option<ImageAttachment>,
    pub documents: Vec<DocumentAttachment>,
    pub tracking_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Either kind of asset. Tracking-ID resolution returns this union since a
/// printed code does not say which collection it belongs to.
#[derive(Debug, Clone)]
pub enum Asset {
    Supply(Supply),
    Equipment(Equipment),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Supply(_) => AssetKind::Supply,
            Asset::Equipment(_) => AssetKind::Equipment,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Asset::Supply(s) => s.id,
            Asset::Equipment(e) => e.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Asset::Supply(s) => &s.name,
            Asset::Equipment(e) => &e.name,
        }
    }

    pub fn tracking_id(&self) -> Option<&str> {
        match self {
            Asset::Supply(s) => s.tracking_id.as_deref(),
            Asset::Equipment(e) => e.tracking_id.as_deref(),
        }
    }
}

//=========================================================================================
// Audit
//=========================================================================================

/// One entry handed to the audit log. Never contains credentials or tokens.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub action: String,
    pub details: String,
    pub client_ip: Option<String>,
}

impl AuditRecord {
    pub fn new(username: &str, action: &str, details: &str, client_ip: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            username: username.to_string(),
            action: action.to_string(),
            details: details.to_string(),
            client_ip,
        }
    }
}
