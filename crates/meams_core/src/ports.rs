//! crates/meams_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete store behind it.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Asset, AssetKind, AuditRecord, Equipment, Principal, Supply};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the backing store.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Read and tracking-ID access to the supply and equipment collections.
///
/// The asset records themselves are owned by out-of-scope CRUD flows; the
/// only mutation this port carries is the conditional tracking-ID claim.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn get_supply(&self, id: Uuid) -> PortResult<Supply>;

    async fn get_equipment(&self, id: Uuid) -> PortResult<Equipment>;

    /// Looks an ID up in both collections, supplies first.
    async fn find_asset(&self, id: Uuid) -> PortResult<Option<Asset>>;

    /// Reverse lookup of a printed tracking ID across both collections.
    async fn find_by_tracking_id(&self, tracking_id: &str) -> PortResult<Option<Asset>>;

    /// Binds `candidate` as the asset's tracking ID only if none is bound
    /// yet, then returns whatever ID is bound after the attempt. Concurrent
    /// callers for the same asset all observe the single winner.
    async fn claim_tracking_id(
        &self,
        kind: AssetKind,
        id: Uuid,
        candidate: &str,
    ) -> PortResult<String>;
}

/// Access to the persistent account collection.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> PortResult<Option<Principal>>;

    /// Looks up by username or email, whichever matches.
    async fn find_by_identifier(&self, identifier: &str) -> PortResult<Option<Principal>>;

    /// Fails with [`PortError::Conflict`] when the username or email is
    /// already taken.
    async fn create_account(&self, principal: Principal) -> PortResult<()>;

    async fn list_accounts(&self) -> PortResult<Vec<Principal>>;

    async fn set_active(&self, username: &str, active: bool) -> PortResult<()>;

    /// Writes a new credential hash and clears the first-login flag.
    async fn update_password(&self, username: &str, password_hash: &str) -> PortResult<()>;

    async fn touch_last_login(&self, username: &str) -> PortResult<()>;
}

/// Fire-and-forget audit sink. Callers ignore failures; a broken log must
/// never fail the business operation it annotates.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: AuditRecord) -> PortResult<()>;
}
