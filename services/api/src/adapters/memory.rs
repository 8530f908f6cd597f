//! services/api/src/adapters/memory.rs
//!
//! An in-memory implementation of the store ports. Backs the test suite and
//! small single-process deployments; mirrors the PostgreSQL adapter's
//! semantics, including the conditional tracking-ID claim.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use meams_core::domain::{Asset, AssetKind, AuditRecord, Equipment, Principal, Supply};
use meams_core::ports::{AccountStore, AssetStore, AuditLog, PortError, PortResult};

/// In-memory store. Cheap to construct per test; all collections start empty.
#[derive(Default)]
pub struct MemoryStore {
    supplies: Mutex<HashMap<Uuid, Supply>>,
    equipment: Mutex<HashMap<Uuid, Equipment>>,
    accounts: Mutex<HashMap<String, Principal>>,
    audit_entries: Mutex<Vec<AuditRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_supply(&self, supply: Supply) {
        self.supplies
            .lock()
            .expect("supplies lock poisoned")
            .insert(supply.id, supply);
    }

    pub fn insert_equipment(&self, equipment: Equipment) {
        self.equipment
            .lock()
            .expect("equipment lock poisoned")
            .insert(equipment.id, equipment);
    }

    pub fn insert_account(&self, principal: Principal) {
        self.accounts
            .lock()
            .expect("accounts lock poisoned")
            .insert(principal.username.clone(), principal);
    }

    /// Clears a bound tracking ID, mimicking a direct store mutation.
    pub fn clear_tracking_id(&self, id: Uuid) {
        if let Some(supply) = self
            .supplies
            .lock()
            .expect("supplies lock poisoned")
            .get_mut(&id)
        {
            supply.tracking_id = None;
        }
        if let Some(equipment) = self
            .equipment
            .lock()
            .expect("equipment lock poisoned")
            .get_mut(&id)
        {
            equipment.tracking_id = None;
        }
    }

    /// Snapshot of recorded audit entries.
    pub fn audit_entries(&self) -> Vec<AuditRecord> {
        self.audit_entries
            .lock()
            .expect("audit lock poisoned")
            .clone()
    }
}

//=========================================================================================
// `AssetStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AssetStore for MemoryStore {
    async fn get_supply(&self, id: Uuid) -> PortResult<Supply> {
        self.supplies
            .lock()
            .expect("supplies lock poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Supply {}", id)))
    }

    async fn get_equipment(&self, id: Uuid) -> PortResult<Equipment> {
        self.equipment
            .lock()
            .expect("equipment lock poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Equipment {}", id)))
    }

    async fn find_asset(&self, id: Uuid) -> PortResult<Option<Asset>> {
        if let Some(supply) = self
            .supplies
            .lock()
            .expect("supplies lock poisoned")
            .get(&id)
        {
            return Ok(Some(Asset::Supply(supply.clone())));
        }
        Ok(self
            .equipment
            .lock()
            .expect("equipment lock poisoned")
            .get(&id)
            .map(|e| Asset::Equipment(e.clone())))
    }

    async fn find_by_tracking_id(&self, tracking_id: &str) -> PortResult<Option<Asset>> {
        if let Some(supply) = self
            .supplies
            .lock()
            .expect("supplies lock poisoned")
            .values()
            .find(|s| s.tracking_id.as_deref() == Some(tracking_id))
        {
            return Ok(Some(Asset::Supply(supply.clone())));
        }
        Ok(self
            .equipment
            .lock()
            .expect("equipment lock poisoned")
            .values()
            .find(|e| e.tracking_id.as_deref() == Some(tracking_id))
            .map(|e| Asset::Equipment(e.clone())))
    }

    async fn claim_tracking_id(
        &self,
        kind: AssetKind,
        id: Uuid,
        candidate: &str,
    ) -> PortResult<String> {
        match kind {
            AssetKind::Supply => {
                let mut supplies = self.supplies.lock().expect("supplies lock poisoned");
                let supply = supplies
                    .get_mut(&id)
                    .ok_or_else(|| PortError::NotFound(format!("Asset {}", id)))?;
                Ok(supply
                    .tracking_id
                    .get_or_insert_with(|| candidate.to_string())
                    .clone())
            }
            AssetKind::Equipment => {
                let mut equipment = self.equipment.lock().expect("equipment lock poisoned");
                let item = equipment
                    .get_mut(&id)
                    .ok_or_else(|| PortError::NotFound(format!("Asset {}", id)))?;
                Ok(item
                    .tracking_id
                    .get_or_insert_with(|| candidate.to_string())
                    .clone())
            }
        }
    }
}

//=========================================================================================
// `AccountStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> PortResult<Option<Principal>> {
        Ok(self
            .accounts
            .lock()
            .expect("accounts lock poisoned")
            .get(username)
            .cloned())
    }

    async fn find_by_identifier(&self, identifier: &str) -> PortResult<Option<Principal>> {
        Ok(self
            .accounts
            .lock()
            .expect("accounts lock poisoned")
            .values()
            .find(|p| p.username == identifier || p.email == identifier)
            .cloned())
    }

    async fn create_account(&self, principal: Principal) -> PortResult<()> {
        let mut accounts = self.accounts.lock().expect("accounts lock poisoned");
        let collides = accounts
            .values()
            .any(|p| p.username == principal.username || p.email == principal.email);
        if collides {
            return Err(PortError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }
        accounts.insert(principal.username.clone(), principal);
        Ok(())
    }

    async fn list_accounts(&self) -> PortResult<Vec<Principal>> {
        let mut accounts: Vec<Principal> = self
            .accounts
            .lock()
            .expect("accounts lock poisoned")
            .values()
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(accounts)
    }

    async fn set_active(&self, username: &str, active: bool) -> PortResult<()> {
        let mut accounts = self.accounts.lock().expect("accounts lock poisoned");
        let principal = accounts
            .get_mut(username)
            .ok_or_else(|| PortError::NotFound(format!("Account {}", username)))?;
        principal.active = active;
        Ok(())
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> PortResult<()> {
        let mut accounts = self.accounts.lock().expect("accounts lock poisoned");
        let principal = accounts
            .get_mut(username)
            .ok_or_else(|| PortError::NotFound(format!("Account {}", username)))?;
        principal.password_hash = password_hash.to_string();
        principal.first_login = false;
        Ok(())
    }

    async fn touch_last_login(&self, username: &str) -> PortResult<()> {
        let mut accounts = self.accounts.lock().expect("accounts lock poisoned");
        if let Some(principal) = accounts.get_mut(username) {
            principal.last_login = Some(chrono::Utc::now());
        }
        Ok(())
    }
}

//=========================================================================================
// `AuditLog` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuditLog for MemoryStore {
    async fn record(&self, entry: AuditRecord) -> PortResult<()> {
        self.audit_entries
            .lock()
            .expect("audit lock poisoned")
            .push(entry);
        Ok(())
    }
}
