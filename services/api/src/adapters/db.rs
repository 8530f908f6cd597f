//! services/api/src/adapters/db.rs
//!
//! The PostgreSQL adapter: concrete implementation of the `AssetStore`,
//! `AccountStore`, and `AuditLog` ports over `sqlx`. Histories and embedded
//! attachments live in JSONB columns on the asset rows.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use meams_core::domain::{
    Asset, AssetKind, AuditRecord, DocumentAttachment, Equipment, ImageAttachment, OpenReport,
    Principal, RepairEntry, Role, Supply, TransactionEntry,
};
use meams_core::ports::{AccountStore, AssetStore, AuditLog, PortError, PortResult};

/// Postgres error code for a unique-constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter implementing the store ports.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SupplyRecord {
    id: Uuid,
    item_code: String,
    name: String,
    category: String,
    location: String,
    status: String,
    quantity: i64,
    unit: Option<String>,
    image: Option<Json<ImageAttachment>>,
    documents: Json<Vec<DocumentAttachment>>,
    transactions: Json<Vec<TransactionEntry>>,
    qr_tracking_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SupplyRecord {
    fn to_domain(self) -> Supply {
        Supply {
            id: self.id,
            item_code: self.item_code,
            name: self.name,
            category: self.category,
            location: self.location,
            status: self.status,
            quantity: self.quantity,
            unit: self.unit,
            image: self.image.map(|j| j.0),
            documents: self.documents.0,
            transactions: self.transactions.0,
            tracking_id: self.qr_tracking_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct EquipmentRecord {
    id: Uuid,
    item_code: String,
    name: String,
    category: String,
    location: String,
    status: String,
    useful_life_years: f64,
    purchase_amount: f64,
    purchase_date: NaiveDate,
    open_report: Option<Json<OpenReport>>,
    repairs: Json<Vec<RepairEntry>>,
    image: Option<Json<ImageAttachment>>,
    documents: Json<Vec<DocumentAttachment>>,
    qr_tracking_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EquipmentRecord {
    fn to_domain(self) -> Equipment {
        Equipment {
            id: self.id,
            item_code: self.item_code,
            name: self.name,
            category: self.category,
            location: self.location,
            status: self.status,
            useful_life_years: self.useful_life_years,
            purchase_amount: self.purchase_amount,
            purchase_date: self.purchase_date,
            open_report: self.open_report.map(|j| j.0),
            repairs: self.repairs.0,
            image: self.image.map(|j| j.0),
            documents: self.documents.0,
            tracking_id: self.qr_tracking_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct AccountRecord {
    username: String,
    email: String,
    full_name: Option<String>,
    role: String,
    active: bool,
    password_hash: String,
    first_login: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl AccountRecord {
    fn to_domain(self) -> PortResult<Principal> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| PortError::Unexpected(format!("unknown role '{}'", self.role)))?;
        Ok(Principal {
            username: self.username,
            email: self.email,
            full_name: self.full_name,
            role,
            active: self.active,
            password_hash: self.password_hash,
            first_login: self.first_login,
            last_login: self.last_login,
            created_at: self.created_at,
        })
    }
}

const SUPPLY_COLUMNS: &str = "id, item_code, name, category, location, status, quantity, unit, \
     image, documents, transactions, qr_tracking_id, created_at, updated_at";

const EQUIPMENT_COLUMNS: &str = "id, item_code, name, category, location, status, \
     useful_life_years, purchase_amount, purchase_date, open_report, repairs, image, documents, \
     qr_tracking_id, created_at, updated_at";

const ACCOUNT_COLUMNS: &str = "username, email, full_name, role, active, password_hash, \
     first_login, last_login, created_at";

impl PgStore {
    async fn fetch_supply(&self, id: Uuid) -> PortResult<Option<Supply>> {
        let sql = format!("SELECT {} FROM supplies WHERE id = $1", SUPPLY_COLUMNS);
        let record = sqlx::query_as::<_, SupplyRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(SupplyRecord::to_domain))
    }

    async fn fetch_equipment(&self, id: Uuid) -> PortResult<Option<Equipment>> {
        let sql = format!("SELECT {} FROM equipment WHERE id = $1", EQUIPMENT_COLUMNS);
        let record = sqlx::query_as::<_, EquipmentRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(EquipmentRecord::to_domain))
    }
}

//=========================================================================================
// `AssetStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AssetStore for PgStore {
    async fn get_supply(&self, id: Uuid) -> PortResult<Supply> {
        self.fetch_supply(id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Supply {}", id)))
    }

    async fn get_equipment(&self, id: Uuid) -> PortResult<Equipment> {
        self.fetch_equipment(id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Equipment {}", id)))
    }

    async fn find_asset(&self, id: Uuid) -> PortResult<Option<Asset>> {
        if let Some(supply) = self.fetch_supply(id).await? {
            return Ok(Some(Asset::Supply(supply)));
        }
        Ok(self.fetch_equipment(id).await?.map(Asset::Equipment))
    }

    async fn find_by_tracking_id(&self, tracking_id: &str) -> PortResult<Option<Asset>> {
        let sql = format!(
            "SELECT {} FROM supplies WHERE qr_tracking_id = $1",
            SUPPLY_COLUMNS
        );
        let supply = sqlx::query_as::<_, SupplyRecord>(&sql)
            .bind(tracking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        if let Some(record) = supply {
            return Ok(Some(Asset::Supply(record.to_domain())));
        }

        let sql = format!(
            "SELECT {} FROM equipment WHERE qr_tracking_id = $1",
            EQUIPMENT_COLUMNS
        );
        let equipment = sqlx::query_as::<_, EquipmentRecord>(&sql)
            .bind(tracking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(equipment.map(|r| Asset::Equipment(r.to_domain())))
    }

    async fn claim_tracking_id(
        &self,
        kind: AssetKind,
        id: Uuid,
        candidate: &str,
    ) -> PortResult<String> {
        let table = match kind {
            AssetKind::Supply => "supplies",
            AssetKind::Equipment => "equipment",
        };
        // Conditional bind: only the first writer lands; losers fall through
        // to the re-read and observe the winner's ID.
        let update = format!(
            "UPDATE {} SET qr_tracking_id = $2, updated_at = now() \
             WHERE id = $1 AND qr_tracking_id IS NULL",
            table
        );
        sqlx::query(&update)
            .bind(id)
            .bind(candidate)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        let select = format!("SELECT qr_tracking_id FROM {} WHERE id = $1", table);
        let bound: Option<(Option<String>,)> = sqlx::query_as(&select)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        match bound {
            Some((Some(tracking_id),)) => Ok(tracking_id),
            Some((None,)) | None => Err(PortError::NotFound(format!("Asset {}", id))),
        }
    }
}

//=========================================================================================
// `AccountStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountStore for PgStore {
    async fn find_by_username(&self, username: &str) -> PortResult<Option<Principal>> {
        let sql = format!("SELECT {} FROM accounts WHERE username = $1", ACCOUNT_COLUMNS);
        let record = sqlx::query_as::<_, AccountRecord>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        record.map(AccountRecord::to_domain).transpose()
    }

    async fn find_by_identifier(&self, identifier: &str) -> PortResult<Option<Principal>> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE username = $1 OR email = $1",
            ACCOUNT_COLUMNS
        );
        let record = sqlx::query_as::<_, AccountRecord>(&sql)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        record.map(AccountRecord::to_domain).transpose()
    }

    async fn create_account(&self, principal: Principal) -> PortResult<()> {
        let result = sqlx::query(
            "INSERT INTO accounts \
             (username, email, full_name, role, active, password_hash, first_login, last_login, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&principal.username)
        .bind(&principal.email)
        .bind(&principal.full_name)
        .bind(principal.role.as_str())
        .bind(principal.active)
        .bind(&principal.password_hash)
        .bind(principal.first_login)
        .bind(principal.last_login)
        .bind(principal.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(PortError::Conflict(
                    "Username or email already exists".to_string(),
                ))
            }
            Err(e) => Err(unexpected(e)),
        }
    }

    async fn list_accounts(&self) -> PortResult<Vec<Principal>> {
        let sql = format!("SELECT {} FROM accounts ORDER BY username", ACCOUNT_COLUMNS);
        let records = sqlx::query_as::<_, AccountRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(AccountRecord::to_domain).collect()
    }

    async fn set_active(&self, username: &str, active: bool) -> PortResult<()> {
        let result = sqlx::query("UPDATE accounts SET active = $2 WHERE username = $1")
            .bind(username)
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Account {}", username)));
        }
        Ok(())
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = $2, first_login = false WHERE username = $1",
        )
        .bind(username)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Account {}", username)));
        }
        Ok(())
    }

    async fn touch_last_login(&self, username: &str) -> PortResult<()> {
        sqlx::query("UPDATE accounts SET last_login = now() WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `AuditLog` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuditLog for PgStore {
    async fn record(&self, entry: AuditRecord) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO audit_logs (timestamp, username, action, details, client_ip) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.timestamp)
        .bind(&entry.username)
        .bind(&entry.action)
        .bind(&entry.details)
        .bind(&entry.client_ip)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}
