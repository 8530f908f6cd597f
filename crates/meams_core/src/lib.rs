pub mod domain;
pub mod lcc;
pub mod ports;
pub mod protocol;
pub mod units;

pub use domain::{
    Asset, AssetKind, AuditRecord, DocumentAttachment, Equipment, ImageAttachment, OpenReport,
    Principal, RepairEntry, Role, Supply, TransactionEntry,
};
pub use lcc::{analyze, LccResult, RiskLevel};
pub use ports::{AccountStore, AssetStore, AuditLog, PortError, PortResult};
pub use protocol::{ScanEvent, ScanFrame};
pub use units::pluralize_unit;
