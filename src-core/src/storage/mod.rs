pub(crate) mod audit_trail;
pub(crate) mod snapshot_store;
pub(crate) mod storage_errors;

pub use audit_trail::{AuditTrail, TrailRecord};
pub use snapshot_store::{BooksSnapshot, LedgerSnapshot, SnapshotStore};
pub use storage_errors::StorageError;
