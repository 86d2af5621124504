pub(crate) mod audit_model;
pub(crate) mod audit_service;

pub use audit_model::{AlertCategory, AlertSeverity, AuditAlert};
pub use audit_service::Auditor;
