use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertCategory {
    Reconciliation,
    FeeAnomaly,
    MissingCostBasis,
}

/// One finding raised by the auditor. Alerts never mutate the books;
/// they only surface conditions an operator should look at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditAlert {
    pub id: String,
    pub severity: AlertSeverity,
    pub category: AlertCategory,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
}

impl AuditAlert {
    pub fn new(severity: AlertSeverity, category: AlertCategory, message: String) -> Self {
        AuditAlert {
            id: uuid::Uuid::new_v4().to_string(),
            severity,
            category,
            message,
            created_at: Utc::now(),
            resolved: false,
        }
    }
}
