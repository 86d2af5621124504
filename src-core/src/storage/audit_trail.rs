use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::storage_errors::StorageError;
use crate::transactions::Transaction;

/// One line of the forensic trail: the event exactly as it was accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailRecord {
    pub recorded_at: DateTime<Utc>,
    pub transaction: Transaction,
}

/// Append-only JSONL record of every ingested event. Each append is
/// flushed immediately so the trail survives a crash between snapshots.
#[derive(Debug)]
pub struct AuditTrail {
    path: PathBuf,
    file: File,
}

impl AuditTrail {
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        let path = data_dir.join("audit_trail.jsonl");
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(AuditTrail { path, file })
    }

    pub fn append(&mut self, transaction: &Transaction) -> Result<(), StorageError> {
        let record = TrailRecord {
            recorded_at: Utc::now(),
            transaction: transaction.clone(),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }

    /// Reads the whole trail back, oldest first.
    pub fn read_all(&self) -> Result<Vec<TrailRecord>, StorageError> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}
