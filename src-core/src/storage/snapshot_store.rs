use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::audit::AuditAlert;
use crate::costbasis::{RealizedGain, TaxLot};
use crate::ledger::JournalEntry;
use crate::storage::storage_errors::StorageError;
use crate::transactions::Transaction;
use crate::utils::decimal_serde::*;

/// Everything the engine side of the books needs to resume: raw
/// transactions, open FIFO lots keyed `"exchange:asset"`, realized gains,
/// and the running peak equity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooksSnapshot {
    pub last_transaction_id: u64,
    pub transactions: Vec<Transaction>,
    pub lots: BTreeMap<String, Vec<TaxLot>>,
    pub realized_gains: Vec<RealizedGain>,
    pub alerts: Vec<AuditAlert>,
    #[serde(with = "decimal_serde")]
    pub peak_equity: Decimal,
}

/// Double-entry side of the books. Balances are derivable from the journal
/// but stored alongside it so a snapshot is readable on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub balances: BTreeMap<u32, Decimal>,
    pub journal: Vec<JournalEntry>,
}

/// Writes and reads the two snapshot files. Every write goes to a
/// temporary sibling first, is fsynced, then renamed over the target, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    books_path: PathBuf,
    ledger_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(data_dir: &Path) -> Self {
        SnapshotStore {
            books_path: data_dir.join("books.json"),
            ledger_path: data_dir.join("ledger.json"),
        }
    }

    pub fn save_books(&self, snapshot: &BooksSnapshot) -> Result<(), StorageError> {
        let payload = serde_json::to_vec_pretty(snapshot)?;
        write_atomic(&self.books_path, &payload)?;
        debug!(
            "Saved books snapshot: {} transactions, {} realized gains",
            snapshot.transactions.len(),
            snapshot.realized_gains.len()
        );
        Ok(())
    }

    pub fn load_books(&self) -> Result<Option<BooksSnapshot>, StorageError> {
        load_json(&self.books_path)
    }

    pub fn save_ledger(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError> {
        let payload = serde_json::to_vec_pretty(snapshot)?;
        write_atomic(&self.ledger_path, &payload)?;
        debug!(
            "Saved ledger snapshot: {} journal entries",
            snapshot.journal.len()
        );
        Ok(())
    }

    pub fn load_ledger(&self) -> Result<Option<LedgerSnapshot>, StorageError> {
        load_json(&self.ledger_path)
    }
}

pub(crate) fn write_atomic(path: &Path, payload: &[u8]) -> Result<(), StorageError> {
    let tmp_path = match path.extension() {
        Some(ext) => {
            let mut ext = ext.to_os_string();
            ext.push(".tmp");
            path.with_extension(ext)
        }
        None => path.with_extension("tmp"),
    };
    let mut file = File::create(&tmp_path)?;
    file.write_all(payload)?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    let value = serde_json::from_str(&raw)?;
    Ok(Some(value))
}
