//! Versioned document store with transactions.
//!
//! # Responsibilities
//! - Hold the committed document and its version
//! - Hold open transactions, each with its own working document
//! - Optionally persist committed state and explicit transactions as JSON

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::document::Document;
use crate::error::ConfError;
use crate::observability::metrics;
use crate::transaction::{Scope, TransactionInfo, Transactions, WorkingCopy};

/// Version of a freshly created store.
pub const INITIAL_VERSION: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Transaction {
    id: String,
    version: i64,
    #[serde(default)]
    implicit: bool,
    document: Document,
}

#[derive(Debug)]
struct Committed {
    version: i64,
    document: Document,
}

/// On-disk layout of the state file.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: i64,
    document: Document,
    #[serde(default)]
    transactions: Vec<Transaction>,
}

/// Thread-safe transaction store.
///
/// Lock order: the committed state mutex is taken before touching the
/// transaction map whenever both are involved.
#[derive(Debug)]
pub struct Storage {
    committed: Mutex<Committed>,
    transactions: DashMap<String, Transaction>,
    persistence_path: Option<PathBuf>,
}

impl Default for Storage {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Storage {
    /// Empty store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::with_document(Document::new())
    }

    /// In-memory store starting from `document` at the initial version.
    pub fn with_document(document: Document) -> Self {
        Self {
            committed: Mutex::new(Committed {
                version: INITIAL_VERSION,
                document,
            }),
            transactions: DashMap::new(),
            persistence_path: None,
        }
    }

    /// Open a file-backed store, loading the state file if it exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfError> {
        let path = path.as_ref();
        let mut storage = Self::in_memory();
        storage.persistence_path = Some(path.to_path_buf());

        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let snapshot: Snapshot = serde_json::from_reader(reader)?;
            {
                let mut committed = storage.lock_committed();
                committed.version = snapshot.version;
                committed.document = snapshot.document;
            }
            for tx in snapshot.transactions {
                storage.transactions.insert(tx.id.clone(), tx);
            }
            tracing::info!(
                path = %path.display(),
                version = storage.lock_committed().version,
                transactions = storage.transactions.len(),
                "Loaded configuration state"
            );
        }
        Ok(storage)
    }

    fn lock_committed(&self) -> MutexGuard<'_, Committed> {
        self.committed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write committed state and explicit transactions to the state file.
    fn persist(&self, committed: &Committed) -> Result<(), ConfError> {
        self.persist_excluding(committed, None)
    }

    /// Like [`Storage::persist`], leaving out the transaction `excluded`.
    fn persist_excluding(
        &self,
        committed: &Committed,
        excluded: Option<&str>,
    ) -> Result<(), ConfError> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };

        let mut transactions: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|r| !r.value().implicit && Some(r.key().as_str()) != excluded)
            .map(|r| r.value().clone())
            .collect();
        transactions.sort_by(|a, b| a.id.cmp(&b.id));

        let snapshot = Snapshot {
            version: committed.version,
            document: committed.document.clone(),
            transactions,
        };
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &snapshot)?;
        tracing::debug!(path = %path.display(), version = committed.version, "Saved configuration state");
        Ok(())
    }

    fn open_transaction(&self, version: i64, implicit: bool) -> Result<Transaction, ConfError> {
        let committed = self.lock_committed();
        if version != committed.version {
            metrics::record_transaction("conflict");
            return Err(ConfError::VersionMismatch {
                expected: version,
                actual: committed.version,
            });
        }

        let tx = Transaction {
            id: Uuid::new_v4().to_string(),
            version,
            implicit,
            document: committed.document.clone(),
        };
        self.transactions.insert(tx.id.clone(), tx.clone());
        if !implicit {
            self.persist(&committed)?;
        }

        metrics::record_transaction("start");
        tracing::debug!(transaction = %tx.id, version, implicit, "Transaction started");
        Ok(tx)
    }

    /// Commit `id` onto `committed`. The in-memory state only changes once
    /// the state file has been written.
    fn commit_locked(&self, committed: &mut Committed, id: &str) -> Result<i64, ConfError> {
        let tx = self
            .transactions
            .get(id)
            .map(|tx| tx.value().clone())
            .ok_or_else(|| ConfError::TransactionDoesNotExist(id.to_string()))?;
        if tx.version != committed.version {
            metrics::record_transaction("conflict");
            return Err(ConfError::VersionMismatch {
                expected: tx.version,
                actual: committed.version,
            });
        }

        let next = Committed {
            version: committed.version + 1,
            document: tx.document,
        };
        self.persist_excluding(&next, Some(id))?;
        self.transactions.remove(id);
        *committed = next;

        metrics::record_transaction("commit");
        tracing::info!(transaction = %id, version = committed.version, "Transaction committed");
        Ok(committed.version)
    }
}

impl Transactions for Storage {
    fn version(&self, transaction: Option<&str>) -> Result<i64, ConfError> {
        match transaction {
            Some(id) => self
                .transactions
                .get(id)
                .map(|tx| tx.version)
                .ok_or_else(|| ConfError::TransactionDoesNotExist(id.to_string())),
            None => Ok(self.lock_committed().version),
        }
    }

    fn document(&self, transaction: Option<&str>) -> Result<Document, ConfError> {
        match transaction {
            Some(id) => self
                .transactions
                .get(id)
                .map(|tx| tx.document.clone())
                .ok_or_else(|| ConfError::TransactionDoesNotExist(id.to_string())),
            None => Ok(self.lock_committed().document.clone()),
        }
    }

    fn snapshot(&self, transaction: Option<&str>) -> Result<(i64, Document), ConfError> {
        match transaction {
            Some(id) => self
                .transactions
                .get(id)
                .map(|tx| (tx.version, tx.document.clone()))
                .ok_or_else(|| ConfError::TransactionDoesNotExist(id.to_string())),
            None => {
                let committed = self.lock_committed();
                Ok((committed.version, committed.document.clone()))
            }
        }
    }

    fn load_for_change(&self, scope: &Scope) -> Result<WorkingCopy, ConfError> {
        match scope {
            Scope::Version(version) => {
                let tx = self.open_transaction(*version, true)?;
                Ok(WorkingCopy::new(tx.document, tx.id, true))
            }
            Scope::Transaction(id) => {
                let document = self.document(Some(id))?;
                Ok(WorkingCopy::new(document, id.clone(), false))
            }
        }
    }

    fn save(&self, working: WorkingCopy) -> Result<(), ConfError> {
        let mut committed = self.lock_committed();
        let id = working.transaction_id().to_string();
        let implicit = working.is_implicit();

        match self.transactions.get_mut(&id) {
            Some(mut tx) => tx.document = working.document,
            None => return Err(ConfError::TransactionDoesNotExist(id)),
        }

        if implicit {
            let result = self.commit_locked(&mut committed, &id);
            if result.is_err() {
                self.transactions.remove(&id);
                metrics::record_transaction("discard");
            }
            result.map(|_| ())
        } else {
            self.persist(&committed)
        }
    }

    fn abandon(&self, working: WorkingCopy) -> Result<(), ConfError> {
        let committed = self.lock_committed();
        let id = working.transaction_id().to_string();

        if working.is_implicit() {
            self.transactions.remove(&id);
            metrics::record_transaction("discard");
            tracing::debug!(transaction = %id, "Implicit transaction discarded");
            return Ok(());
        }

        match self.transactions.get_mut(&id) {
            Some(mut tx) => tx.document = working.document,
            None => return Err(ConfError::TransactionDoesNotExist(id)),
        }
        self.persist(&committed)
    }

    fn start_transaction(&self, version: i64) -> Result<TransactionInfo, ConfError> {
        let tx = self.open_transaction(version, false)?;
        Ok(TransactionInfo {
            id: tx.id,
            version: tx.version,
        })
    }

    fn commit_transaction(&self, id: &str) -> Result<i64, ConfError> {
        let mut committed = self.lock_committed();
        self.commit_locked(&mut committed, id)
    }

    fn delete_transaction(&self, id: &str) -> Result<(), ConfError> {
        let committed = self.lock_committed();
        if self.transactions.remove(id).is_none() {
            return Err(ConfError::TransactionDoesNotExist(id.to_string()));
        }
        metrics::record_transaction("discard");
        tracing::info!(transaction = %id, "Transaction deleted");
        self.persist(&committed)
    }

    fn transactions(&self) -> Vec<TransactionInfo> {
        let mut infos: Vec<TransactionInfo> = self
            .transactions
            .iter()
            .filter(|r| !r.value().implicit)
            .map(|r| TransactionInfo {
                id: r.key().clone(),
                version: r.value().version,
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }
}
