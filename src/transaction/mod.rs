//! Transaction coordination.
//!
//! # Data Flow
//! ```text
//! Scope::Version(v)      → implicit transaction opened at version v
//! Scope::Transaction(id) → existing transaction attached
//!     → WorkingCopy (document owned by one call)
//!     → save:    stored; committed if implicit
//!     → abandon: implicit discarded, explicit stored back for its owner
//! ```
//!
//! # Design Decisions
//! - Optimistic concurrency: a transaction records the committed version it
//!   started from and may only commit while that version is current
//! - Explicit transactions are never committed or discarded by site calls
//! - Committing bumps the version by one

pub mod storage;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::ConfError;

pub use storage::Storage;

/// Transaction context of a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Work inside a caller-owned transaction; the caller commits it.
    Transaction(String),
    /// Open an implicit transaction at this base version and commit it on success.
    Version(i64),
}

/// The document of one transaction, exclusively owned by the running call.
#[derive(Debug)]
pub struct WorkingCopy {
    pub document: Document,
    transaction_id: String,
    implicit: bool,
}

impl WorkingCopy {
    pub fn new(document: Document, transaction_id: String, implicit: bool) -> Self {
        Self {
            document,
            transaction_id,
            implicit,
        }
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn is_implicit(&self) -> bool {
        self.implicit
    }
}

/// An open transaction as listed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransactionInfo {
    pub id: String,
    /// Committed version the transaction started from.
    pub version: i64,
}

/// Coordinator handing out working copies and deciding their fate.
pub trait Transactions {
    /// Committed version, or the base version of `transaction`.
    fn version(&self, transaction: Option<&str>) -> Result<i64, ConfError>;

    /// Snapshot of the committed document, or of `transaction`'s copy.
    fn document(&self, transaction: Option<&str>) -> Result<Document, ConfError>;

    /// Version and document read together, so neither can come from a
    /// later commit than the other.
    fn snapshot(&self, transaction: Option<&str>) -> Result<(i64, Document), ConfError>;

    fn load_for_change(&self, scope: &Scope) -> Result<WorkingCopy, ConfError>;

    /// Store the working copy, committing it if its transaction is implicit.
    fn save(&self, working: WorkingCopy) -> Result<(), ConfError>;

    /// Discard an implicit transaction. An explicit transaction keeps the
    /// working copy and stays open.
    fn abandon(&self, working: WorkingCopy) -> Result<(), ConfError>;

    fn start_transaction(&self, version: i64) -> Result<TransactionInfo, ConfError>;

    /// Commit and close; returns the new committed version.
    fn commit_transaction(&self, id: &str) -> Result<i64, ConfError>;

    fn delete_transaction(&self, id: &str) -> Result<(), ConfError>;

    fn transactions(&self) -> Vec<TransactionInfo>;
}
