//! Error types shared by the document, transaction and site layers.

use std::fmt;
use thiserror::Error;

/// Errors raised while reading or changing the configuration.
#[derive(Debug, Error)]
pub enum ConfError {
    /// Referenced site, frontend, backend or child object is absent.
    #[error("{0}")]
    ObjectDoesNotExist(String),

    /// A primitive with the same key already exists.
    #[error("{0}")]
    ObjectAlreadyExists(String),

    /// Schema validation failure or a business-rule conflict.
    #[error("validation error: {0}")]
    Validation(String),

    /// A conditional farm without a routing predicate.
    #[error("backend {0} set as conditional but no conditions provided")]
    MissingCondition(String),

    /// One or more primitive operations failed during a reconciliation pass.
    #[error(transparent)]
    CompositeTransaction(CompositeError),

    /// Optimistic concurrency check failed.
    #[error("version mismatch: expected {expected}, committed version is {actual}")]
    VersionMismatch { expected: i64, actual: i64 },

    /// Unknown transaction id.
    #[error("transaction {0} does not exist")]
    TransactionDoesNotExist(String),

    /// Persistence failure in the transaction store.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ConfError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfError::ObjectDoesNotExist(_))
    }

    /// Underlying errors of a composite, or the error itself otherwise.
    pub fn causes(&self) -> Vec<&ConfError> {
        match self {
            ConfError::CompositeTransaction(composite) => {
                composite.iter().flat_map(|e| e.causes()).collect()
            }
            other => vec![other],
        }
    }
}

impl From<std::io::Error> for ConfError {
    fn from(e: std::io::Error) -> Self {
        ConfError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for ConfError {
    fn from(e: serde_json::Error) -> Self {
        ConfError::Storage(e.to_string())
    }
}

/// Ordered collection of errors gathered during a multi-step operation.
///
/// Failures are pushed as they happen and the container is checked once at
/// the end with [`CompositeError::into_result`].
#[derive(Debug, Default)]
pub struct CompositeError {
    errors: Vec<ConfError>,
}

impl CompositeError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: ConfError) {
        self.errors.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConfError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing was recorded, otherwise a composite error.
    pub fn into_result(self) -> Result<(), ConfError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ConfError::CompositeTransaction(self))
        }
    }
}

impl fmt::Display for CompositeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} operation(s) failed: ", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompositeError {}
