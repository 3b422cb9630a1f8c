//! Ledger collaborator interfaces
//!
//! The registry never simulates transactions or executes queries. It only
//! holds handles to the objects that do, and guarantees that every result
//! iterator it has been given is closed exactly once.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a ledger collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ledger error: {message}")]
pub struct LedgerError {
    message: String,
}

impl LedgerError {
    /// Create a ledger error with a description
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One serialized query result as handed back to the chaincode process
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryResultBytes {
    /// Encoded result record
    pub result_bytes: Vec<u8>,
}

impl QueryResultBytes {
    /// Wrap an encoded result record
    pub fn new(result_bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            result_bytes: result_bytes.into(),
        }
    }
}

/// Records proposed state changes for a transaction before commit
pub trait TxSimulator: fmt::Debug + Send + Sync {
    /// Transaction this simulator is recording for
    fn tx_id(&self) -> &str;
}

/// Answers historical-state queries for a chain
pub trait HistoryQueryExecutor: fmt::Debug + Send + Sync {
    /// Chain whose history is being queried
    fn chain_id(&self) -> &str;
}

/// Cursor over ledger query results produced by range and history queries
///
/// Implementations must release their underlying resources in `close`. The
/// registry calls `close` once per registered iterator; callers that take an
/// iterator out of a context become responsible for closing it.
pub trait ResultsIterator: Send {
    /// Advance the cursor, returning `None` once exhausted
    fn next(&mut self) -> Result<Option<QueryResultBytes>, LedgerError>;

    /// Release the iterator's resources
    fn close(&mut self) -> Result<(), LedgerError>;
}
