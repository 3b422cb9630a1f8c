//! Error types for transaction context bookkeeping
//!
//! Absent contexts are not errors: lookups and removals return `Option`.
//! Everything here is either a protocol violation by the dispatcher or a
//! failure reported by a ledger collaborator.

use std::time::Duration;

use thiserror::Error;

use crate::ledger::LedgerError;

/// Errors raised by the transaction context registry and its records
#[derive(Debug, Error)]
pub enum TransactionContextError {
    /// A context already exists for the chain and transaction
    #[error("txid: {tx_id}({chain_id}) exists")]
    DuplicateTransactionContext {
        /// Chain the duplicate transaction targeted
        chain_id: String,
        /// Transaction identifier that was submitted twice
        tx_id: String,
    },

    /// The terminal response slot has already been filled
    #[error("response already sent for transaction")]
    ResponseAlreadySent,

    /// Another waiter has already claimed the response slot
    #[error("response already claimed by another waiter")]
    ResponseAlreadyClaimed,

    /// The waiting side went away before the response was delivered
    #[error("response receiver dropped before delivery")]
    ResponseReceiverDropped,

    /// The producing side went away without sending a response
    #[error("response sender dropped without a response")]
    ResponseSenderDropped,

    /// No response arrived within the allotted time
    #[error("timeout expired while waiting for response after {timeout:?}")]
    ResponseTimeout {
        /// How long the waiter was prepared to block
        timeout: Duration,
    },

    /// Closing a query iterator failed
    #[error("failed to close query iterator {handle}")]
    QueryIterator {
        /// Iterator handle assigned by the chaincode process
        handle: String,
        /// Failure reported by the iterator
        #[source]
        source: LedgerError,
    },
}

impl TransactionContextError {
    /// Create a duplicate transaction context error
    pub fn duplicate(chain_id: impl Into<String>, tx_id: impl Into<String>) -> Self {
        Self::DuplicateTransactionContext {
            chain_id: chain_id.into(),
            tx_id: tx_id.into(),
        }
    }

    /// Create a query iterator failure for `handle`
    pub fn query_iterator(handle: impl Into<String>, source: LedgerError) -> Self {
        Self::QueryIterator {
            handle: handle.into(),
            source,
        }
    }

    /// Whether the error signals a duplicate transaction identifier
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateTransactionContext { .. })
    }
}

/// Result type for transaction context operations
pub type Result<T> = std::result::Result<T, TransactionContextError>;

/// Errors raised while loading registry configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration text was not valid TOML for the expected shape
    #[error("invalid configuration: {source}")]
    Parse {
        /// Underlying TOML error
        #[from]
        source: toml::de::Error,
    },
}
