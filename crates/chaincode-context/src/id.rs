//! Composite transaction context key
//!
//! Chain and transaction identifiers are stored as a pair rather than
//! concatenated, so `("ab", "c")` and `("a", "bc")` never collide.

use std::fmt;

/// Identifies one transaction within one chain
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionContextId {
    chain_id: String,
    tx_id: String,
}

impl TransactionContextId {
    /// Create a transaction identifier that is scoped to a chain
    pub fn new(chain_id: impl Into<String>, tx_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            tx_id: tx_id.into(),
        }
    }

    /// Chain component
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Transaction component
    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }
}

impl fmt::Display for TransactionContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.tx_id, self.chain_id)
    }
}
