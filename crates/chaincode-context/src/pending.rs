//! Buffered query results awaiting delivery to the chaincode process

use crate::ledger::QueryResultBytes;

/// Query results collected for the next batch of a paginated query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingQueryResult {
    batch: Vec<QueryResultBytes>,
}

impl PendingQueryResult {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result to the current batch
    pub fn add(&mut self, result: QueryResultBytes) {
        self.batch.push(result);
    }

    /// Take the current batch, leaving the buffer empty
    pub fn cut(&mut self) -> Vec<QueryResultBytes> {
        std::mem::take(&mut self.batch)
    }

    /// Number of buffered results
    pub fn len(&self) -> usize {
        self.batch.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }
}
