//! Ledger handles supplied to a transaction context at creation
//!
//! Either handle may be absent: query-only invocations run without a write
//! set simulator, and chains without a history database have no history
//! executor.

use std::sync::Arc;

use crate::ledger::{HistoryQueryExecutor, TxSimulator};

/// Collaborators available to one invocation
#[derive(Debug, Clone, Default)]
pub struct ExecutionResources {
    tx_simulator: Option<Arc<dyn TxSimulator>>,
    history_query_executor: Option<Arc<dyn HistoryQueryExecutor>>,
}

impl ExecutionResources {
    /// Resources with no collaborators attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a write set simulator
    pub fn with_tx_simulator(mut self, tx_simulator: Arc<dyn TxSimulator>) -> Self {
        self.tx_simulator = Some(tx_simulator);
        self
    }

    /// Attach a history query executor
    pub fn with_history_query_executor(
        mut self,
        history_query_executor: Arc<dyn HistoryQueryExecutor>,
    ) -> Self {
        self.history_query_executor = Some(history_query_executor);
        self
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Option<Arc<dyn TxSimulator>>,
        Option<Arc<dyn HistoryQueryExecutor>>,
    ) {
        (self.tx_simulator, self.history_query_executor)
    }
}
