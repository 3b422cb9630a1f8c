//! Per-transaction execution state
//!
//! A `TransactionContext` ties one in-flight invocation to the resources it
//! has opened: result iterators for range and history queries, buffered
//! results for paginated queries, and the slot its terminal response will be
//! delivered through.
//!
//! ## Lock Usage
//!
//! Iterator and pending-result maps share one `parking_lot::Mutex` per
//! context. Query handlers for the same transaction may run concurrently with
//! each other and with the registry-wide close sweep, so every access goes
//! through that lock. When both are needed, the registry lock is taken first.
//! Iterators are closed after the context lock is released.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, TransactionContextError};
use crate::id::TransactionContextId;
use crate::ledger::{HistoryQueryExecutor, ResultsIterator, TxSimulator};
use crate::message::{ChaincodeMessage, Proposal, SignedProposal};
use crate::notifier::ResponseNotifier;
use crate::pending::PendingQueryResult;
use crate::resources::ExecutionResources;

/// Outcome of a best-effort iterator close sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseSummary {
    /// Iterators whose `close` succeeded
    pub closed: usize,
    /// Iterators whose `close` reported an error
    pub failed: usize,
}

impl CloseSummary {
    /// Total iterators visited
    pub fn total(&self) -> usize {
        self.closed + self.failed
    }

    /// Fold another sweep's counts into this one
    pub fn merge(&mut self, other: CloseSummary) {
        self.closed += other.closed;
        self.failed += other.failed;
    }
}

#[derive(Default)]
struct QueryState {
    iterators: HashMap<String, Box<dyn ResultsIterator>>,
    pending: HashMap<String, PendingQueryResult>,
}

/// Execution state for one transaction on one chain
pub struct TransactionContext {
    id: TransactionContextId,
    signed_proposal: Option<SignedProposal>,
    proposal: Option<Proposal>,
    response_notifier: ResponseNotifier,
    execute_timeout: Option<Duration>,
    queries: Mutex<QueryState>,
    tx_simulator: Option<Arc<dyn TxSimulator>>,
    history_query_executor: Option<Arc<dyn HistoryQueryExecutor>>,
}

impl TransactionContext {
    pub(crate) fn new(
        id: TransactionContextId,
        resources: ExecutionResources,
        signed_proposal: Option<SignedProposal>,
        proposal: Option<Proposal>,
        execute_timeout: Option<Duration>,
    ) -> Self {
        let (tx_simulator, history_query_executor) = resources.into_parts();
        Self {
            id,
            signed_proposal,
            proposal,
            response_notifier: ResponseNotifier::new(),
            execute_timeout,
            queries: Mutex::new(QueryState::default()),
            tx_simulator,
            history_query_executor,
        }
    }

    /// Registry key of this context
    pub fn id(&self) -> &TransactionContextId {
        &self.id
    }

    /// Chain the transaction targets
    pub fn chain_id(&self) -> &str {
        self.id.chain_id()
    }

    /// Transaction identifier
    pub fn tx_id(&self) -> &str {
        self.id.tx_id()
    }

    /// Signed client proposal, when the invocation carried one
    pub fn signed_proposal(&self) -> Option<&SignedProposal> {
        self.signed_proposal.as_ref()
    }

    /// Client proposal, when the invocation carried one
    pub fn proposal(&self) -> Option<&Proposal> {
        self.proposal.as_ref()
    }

    /// Write set simulator supplied at creation
    pub fn tx_simulator(&self) -> Option<&Arc<dyn TxSimulator>> {
        self.tx_simulator.as_ref()
    }

    /// History query executor supplied at creation
    pub fn history_query_executor(&self) -> Option<&Arc<dyn HistoryQueryExecutor>> {
        self.history_query_executor.as_ref()
    }

    // Response slot

    /// Deliver the terminal response to the invoking caller
    pub fn notify(&self, message: ChaincodeMessage) -> Result<()> {
        self.response_notifier.notify(message)
    }

    /// Wait for the terminal response, bounded by the registry's execute
    /// timeout when one is configured
    pub async fn wait_for_response(&self) -> Result<ChaincodeMessage> {
        match self.execute_timeout {
            Some(timeout) => self.response_notifier.wait_timeout(timeout).await,
            None => self.response_notifier.wait().await,
        }
    }

    /// Wait for the terminal response for at most `timeout`
    pub async fn wait_for_response_timeout(&self, timeout: Duration) -> Result<ChaincodeMessage> {
        self.response_notifier.wait_timeout(timeout).await
    }

    /// Whether the terminal response has been delivered
    pub fn response_sent(&self) -> bool {
        self.response_notifier.is_sent()
    }

    /// Abandon the response slot, waking any waiter with an error
    pub fn close_response(&self) {
        self.response_notifier.close();
    }

    // Query bookkeeping

    /// Register an iterator and an empty pending result under `handle`
    ///
    /// An iterator already registered under the same handle is closed.
    pub fn initialize_query_context(
        &self,
        handle: impl Into<String>,
        iterator: Box<dyn ResultsIterator>,
    ) {
        let handle = handle.into();
        let replaced = {
            let mut queries = self.queries.lock();
            queries
                .pending
                .insert(handle.clone(), PendingQueryResult::new());
            queries.iterators.insert(handle.clone(), iterator)
        };

        if let Some(mut previous) = replaced {
            warn!(
                chain_id = %self.chain_id(),
                tx_id = %self.tx_id(),
                handle = %handle,
                "replacing open query iterator"
            );
            if let Err(error) = previous.close() {
                warn!(handle = %handle, %error, "failed to close replaced query iterator");
            }
        }
    }

    /// Whether an iterator is registered under `handle`
    pub fn has_query_iterator(&self, handle: &str) -> bool {
        self.queries.lock().iterators.contains_key(handle)
    }

    /// Run `f` against the iterator registered under `handle`
    ///
    /// The context lock is held while `f` runs.
    pub fn with_query_iterator<R>(
        &self,
        handle: &str,
        f: impl FnOnce(&mut dyn ResultsIterator) -> R,
    ) -> Option<R> {
        let mut queries = self.queries.lock();
        queries
            .iterators
            .get_mut(handle)
            .map(|iterator| f(iterator.as_mut()))
    }

    /// Remove the iterator under `handle` without closing it
    pub fn take_query_iterator(&self, handle: &str) -> Option<Box<dyn ResultsIterator>> {
        self.queries.lock().iterators.remove(handle)
    }

    /// Store buffered results under `handle`, returning any previous buffer
    pub fn insert_pending_query_result(
        &self,
        handle: impl Into<String>,
        pending: PendingQueryResult,
    ) -> Option<PendingQueryResult> {
        self.queries.lock().pending.insert(handle.into(), pending)
    }

    /// Run `f` against the buffered results under `handle`
    pub fn with_pending_query_result<R>(
        &self,
        handle: &str,
        f: impl FnOnce(&mut PendingQueryResult) -> R,
    ) -> Option<R> {
        self.queries.lock().pending.get_mut(handle).map(f)
    }

    /// Remove the buffered results under `handle`
    pub fn take_pending_query_result(&self, handle: &str) -> Option<PendingQueryResult> {
        self.queries.lock().pending.remove(handle)
    }

    /// Close the iterator under `handle` and drop its buffered results
    ///
    /// Missing handles are ignored.
    pub fn cleanup_query_context(&self, handle: &str) -> Result<()> {
        let iterator = {
            let mut queries = self.queries.lock();
            queries.pending.remove(handle);
            queries.iterators.remove(handle)
        };

        match iterator {
            Some(mut iterator) => iterator
                .close()
                .map_err(|source| TransactionContextError::query_iterator(handle, source)),
            None => Ok(()),
        }
    }

    /// Close every registered iterator
    ///
    /// Failures are logged and counted; they never stop the sweep. Closed
    /// iterators are removed so a later sweep does not close them again.
    pub fn close_query_iterators(&self) -> CloseSummary {
        let iterators: Vec<_> = self.queries.lock().iterators.drain().collect();

        let mut summary = CloseSummary::default();
        for (handle, mut iterator) in iterators {
            match iterator.close() {
                Ok(()) => summary.closed += 1,
                Err(error) => {
                    summary.failed += 1;
                    warn!(
                        chain_id = %self.chain_id(),
                        tx_id = %self.tx_id(),
                        handle = %handle,
                        %error,
                        "failed to close query iterator"
                    );
                }
            }
        }

        if summary.total() > 0 {
            debug!(
                chain_id = %self.chain_id(),
                tx_id = %self.tx_id(),
                closed = summary.closed,
                failed = summary.failed,
                "closed query iterators"
            );
        }
        summary
    }

    /// Number of registered iterators
    pub fn query_iterator_count(&self) -> usize {
        self.queries.lock().iterators.len()
    }

    /// Number of pending query result buffers
    pub fn pending_query_result_count(&self) -> usize {
        self.queries.lock().pending.len()
    }
}

impl fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("TransactionContext");
        d.field("id", &self.id);
        // the lock is not reentrant; a handler may be formatting from inside it
        match self.queries.try_lock() {
            Some(queries) => {
                d.field("query_iterators", &queries.iterators.len());
                d.field("pending_query_results", &queries.pending.len());
            }
            None => {
                d.field("queries", &format_args!("<locked>"));
            }
        }
        d.field("response_sent", &self.response_notifier.is_sent())
            .field("tx_simulator", &self.tx_simulator)
            .field("history_query_executor", &self.history_query_executor)
            .finish()
    }
}
