//! Registry of active transaction contexts for one chaincode session
//!
//! The registry is the single source of truth mapping a transaction identity
//! to its live execution state. The dispatcher creates a context when an
//! invocation begins, message handlers look it up while routing follow-up
//! query and response messages, and the dispatcher deletes it once the
//! invocation terminates. When the session ends, `close` sweeps every
//! remaining context and closes its open iterators.
//!
//! The registry is an explicitly owned object: the session constructs it and
//! shares it through an `Arc` with every component that routes messages.
//!
//! ## Lock Usage
//!
//! One `parking_lot::Mutex` guards the map. Hold time is constant for
//! `create`, `get` and `delete`; `close` holds it across the whole sweep and
//! may block on iterator `close` calls, so callers needing bounded shutdown
//! latency should wrap the entire call in a timeout.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::TransactionContextsConfig;
use crate::context::{CloseSummary, TransactionContext};
use crate::error::{Result, TransactionContextError};
use crate::id::TransactionContextId;
use crate::message::{Proposal, SignedProposal};
use crate::resources::ExecutionResources;

/// Active transaction contexts for a chaincode session
#[derive(Debug)]
pub struct TransactionContexts {
    contexts: Mutex<HashMap<TransactionContextId, Arc<TransactionContext>>>,
    config: TransactionContextsConfig,
}

impl TransactionContexts {
    /// Create an empty registry with default configuration
    pub fn new() -> Self {
        Self::with_config(TransactionContextsConfig::default())
    }

    /// Create an empty registry with the given configuration
    pub fn with_config(config: TransactionContextsConfig) -> Self {
        Self {
            contexts: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Configuration the registry was built with
    pub fn config(&self) -> &TransactionContextsConfig {
        &self.config
    }

    /// Create the context for a chain and transaction
    ///
    /// Fails with `DuplicateTransactionContext` when one already exists; the
    /// existing context is left untouched.
    pub fn create(
        &self,
        resources: ExecutionResources,
        chain_id: &str,
        tx_id: &str,
        signed_proposal: Option<SignedProposal>,
        proposal: Option<Proposal>,
    ) -> Result<Arc<TransactionContext>> {
        let mut contexts = self.contexts.lock();

        match contexts.entry(TransactionContextId::new(chain_id, tx_id)) {
            Entry::Occupied(_) => {
                warn!(chain_id, tx_id, "duplicate transaction context");
                Err(TransactionContextError::duplicate(chain_id, tx_id))
            }
            Entry::Vacant(entry) => {
                let txctx = Arc::new(TransactionContext::new(
                    entry.key().clone(),
                    resources,
                    signed_proposal,
                    proposal,
                    self.config.execute_timeout(),
                ));
                entry.insert(Arc::clone(&txctx));
                debug!(chain_id, tx_id, "created transaction context");
                Ok(txctx)
            }
        }
    }

    /// Look up the context for a chain and transaction
    pub fn get(&self, chain_id: &str, tx_id: &str) -> Option<Arc<TransactionContext>> {
        let id = TransactionContextId::new(chain_id, tx_id);
        self.contexts.lock().get(&id).cloned()
    }

    /// Remove the context for a chain and transaction
    ///
    /// Missing entries are ignored. The removed context's response slot is
    /// closed, and its iterators are closed as well unless the registry was
    /// configured otherwise. Both happen after the registry lock is released.
    pub fn delete(&self, chain_id: &str, tx_id: &str) -> Option<Arc<TransactionContext>> {
        let id = TransactionContextId::new(chain_id, tx_id);
        let removed = self.contexts.lock().remove(&id)?;

        removed.close_response();
        if self.config.close_iterators_on_delete {
            removed.close_query_iterators();
        }
        debug!(chain_id, tx_id, "deleted transaction context");
        Some(removed)
    }

    /// Whether a context exists for a chain and transaction
    pub fn contains(&self, chain_id: &str, tx_id: &str) -> bool {
        let id = TransactionContextId::new(chain_id, tx_id);
        self.contexts.lock().contains_key(&id)
    }

    /// Number of registered contexts
    pub fn len(&self) -> usize {
        self.contexts.lock().len()
    }

    /// Whether no contexts are registered
    pub fn is_empty(&self) -> bool {
        self.contexts.lock().is_empty()
    }

    /// Close the query iterators of every registered context
    ///
    /// Contexts stay registered; the registry is expected to be discarded
    /// afterwards. Iterator failures are logged and counted, never returned.
    pub fn close(&self) -> CloseSummary {
        let contexts = self.contexts.lock();

        let mut summary = CloseSummary::default();
        for txctx in contexts.values() {
            summary.merge(txctx.close_query_iterators());
        }

        debug!(
            contexts = contexts.len(),
            closed = summary.closed,
            failed = summary.failed,
            "closed transaction contexts"
        );
        summary
    }
}

impl Default for TransactionContexts {
    fn default() -> Self {
        Self::new()
    }
}
