//! # Chaincode Context
//!
//! **Purpose**: Track the lifecycle of in-flight chaincode transactions.
//!
//! Each transaction executing in the chaincode host, identified by its chain
//! and transaction identifiers, owns a `TransactionContext` holding the
//! ledger handles it was started with, the query iterators it has opened,
//! buffered paginated query results, and the one-shot slot its terminal
//! response is delivered through. `TransactionContexts` maps transaction
//! identities to those records with create-once semantics and guarantees
//! that every registered iterator is closed at teardown.
//!
//! ## What's NOT in this crate
//!
//! - The ledger, its simulators and history database (see [`ledger`] for the
//!   interfaces consumed here)
//! - Query execution and message serialization
//! - Proposal and signature validation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chaincode_context::{ChaincodeMessage, ExecutionResources, TransactionContexts};
//!
//! let contexts = Arc::new(TransactionContexts::new());
//! let resources = ExecutionResources::new().with_tx_simulator(simulator);
//! let txctx = contexts.create(resources, "mychannel", "tx001", Some(signed), Some(proposal))?;
//!
//! // message loop, on COMPLETED:
//! contexts
//!     .get("mychannel", "tx001")
//!     .map(|txctx| txctx.notify(message));
//!
//! let response = txctx.wait_for_response().await;
//! contexts.delete("mychannel", "tx001");
//! ```

#![forbid(unsafe_code)]

/// Registry configuration
pub mod config;

/// Per-transaction execution state
pub mod context;

/// Error types
pub mod error;

/// Composite transaction context key
pub mod id;

/// Ledger collaborator interfaces
pub mod ledger;

/// Protocol value types
pub mod message;

/// One-shot response delivery
pub mod notifier;

/// Buffered paginated query results
pub mod pending;

/// Transaction context registry
pub mod registry;

/// Ledger handles supplied at creation
pub mod resources;

pub use config::TransactionContextsConfig;
pub use context::{CloseSummary, TransactionContext};
pub use error::{ConfigError, Result, TransactionContextError};
pub use id::TransactionContextId;
pub use ledger::{HistoryQueryExecutor, LedgerError, QueryResultBytes, ResultsIterator, TxSimulator};
pub use message::{ChaincodeMessage, ChaincodeMessageType, Proposal, SignedProposal};
pub use notifier::ResponseNotifier;
pub use pending::PendingQueryResult;
pub use registry::TransactionContexts;
pub use resources::ExecutionResources;
