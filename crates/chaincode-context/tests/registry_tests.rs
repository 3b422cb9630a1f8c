//! Integration tests for the transaction context registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use assert_matches::assert_matches;
use chaincode_context::{
    ChaincodeMessage, ExecutionResources, HistoryQueryExecutor, LedgerError, QueryResultBytes,
    ResultsIterator, TransactionContextError, TransactionContexts, TransactionContextsConfig,
    TxSimulator,
};

#[derive(Debug)]
struct FakeSimulator {
    tx_id: String,
}

impl TxSimulator for FakeSimulator {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }
}

#[derive(Debug)]
struct FakeHistory {
    chain_id: String,
}

impl HistoryQueryExecutor for FakeHistory {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }
}

/// Iterator that counts `close` calls and can be told to fail them
struct CountingIterator {
    closes: Arc<AtomicUsize>,
    fail_close: bool,
}

impl CountingIterator {
    fn boxed(closes: &Arc<AtomicUsize>, fail_close: bool) -> Box<dyn ResultsIterator> {
        Box::new(Self {
            closes: Arc::clone(closes),
            fail_close,
        })
    }
}

impl ResultsIterator for CountingIterator {
    fn next(&mut self) -> Result<Option<QueryResultBytes>, LedgerError> {
        Ok(None)
    }

    fn close(&mut self) -> Result<(), LedgerError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            Err(LedgerError::new("iterator already released"))
        } else {
            Ok(())
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("chaincode_context=debug")
        .with_test_writer()
        .try_init();
}

fn registry() -> TransactionContexts {
    TransactionContexts::with_config(TransactionContextsConfig::for_testing())
}

#[test]
fn close_invokes_every_iterator_once_despite_failure() {
    init_tracing();
    let contexts = registry();
    let counters: Vec<_> = (0..4).map(|_| Arc::new(AtomicUsize::new(0))).collect();

    let chain_a = contexts
        .create(ExecutionResources::new(), "chainA", "tx1", None, None)
        .unwrap();
    let chain_b = contexts
        .create(ExecutionResources::new(), "chainB", "tx2", None, None)
        .unwrap();

    chain_a.initialize_query_context("a-1", CountingIterator::boxed(&counters[0], true));
    chain_a.initialize_query_context("a-2", CountingIterator::boxed(&counters[1], false));
    chain_b.initialize_query_context("b-1", CountingIterator::boxed(&counters[2], false));
    chain_b.initialize_query_context("b-2", CountingIterator::boxed(&counters[3], false));

    let summary = contexts.close();
    assert_eq!(summary.closed, 3);
    assert_eq!(summary.failed, 1);
    for counter in &counters {
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    // contexts remain registered after the sweep
    assert_eq!(contexts.len(), 2);
    assert!(contexts.get("chainA", "tx1").is_some());
}

#[test]
fn distinct_keys_are_independent() {
    let contexts = registry();
    let a = contexts
        .create(ExecutionResources::new(), "chainA", "tx1", None, None)
        .unwrap();
    let b = contexts
        .create(ExecutionResources::new(), "chainB", "tx2", None, None)
        .unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &contexts.get("chainA", "tx1").unwrap()));
    assert!(Arc::ptr_eq(&b, &contexts.get("chainB", "tx2").unwrap()));

    contexts.delete("chainA", "tx1");
    assert!(contexts.get("chainA", "tx1").is_none());
    assert!(Arc::ptr_eq(&b, &contexts.get("chainB", "tx2").unwrap()));
}

#[test]
fn get_and_delete_of_unknown_keys_are_empty() {
    let contexts = registry();
    assert!(contexts.get("mychannel", "never").is_none());

    contexts.delete("mychannel", "never");
    contexts.delete("mychannel", "never");
    assert!(contexts.is_empty());

    contexts
        .create(ExecutionResources::new(), "mychannel", "tx001", None, None)
        .unwrap();
    contexts.delete("mychannel", "tx001");
    assert!(contexts.get("mychannel", "tx001").is_none());

    // a deleted key can be created again
    assert!(contexts
        .create(ExecutionResources::new(), "mychannel", "tx001", None, None)
        .is_ok());
}

#[test]
fn concurrent_create_admits_exactly_one() {
    const THREADS: usize = 16;
    let contexts = Arc::new(registry());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let contexts = Arc::clone(&contexts);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                contexts.create(ExecutionResources::new(), "mychannel", "tx001", None, None)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_duplicate()))
        .count();

    assert_eq!(winners.len(), 1);
    assert_eq!(duplicates, THREADS - 1);
    assert_eq!(contexts.len(), 1);
    assert!(Arc::ptr_eq(
        winners[0],
        &contexts.get("mychannel", "tx001").unwrap()
    ));
}

#[test]
fn concurrent_query_handlers_and_close_sweep_close_each_iterator_once() {
    const HANDLERS: usize = 8;
    const PER_HANDLER: usize = 25;
    let contexts = Arc::new(registry());
    let txctx = contexts
        .create(ExecutionResources::new(), "mychannel", "tx001", None, None)
        .unwrap();
    let closes = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(HANDLERS + 1));

    let handlers: Vec<_> = (0..HANDLERS)
        .map(|h| {
            let txctx = Arc::clone(&txctx);
            let closes = Arc::clone(&closes);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..PER_HANDLER {
                    let handle = format!("{h}-{i}");
                    txctx.initialize_query_context(
                        handle.clone(),
                        CountingIterator::boxed(&closes, false),
                    );
                    if i % 2 == 0 {
                        txctx.cleanup_query_context(&handle).unwrap();
                    }
                }
            })
        })
        .collect();

    let sweeper = {
        let contexts = Arc::clone(&contexts);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            contexts.close()
        })
    };

    for handler in handlers {
        handler.join().unwrap();
    }
    sweeper.join().unwrap();
    contexts.close();

    assert_eq!(txctx.query_iterator_count(), 0);
    assert_eq!(closes.load(Ordering::SeqCst), HANDLERS * PER_HANDLER);
}

#[test]
fn delete_closes_iterators_when_configured() {
    let contexts = registry();
    let closes = Arc::new(AtomicUsize::new(0));
    let txctx = contexts
        .create(ExecutionResources::new(), "mychannel", "tx001", None, None)
        .unwrap();
    txctx.initialize_query_context("q1", CountingIterator::boxed(&closes, false));
    txctx.initialize_query_context("q2", CountingIterator::boxed(&closes, true));

    contexts.delete("mychannel", "tx001");
    assert_eq!(closes.load(Ordering::SeqCst), 2);
    assert_eq!(txctx.query_iterator_count(), 0);
}

#[test]
fn delete_leaves_iterators_when_disabled() {
    let contexts = TransactionContexts::with_config(
        TransactionContextsConfig::for_testing().with_close_iterators_on_delete(false),
    );
    let closes = Arc::new(AtomicUsize::new(0));
    let txctx = contexts
        .create(ExecutionResources::new(), "mychannel", "tx001", None, None)
        .unwrap();
    txctx.initialize_query_context("q1", CountingIterator::boxed(&closes, false));

    let removed = contexts.delete("mychannel", "tx001").unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 0);
    assert_eq!(removed.query_iterator_count(), 1);

    assert_eq!(removed.close_query_iterators().closed, 1);
}

#[test]
fn collaborators_are_carried_when_present() {
    let contexts = registry();
    let simulator: Arc<dyn TxSimulator> = Arc::new(FakeSimulator {
        tx_id: "tx001".to_string(),
    });
    let history: Arc<dyn HistoryQueryExecutor> = Arc::new(FakeHistory {
        chain_id: "mychannel".to_string(),
    });

    let resources = ExecutionResources::new()
        .with_tx_simulator(Arc::clone(&simulator))
        .with_history_query_executor(Arc::clone(&history));
    let txctx = contexts
        .create(resources, "mychannel", "tx001", None, None)
        .unwrap();

    assert!(Arc::ptr_eq(txctx.tx_simulator().unwrap(), &simulator));
    assert_eq!(txctx.history_query_executor().unwrap().chain_id(), "mychannel");
}

#[test]
fn query_only_invocation_has_no_simulator() {
    let contexts = registry();
    let history: Arc<dyn HistoryQueryExecutor> = Arc::new(FakeHistory {
        chain_id: "mychannel".to_string(),
    });

    let txctx = contexts
        .create(
            ExecutionResources::new().with_history_query_executor(history),
            "mychannel",
            "query-1",
            None,
            None,
        )
        .unwrap();

    assert!(txctx.tx_simulator().is_none());
    assert!(txctx.history_query_executor().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn message_loop_delivers_response_to_invoker() {
    let contexts = Arc::new(registry());
    let txctx = contexts
        .create(ExecutionResources::new(), "mychannel", "tx001", None, None)
        .unwrap();

    let loop_contexts = Arc::clone(&contexts);
    let message_loop = tokio::spawn(async move {
        let txctx = loop_contexts
            .get("mychannel", "tx001")
            .ok_or(TransactionContextError::ResponseReceiverDropped)?;
        txctx.notify(ChaincodeMessage::completed("mychannel", "tx001", b"ok".to_vec()))?;
        txctx.notify(ChaincodeMessage::error("mychannel", "tx001", "late"))
    });

    let response = txctx
        .wait_for_response_timeout(Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(response.payload, b"ok");
    assert_matches!(
        message_loop.await.unwrap(),
        Err(TransactionContextError::ResponseAlreadySent)
    );

    contexts.delete("mychannel", "tx001");
    assert!(contexts.is_empty());
}
