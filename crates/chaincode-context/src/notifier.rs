//! One-shot delivery of a transaction's terminal response
//!
//! The message loop fills the slot once when the chaincode reports completion;
//! the invoking caller claims it once. A second send fails fast instead of
//! blocking, and a closed slot wakes any waiter with an error.
//!
//! ## Lock Usage
//!
//! Both halves sit behind `parking_lot::Mutex` so the notifier can be shared
//! through an `Arc`. They only guard a `take()` or a non-blocking `send` and
//! are never held across `.await`.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

use crate::error::{Result, TransactionContextError};
use crate::message::ChaincodeMessage;

#[derive(Debug)]
enum SenderSlot {
    Open(oneshot::Sender<ChaincodeMessage>),
    Sent,
    Closed,
}

/// Single-producer, single-consumer response slot
#[derive(Debug)]
pub struct ResponseNotifier {
    sender: Mutex<SenderSlot>,
    receiver: Mutex<Option<oneshot::Receiver<ChaincodeMessage>>>,
}

impl ResponseNotifier {
    /// Create an empty slot
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            sender: Mutex::new(SenderSlot::Open(tx)),
            receiver: Mutex::new(Some(rx)),
        }
    }

    /// Deliver the terminal response
    ///
    /// Fails with `ResponseAlreadySent` if a response was already delivered,
    /// and with `ResponseReceiverDropped` if the slot was closed or the
    /// waiter went away.
    pub fn notify(&self, message: ChaincodeMessage) -> Result<()> {
        let mut slot = self.sender.lock();
        match std::mem::replace(&mut *slot, SenderSlot::Closed) {
            SenderSlot::Open(sender) => {
                // slot stays closed when the waiter is gone
                sender
                    .send(message)
                    .map_err(|_| TransactionContextError::ResponseReceiverDropped)?;
                *slot = SenderSlot::Sent;
                Ok(())
            }
            SenderSlot::Sent => {
                *slot = SenderSlot::Sent;
                warn!(
                    tx_id = %message.tx_id,
                    channel_id = %message.channel_id,
                    "dropping duplicate response"
                );
                Err(TransactionContextError::ResponseAlreadySent)
            }
            SenderSlot::Closed => Err(TransactionContextError::ResponseReceiverDropped),
        }
    }

    /// Wait for the terminal response
    ///
    /// Only one caller may wait; later callers get `ResponseAlreadyClaimed`.
    pub async fn wait(&self) -> Result<ChaincodeMessage> {
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or(TransactionContextError::ResponseAlreadyClaimed)?;

        receiver
            .await
            .map_err(|_| TransactionContextError::ResponseSenderDropped)
    }

    /// Wait for the terminal response for at most `timeout`
    ///
    /// The slot is claimed even when the wait times out.
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<ChaincodeMessage> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| TransactionContextError::ResponseTimeout { timeout })?
    }

    /// Close the producing side without a response
    ///
    /// A pending waiter wakes with `ResponseSenderDropped`. Closing after a
    /// response was sent has no effect.
    pub fn close(&self) {
        let mut slot = self.sender.lock();
        if matches!(*slot, SenderSlot::Open(_)) {
            *slot = SenderSlot::Closed;
        }
    }

    /// Whether a response has been delivered
    pub fn is_sent(&self) -> bool {
        matches!(*self.sender.lock(), SenderSlot::Sent)
    }
}

impl Default for ResponseNotifier {
    fn default() -> Self {
        Self::new()
    }
}
