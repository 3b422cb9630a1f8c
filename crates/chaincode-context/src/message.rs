//! Protocol value types carried by a transaction context
//!
//! These are opaque to the registry. Proposals are kept for authorization
//! checks made by collaborators, and `ChaincodeMessage` is the terminal
//! response handed from the message loop to the invoking caller.

use serde::{Deserialize, Serialize};

/// Client proposal together with the creator's signature over it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignedProposal {
    /// Serialized `Proposal`
    pub proposal_bytes: Vec<u8>,
    /// Signature over `proposal_bytes`
    pub signature: Vec<u8>,
}

/// Client request to invoke a chaincode
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Proposal {
    /// Serialized header identifying channel, creator and transaction
    pub header: Vec<u8>,
    /// Serialized invocation payload
    pub payload: Vec<u8>,
    /// Optional chaincode-specific extension
    pub extension: Vec<u8>,
}

/// Kind of message exchanged with the chaincode process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChaincodeMessageType {
    /// Invocation finished successfully
    Completed,
    /// Invocation failed
    Error,
}

/// Message delivered to the caller waiting on a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeMessage {
    /// Message kind
    pub message_type: ChaincodeMessageType,
    /// Encoded payload
    pub payload: Vec<u8>,
    /// Transaction the message belongs to
    pub tx_id: String,
    /// Chain the transaction targets
    pub channel_id: String,
}

impl ChaincodeMessage {
    /// Create a message of the given kind for a transaction
    pub fn new(
        message_type: ChaincodeMessageType,
        channel_id: impl Into<String>,
        tx_id: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            message_type,
            payload: payload.into(),
            tx_id: tx_id.into(),
            channel_id: channel_id.into(),
        }
    }

    /// Create a `Completed` message
    pub fn completed(
        channel_id: impl Into<String>,
        tx_id: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(ChaincodeMessageType::Completed, channel_id, tx_id, payload)
    }

    /// Create an `Error` message carrying a description
    pub fn error(
        channel_id: impl Into<String>,
        tx_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let message: String = message.into();
        Self::new(
            ChaincodeMessageType::Error,
            channel_id,
            tx_id,
            message.into_bytes(),
        )
    }
}
