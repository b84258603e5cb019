//! # Entities
//!
//! The signed transaction a client hands us, the compiled artifacts we match
//! it against, and the per-transaction record the bridge keeps afterwards.

use super::abi::{constructor_inputs, AbiType};
use super::errors::BridgeError;
use super::tron::{SubmissionId, TronAddress};
use super::types::{Address, Bytes, Hash, U256};
use serde_json::Value;
use std::path::PathBuf;

/// Envelope type of a decoded transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxType {
    Legacy,
    AccessList, // EIP-2930
    DynamicFee, // EIP-1559
}

impl TxType {
    /// The `type` field of transaction and receipt objects.
    pub fn code(&self) -> u8 {
        match self {
            TxType::Legacy => 0,
            TxType::AccessList => 1,
            TxType::DynamicFee => 2,
        }
    }
}

/// Creation (no destination) or invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Creation,
    Invocation(Address),
}

/// A client-signed transaction after decoding and sender recovery.
///
/// Lives for the duration of one `eth_sendRawTransaction` call.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub hash: Hash,
    pub sender: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub value: U256,
    pub payload: Vec<u8>,
    pub chain_id: Option<u64>,
    pub tx_type: TxType,
}

impl SignedTransaction {
    pub fn kind(&self) -> TxKind {
        match self.to {
            Some(to) => TxKind::Invocation(to),
            None => TxKind::Creation,
        }
    }
}

/// A compiled contract known to the artifact repository.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorArtifact {
    pub name: String,
    /// File the artifact was read from.
    pub source: PathBuf,
    /// Full creation bytecode, metadata included.
    pub bytecode: Vec<u8>,
    /// JSON ABI entry array.
    pub abi: Value,
}

impl ConstructorArtifact {
    pub fn constructor_inputs(&self) -> Result<Vec<AbiType>, BridgeError> {
        constructor_inputs(&self.abi)
    }
}

/// Reconciliation state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentPhase {
    /// Record exists, submission not yet acknowledged by the node.
    Submitted,
    /// Broadcast accepted; waiting for transaction info.
    AwaitingConfirmation,
    /// Contract address known; waiting for its code to be retrievable.
    AwaitingCode,
    /// Receipt can be served. `placeholder` marks the degraded fallback.
    Resolved { placeholder: bool },
    /// Target chain reported failure, or the broadcast was rejected.
    Failed,
}

impl DeploymentPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentPhase::Resolved { .. } | DeploymentPhase::Failed)
    }
}

/// Translation state for one client-visible transaction hash.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRecord {
    pub tx_hash: Hash,
    pub sender: Address,
    /// Destination the client signed for (`None` for creations).
    pub recipient: Option<Address>,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub tx_type: TxType,
    pub payload: Bytes,
    pub submission_id: Option<SubmissionId>,
    /// Creation address the client derived from (sender, nonce).
    pub predicted_address: Option<Address>,
    pub confirmed_address: Option<TronAddress>,
    pub cached_code: Option<Bytes>,
    pub poll_attempts: u32,
    pub block_number: Option<u64>,
    pub phase: DeploymentPhase,
}

impl DeploymentRecord {
    /// Fresh record for a just-decoded transaction.
    pub fn new(tx: &SignedTransaction) -> Self {
        Self {
            tx_hash: tx.hash,
            sender: tx.sender,
            recipient: tx.to,
            nonce: tx.nonce,
            gas_limit: tx.gas_limit,
            gas_price: tx.gas_price,
            tx_type: tx.tx_type,
            payload: Bytes::new(tx.payload.clone()),
            submission_id: None,
            predicted_address: None,
            confirmed_address: None,
            cached_code: None,
            poll_attempts: 0,
            block_number: None,
            phase: DeploymentPhase::Submitted,
        }
    }

    pub fn is_creation(&self) -> bool {
        self.recipient.is_none()
    }
}
