//! # Reconciliation Engine
//!
//! Walks a deployment record from submission to "client sees a receipt and
//! non-empty code at the predicted address":
//!
//! ```text
//! Submitted -> AwaitingConfirmation -> AwaitingCode -> Resolved
//!      \______________\____________________\________-> Failed
//! ```
//!
//! Each step is driven by a client poll. The store lock is never held across
//! a node call: read the record, release, query, then re-lock and write.

use crate::domain::config::ReconciliationConfig;
use crate::domain::{
    Address, BridgeError, Bytes, DeploymentPhase, DeploymentRecord, DeploymentStore, Hash,
};
use crate::metrics::BridgeMetrics;
use crate::ports::TargetChainClient;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One-byte STOP program served when genuine code never became retrievable.
pub const PLACEHOLDER_CODE: [u8; 1] = [0x00];

/// What a receipt poll found.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptState {
    /// The hash was never submitted through this gateway.
    Unknown,
    /// Not yet available; the client should poll again.
    Pending,
    /// Final outcome, with the record as it stands.
    Settled {
        record: Box<DeploymentRecord>,
        success: bool,
    },
}

/// What a code query found.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeLookup {
    /// The address is a predicted creation address; empty while unresolved.
    Known(Bytes),
    /// Not one of ours.
    Unrelated,
}

enum CodeProgress {
    Resolved,
    Pending,
}

pub struct Reconciler {
    store: Arc<Mutex<DeploymentStore>>,
    chain: Arc<dyn TargetChainClient>,
    settings: ReconciliationConfig,
    metrics: Arc<BridgeMetrics>,
}

impl Reconciler {
    pub fn new(
        store: Arc<Mutex<DeploymentStore>>,
        chain: Arc<dyn TargetChainClient>,
        settings: ReconciliationConfig,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            store,
            chain,
            settings,
            metrics,
        }
    }

    /// Advance the record for `tx_hash` as far as the node allows.
    pub async fn receipt(&self, tx_hash: &Hash) -> Result<ReceiptState, BridgeError> {
        let Some(record) = self.snapshot(tx_hash) else {
            return Ok(ReceiptState::Unknown);
        };

        match record.phase {
            DeploymentPhase::Failed => return Ok(settled(record, false)),
            DeploymentPhase::Resolved { .. } => return Ok(settled(record, true)),
            DeploymentPhase::Submitted => return Ok(ReceiptState::Pending),
            DeploymentPhase::AwaitingConfirmation => {
                if !self.confirm(&record).await? {
                    return Ok(ReceiptState::Pending);
                }
            }
            DeploymentPhase::AwaitingCode => {}
        }

        let record = self.snapshot(tx_hash).ok_or_else(|| lost(tx_hash))?;
        match record.phase {
            DeploymentPhase::Failed => Ok(settled(record, false)),
            DeploymentPhase::Resolved { .. } => Ok(settled(record, true)),
            DeploymentPhase::AwaitingCode => match self.advance_code(&record).await? {
                CodeProgress::Resolved => {
                    let record = self.snapshot(tx_hash).ok_or_else(|| lost(tx_hash))?;
                    Ok(settled(record, true))
                }
                CodeProgress::Pending => Ok(ReceiptState::Pending),
            },
            _ => Ok(ReceiptState::Pending),
        }
    }

    /// Code at `address`, self-healing a pending deployment inline.
    pub async fn code_at(&self, address: &Address) -> Result<CodeLookup, BridgeError> {
        let tx_hash = {
            let store = self.store.lock();
            if let Some(code) = store.cached_bytecode(address) {
                return Ok(CodeLookup::Known(code.clone()));
            }
            match store.find_by_predicted(address) {
                Some(record) => record.tx_hash,
                None => return Ok(CodeLookup::Unrelated),
            }
        };

        self.receipt(&tx_hash).await?;

        let store = self.store.lock();
        Ok(CodeLookup::Known(
            store.cached_bytecode(address).cloned().unwrap_or_default(),
        ))
    }

    /// Query transaction info. Returns whether the record moved past
    /// `AwaitingConfirmation`.
    async fn confirm(&self, record: &DeploymentRecord) -> Result<bool, BridgeError> {
        let Some(id) = record.submission_id.clone() else {
            return Ok(false);
        };
        let Some(info) = self.chain.transaction_info(&id).await? else {
            debug!(tx_hash = ?record.tx_hash, submission = %id, "Transaction info not yet available");
            return Ok(false);
        };

        let mut store = self.store.lock();
        if let Some(block) = info.block_number {
            store.set_block_number(&record.tx_hash, block);
        }

        if !info.succeeded() {
            warn!(
                tx_hash = ?record.tx_hash,
                submission = %id,
                reason = %info.failure_reason().unwrap_or_default(),
                "Target chain reports failure"
            );
            store.set_phase(&record.tx_hash, DeploymentPhase::Failed);
            self.metrics.record_failed();
            return Ok(true);
        }

        if !record.is_creation() {
            store.set_phase(&record.tx_hash, DeploymentPhase::Resolved { placeholder: false });
            return Ok(true);
        }

        match info.created_contract() {
            Some(confirmed) => {
                info!(tx_hash = ?record.tx_hash, contract = %confirmed, "Deployment confirmed");
                store.set_confirmed_address(&record.tx_hash, confirmed);
                Ok(true)
            }
            None => {
                debug!(tx_hash = ?record.tx_hash, "Confirmed without a contract address yet");
                Ok(false)
            }
        }
    }

    /// One bounded code-retrieval attempt; falls back to placeholder code
    /// once the bound is reached, if enabled.
    async fn advance_code(&self, record: &DeploymentRecord) -> Result<CodeProgress, BridgeError> {
        let (Some(predicted), Some(confirmed)) = (record.predicted_address, record.confirmed_address)
        else {
            return Ok(CodeProgress::Pending);
        };

        let attempts = self
            .store
            .lock()
            .increment_poll_attempts(&record.tx_hash)
            .unwrap_or(0);
        let code = self.chain.contract_code(&confirmed).await?;

        let mut store = self.store.lock();
        if store.cached_bytecode(&predicted).is_some() {
            return Ok(CodeProgress::Resolved);
        }

        if !code.is_empty() {
            store.set_cached_bytecode(&predicted, code);
            store.set_phase(&record.tx_hash, DeploymentPhase::Resolved { placeholder: false });
            self.metrics.record_resolved();
            info!(predicted = ?predicted, contract = %confirmed, attempts, "Deployment resolved");
            return Ok(CodeProgress::Resolved);
        }

        if attempts < self.settings.max_code_attempts || !self.settings.placeholder_fallback {
            debug!(predicted = ?predicted, attempts, "Contract code not yet retrievable");
            return Ok(CodeProgress::Pending);
        }

        store.set_cached_bytecode(&predicted, Bytes::new(PLACEHOLDER_CODE.to_vec()));
        store.set_phase(&record.tx_hash, DeploymentPhase::Resolved { placeholder: true });
        self.metrics.record_placeholder();
        warn!(
            predicted = ?predicted,
            contract = %confirmed,
            attempts,
            "Contract code never became retrievable; serving PLACEHOLDER code 0x00"
        );
        Ok(CodeProgress::Resolved)
    }

    fn snapshot(&self, tx_hash: &Hash) -> Option<DeploymentRecord> {
        self.store.lock().get(tx_hash).cloned()
    }
}

fn settled(record: DeploymentRecord, success: bool) -> ReceiptState {
    ReceiptState::Settled {
        record: Box::new(record),
        success,
    }
}

fn lost(tx_hash: &Hash) -> BridgeError {
    BridgeError::TargetChain(format!("record {:?} vanished during reconciliation", tx_hash))
}
