//! In-memory deployment state, keyed by client transaction hash.
//!
//! Records are never evicted; the store lives as long as the process.

use super::entities::{DeploymentPhase, DeploymentRecord};
use super::tron::{SubmissionId, TronAddress};
use super::types::{Address, Bytes, Hash};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DeploymentStore {
    records: HashMap<Hash, DeploymentRecord>,
    by_predicted: HashMap<Address, Hash>,
}

impl DeploymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record for `record.tx_hash`, replacing any earlier one.
    pub fn create_record(&mut self, record: DeploymentRecord) {
        if let Some(predicted) = record.predicted_address {
            self.by_predicted.insert(predicted, record.tx_hash);
        }
        self.records.insert(record.tx_hash, record);
    }

    /// Insert `record` unless a record that has not failed already holds its
    /// hash. Returns whether the record was inserted.
    pub fn claim(&mut self, record: DeploymentRecord) -> bool {
        let live = self
            .records
            .get(&record.tx_hash)
            .is_some_and(|existing| existing.phase != DeploymentPhase::Failed);
        if live {
            return false;
        }
        self.create_record(record);
        true
    }

    pub fn get(&self, tx_hash: &Hash) -> Option<&DeploymentRecord> {
        self.records.get(tx_hash)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn set_submission_id(&mut self, tx_hash: &Hash, id: SubmissionId) -> bool {
        self.update(tx_hash, |record| {
            record.submission_id = Some(id);
            if record.phase == DeploymentPhase::Submitted {
                record.phase = DeploymentPhase::AwaitingConfirmation;
            }
        })
    }

    /// Associate a predicted address with a record, both directions.
    pub fn set_predicted_address(&mut self, tx_hash: &Hash, predicted: Address) -> bool {
        let updated = self.update(tx_hash, |record| record.predicted_address = Some(predicted));
        if updated {
            self.by_predicted.insert(predicted, *tx_hash);
        }
        updated
    }

    /// Record holding `predicted` as its predicted address.
    pub fn find_by_predicted(&self, predicted: &Address) -> Option<&DeploymentRecord> {
        self.by_predicted
            .get(predicted)
            .and_then(|hash| self.records.get(hash))
    }

    pub fn set_confirmed_address(&mut self, tx_hash: &Hash, confirmed: TronAddress) -> bool {
        self.update(tx_hash, |record| {
            record.confirmed_address = Some(confirmed);
            if record.phase == DeploymentPhase::AwaitingConfirmation {
                record.phase = DeploymentPhase::AwaitingCode;
            }
        })
    }

    /// Confirmed target-chain address behind a predicted address.
    pub fn confirmed_for(&self, predicted: &Address) -> Option<TronAddress> {
        self.find_by_predicted(predicted)
            .and_then(|record| record.confirmed_address)
    }

    /// Cache code for a predicted address. An empty value never replaces a
    /// non-empty one; returns whether the cache changed.
    pub fn set_cached_bytecode(&mut self, predicted: &Address, code: Bytes) -> bool {
        let Some(hash) = self.by_predicted.get(predicted).copied() else {
            return false;
        };
        let Some(record) = self.records.get_mut(&hash) else {
            return false;
        };
        let has_code = record.cached_code.as_ref().is_some_and(|c| !c.is_empty());
        if has_code && code.is_empty() {
            return false;
        }
        record.cached_code = Some(code);
        true
    }

    /// Non-empty cached code for a predicted address.
    pub fn cached_bytecode(&self, predicted: &Address) -> Option<&Bytes> {
        self.find_by_predicted(predicted)
            .and_then(|record| record.cached_code.as_ref())
            .filter(|code| !code.is_empty())
    }

    /// Bump the poll counter, returning the new count.
    pub fn increment_poll_attempts(&mut self, tx_hash: &Hash) -> Option<u32> {
        let record = self.records.get_mut(tx_hash)?;
        record.poll_attempts = record.poll_attempts.saturating_add(1);
        Some(record.poll_attempts)
    }

    pub fn set_block_number(&mut self, tx_hash: &Hash, block: u64) -> bool {
        self.update(tx_hash, |record| record.block_number = Some(block))
    }

    /// Move a record to `phase`. Terminal phases are final.
    pub fn set_phase(&mut self, tx_hash: &Hash, phase: DeploymentPhase) -> bool {
        self.update(tx_hash, |record| {
            if !record.phase.is_terminal() {
                record.phase = phase;
            }
        })
    }

    fn update(&mut self, tx_hash: &Hash, apply: impl FnOnce(&mut DeploymentRecord)) -> bool {
        match self.records.get_mut(tx_hash) {
            Some(record) => {
                apply(record);
                true
            }
            None => false,
        }
    }
}
