//! # Outbound Ports
//!
//! Capabilities the bridge consumes: the Tron node, the pass-through node
//! and the compiled-artifact tree. Each has an in-memory implementation for
//! tests and dry runs.

use crate::domain::{
    BridgeError, Bytes, ConstructorArtifact, DeployContract, SubmissionId, TransactionInfo,
    TriggerSmartContract, TronAddress, TronTransaction,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Target-chain node - outbound port.
///
/// "Not found yet" is `Ok(None)` / empty bytes; `Err` is reserved for faults.
#[async_trait]
pub trait TargetChainClient: Send + Sync {
    /// Build an unsigned creation transaction.
    async fn deploy_contract(
        &self,
        request: &DeployContract,
    ) -> Result<TronTransaction, BridgeError>;

    /// Build an unsigned contract call.
    async fn trigger_contract(
        &self,
        request: &TriggerSmartContract,
    ) -> Result<TronTransaction, BridgeError>;

    /// Submit a signed transaction. Refusal is `BroadcastRejected`.
    async fn broadcast(&self, transaction: &TronTransaction) -> Result<SubmissionId, BridgeError>;

    /// Confirmed info for a submission, `None` while unconfirmed.
    async fn transaction_info(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<TransactionInfo>, BridgeError>;

    /// Runtime code at an address; empty while not retrievable.
    async fn contract_code(&self, address: &TronAddress) -> Result<Bytes, BridgeError>;
}

/// Origin-protocol node used for methods the bridge does not translate.
#[async_trait]
pub trait UpstreamForwarder: Send + Sync {
    /// Send `method` with `params` and `id`, returning the full JSON-RPC
    /// response object untouched.
    async fn forward(&self, method: &str, params: Value, id: Value) -> Result<Value, BridgeError>;
}

/// Compiled-contract artifacts.
pub trait ArtifactRepository: Send + Sync {
    /// Every artifact, in deterministic traversal order, reflecting the
    /// current state of the source.
    fn artifacts(&self) -> Result<Vec<ConstructorArtifact>, BridgeError>;
}

// =============================================================================
// In-memory implementations
// =============================================================================

#[derive(Default)]
struct MockChainState {
    next_nonce: u64,
    deployments: Vec<DeployContract>,
    triggers: Vec<TriggerSmartContract>,
    broadcasts: Vec<TronTransaction>,
    infos: HashMap<String, TransactionInfo>,
    codes: HashMap<TronAddress, Bytes>,
    code_queries: u32,
    rejection: Option<(String, String)>,
    faulty: bool,
}

/// Scriptable Tron node.
#[derive(Default)]
pub struct MockTargetChain {
    state: Mutex<MockChainState>,
}

impl MockTargetChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `gettransactioninfobyid` answer for `id`.
    pub fn confirm(&self, id: &SubmissionId, info: TransactionInfo) {
        self.state.lock().infos.insert(id.0.clone(), info);
    }

    /// Make code retrievable at `address`.
    pub fn set_code(&self, address: TronAddress, code: Bytes) {
        self.state.lock().codes.insert(address, code);
    }

    /// Refuse every later broadcast with this code and message.
    pub fn reject_broadcasts(&self, code: &str, message: &str) {
        self.state.lock().rejection = Some((code.to_string(), message.to_string()));
    }

    /// Fail every query with a transport fault.
    pub fn set_faulty(&self, faulty: bool) {
        self.state.lock().faulty = faulty;
    }

    pub fn deployments(&self) -> Vec<DeployContract> {
        self.state.lock().deployments.clone()
    }

    pub fn triggers(&self) -> Vec<TriggerSmartContract> {
        self.state.lock().triggers.clone()
    }

    pub fn broadcasts(&self) -> Vec<TronTransaction> {
        self.state.lock().broadcasts.clone()
    }

    pub fn code_queries(&self) -> u32 {
        self.state.lock().code_queries
    }

    fn build(&self, body: Value) -> TronTransaction {
        let mut state = self.state.lock();
        state.next_nonce += 1;
        let raw = serde_json::to_vec(&json!({ "body": body, "n": state.next_nonce }))
            .unwrap_or_default();
        TronTransaction {
            tx_id: hex::encode(Sha256::digest(&raw)),
            raw_data: body,
            raw_data_hex: hex::encode(&raw),
            signature: Vec::new(),
            visible: false,
        }
    }

    fn check_fault(&self) -> Result<(), BridgeError> {
        if self.state.lock().faulty {
            return Err(BridgeError::TargetChain("mock node unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TargetChainClient for MockTargetChain {
    async fn deploy_contract(
        &self,
        request: &DeployContract,
    ) -> Result<TronTransaction, BridgeError> {
        self.check_fault()?;
        self.state.lock().deployments.push(request.clone());
        Ok(self.build(json!({ "deploy": request.name })))
    }

    async fn trigger_contract(
        &self,
        request: &TriggerSmartContract,
    ) -> Result<TronTransaction, BridgeError> {
        self.check_fault()?;
        self.state.lock().triggers.push(request.clone());
        Ok(self.build(json!({ "trigger": request.contract_address })))
    }

    async fn broadcast(&self, transaction: &TronTransaction) -> Result<SubmissionId, BridgeError> {
        self.check_fault()?;
        let mut state = self.state.lock();
        if let Some((code, message)) = &state.rejection {
            return Err(BridgeError::BroadcastRejected(format!("{}: {}", code, message)));
        }
        if transaction.signature.is_empty() {
            return Err(BridgeError::BroadcastRejected(
                "SIGERROR: missing signature".into(),
            ));
        }
        state.broadcasts.push(transaction.clone());
        Ok(SubmissionId(transaction.tx_id.clone()))
    }

    async fn transaction_info(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<TransactionInfo>, BridgeError> {
        self.check_fault()?;
        Ok(self.state.lock().infos.get(&id.0).cloned())
    }

    async fn contract_code(&self, address: &TronAddress) -> Result<Bytes, BridgeError> {
        self.check_fault()?;
        let mut state = self.state.lock();
        state.code_queries += 1;
        Ok(state.codes.get(address).cloned().unwrap_or_default())
    }
}

/// Recording upstream node with canned results per method.
#[derive(Default)]
pub struct MockUpstream {
    results: RwLock<HashMap<String, Value>>,
    calls: Mutex<Vec<(String, Value, Value)>>,
    failing: RwLock<bool>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method` with `result`.
    pub fn respond(&self, method: &str, result: Value) {
        self.results.write().insert(method.to_string(), result);
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.write() = failing;
    }

    /// Every `(method, params, id)` forwarded so far.
    pub fn calls(&self) -> Vec<(String, Value, Value)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl UpstreamForwarder for MockUpstream {
    async fn forward(&self, method: &str, params: Value, id: Value) -> Result<Value, BridgeError> {
        self.calls
            .lock()
            .push((method.to_string(), params, id.clone()));
        if *self.failing.read() {
            return Err(BridgeError::UpstreamFailure("connection refused".into()));
        }
        let result = self
            .results
            .read()
            .get(method)
            .cloned()
            .unwrap_or(Value::Null);
        Ok(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
    }
}

/// Fixed artifact list.
#[derive(Default)]
pub struct InMemoryArtifacts {
    artifacts: RwLock<Vec<ConstructorArtifact>>,
}

impl InMemoryArtifacts {
    pub fn new(artifacts: Vec<ConstructorArtifact>) -> Self {
        Self {
            artifacts: RwLock::new(artifacts),
        }
    }

    pub fn replace(&self, artifacts: Vec<ConstructorArtifact>) {
        *self.artifacts.write() = artifacts;
    }
}

impl ArtifactRepository for InMemoryArtifacts {
    fn artifacts(&self) -> Result<Vec<ConstructorArtifact>, BridgeError> {
        Ok(self.artifacts.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_chain_ids_are_digest_of_raw_data() {
        let chain = MockTargetChain::new();
        let tx = chain
            .trigger_contract(&TriggerSmartContract {
                contract_address: "41aa".into(),
                owner_address: "41bb".into(),
                data: "00".into(),
                call_value: 0,
                fee_limit: 1,
                visible: false,
            })
            .await
            .unwrap();
        let raw = hex::decode(&tx.raw_data_hex).unwrap();
        assert_eq!(tx.tx_id, hex::encode(Sha256::digest(&raw)));
    }

    #[tokio::test]
    async fn test_mock_chain_rejects_unsigned_broadcast() {
        let chain = MockTargetChain::new();
        let tx = TronTransaction {
            tx_id: "00".into(),
            raw_data: Value::Null,
            raw_data_hex: String::new(),
            signature: Vec::new(),
            visible: false,
        };
        assert!(matches!(
            chain.broadcast(&tx).await,
            Err(BridgeError::BroadcastRejected(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_upstream_echoes_id_and_records_call() {
        let upstream = MockUpstream::new();
        upstream.respond("eth_chainId", json!("0x2b6653dc"));
        let response = upstream
            .forward("eth_chainId", json!([]), json!(7))
            .await
            .unwrap();
        assert_eq!(response["id"], 7);
        assert_eq!(response["result"], "0x2b6653dc");
        assert_eq!(upstream.calls().len(), 1);
    }
}
