//! Translated Ethereum JSON-RPC methods.
//!
//! Everything not handled here is forwarded verbatim by the router.

use super::builder::TransactionBuilder;
use super::reconciler::{CodeLookup, ReceiptState, Reconciler};
use crate::adapters::GatewaySigner;
use crate::algorithms::{
    decode_params, decode_signed_transaction, encode_all_for_target, match_artifact,
    predict_create_address,
};
use crate::domain::types::{address_hex, hash_hex, quantity};
use crate::domain::{
    AbiType, Address, BridgeConfig, BridgeError, BridgeResult, Bytes, ConstructorArtifact,
    DeploymentPhase, DeploymentRecord, DeploymentStore, Hash, NonceEmulator, SignedTransaction,
    SubmissionId, TronAddress, TronValue, TxKind,
};
use crate::domain::config::StubsConfig;
use crate::metrics::BridgeMetrics;
use crate::ports::{ArtifactRepository, TargetChainClient, UpstreamForwarder};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of a translated call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A `result` value for the client's envelope.
    Result(Value),
    /// A complete upstream response object, returned as-is.
    Forwarded(Value),
}

/// A creation ready to be built: artifact, constructor types, translated
/// arguments and the address the client expects.
struct CreationPlan {
    artifact: ConstructorArtifact,
    inputs: Vec<AbiType>,
    args: Vec<TronValue>,
    predicted: Address,
}

enum Submission {
    Creation(CreationPlan),
    Invocation(Address),
}

/// The gateway's translation state and collaborators.
pub struct EthBridge {
    signer: Arc<GatewaySigner>,
    artifacts: Arc<dyn ArtifactRepository>,
    upstream: Arc<dyn UpstreamForwarder>,
    builder: TransactionBuilder,
    reconciler: Reconciler,
    store: Arc<Mutex<DeploymentStore>>,
    nonces: Mutex<NonceEmulator>,
    stubs: StubsConfig,
    metrics: Arc<BridgeMetrics>,
}

impl EthBridge {
    pub fn new(
        config: &BridgeConfig,
        signer: GatewaySigner,
        chain: Arc<dyn TargetChainClient>,
        upstream: Arc<dyn UpstreamForwarder>,
        artifacts: Arc<dyn ArtifactRepository>,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        let signer = Arc::new(signer);
        let store = Arc::new(Mutex::new(DeploymentStore::new()));
        Self {
            builder: TransactionBuilder::new(
                Arc::clone(&chain),
                Arc::clone(&signer),
                config.tron.clone(),
            ),
            reconciler: Reconciler::new(
                Arc::clone(&store),
                chain,
                config.reconciliation.clone(),
                Arc::clone(&metrics),
            ),
            signer,
            artifacts,
            upstream,
            store,
            nonces: Mutex::new(NonceEmulator::new()),
            stubs: config.stubs.clone(),
            metrics,
        }
    }

    /// The only sender this gateway accepts.
    pub fn signer_address(&self) -> Address {
        self.signer.evm_address()
    }

    pub fn signer_tron_address(&self) -> TronAddress {
        self.signer.tron_address()
    }

    pub fn metrics(&self) -> Arc<BridgeMetrics> {
        Arc::clone(&self.metrics)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACCOUNT & FEE STUBS
    // ═══════════════════════════════════════════════════════════════════════

    /// eth_getTransactionCount - emulated, the block tag is ignored
    #[instrument(skip(self))]
    pub fn get_transaction_count(&self, address: Address) -> String {
        quantity(self.nonces.lock().peek_next(&address))
    }

    /// eth_estimateGas
    pub fn estimate_gas(&self) -> String {
        quantity(self.stubs.gas_estimate)
    }

    /// eth_gasPrice
    pub fn gas_price(&self) -> String {
        format!("0x{:x}", self.stubs.gas_price)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SUBMISSION
    // ═══════════════════════════════════════════════════════════════════════

    /// eth_sendRawTransaction - decode, translate, sign and broadcast on Tron
    #[instrument(skip(self, raw), fields(len = raw.len()))]
    pub async fn send_raw_transaction(&self, raw: Bytes) -> BridgeResult<Hash> {
        let tx = decode_signed_transaction(raw.as_slice())?;

        let expected = self.signer.evm_address();
        if tx.sender != expected {
            return Err(BridgeError::SenderMismatch {
                decoded: address_hex(&tx.sender),
                expected: address_hex(&expected),
            });
        }

        let plan = match tx.kind() {
            TxKind::Creation => Submission::Creation(self.prepare_creation(&tx).await?),
            TxKind::Invocation(to) => Submission::Invocation(to),
        };

        let mut record = DeploymentRecord::new(&tx);
        if let Submission::Creation(creation) = &plan {
            record.predicted_address = Some(creation.predicted);
        }
        if !self.store.lock().claim(record) {
            debug!(tx_hash = ?tx.hash, "Duplicate submission, returning existing hash");
            return Ok(tx.hash);
        }

        let is_creation = matches!(plan, Submission::Creation(_));
        let submitted = match plan {
            Submission::Creation(creation) => {
                info!(tx_hash = ?tx.hash, predicted = ?creation.predicted, artifact = %creation.artifact.name, "Deploying");
                self.builder
                    .build_creation(&creation.artifact, &creation.inputs, &creation.args)
                    .await
            }
            Submission::Invocation(to) => self.submit_invocation(&tx, to).await,
        };

        match submitted {
            Ok(id) => {
                self.store.lock().set_submission_id(&tx.hash, id.clone());
                self.nonces.lock().observe(tx.sender, tx.nonce);
                self.metrics.record_submission(is_creation);
                info!(tx_hash = ?tx.hash, submission = %id, nonce = tx.nonce, "Transaction submitted");
                Ok(tx.hash)
            }
            Err(e) => {
                self.store.lock().set_phase(&tx.hash, DeploymentPhase::Failed);
                if matches!(e, BridgeError::BroadcastRejected(_)) {
                    self.metrics.record_broadcast_rejected();
                }
                warn!(tx_hash = ?tx.hash, error = %e, "Submission failed");
                Err(e)
            }
        }
    }

    /// Match the creation payload against the artifact tree and translate
    /// its constructor arguments. No state is touched.
    async fn prepare_creation(&self, tx: &SignedTransaction) -> BridgeResult<CreationPlan> {
        let repository = Arc::clone(&self.artifacts);
        let artifacts = tokio::task::spawn_blocking(move || repository.artifacts())
            .await
            .map_err(|e| BridgeError::Artifact(format!("artifact scan aborted: {}", e)))??;

        let matched = match_artifact(&artifacts, &tx.payload)?;
        let inputs = matched.artifact.constructor_inputs()?;
        let values = decode_params(&inputs, &matched.constructor_args)?;
        let args = encode_all_for_target(&values, &inputs)?;
        debug!(
            artifact = %matched.artifact.name,
            args = %serde_json::to_string(&args).unwrap_or_default(),
            "Translated constructor arguments"
        );

        Ok(CreationPlan {
            artifact: matched.artifact,
            inputs,
            args,
            predicted: predict_create_address(&tx.sender, tx.nonce),
        })
    }

    async fn submit_invocation(
        &self,
        tx: &SignedTransaction,
        to: Address,
    ) -> BridgeResult<SubmissionId> {
        let destination = self
            .store
            .lock()
            .confirmed_for(&to)
            .unwrap_or_else(|| TronAddress::from_evm(&to));
        if destination.evm() != to {
            debug!(to = ?to, contract = %destination, "Calling confirmed address behind predicted address");
        }

        self.builder
            .build_invocation(&destination, &tx.sender, &tx.payload)
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // RECONCILED QUERIES
    // ═══════════════════════════════════════════════════════════════════════

    /// eth_getTransactionReceipt
    #[instrument(skip(self, id))]
    pub async fn get_transaction_receipt(&self, tx_hash: Hash, id: Value) -> BridgeResult<Reply> {
        match self.reconciler.receipt(&tx_hash).await? {
            ReceiptState::Unknown => {
                self.forward("eth_getTransactionReceipt", json!([hash_hex(&tx_hash)]), id)
                    .await
            }
            ReceiptState::Pending => Ok(Reply::Result(Value::Null)),
            ReceiptState::Settled { record, success } => {
                Ok(Reply::Result(self.receipt_json(&record, success)))
            }
        }
    }

    /// eth_getCode
    #[instrument(skip(self, id))]
    pub async fn get_code(
        &self,
        address: Address,
        block: Option<Value>,
        id: Value,
    ) -> BridgeResult<Reply> {
        match self.reconciler.code_at(&address).await? {
            CodeLookup::Known(code) => Ok(Reply::Result(json!(code.to_hex()))),
            CodeLookup::Unrelated => {
                let params = json!([address_hex(&address), block.unwrap_or(json!("latest"))]);
                let response = self.upstream.forward("eth_getCode", params, id).await?;
                self.metrics.record_forwarded();
                let code = response
                    .get("result")
                    .filter(|result| !result.is_null())
                    .cloned()
                    .unwrap_or(json!("0x"));
                Ok(Reply::Result(code))
            }
        }
    }

    /// eth_getBalance / eth_getStorageAt - predicted addresses are swapped for
    /// their confirmed target-chain address before forwarding.
    #[instrument(skip(self, id))]
    pub async fn forward_aliased(
        &self,
        method: &str,
        mut params: Vec<Value>,
        id: Value,
    ) -> BridgeResult<Reply> {
        let alias = params
            .first()
            .and_then(|first| serde_json::from_value::<Address>(first.clone()).ok())
            .and_then(|address| self.store.lock().confirmed_for(&address));
        if let (Some(confirmed), Some(first)) = (alias, params.first_mut()) {
            *first = json!(address_hex(&confirmed.evm()));
        }
        self.forward(method, Value::Array(params), id).await
    }

    /// eth_getTransactionByHash
    #[instrument(skip(self, id))]
    pub async fn get_transaction_by_hash(&self, tx_hash: Hash, id: Value) -> BridgeResult<Reply> {
        let record = self.store.lock().get(&tx_hash).cloned();
        match record {
            Some(record) => Ok(Reply::Result(transaction_json(&record))),
            None => {
                self.forward("eth_getTransactionByHash", json!([hash_hex(&tx_hash)]), id)
                    .await
            }
        }
    }

    /// Anything without a translation.
    pub async fn forward(&self, method: &str, params: Value, id: Value) -> BridgeResult<Reply> {
        let response = self.upstream.forward(method, params, id).await?;
        self.metrics.record_forwarded();
        Ok(Reply::Forwarded(response))
    }

    fn receipt_json(&self, record: &DeploymentRecord, success: bool) -> Value {
        let contract_address = if success {
            record.predicted_address.as_ref().map(address_hex)
        } else {
            None
        };
        json!({
            "transactionHash": hash_hex(&record.tx_hash),
            "transactionIndex": "0x0",
            "blockHash": Value::Null,
            "blockNumber": record.block_number.map(quantity),
            "from": address_hex(&record.sender),
            "to": record.recipient.as_ref().map(address_hex),
            "contractAddress": contract_address,
            "status": if success { "0x1" } else { "0x0" },
            "gasUsed": "0x0",
            "cumulativeGasUsed": "0x0",
            "effectiveGasPrice": self.gas_price(),
            "logs": [],
            "logsBloom": format!("0x{}", "0".repeat(512)),
            "type": quantity(u64::from(record.tx_type.code())),
        })
    }
}

fn transaction_json(record: &DeploymentRecord) -> Value {
    json!({
        "hash": hash_hex(&record.tx_hash),
        "from": address_hex(&record.sender),
        "to": record.recipient.as_ref().map(address_hex),
        "nonce": quantity(record.nonce),
        "input": record.payload.to_hex(),
        "value": "0x0",
        "gas": quantity(record.gas_limit),
        "gasPrice": record.gas_price,
        "blockHash": Value::Null,
        "blockNumber": record.block_number.map(quantity),
        "transactionIndex": record.block_number.map(|_| "0x0"),
        "type": quantity(u64::from(record.tx_type.code())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::encode_params;
    use crate::domain::tron::ResourceReceipt;
    use crate::domain::{
        AbiType, AbiValue, ConstructorArtifact, DeployContract, PrivateKey, TransactionInfo,
        TriggerSmartContract, TronTransaction,
    };
    use async_trait::async_trait;
    use crate::ports::{InMemoryArtifacts, MockTargetChain, MockUpstream};
    use crate::testing::{
        sign_dynamic_fee, sign_legacy, signer_address, signer_key, stranger_key, UnsignedTx,
        SIGNER_KEY_HEX,
    };
    use std::path::PathBuf;

    const CHAIN_ID: u64 = 728126428;
    const BYTECODE: [u8; 5] = [0x60, 0x80, 0x60, 0x40, 0x52];

    struct Harness {
        bridge: EthBridge,
        chain: Arc<MockTargetChain>,
        upstream: Arc<MockUpstream>,
    }

    fn harness() -> Harness {
        harness_with(BridgeConfig::default())
    }

    fn harness_with(config: BridgeConfig) -> Harness {
        let chain = Arc::new(MockTargetChain::new());
        let upstream = Arc::new(MockUpstream::new());
        let bridge = bridge_over(&config, chain.clone(), upstream.clone());
        Harness {
            bridge,
            chain,
            upstream,
        }
    }

    fn bridge_over(
        config: &BridgeConfig,
        chain: Arc<dyn TargetChainClient>,
        upstream: Arc<MockUpstream>,
    ) -> EthBridge {
        let artifacts = Arc::new(InMemoryArtifacts::new(vec![ConstructorArtifact {
            name: "Token".into(),
            source: PathBuf::from("out/Token.sol/Token.json"),
            bytecode: BYTECODE.to_vec(),
            abi: json!([{
                "type": "constructor",
                "inputs": [
                    { "name": "owner", "type": "address" },
                    { "name": "supply", "type": "uint256" }
                ]
            }]),
        }]));
        let signer = GatewaySigner::new(&PrivateKey::new(SIGNER_KEY_HEX)).unwrap();
        EthBridge::new(
            config,
            signer,
            chain,
            upstream,
            artifacts,
            Arc::new(BridgeMetrics::new()),
        )
    }

    /// Node that hands control back to the scheduler while building and
    /// broadcasting, so overlapping submissions interleave.
    struct SlowChain(Arc<MockTargetChain>);

    #[async_trait]
    impl TargetChainClient for SlowChain {
        async fn deploy_contract(
            &self,
            request: &DeployContract,
        ) -> Result<TronTransaction, BridgeError> {
            tokio::task::yield_now().await;
            self.0.deploy_contract(request).await
        }

        async fn trigger_contract(
            &self,
            request: &TriggerSmartContract,
        ) -> Result<TronTransaction, BridgeError> {
            tokio::task::yield_now().await;
            self.0.trigger_contract(request).await
        }

        async fn broadcast(
            &self,
            transaction: &TronTransaction,
        ) -> Result<SubmissionId, BridgeError> {
            tokio::task::yield_now().await;
            self.0.broadcast(transaction).await
        }

        async fn transaction_info(
            &self,
            id: &SubmissionId,
        ) -> Result<Option<TransactionInfo>, BridgeError> {
            self.0.transaction_info(id).await
        }

        async fn contract_code(&self, address: &TronAddress) -> Result<Bytes, BridgeError> {
            self.0.contract_code(address).await
        }
    }

    fn creation_payload() -> Vec<u8> {
        let args = encode_params(
            &[AbiType::Address, AbiType::Uint(256)],
            &[
                AbiValue::Address(Address::repeat_byte(0x44)),
                AbiValue::Uint(1_000_000u64.into()),
            ],
        )
        .unwrap();
        [BYTECODE.to_vec(), args].concat()
    }

    fn deploy_raw(nonce: u64) -> Bytes {
        Bytes::new(sign_legacy(
            &signer_key(),
            &UnsignedTx::creation(nonce, creation_payload()),
            Some(CHAIN_ID),
        ))
    }

    fn last_submission(chain: &MockTargetChain) -> SubmissionId {
        SubmissionId(chain.broadcasts().last().unwrap().tx_id.clone())
    }

    fn confirmed(contract: &TronAddress) -> TransactionInfo {
        TransactionInfo {
            id: "x".into(),
            block_number: Some(1234),
            contract_address: Some(contract.to_hex()),
            receipt: Some(ResourceReceipt {
                result: Some("SUCCESS".into()),
                energy_usage_total: None,
            }),
            ..TransactionInfo::default()
        }
    }

    fn receipt_of(reply: Reply) -> Value {
        match reply {
            Reply::Result(value) => value,
            Reply::Forwarded(response) => panic!("unexpected forward: {response}"),
        }
    }

    fn deployed_contract() -> TronAddress {
        TronAddress::from_evm(&Address::repeat_byte(0xdc))
    }

    #[tokio::test]
    async fn test_deployment_lifecycle_resolves_at_predicted_address() {
        let h = harness();
        let hash = h.bridge.send_raw_transaction(deploy_raw(0)).await.unwrap();
        let predicted = predict_create_address(&signer_address(), 0);

        let deploy = &h.chain.deployments()[0];
        assert_eq!(deploy.bytecode, hex::encode(BYTECODE));
        assert_eq!(
            deploy.parameter,
            hex::encode(&creation_payload()[BYTECODE.len()..])
        );

        let first = h.bridge.get_transaction_receipt(hash, json!(1)).await.unwrap();
        assert_eq!(first, Reply::Result(Value::Null));

        h.chain
            .confirm(&last_submission(&h.chain), confirmed(&deployed_contract()));
        let second = h.bridge.get_transaction_receipt(hash, json!(2)).await.unwrap();
        assert_eq!(second, Reply::Result(Value::Null));

        h.chain
            .set_code(deployed_contract(), Bytes::new(vec![0x60, 0x80, 0x00]));
        let receipt = receipt_of(h.bridge.get_transaction_receipt(hash, json!(3)).await.unwrap());
        assert_eq!(receipt["contractAddress"], json!(address_hex(&predicted)));
        assert_eq!(receipt["status"], "0x1");
        assert_eq!(receipt["blockNumber"], "0x4d2");
        assert_eq!(receipt["transactionHash"], json!(hash_hex(&hash)));

        let code = h.bridge.get_code(predicted, None, json!(4)).await.unwrap();
        assert_eq!(code, Reply::Result(json!("0x608000")));
        assert_eq!(h.bridge.get_transaction_count(signer_address()), "0x1");
        assert!(h.upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_placeholder_code_after_ten_empty_attempts() {
        let h = harness();
        let hash = h.bridge.send_raw_transaction(deploy_raw(3)).await.unwrap();
        let predicted = predict_create_address(&signer_address(), 3);
        h.chain
            .confirm(&last_submission(&h.chain), confirmed(&deployed_contract()));

        for _ in 0..9 {
            let reply = h.bridge.get_transaction_receipt(hash, json!(1)).await.unwrap();
            assert_eq!(reply, Reply::Result(Value::Null));
        }
        assert_eq!(
            h.bridge.get_code(predicted, None, json!(1)).await.unwrap(),
            Reply::Result(json!("0x00"))
        );
        let receipt = receipt_of(h.bridge.get_transaction_receipt(hash, json!(1)).await.unwrap());
        assert_eq!(receipt["contractAddress"], json!(address_hex(&predicted)));
        assert_eq!(h.bridge.metrics().to_json()["deployments"]["placeholder"], 1);
    }

    #[tokio::test]
    async fn test_sender_mismatch_has_no_side_effects() {
        let h = harness();
        let raw = sign_legacy(
            &stranger_key(),
            &UnsignedTx::creation(0, creation_payload()),
            Some(CHAIN_ID),
        );
        let result = h.bridge.send_raw_transaction(Bytes::new(raw)).await;

        assert!(matches!(result, Err(BridgeError::SenderMismatch { .. })));
        assert!(h.chain.deployments().is_empty());
        assert!(h.chain.broadcasts().is_empty());
        assert!(h.bridge.store.lock().is_empty());
        assert_eq!(h.bridge.get_transaction_count(signer_address()), "0x0");
    }

    #[tokio::test]
    async fn test_nonzero_value_rejected() {
        let h = harness();
        let mut tx = UnsignedTx::call(0, Address::repeat_byte(0x12), vec![]);
        tx.value = 1;
        let result = h
            .bridge
            .send_raw_transaction(Bytes::new(sign_legacy(&signer_key(), &tx, Some(CHAIN_ID))))
            .await;
        assert!(matches!(result, Err(BridgeError::UnsupportedFeature(_))));
        assert!(h.chain.triggers().is_empty());
        assert!(h.bridge.store.lock().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_rejection_marks_failed() {
        let h = harness();
        h.chain.reject_broadcasts("BANDWITH_ERROR", "account has insufficient bandwidth");
        let raw = deploy_raw(0);
        let result = h.bridge.send_raw_transaction(raw.clone()).await;
        assert_eq!(
            result,
            Err(BridgeError::BroadcastRejected(
                "BANDWITH_ERROR: account has insufficient bandwidth".into()
            ))
        );
        assert_eq!(h.bridge.get_transaction_count(signer_address()), "0x0");

        let hash = decode_signed_transaction(raw.as_slice()).unwrap().hash;
        let receipt = receipt_of(h.bridge.get_transaction_receipt(hash, json!(1)).await.unwrap());
        assert_eq!(receipt["status"], "0x0");
        assert_eq!(receipt["contractAddress"], Value::Null);
        assert_eq!(h.bridge.metrics().to_json()["submissions"]["broadcast_rejected"], 1);
    }

    #[tokio::test]
    async fn test_resubmission_is_idempotent() {
        let h = harness();
        let first = h.bridge.send_raw_transaction(deploy_raw(0)).await.unwrap();
        let second = h.bridge.send_raw_transaction(deploy_raw(0)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(h.chain.broadcasts().len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_resubmission_broadcasts_once() {
        let chain = Arc::new(MockTargetChain::new());
        let bridge = bridge_over(
            &BridgeConfig::default(),
            Arc::new(SlowChain(chain.clone())),
            Arc::new(MockUpstream::new()),
        );

        let raw = deploy_raw(0);
        let (a, b) = tokio::join!(
            bridge.send_raw_transaction(raw.clone()),
            bridge.send_raw_transaction(raw)
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(chain.deployments().len(), 1);
        assert_eq!(chain.broadcasts().len(), 1);

        let call = Bytes::new(sign_legacy(
            &signer_key(),
            &UnsignedTx::call(1, Address::repeat_byte(0x12), vec![0x01]),
            Some(CHAIN_ID),
        ));
        let (a, b) = tokio::join!(
            bridge.send_raw_transaction(call.clone()),
            bridge.send_raw_transaction(call)
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(chain.triggers().len(), 1);
        assert_eq!(chain.broadcasts().len(), 2);
        assert_eq!(bridge.get_transaction_count(signer_address()), "0x2");
    }

    #[tokio::test]
    async fn test_failed_submission_can_be_retried() {
        let h = harness();
        h.chain.set_faulty(true);
        let raw = deploy_raw(0);
        assert!(matches!(
            h.bridge.send_raw_transaction(raw.clone()).await,
            Err(BridgeError::TargetChain(_))
        ));

        h.chain.set_faulty(false);
        h.bridge.send_raw_transaction(raw).await.unwrap();
        assert_eq!(h.chain.broadcasts().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_artifact() {
        let h = harness();
        let raw = sign_legacy(
            &signer_key(),
            &UnsignedTx::creation(0, vec![0x61, 0x00, 0x01, 0x02, 0x03, 0x04]),
            Some(CHAIN_ID),
        );
        assert_eq!(
            h.bridge.send_raw_transaction(Bytes::new(raw)).await,
            Err(BridgeError::NoArtifactMatch { payload_len: 6 })
        );
        assert!(h.bridge.store.lock().is_empty());
    }

    #[tokio::test]
    async fn test_invocation_goes_to_confirmed_address() {
        let h = harness();
        let hash = h.bridge.send_raw_transaction(deploy_raw(0)).await.unwrap();
        h.chain
            .confirm(&last_submission(&h.chain), confirmed(&deployed_contract()));
        h.chain.set_code(deployed_contract(), Bytes::new(vec![0x01]));
        h.bridge.get_transaction_receipt(hash, json!(1)).await.unwrap();

        let predicted = predict_create_address(&signer_address(), 0);
        let call = UnsignedTx::call(1, predicted, vec![0xa9, 0x05, 0x9c, 0xbb]);
        let call_hash = h
            .bridge
            .send_raw_transaction(Bytes::new(sign_dynamic_fee(&signer_key(), &call, CHAIN_ID)))
            .await
            .unwrap();

        assert_eq!(h.chain.triggers()[0].contract_address, deployed_contract().to_hex());
        assert_eq!(h.bridge.get_transaction_count(signer_address()), "0x2");

        let by_hash = match h
            .bridge
            .get_transaction_by_hash(call_hash, json!(1))
            .await
            .unwrap()
        {
            Reply::Result(value) => value,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(by_hash["to"], json!(address_hex(&predicted)));
        assert_eq!(by_hash["input"], "0xa9059cbb");
        assert_eq!(by_hash["type"], "0x2");

        h.chain.confirm(
            &last_submission(&h.chain),
            TransactionInfo {
                id: "y".into(),
                block_number: Some(1300),
                ..TransactionInfo::default()
            },
        );
        let receipt = receipt_of(h.bridge.get_transaction_receipt(call_hash, json!(1)).await.unwrap());
        assert_eq!(receipt["status"], "0x1");
        assert_eq!(receipt["contractAddress"], Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_queries_are_forwarded() {
        let h = harness();
        h.upstream.respond("eth_getCode", json!("0x6001"));
        let address = Address::repeat_byte(0x99);
        assert_eq!(
            h.bridge.get_code(address, Some(json!("0x10")), json!(5)).await.unwrap(),
            Reply::Result(json!("0x6001"))
        );
        let (method, params, id) = h.upstream.calls()[0].clone();
        assert_eq!(method, "eth_getCode");
        assert_eq!(params, json!([address_hex(&address), "0x10"]));
        assert_eq!(id, json!(5));

        let hash = Hash::repeat_byte(0x42);
        let reply = h.bridge.get_transaction_receipt(hash, json!(6)).await.unwrap();
        assert!(matches!(reply, Reply::Forwarded(_)));
        assert_eq!(h.upstream.calls()[1].1, json!([hash_hex(&hash)]));
    }

    #[tokio::test]
    async fn test_unrelated_code_defaults_to_empty() {
        let h = harness();
        assert_eq!(
            h.bridge
                .get_code(Address::repeat_byte(1), None, json!(1))
                .await
                .unwrap(),
            Reply::Result(json!("0x"))
        );
        assert_eq!(h.upstream.calls()[0].1[1], "latest");
    }

    #[tokio::test]
    async fn test_balance_of_predicted_address_is_aliased() {
        let h = harness();
        let hash = h.bridge.send_raw_transaction(deploy_raw(0)).await.unwrap();
        h.chain
            .confirm(&last_submission(&h.chain), confirmed(&deployed_contract()));
        h.bridge.get_transaction_receipt(hash, json!(1)).await.unwrap();

        let predicted = predict_create_address(&signer_address(), 0);
        h.bridge
            .forward_aliased(
                "eth_getBalance",
                vec![json!(address_hex(&predicted)), json!("latest")],
                json!(9),
            )
            .await
            .unwrap();
        let (_, params, _) = h.upstream.calls()[0].clone();
        assert_eq!(params[0], json!(address_hex(&deployed_contract().evm())));
        assert_eq!(params[1], "latest");
    }

    #[tokio::test]
    async fn test_stubs_follow_config() {
        let mut config = BridgeConfig::default();
        config.stubs.gas_estimate = 0x10;
        let h = harness_with(config);
        assert_eq!(h.bridge.estimate_gas(), "0x10");
        assert_eq!(h.bridge.gas_price(), "0x2540be400");
        assert_eq!(harness().bridge.estimate_gas(), "0x7a1200");
    }

    #[tokio::test]
    async fn test_upstream_failure_surfaces() {
        let h = harness();
        h.upstream.set_failing(true);
        assert!(matches!(
            h.bridge.forward("eth_chainId", json!([]), json!(1)).await,
            Err(BridgeError::UpstreamFailure(_))
        ));
    }
}
