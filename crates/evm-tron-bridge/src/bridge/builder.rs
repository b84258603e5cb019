//! # Target-Chain Transaction Builder
//!
//! Composes native Tron creation and invocation transactions, has the
//! gateway key sign them, and submits them. Fee ceiling, origin energy limit
//! and the caller's energy share come from configuration, never from the
//! client's transaction.

use crate::adapters::GatewaySigner;
use crate::algorithms::{decode_all_from_target, encode_params};
use crate::domain::config::TronConfig;
use crate::domain::{
    AbiType, Address, BridgeError, ConstructorArtifact, DeployContract, SubmissionId,
    TriggerSmartContract, TronAddress, TronTransaction, TronValue,
};
use crate::ports::TargetChainClient;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub struct TransactionBuilder {
    chain: Arc<dyn TargetChainClient>,
    signer: Arc<GatewaySigner>,
    settings: TronConfig,
}

impl TransactionBuilder {
    pub fn new(
        chain: Arc<dyn TargetChainClient>,
        signer: Arc<GatewaySigner>,
        settings: TronConfig,
    ) -> Self {
        Self {
            chain,
            signer,
            settings,
        }
    }

    /// Deploy `artifact` with already-translated constructor arguments.
    pub async fn build_creation(
        &self,
        artifact: &ConstructorArtifact,
        inputs: &[AbiType],
        args: &[TronValue],
    ) -> Result<SubmissionId, BridgeError> {
        let values = decode_all_from_target(args, inputs)?;
        let parameter = encode_params(inputs, &values)?;

        let request = DeployContract {
            owner_address: self.signer.tron_address().to_hex(),
            abi: normalize_abi(&artifact.abi),
            bytecode: hex::encode(&artifact.bytecode),
            parameter: hex::encode(parameter),
            call_value: 0,
            name: self
                .settings
                .contract_name
                .clone()
                .unwrap_or_else(|| artifact.name.clone()),
            fee_limit: self.settings.fee_limit_sun,
            consume_user_resource_percent: self.settings.user_fee_percentage,
            origin_energy_limit: self.settings.origin_energy_limit,
            visible: false,
        };

        let unsigned = self.chain.deploy_contract(&request).await?;
        let id = self.sign_and_broadcast(unsigned).await?;
        info!(name = %request.name, submission = %id, "Creation broadcast");
        Ok(id)
    }

    /// Call `contract` on behalf of `caller` with pre-encoded call data.
    pub async fn build_invocation(
        &self,
        contract: &TronAddress,
        caller: &Address,
        data: &[u8],
    ) -> Result<SubmissionId, BridgeError> {
        let request = TriggerSmartContract {
            contract_address: contract.to_hex(),
            owner_address: TronAddress::from_evm(caller).to_hex(),
            data: hex::encode(data),
            call_value: 0,
            fee_limit: self.settings.fee_limit_sun,
            visible: false,
        };

        let unsigned = self.chain.trigger_contract(&request).await?;
        let id = self.sign_and_broadcast(unsigned).await?;
        info!(contract = %contract, submission = %id, "Invocation broadcast");
        Ok(id)
    }

    async fn sign_and_broadcast(
        &self,
        unsigned: TronTransaction,
    ) -> Result<SubmissionId, BridgeError> {
        let signed = self.signer.sign(unsigned)?;
        self.chain.broadcast(&signed).await
    }
}

/// ABI JSON text in the form the node's contract parser accepts: entry
/// `type` and `stateMutability` values capitalised (`function` ->
/// `Function`, `view` -> `View`).
pub fn normalize_abi(abi: &Value) -> String {
    let entries = match abi {
        Value::Array(entries) => entries
            .iter()
            .map(|entry| {
                let mut entry = entry.clone();
                if let Value::Object(fields) = &mut entry {
                    for key in ["type", "stateMutability"] {
                        if let Some(Value::String(text)) = fields.get_mut(key) {
                            *text = capitalize(text);
                        }
                    }
                }
                entry
            })
            .collect(),
        _ => Vec::new(),
    };
    Value::Array(entries).to_string()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
