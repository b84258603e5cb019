//! reqwest client for a Tron full node's HTTP API.

use crate::domain::tron::decode_node_message;
use crate::domain::{
    BridgeError, Bytes, DeployContract, SubmissionId, TransactionInfo, TriggerSmartContract,
    TronAddress, TronTransaction,
};
use crate::ports::TargetChainClient;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

const DEPLOY_CONTRACT: &str = "/wallet/deploycontract";
const TRIGGER_CONTRACT: &str = "/wallet/triggersmartcontract";
const BROADCAST: &str = "/wallet/broadcasttransaction";
const TRANSACTION_INFO: &str = "/walletsolidity/gettransactioninfobyid";
const CONTRACT_INFO: &str = "/wallet/getcontractinfo";

/// Tron node reached over `/wallet` and `/walletsolidity`.
#[derive(Debug, Clone)]
pub struct TronHttpClient {
    client: reqwest::Client,
    base: String,
}

impl TronHttpClient {
    /// `node_base` is the node root, without `/wallet` or `/jsonrpc`.
    pub fn new(node_base: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let parsed = Url::parse(node_base)
            .map_err(|e| BridgeError::TargetChain(format!("invalid node url '{node_base}': {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::TargetChain(e.to_string()))?;
        Ok(Self {
            client,
            base: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<Value, BridgeError> {
        let url = format!("{}{}", self.base, path);
        debug!(%url, "Tron node request");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| BridgeError::TargetChain(format!("{path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::TargetChain(format!("{path}: HTTP {status}")));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| BridgeError::TargetChain(format!("{path}: {e}")))
    }
}

fn parse_transaction(path: &str, value: Value) -> Result<TronTransaction, BridgeError> {
    serde_json::from_value(value)
        .map_err(|e| BridgeError::TargetChain(format!("{path}: unexpected transaction shape: {e}")))
}

fn node_message(value: &Value) -> String {
    value
        .get("message")
        .and_then(Value::as_str)
        .map(decode_node_message)
        .unwrap_or_default()
}

#[async_trait]
impl TargetChainClient for TronHttpClient {
    async fn deploy_contract(
        &self,
        request: &DeployContract,
    ) -> Result<TronTransaction, BridgeError> {
        let response = self.post(DEPLOY_CONTRACT, request).await?;
        if let Some(error) = response.get("Error") {
            return Err(BridgeError::BroadcastRejected(format!(
                "{DEPLOY_CONTRACT}: {}",
                error.as_str().unwrap_or_default()
            )));
        }
        parse_transaction(DEPLOY_CONTRACT, response)
    }

    async fn trigger_contract(
        &self,
        request: &TriggerSmartContract,
    ) -> Result<TronTransaction, BridgeError> {
        let mut response = self.post(TRIGGER_CONTRACT, request).await?;
        let result = &response["result"];
        if result.get("result").and_then(Value::as_bool) != Some(true) {
            let code = result.get("code").and_then(Value::as_str).unwrap_or("UNKNOWN");
            return Err(BridgeError::BroadcastRejected(format!(
                "{TRIGGER_CONTRACT}: {code}: {}",
                node_message(result)
            )));
        }
        parse_transaction(TRIGGER_CONTRACT, response["transaction"].take())
    }

    async fn broadcast(&self, transaction: &TronTransaction) -> Result<SubmissionId, BridgeError> {
        let response = self.post(BROADCAST, transaction).await?;
        if response.get("result").and_then(Value::as_bool) == Some(true) {
            let txid = response
                .get("txid")
                .and_then(Value::as_str)
                .unwrap_or(&transaction.tx_id);
            return Ok(SubmissionId(txid.to_string()));
        }
        let code = response
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN");
        Err(BridgeError::BroadcastRejected(format!(
            "{code}: {}",
            node_message(&response)
        )))
    }

    async fn transaction_info(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<TransactionInfo>, BridgeError> {
        let response = self.post(TRANSACTION_INFO, &json!({ "value": id.0 })).await?;
        if response.get("id").is_none() {
            return Ok(None);
        }
        serde_json::from_value(response)
            .map(Some)
            .map_err(|e| BridgeError::TargetChain(format!("{TRANSACTION_INFO}: {e}")))
    }

    async fn contract_code(&self, address: &TronAddress) -> Result<Bytes, BridgeError> {
        let response = self
            .post(
                CONTRACT_INFO,
                &json!({ "value": address.to_hex(), "visible": false }),
            )
            .await?;
        match response.get("runtimecode").and_then(Value::as_str) {
            Some(code) => Bytes::from_hex(code)
                .map_err(|e| BridgeError::TargetChain(format!("{CONTRACT_INFO}: {e}"))),
            None => Ok(Bytes::default()),
        }
    }
}
