//! Target-chain (Tron) types: addresses, translated values and the HTTP API
//! payloads the bridge exchanges with a Tron full node.

use super::types::Address;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Leading byte of every Tron mainnet/testnet account address.
pub const TRON_ADDRESS_PREFIX: u8 = 0x41;

/// Address parse failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58check address '{0}'")]
    Base58(String),
    #[error("invalid hex address '{0}'")]
    Hex(String),
    #[error("address '{0}' does not carry the 0x41 prefix")]
    Prefix(String),
}

/// Tron account address: `0x41` followed by the 20 address bytes an EVM
/// would use. Displays in base58check (`T...`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TronAddress([u8; 21]);

impl TronAddress {
    pub fn from_evm(address: &Address) -> Self {
        let mut bytes = [0u8; 21];
        bytes[0] = TRON_ADDRESS_PREFIX;
        bytes[1..].copy_from_slice(address.as_bytes());
        TronAddress(bytes)
    }

    /// The 20 address bytes in origin-chain form.
    pub fn evm(&self) -> Address {
        Address::from_slice(&self.0[1..])
    }

    /// Parse `41...` (42 hex digits), optionally `0x`-prefixed, or a bare
    /// 20-byte hex address.
    pub fn from_hex(value: &str) -> Result<Self, AddressError> {
        let digits = value.strip_prefix("0x").unwrap_or(value);
        let raw = hex::decode(digits).map_err(|_| AddressError::Hex(value.to_string()))?;
        match raw.len() {
            20 => Ok(Self::from_evm(&Address::from_slice(&raw))),
            21 if raw[0] == TRON_ADDRESS_PREFIX => {
                let mut bytes = [0u8; 21];
                bytes.copy_from_slice(&raw);
                Ok(TronAddress(bytes))
            }
            21 => Err(AddressError::Prefix(value.to_string())),
            _ => Err(AddressError::Hex(value.to_string())),
        }
    }

    pub fn from_base58(value: &str) -> Result<Self, AddressError> {
        let raw = bs58::decode(value)
            .with_check(Some(TRON_ADDRESS_PREFIX))
            .into_vec()
            .map_err(|_| AddressError::Base58(value.to_string()))?;
        if raw.len() != 21 {
            return Err(AddressError::Base58(value.to_string()));
        }
        let mut bytes = [0u8; 21];
        bytes.copy_from_slice(&raw);
        Ok(TronAddress(bytes))
    }

    /// Accept either native form.
    pub fn parse(value: &str) -> Result<Self, AddressError> {
        if value.starts_with('T') {
            Self::from_base58(value)
        } else {
            Self::from_hex(value)
        }
    }

    /// Hex form used by the HTTP API with `visible: false`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).with_check().into_string()
    }
}

impl From<Address> for TronAddress {
    fn from(address: Address) -> Self {
        TronAddress::from_evm(&address)
    }
}

impl fmt::Display for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TronAddress({})", self.to_base58())
    }
}

impl Serialize for TronAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_base58())
    }
}

/// One ABI value in the representation TronWeb-style tooling expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TronValue {
    /// Base58check address.
    Address(TronAddress),
    /// Exact decimal rendering, `-` prefixed when negative.
    Integer(String),
    Bool(bool),
    Text(String),
    /// `0x`-prefixed hex.
    Bytes(String),
    /// Array or tuple members, in declared order.
    List(Vec<TronValue>),
    /// Value of an untranslated type, kept as its raw `0x` word.
    Untranslated(String),
}

/// Target-chain transaction identifier (`txID`, 64 hex digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubmissionId(pub String);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transaction as returned by the node's build endpoints and accepted by
/// `broadcasttransaction` once `signature` is filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TronTransaction {
    #[serde(rename = "txID")]
    pub tx_id: String,
    pub raw_data: Value,
    pub raw_data_hex: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<String>,
    #[serde(default)]
    pub visible: bool,
}

/// `/wallet/deploycontract` request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployContract {
    pub owner_address: String,
    /// JSON text of the ABI entry array.
    pub abi: String,
    pub bytecode: String,
    /// ABI-encoded constructor arguments.
    pub parameter: String,
    pub call_value: u64,
    pub name: String,
    pub fee_limit: u64,
    pub consume_user_resource_percent: u8,
    pub origin_energy_limit: u64,
    pub visible: bool,
}

/// `/wallet/triggersmartcontract` request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerSmartContract {
    pub contract_address: String,
    pub owner_address: String,
    /// Selector plus encoded arguments.
    pub data: String,
    pub call_value: u64,
    pub fee_limit: u64,
    pub visible: bool,
}

/// Resource receipt inside a transaction-info result.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResourceReceipt {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub energy_usage_total: Option<u64>,
}

/// Confirmed transaction info from `gettransactioninfobyid`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionInfo {
    pub id: String,
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub receipt: Option<ResourceReceipt>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(rename = "resMessage", default)]
    pub res_message: Option<String>,
}

impl TransactionInfo {
    /// Success unless the node flags `FAILED` or a non-`SUCCESS` receipt
    /// (`REVERT`, `OUT_OF_ENERGY`, ...).
    pub fn succeeded(&self) -> bool {
        if self.result.as_deref() == Some("FAILED") {
            return false;
        }
        match self.receipt.as_ref().and_then(|r| r.result.as_deref()) {
            Some(result) => result == "SUCCESS",
            None => true,
        }
    }

    /// Contract address created by this transaction, if any.
    pub fn created_contract(&self) -> Option<TronAddress> {
        self.contract_address
            .as_deref()
            .filter(|a| !a.is_empty())
            .and_then(|a| TronAddress::parse(a).ok())
    }

    /// Human-readable failure reason (`resMessage` is hex-encoded text).
    pub fn failure_reason(&self) -> Option<String> {
        self.res_message.as_deref().map(decode_node_message)
    }
}

/// Tron nodes hex-encode free-text messages; fall back to the raw text.
pub fn decode_node_message(message: &str) -> String {
    hex::decode(message)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| message.to_string())
}
