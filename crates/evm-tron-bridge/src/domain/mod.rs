//! Domain layer: types, entities and the two in-memory state holders.

pub mod abi;
pub mod config;
pub mod deployments;
pub mod entities;
pub mod errors;
pub mod nonce;
pub mod tron;
pub mod types;

pub use abi::{constructor_inputs, AbiType, AbiValue};
pub use config::{BridgeConfig, ConfigError, PrivateKey};
pub use deployments::DeploymentStore;
pub use entities::{
    ConstructorArtifact, DeploymentPhase, DeploymentRecord, SignedTransaction, TxKind, TxType,
};
pub use errors::{codes, ApiError, ApiResult, BridgeError, BridgeResult, GatewayError};
pub use nonce::NonceEmulator;
pub use tron::{
    DeployContract, SubmissionId, TransactionInfo, TriggerSmartContract, TronAddress,
    TronTransaction, TronValue,
};
pub use types::{Address, Bytes, Hash, U256};
