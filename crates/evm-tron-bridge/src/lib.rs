#![allow(missing_docs)]

//! EVM-to-Tron bridge: an Ethereum JSON-RPC endpoint that deploys and calls
//! contracts on a Tron node.
//!
//! Ethereum tooling (Foundry, Hardhat, ethers) signs ordinary transactions
//! and sends them here. The gateway decodes them, rebuilds equivalent Tron
//! transactions, signs those with its own key and broadcasts them. Receipts
//! and code queries are answered from local deployment state until the
//! target chain catches up. Everything else is forwarded to an upstream
//! Ethereum-compatible endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        EVM-TRON BRIDGE                               │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │   POST /  ──►  rpc::dispatch  ──►  EthBridge                         │
//! │                                     │                                │
//! │       ┌─────────────────────────────┼──────────────────────┐         │
//! │       ▼                             ▼                      ▼         │
//! │  algorithms::*               TransactionBuilder        Reconciler    │
//! │  (decode, match, ABI,        (deploy/trigger,          (receipts,    │
//! │   address prediction)         sign, broadcast)          code)        │
//! │                                     │                      │         │
//! │                                     ▼                      ▼         │
//! │                           TargetChainClient  ◄─────────────┘         │
//! │                                     │                                │
//! └─────────────────────────────────────┼────────────────────────────────┘
//!                                       ▼
//!                         Tron node (/wallet, /walletsolidity)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use evm_tron_bridge::{BridgeConfig, BridgeService};
//!
//! let config = BridgeConfig::from_env();
//! let mut service = BridgeService::from_config(config)?;
//! service.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod algorithms;
pub mod bridge;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod rpc;
pub mod service;

#[cfg(test)]
mod testing;

// Re-exports for public API
pub use adapters::{FsArtifactRepository, GatewaySigner, HttpUpstreamForwarder, TronHttpClient};
pub use bridge::{EthBridge, Reply};
pub use domain::config::BridgeConfig;
pub use domain::errors::{ApiError, ApiResult, BridgeError, BridgeResult, GatewayError};
pub use metrics::BridgeMetrics;
pub use service::BridgeService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
