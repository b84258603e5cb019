//! Bridge error types and their JSON-RPC 2.0 rendering.
//!
//! [`BridgeError`] is what the translation core returns. [`ApiError`] is what
//! goes on the wire; every translated-call failure becomes `-32603` with the
//! bridge error's message attached as `data`.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Standard JSON-RPC 2.0 error codes
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Failure of a single translated call.
///
/// "Not yet available" is not a variant: it is a `null` result, modelled as
/// `Ok(None)` or a pending state by the reconciliation engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The signed envelope could not be parsed or its signature does not
    /// recover a sender.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    /// The transaction uses something the gateway cannot translate, such as
    /// a native value transfer.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// The recovered sender is not the gateway's signer.
    #[error("sender mismatch: transaction signed by {decoded}, gateway signs as {expected}")]
    SenderMismatch {
        /// Sender recovered from the signature.
        decoded: String,
        /// Address of the configured signer.
        expected: String,
    },

    /// No compiled artifact is a prefix of the creation payload.
    #[error("no compiled artifact matches the creation payload ({payload_len} bytes)")]
    NoArtifactMatch {
        /// Length of the payload that failed to match.
        payload_len: usize,
    },

    /// The target chain refused the submission.
    #[error("broadcast rejected by target chain: {0}")]
    BroadcastRejected(String),

    /// A value is structurally incompatible with its declared ABI type.
    #[error("unsupported ABI value: {0}")]
    UnsupportedAbiType(String),

    /// The upstream forwarding node failed.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    /// The target-chain node could not be reached or answered nonsense.
    #[error("target chain fault: {0}")]
    TargetChain(String),

    /// Reading the artifact tree failed.
    #[error("artifact repository error: {0}")]
    Artifact(String),

    /// A request parameter is missing or malformed.
    #[error("invalid params: {0}")]
    InvalidParams(String),
}

/// Result alias for the translation core.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// JSON-RPC error object, as placed under `"error"` in a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiError {
    fn new(code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    /// -32700: the body is not JSON.
    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(
            codes::PARSE_ERROR,
            format!("Parse error: {}", details.into()),
            None,
        )
    }

    /// -32600: not a JSON-RPC 2.0 envelope.
    pub fn invalid_request() -> Self {
        Self::new(codes::INVALID_REQUEST, "Invalid Request", None)
    }

    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_PARAMS,
            format!("Invalid params: {}", details.into()),
            None,
        )
    }

    /// -32603 with the failure text under `data`.
    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            codes::INTERNAL_ERROR,
            "Internal error",
            Some(Value::String(details.into())),
        )
    }
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::InvalidParams(details) => ApiError::invalid_params(details),
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Service-level errors (startup, not per call)
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// HTTP server terminated with an error
    #[error("server error: {0}")]
    Serve(String),
}
