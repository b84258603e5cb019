//! Translation Router: JSON-RPC envelope handling and method dispatch.

use crate::bridge::{EthBridge, Reply};
use crate::domain::types::hash_hex;
use crate::domain::{Address, ApiError, ApiResult, Bytes, Hash};
use axum::http::StatusCode;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::debug;

/// Handle a raw request body: a single call or a batch.
pub async fn dispatch(bridge: &EthBridge, body: &str) -> (StatusCode, Value) {
    let request: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                error_response(Value::Null, ApiError::parse_error(e.to_string())),
            );
        }
    };

    match request {
        Value::Array(requests) => {
            if requests.is_empty() {
                return (
                    StatusCode::BAD_REQUEST,
                    error_response(Value::Null, ApiError::invalid_request()),
                );
            }
            let mut responses = Vec::with_capacity(requests.len());
            for req in &requests {
                let response = match validate_envelope(req) {
                    Ok((id, method, params)) => process_call(bridge, id, method, params).await,
                    Err(id) => error_response(id, ApiError::invalid_request()),
                };
                responses.push(response);
            }
            (StatusCode::OK, Value::Array(responses))
        }
        single => match validate_envelope(&single) {
            Ok((id, method, params)) => {
                (StatusCode::OK, process_call(bridge, id, method, params).await)
            }
            Err(id) => (
                StatusCode::BAD_REQUEST,
                error_response(id, ApiError::invalid_request()),
            ),
        },
    }
}

/// `jsonrpc` must be `"2.0"` and `method` a string. On failure returns the
/// request id (or null) for the error response.
fn validate_envelope(request: &Value) -> Result<(Value, &str, &Value), Value> {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    if request.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(id);
    }
    let Some(method) = request.get("method").and_then(Value::as_str) else {
        return Err(id);
    };
    Ok((id, method, request.get("params").unwrap_or(&Value::Null)))
}

async fn process_call(bridge: &EthBridge, id: Value, method: &str, params: &Value) -> Value {
    let started = Instant::now();
    let result = route_method(bridge, method, params, &id).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(Reply::Result(value)) => {
            bridge.metrics().record_request(true, latency_ms);
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": value
            })
        }
        Ok(Reply::Forwarded(response)) => {
            bridge.metrics().record_request(true, latency_ms);
            response
        }
        Err(e) => {
            bridge.metrics().record_request(false, latency_ms);
            debug!(method, code = e.code, error = %e, "Call failed");
            error_response(id, e)
        }
    }
}

fn error_response(id: Value, error: ApiError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": error
    })
}

/// Route one method to its translated handler, or forward it.
async fn route_method(
    bridge: &EthBridge,
    method: &str,
    params: &Value,
    id: &Value,
) -> ApiResult<Reply> {
    let reply = match method {
        // ═══════════════════════════════════════════════════════════════════
        // EMULATED
        // ═══════════════════════════════════════════════════════════════════
        "eth_getTransactionCount" => {
            let address: Address = parse_param(params, 0)?;
            Reply::Result(json!(bridge.get_transaction_count(address)))
        }

        "eth_estimateGas" => Reply::Result(json!(bridge.estimate_gas())),

        "eth_gasPrice" => Reply::Result(json!(bridge.gas_price())),

        // ═══════════════════════════════════════════════════════════════════
        // SUBMISSION
        // ═══════════════════════════════════════════════════════════════════
        "eth_sendRawTransaction" => {
            let raw: String = parse_param(params, 0)?;
            if !raw.starts_with("0x") {
                return Err(ApiError::invalid_params("expected 0x-prefixed hex"));
            }
            let raw = Bytes::from_hex(&raw).map_err(|e| ApiError::invalid_params(e.to_string()))?;
            let hash = bridge.send_raw_transaction(raw).await?;
            Reply::Result(json!(hash_hex(&hash)))
        }

        // ═══════════════════════════════════════════════════════════════════
        // RECONCILED
        // ═══════════════════════════════════════════════════════════════════
        "eth_getTransactionReceipt" => {
            let hash: Hash = parse_param(params, 0)?;
            bridge.get_transaction_receipt(hash, id.clone()).await?
        }

        "eth_getCode" => {
            let address: Address = parse_param(params, 0)?;
            let block: Option<Value> = parse_param_optional(params, 1);
            bridge.get_code(address, block, id.clone()).await?
        }

        "eth_getTransactionByHash" => {
            let hash: Hash = parse_param(params, 0)?;
            bridge.get_transaction_by_hash(hash, id.clone()).await?
        }

        "eth_getBalance" | "eth_getStorageAt" => {
            let list = match params {
                Value::Array(items) => items.clone(),
                Value::Null => Vec::new(),
                other => vec![other.clone()],
            };
            bridge.forward_aliased(method, list, id.clone()).await?
        }

        // ═══════════════════════════════════════════════════════════════════
        // PASS-THROUGH
        // ═══════════════════════════════════════════════════════════════════
        _ => bridge.forward(method, params.clone(), id.clone()).await?,
    };
    Ok(reply)
}

/// Parse a required parameter from JSON-RPC params array.
fn parse_param<T: serde::de::DeserializeOwned>(params: &Value, index: usize) -> ApiResult<T> {
    let param = positional(params, index)
        .ok_or_else(|| ApiError::invalid_params(format!("missing parameter at index {}", index)))?;

    serde_json::from_value(param.clone()).map_err(|e| {
        ApiError::invalid_params(format!("invalid parameter at index {}: {}", index, e))
    })
}

/// Parse an optional parameter from JSON-RPC params array.
fn parse_param_optional<T: serde::de::DeserializeOwned>(params: &Value, index: usize) -> Option<T> {
    positional(params, index)
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn positional(params: &Value, index: usize) -> Option<&Value> {
    match params {
        Value::Array(items) => items.get(index),
        Value::Null => None,
        single if index == 0 => Some(single),
        _ => None,
    }
}
