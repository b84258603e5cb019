//! Pass-through JSON-RPC forwarding over HTTP.

use crate::domain::BridgeError;
use crate::ports::UpstreamForwarder;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Forwards untranslated calls to an origin-protocol node.
#[derive(Debug, Clone)]
pub struct HttpUpstreamForwarder {
    client: reqwest::Client,
    url: Url,
}

impl HttpUpstreamForwarder {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let url = Url::parse(url)
            .map_err(|e| BridgeError::UpstreamFailure(format!("invalid upstream url '{url}': {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::UpstreamFailure(e.to_string()))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl UpstreamForwarder for HttpUpstreamForwarder {
    async fn forward(&self, method: &str, params: Value, id: Value) -> Result<Value, BridgeError> {
        let params = if params.is_null() { json!([]) } else { params };
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, url = %self.url, "Forwarding upstream");

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| BridgeError::UpstreamFailure(format!("{method}: {e}")))?;

        let status = response.status();
        response.json::<Value>().await.map_err(|e| {
            BridgeError::UpstreamFailure(format!("{method}: HTTP {status}, unreadable body: {e}"))
        })
    }
}
