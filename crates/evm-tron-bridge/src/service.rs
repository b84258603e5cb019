//! Gateway service: wires adapters into the bridge and serves JSON-RPC over
//! HTTP.

use crate::adapters::{FsArtifactRepository, GatewaySigner, HttpUpstreamForwarder, TronHttpClient};
use crate::bridge::EthBridge;
use crate::domain::types::address_hex;
use crate::domain::{BridgeConfig, ConfigError, GatewayError};
use crate::metrics::BridgeMetrics;
use crate::rpc;
use axum::{
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// The running gateway.
pub struct BridgeService {
    config: BridgeConfig,
    bridge: Arc<EthBridge>,
    metrics: Arc<BridgeMetrics>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl BridgeService {
    /// Wrap an already-assembled bridge.
    pub fn new(config: BridgeConfig, bridge: Arc<EthBridge>) -> Self {
        let metrics = bridge.metrics();
        Self {
            config,
            bridge,
            metrics,
            shutdown_tx: None,
        }
    }

    /// Validate `config` and assemble the bridge against the real node,
    /// upstream and artifact tree.
    pub fn from_config(config: BridgeConfig) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let key = config
            .tron
            .private_key
            .as_ref()
            .ok_or_else(|| GatewayError::Config(ConfigError::MissingPrivateKey.to_string()))?;
        let signer = GatewaySigner::new(key).map_err(|e| GatewayError::Config(e.to_string()))?;

        let chain = TronHttpClient::new(&config.tron.node_base, config.upstream.timeout)
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        let upstream_url = config.upstream_url();
        let upstream = HttpUpstreamForwarder::new(&upstream_url, config.upstream.timeout)
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        let artifacts = FsArtifactRepository::new(config.artifacts.root.clone());

        info!(
            signer = %address_hex(&signer.evm_address()),
            tron_signer = %signer.tron_address(),
            node = %config.tron.node_base,
            upstream = %upstream_url,
            artifacts = %config.artifacts.root.display(),
            "Bridge configured"
        );

        let bridge = EthBridge::new(
            &config,
            signer,
            Arc::new(chain),
            Arc::new(upstream),
            Arc::new(artifacts),
            Arc::new(BridgeMetrics::new()),
        );
        Ok(Self::new(config, Arc::new(bridge)))
    }

    pub fn metrics(&self) -> Arc<BridgeMetrics> {
        Arc::clone(&self.metrics)
    }

    /// HTTP router: JSON-RPC on `POST /`, plus `/health` and `/metrics`.
    pub fn router(&self) -> Router {
        let state = AppState {
            bridge: Arc::clone(&self.bridge),
            metrics: Arc::clone(&self.metrics),
        };

        let middleware = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(self.config.http.max_request_size))
            .layer(DefaultBodyLimit::disable())
            .layer(TimeoutLayer::new(self.config.http.request_timeout));

        Router::new()
            .route("/", post(handle_json_rpc))
            .route("/health", get(health_check))
            .route("/metrics", get(metrics_snapshot))
            .layer(middleware)
            .with_state(state)
    }

    /// Bind the configured address and serve until [`shutdown`](Self::shutdown)
    /// is called or the server fails.
    pub async fn start(&mut self) -> Result<(), GatewayError> {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{}: {}", addr, e)))?;

        self.serve(listener, async {
            let _ = shutdown_rx.await;
        })
        .await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        info!(addr = %addr, "JSON-RPC gateway listening");

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        match result {
            Ok(()) => {
                info!("JSON-RPC gateway stopped");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "HTTP server error");
                Err(GatewayError::Serve(e.to_string()))
            }
        }
    }

    /// Trigger graceful shutdown of a server started with [`start`](Self::start).
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    bridge: Arc<EthBridge>,
    metrics: Arc<BridgeMetrics>,
}

async fn handle_json_rpc(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let (status, response) = rpc::dispatch(&state.bridge, &body).await;
    (status, Json(response))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "evm-tron-bridge",
        "version": env!("CARGO_PKG_VERSION"),
        "signer": {
            "evm": address_hex(&state.bridge.signer_address()),
            "tron": state.bridge.signer_tron_address().to_string(),
        }
    }))
}

async fn metrics_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PrivateKey;
    use crate::ports::{InMemoryArtifacts, MockTargetChain, MockUpstream};
    use crate::testing::{signer_address, SIGNER_KEY_HEX};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn service(config: BridgeConfig) -> BridgeService {
        let bridge = EthBridge::new(
            &config,
            GatewaySigner::new(&PrivateKey::new(SIGNER_KEY_HEX)).unwrap(),
            Arc::new(MockTargetChain::new()),
            Arc::new(MockUpstream::new()),
            Arc::new(InMemoryArtifacts::default()),
            Arc::new(BridgeMetrics::new()),
        );
        BridgeService::new(config, Arc::new(bridge))
    }

    fn rpc_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_from_config_rejects_missing_key() {
        let mut config = BridgeConfig::default();
        config.tron.node_base = "https://tron.example".into();
        assert!(matches!(
            BridgeService::from_config(config),
            Err(GatewayError::Config(_))
        ));
    }

    #[test]
    fn test_from_config_assembles_with_valid_settings() {
        let mut config = BridgeConfig::default();
        config.tron.node_base = "https://tron.example".into();
        config.tron.private_key = Some(PrivateKey::new(SIGNER_KEY_HEX));
        assert!(BridgeService::from_config(config).is_ok());
    }

    #[tokio::test]
    async fn test_health_reports_signer() {
        let response = service(BridgeConfig::default())
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["signer"]["evm"], address_hex(&signer_address()));
        assert!(body["signer"]["tron"].as_str().unwrap().starts_with('T'));
    }

    #[tokio::test]
    async fn test_json_rpc_round_trip_counts_request() {
        let service = service(BridgeConfig::default());
        let router = service.router();

        let response = router
            .clone()
            .oneshot(rpc_request(
                r#"{"jsonrpc":"2.0","id":7,"method":"eth_gasPrice","params":[]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "jsonrpc": "2.0", "id": 7, "result": "0x2540be400" })
        );

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await["requests"]["total"], 1);
    }

    #[tokio::test]
    async fn test_parse_error_is_http_400() {
        let response = service(BridgeConfig::default())
            .router()
            .oneshot(rpc_request("not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mut config = BridgeConfig::default();
        config.http.max_request_size = 16;
        let response = service(config)
            .router()
            .oneshot(rpc_request(
                r#"{"jsonrpc":"2.0","id":1,"method":"eth_gasPrice","params":[]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let service = service(BridgeConfig::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            service
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await
        });

        let body: Value = reqwest::Client::new()
            .post(format!("http://{}/", addr))
            .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": "eth_estimateGas", "params": [] }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["result"], "0x7a1200");

        tx.send(()).unwrap();
        assert!(server.await.unwrap().is_ok());
    }
}
