//! Bridge counters, served as JSON at `GET /metrics`.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct BridgeMetrics {
    // Request counters
    pub requests_total: AtomicU64,
    pub requests_success: AtomicU64,
    pub requests_error: AtomicU64,
    pub forwarded_total: AtomicU64,

    // Submissions
    pub creations_submitted: AtomicU64,
    pub invocations_submitted: AtomicU64,
    pub broadcast_rejected: AtomicU64,

    // Reconciliation outcomes
    pub deployments_resolved: AtomicU64,
    pub placeholder_fallbacks: AtomicU64,
    pub deployments_failed: AtomicU64,

    // Latency tracking
    pub total_latency_ms: AtomicU64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one JSON-RPC call
    pub fn record_request(&self, success: bool, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.requests_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_error.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_forwarded(&self) {
        self.forwarded_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission(&self, creation: bool) {
        if creation {
            self.creations_submitted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.invocations_submitted.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_broadcast_rejected(&self) {
        self.broadcast_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Genuine bytecode retrieved for a deployment
    pub fn record_resolved(&self) {
        self.deployments_resolved.fetch_add(1, Ordering::Relaxed);
    }

    /// Placeholder code served instead of genuine bytecode
    pub fn record_placeholder(&self) {
        self.placeholder_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.deployments_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.requests_total.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    pub fn to_json(&self) -> Value {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        json!({
            "requests": {
                "total": load(&self.requests_total),
                "success": load(&self.requests_success),
                "error": load(&self.requests_error),
                "forwarded": load(&self.forwarded_total),
                "average_latency_ms": self.average_latency_ms(),
            },
            "submissions": {
                "creations": load(&self.creations_submitted),
                "invocations": load(&self.invocations_submitted),
                "broadcast_rejected": load(&self.broadcast_rejected),
            },
            "deployments": {
                "resolved": load(&self.deployments_resolved),
                "placeholder": load(&self.placeholder_fallbacks),
                "failed": load(&self.deployments_failed),
            },
        })
    }
}
