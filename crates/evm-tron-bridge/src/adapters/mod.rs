//! Adapters: concrete implementations of the outbound ports, plus the
//! gateway signing key.

pub mod artifact_fs;
pub mod signer;
pub mod tron_http;
pub mod upstream_http;

pub use artifact_fs::FsArtifactRepository;
pub use signer::GatewaySigner;
pub use tron_http::TronHttpClient;
pub use upstream_http::HttpUpstreamForwarder;
