//! Bridge configuration with validation.
//!
//! Defaults mirror what Foundry-style tooling expects from a local node:
//! `127.0.0.1:8545`, an 8M gas estimate and a 10 gwei gas price.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use zeroize::Zeroizing;

/// Main bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// JSON-RPC listener
    pub http: HttpConfig,
    /// Target-chain node and signing key
    pub tron: TronConfig,
    /// Origin-protocol node used for pass-through methods
    pub upstream: UpstreamConfig,
    /// Compiled-artifact tree
    pub artifacts: ArtifactsConfig,
    /// Receipt / code reconciliation
    pub reconciliation: ReconciliationConfig,
    /// Fixed gas answers
    pub stubs: StubsConfig,
}

impl BridgeConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tron.node_base.trim().is_empty() {
            return Err(ConfigError::MissingNodeBase);
        }
        url::Url::parse(&self.tron.node_base)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.tron.node_base, e)))?;

        let upstream = self.upstream_url();
        url::Url::parse(&upstream)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", upstream, e)))?;

        match &self.tron.private_key {
            None => return Err(ConfigError::MissingPrivateKey),
            Some(key) if !key.is_well_formed() => return Err(ConfigError::InvalidPrivateKey),
            Some(_) => {}
        }

        if self.tron.user_fee_percentage > 100 {
            return Err(ConfigError::InvalidFee(format!(
                "user_fee_percentage must be 0..=100, got {}",
                self.tron.user_fee_percentage
            )));
        }

        if self.tron.fee_limit_sun == 0 {
            return Err(ConfigError::InvalidFee("fee_limit_sun cannot be 0".into()));
        }

        if self.reconciliation.max_code_attempts == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_code_attempts cannot be 0".into(),
            ));
        }

        if self.http.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// HTTP listener bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Upstream JSON-RPC endpoint; defaults to the node's own `/jsonrpc`.
    pub fn upstream_url(&self) -> String {
        match &self.upstream.url {
            Some(url) => url.clone(),
            None => format!("{}/jsonrpc", self.tron.node_base.trim_end_matches('/')),
        }
    }

    /// Build a configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup. Unparseable values are
    /// logged and leave the default in place.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("HOST") {
            parse_into(&mut config.http.host, "HOST", &host);
        }
        if let Some(port) = get("PORT") {
            parse_into(&mut config.http.port, "PORT", &port);
        }

        let node_base = get("CHAINSTACK_BASE_ENDPOINT")
            .or_else(|| get("TRON_NODE_BASE"))
            .or_else(|| get("TRON_RPC_URL"));
        if let Some(base) = node_base {
            config.tron.node_base = normalize_node_base(&base);
        }

        if let Some(key) = get("TRON_PRIVATE_KEY").or_else(|| get("PRIVATE_KEY")) {
            config.tron.private_key = Some(PrivateKey::new(key));
        }
        if let Some(v) = get("FEE_LIMIT_SUN") {
            parse_into(&mut config.tron.fee_limit_sun, "FEE_LIMIT_SUN", &v);
        }
        if let Some(v) = get("ORIGIN_ENERGY_LIMIT") {
            parse_into(&mut config.tron.origin_energy_limit, "ORIGIN_ENERGY_LIMIT", &v);
        }
        if let Some(v) = get("USER_FEE_PERCENTAGE") {
            parse_into(&mut config.tron.user_fee_percentage, "USER_FEE_PERCENTAGE", &v);
        }
        config.tron.contract_name = get("CONTRACT_NAME");

        config.upstream.url = get("UPSTREAM_RPC_URL");

        if let Some(dir) = get("ARTIFACTS_DIR") {
            config.artifacts.root = PathBuf::from(dir);
        } else if let Some(file) = get("FOUNDRY_ARTIFACT_PATH") {
            let path = PathBuf::from(file);
            config.artifacts.root = match path.parent() {
                Some(parent) if path.extension().is_some() => parent.to_path_buf(),
                _ => path,
            };
        }

        if let Some(v) = get("MAX_CODE_ATTEMPTS") {
            parse_into(
                &mut config.reconciliation.max_code_attempts,
                "MAX_CODE_ATTEMPTS",
                &v,
            );
        }
        if let Some(v) = get("PLACEHOLDER_FALLBACK") {
            parse_into(
                &mut config.reconciliation.placeholder_fallback,
                "PLACEHOLDER_FALLBACK",
                &v,
            );
        }

        config
    }
}

fn parse_into<T: std::str::FromStr>(slot: &mut T, key: &str, raw: &str) {
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => warn!(key, value = raw, "Ignoring unparseable environment value"),
    }
}

/// Strip an API path a user may have pasted along with the node URL.
pub fn normalize_node_base(raw: &str) -> String {
    let mut base = raw.trim().trim_end_matches('/');
    for suffix in ["/jsonrpc", "/walletsolidity", "/wallet"] {
        if let Some(stripped) = base.strip_suffix(suffix) {
            base = stripped;
            break;
        }
    }
    base.trim_end_matches('/').to_string()
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address (default: 127.0.0.1)
    pub host: IpAddr,
    /// Port (default: 8545)
    pub port: u16,
    /// Max request body in bytes
    pub max_request_size: usize,
    /// Overall per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8545,
            max_request_size: 5 * 1024 * 1024,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Target-chain node, key and fee settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TronConfig {
    /// Node base URL, without `/wallet` or `/jsonrpc`
    pub node_base: String,
    /// Hex secp256k1 key the gateway signs with
    pub private_key: Option<PrivateKey>,
    /// Fee ceiling per transaction, in sun
    pub fee_limit_sun: u64,
    /// Energy the deployer pays at most per call into a deployed contract
    pub origin_energy_limit: u64,
    /// Share of energy cost charged to callers (0..=100)
    pub user_fee_percentage: u8,
    /// Overrides the artifact name on deployment
    pub contract_name: Option<String>,
}

impl Default for TronConfig {
    fn default() -> Self {
        Self {
            node_base: String::new(),
            private_key: None,
            fee_limit_sun: 150_000_000,
            origin_energy_limit: 10_000_000,
            user_fee_percentage: 100,
            contract_name: None,
        }
    }
}

/// Pass-through node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Explicit endpoint; `None` means `<node_base>/jsonrpc`
    pub url: Option<String>,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(20),
        }
    }
}

/// Compiled-artifact tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Root directory, searched recursively
    pub root: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("out"),
        }
    }
}

/// Receipt / code reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Code queries per deployment before giving up on genuine bytecode
    pub max_code_attempts: u32,
    /// Serve placeholder code once attempts are exhausted
    pub placeholder_fallback: bool,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            max_code_attempts: 10,
            placeholder_fallback: true,
        }
    }
}

/// Fixed answers for gas queries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StubsConfig {
    pub gas_estimate: u64,
    /// In wei
    pub gas_price: u128,
}

impl Default for StubsConfig {
    fn default() -> Self {
        Self {
            gas_estimate: 8_000_000,
            gas_price: 10_000_000_000,
        }
    }
}

/// Signing key, zeroed on drop and never printed.
#[derive(Clone)]
pub struct PrivateKey(Zeroizing<String>);

impl PrivateKey {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        PrivateKey(Zeroizing::new(digits.to_string()))
    }

    /// Hex digits, without `0x`.
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn is_well_formed(&self) -> bool {
        self.0.len() == 64 && self.0.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

impl Serialize for PrivateKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("<redacted>")
    }
}

impl<'de> Deserialize<'de> for PrivateKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(PrivateKey::new)
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// No Tron node configured
    #[error("no Tron node configured (set CHAINSTACK_BASE_ENDPOINT, TRON_NODE_BASE or TRON_RPC_URL)")]
    MissingNodeBase,

    /// No signing key configured
    #[error("no signing key configured (set TRON_PRIVATE_KEY or PRIVATE_KEY)")]
    MissingPrivateKey,

    /// Key is not 32 bytes of hex
    #[error("private key must be 64 hex digits")]
    InvalidPrivateKey,

    /// Unparseable URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Fee settings out of range
    #[error("invalid fee setting: {0}")]
    InvalidFee(String),

    /// Invalid limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
}

/// Duration serialization helper
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
