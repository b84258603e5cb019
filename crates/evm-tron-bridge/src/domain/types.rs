//! Origin-chain primitive types with JSON-RPC serialization.
//!
//! Everything crossing the Ethereum JSON-RPC surface is a `0x`-prefixed hex
//! string: quantities without leading zeros, data with an even digit count.

use primitive_types::U256 as PrimitiveU256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub use primitive_types::{H160 as Address, H256 as Hash};

/// 256-bit quantity rendered as a `0x` hex string on the wire.
///
/// Reads hex strings, decimal strings and plain JSON numbers, since clients
/// are not consistent about which one they send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct U256(pub PrimitiveU256);

impl U256 {
    pub const ZERO: U256 = U256(PrimitiveU256::zero());

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn inner(&self) -> PrimitiveU256 {
        self.0
    }

    /// Big-endian bytes, at most 32.
    pub fn from_be_slice(bytes: &[u8]) -> Self {
        U256(PrimitiveU256::from_big_endian(bytes))
    }

    fn parse(text: &str) -> Result<Self, String> {
        match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some("") => Ok(U256::ZERO),
            Some(digits) => PrimitiveU256::from_str_radix(digits, 16)
                .map(U256)
                .map_err(|_| format!("'{}' is not a hex quantity", text)),
            None => PrimitiveU256::from_dec_str(text)
                .map(U256)
                .map_err(|_| format!("'{}' is not a decimal quantity", text)),
        }
    }
}

impl From<u64> for U256 {
    fn from(value: u64) -> Self {
        U256(value.into())
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl Serialize for U256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for U256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Quantity {
            Number(u64),
            Text(String),
        }

        match Quantity::deserialize(deserializer)? {
            Quantity::Number(n) => Ok(U256::from(n)),
            Quantity::Text(text) => U256::parse(&text).map_err(de::Error::custom),
        }
    }
}

/// Arbitrary data, `0x`-prefixed hex on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a hex string with or without the `0x` prefix.
    pub fn from_hex(value: &str) -> Result<Self, hex::FromHexError> {
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);
        hex::decode(digits).map(Bytes)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Bytes::from_hex(&text).map_err(|e| de::Error::custom(format!("invalid hex data: {}", e)))
    }
}

/// Format a `u64` as a JSON-RPC quantity.
pub fn quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

/// `0x`-prefixed lowercase address form used in responses.
pub fn address_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

/// `0x`-prefixed hash form used in responses.
pub fn hash_hex(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_serialization() {
        let value = U256::from(10_000_000_000u64);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"0x2540be400\"");
    }

    #[test]
    fn test_u256_accepts_hex_decimal_and_number() {
        let a: U256 = serde_json::from_str("\"0x10\"").unwrap();
        let b: U256 = serde_json::from_str("\"16\"").unwrap();
        let c: U256 = serde_json::from_str("16").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_bytes_hex() {
        let data: Bytes = serde_json::from_str("\"0xdeadbeef\"").unwrap();
        assert_eq!(data.0, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(serde_json::to_string(&data).unwrap(), "\"0xdeadbeef\"");
    }

    #[test]
    fn test_bytes_rejects_odd_hex() {
        assert!(serde_json::from_str::<Bytes>("\"0xabc\"").is_err());
    }

    #[test]
    fn test_quantity() {
        assert_eq!(quantity(0), "0x0");
        assert_eq!(quantity(8_000_000), "0x7a1200");
    }
}
