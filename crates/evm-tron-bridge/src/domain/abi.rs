//! ABI type model shared by both chains.
//!
//! Tron executes the same contract ABI as the EVM, so one closed type model
//! serves both directions; only the JSON rendering of values differs.

use super::errors::BridgeError;
use super::types::Address;
use primitive_types::U256;
use serde_json::Value;

/// ABI type tag, parsed from a JSON ABI parameter (`type` + `components`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiType {
    Address,
    /// Unsigned integer of the given bit width.
    Uint(usize),
    /// Signed integer of the given bit width.
    Int(usize),
    Bool,
    String,
    Bytes,
    /// `bytesN`, 1 <= N <= 32.
    FixedBytes(usize),
    /// `T[]` (`None`) or `T[k]` (`Some(k)`).
    Array(Box<AbiType>, Option<usize>),
    Tuple(Vec<AbiType>),
    /// Well-formed but untranslated tag (`function`, `fixed128x18`, ...).
    /// Occupies one static word.
    Other(String),
}

impl AbiType {
    /// Parse a JSON ABI parameter object.
    pub fn from_json(param: &Value) -> Result<Self, BridgeError> {
        let ty = param
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| BridgeError::UnsupportedAbiType("parameter without a type".into()))?;
        Self::parse(ty, param.get("components"))
    }

    fn parse(ty: &str, components: Option<&Value>) -> Result<Self, BridgeError> {
        if let Some(stripped) = ty.strip_suffix(']') {
            let open = stripped.rfind('[').ok_or_else(|| {
                BridgeError::UnsupportedAbiType(format!("unbalanced array type '{}'", ty))
            })?;
            let inner = Self::parse(&stripped[..open], components)?;
            let dimension = &stripped[open + 1..];
            let len = if dimension.is_empty() {
                None
            } else {
                Some(dimension.parse::<usize>().map_err(|_| {
                    BridgeError::UnsupportedAbiType(format!("bad array length in '{}'", ty))
                })?)
            };
            return AbiType::Array(Box::new(inner), len).sized(ty);
        }

        let parsed = match ty {
            "address" => AbiType::Address,
            "bool" => AbiType::Bool,
            "string" => AbiType::String,
            "bytes" => AbiType::Bytes,
            "uint" => AbiType::Uint(256),
            "int" => AbiType::Int(256),
            "tuple" => {
                let members = components.and_then(Value::as_array).ok_or_else(|| {
                    BridgeError::UnsupportedAbiType("tuple without components".into())
                })?;
                return AbiType::Tuple(
                    members
                        .iter()
                        .map(AbiType::from_json)
                        .collect::<Result<_, _>>()?,
                )
                .sized(ty);
            }
            other => {
                if let Some(bits) = other.strip_prefix("uint").and_then(integer_width) {
                    AbiType::Uint(bits)
                } else if let Some(bits) = other.strip_prefix("int").and_then(integer_width) {
                    AbiType::Int(bits)
                } else if let Some(size) = other
                    .strip_prefix("bytes")
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|n| (1..=32).contains(n))
                {
                    AbiType::FixedBytes(size)
                } else {
                    AbiType::Other(other.to_string())
                }
            }
        };
        Ok(parsed)
    }

    /// Whether the value is encoded out of line (head holds an offset).
    pub fn is_dynamic(&self) -> bool {
        match self {
            AbiType::String | AbiType::Bytes | AbiType::Array(_, None) => true,
            AbiType::Array(inner, Some(_)) => inner.is_dynamic(),
            AbiType::Tuple(members) => members.iter().any(AbiType::is_dynamic),
            _ => false,
        }
    }

    /// Size of a static value in the head section. Saturates for types
    /// whose head does not fit in `usize`; parsing rejects those.
    pub fn head_size(&self) -> usize {
        self.checked_head_size().unwrap_or(usize::MAX)
    }

    fn checked_head_size(&self) -> Option<usize> {
        match self {
            AbiType::Array(inner, Some(len)) if !self.is_dynamic() => {
                inner.checked_head_size()?.checked_mul(*len)
            }
            AbiType::Tuple(members) if !self.is_dynamic() => members
                .iter()
                .try_fold(0usize, |total, member| {
                    total.checked_add(member.checked_head_size()?)
                }),
            _ => Some(32),
        }
    }

    fn sized(self, ty: &str) -> Result<Self, BridgeError> {
        match self.checked_head_size() {
            Some(_) => Ok(self),
            None => Err(BridgeError::UnsupportedAbiType(format!(
                "'{}' is too large to encode",
                ty
            ))),
        }
    }

    /// Canonical type string, as used in signatures.
    pub fn canonical(&self) -> String {
        match self {
            AbiType::Address => "address".into(),
            AbiType::Uint(bits) => format!("uint{}", bits),
            AbiType::Int(bits) => format!("int{}", bits),
            AbiType::Bool => "bool".into(),
            AbiType::String => "string".into(),
            AbiType::Bytes => "bytes".into(),
            AbiType::FixedBytes(n) => format!("bytes{}", n),
            AbiType::Array(inner, None) => format!("{}[]", inner.canonical()),
            AbiType::Array(inner, Some(len)) => format!("{}[{}]", inner.canonical(), len),
            AbiType::Tuple(members) => format!(
                "({})",
                members
                    .iter()
                    .map(AbiType::canonical)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            AbiType::Other(name) => name.clone(),
        }
    }
}

fn integer_width(digits: &str) -> Option<usize> {
    digits
        .parse::<usize>()
        .ok()
        .filter(|bits| *bits >= 8 && *bits <= 256 && bits % 8 == 0)
}

/// Declared input types of the constructor in a JSON ABI. An ABI without a
/// constructor entry means a constructor with no inputs.
pub fn constructor_inputs(abi: &Value) -> Result<Vec<AbiType>, BridgeError> {
    let constructor = abi.as_array().and_then(|entries| {
        entries
            .iter()
            .find(|entry| entry.get("type").and_then(Value::as_str) == Some("constructor"))
    });

    match constructor.and_then(|c| c.get("inputs")).and_then(Value::as_array) {
        Some(inputs) => inputs.iter().map(AbiType::from_json).collect(),
        None => Ok(Vec::new()),
    }
}

/// A decoded origin-chain ABI value.
///
/// Signed integers keep their 256-bit two's-complement word so that decoding
/// and re-encoding is lossless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Uint(U256),
    Int(U256),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    FixedBytes(Vec<u8>),
    Array(Vec<AbiValue>),
    Tuple(Vec<AbiValue>),
    /// Raw word of an [`AbiType::Other`] value.
    Word([u8; 32]),
}
