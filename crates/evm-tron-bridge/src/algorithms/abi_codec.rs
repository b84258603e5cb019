//! Contract ABI head/tail encoding.
//!
//! Both chains run the same contract ABI, so this one codec decodes the
//! constructor arguments a client appended to its creation payload and
//! re-encodes them as the Tron `parameter` field.

use crate::domain::{AbiType, AbiValue, Address, BridgeError};
use primitive_types::U256;
use std::iter;

const WORD: usize = 32;

/// Decode `data` as a sequence of `types` (no selector).
pub fn decode_params(types: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>, BridgeError> {
    Decoder::new(data).sequence(types.iter(), 0)
}

/// Encode `values` as a sequence of `types` (no selector).
pub fn encode_params(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>, BridgeError> {
    if types.len() != values.len() {
        return Err(BridgeError::UnsupportedAbiType(format!(
            "expected {} values, got {}",
            types.len(),
            values.len()
        )));
    }
    encode_sequence(types.iter().zip(values))
}

/// Work units a decode may spend per payload byte. Offsets can alias, so
/// the payload size alone does not bound the decoded tree.
const BUDGET_PER_BYTE: usize = 32;
const MIN_BUDGET: usize = 1024;

struct Decoder<'d> {
    data: &'d [u8],
    budget: usize,
}

impl<'d> Decoder<'d> {
    fn new(data: &'d [u8]) -> Self {
        Self {
            data,
            budget: data.len().saturating_mul(BUDGET_PER_BYTE).max(MIN_BUDGET),
        }
    }

    fn charge(&mut self, units: usize) -> Result<(), BridgeError> {
        self.budget = self
            .budget
            .checked_sub(units)
            .ok_or_else(|| malformed("decoded values exceed the payload budget"))?;
        Ok(())
    }

    fn sequence<'t>(
        &mut self,
        types: impl Iterator<Item = &'t AbiType>,
        base: usize,
    ) -> Result<Vec<AbiValue>, BridgeError> {
        let mut values = Vec::new();
        let mut cursor = base;
        for ty in types {
            if ty.is_dynamic() {
                let offset = read_length(self.data, cursor)?;
                let at = base
                    .checked_add(offset)
                    .ok_or_else(|| malformed("offset overflow"))?;
                values.push(self.value(ty, at)?);
                cursor += WORD;
            } else {
                values.push(self.value(ty, cursor)?);
                cursor = cursor
                    .checked_add(ty.head_size())
                    .ok_or_else(|| malformed("offset overflow"))?;
            }
        }
        Ok(values)
    }

    fn value(&mut self, ty: &AbiType, at: usize) -> Result<AbiValue, BridgeError> {
        self.charge(1)?;
        let data = self.data;
        let value = match ty {
            AbiType::Address => {
                AbiValue::Address(Address::from_slice(&read_word(data, at)?[12..]))
            }
            AbiType::Uint(_) => AbiValue::Uint(U256::from_big_endian(read_word(data, at)?)),
            AbiType::Int(_) => AbiValue::Int(U256::from_big_endian(read_word(data, at)?)),
            AbiType::Bool => AbiValue::Bool(read_word(data, at)?[WORD - 1] != 0),
            AbiType::FixedBytes(size) => {
                AbiValue::FixedBytes(read_word(data, at)?[..*size].to_vec())
            }
            AbiType::Bytes => {
                let raw = read_tail_bytes(data, at)?;
                self.charge(raw.len())?;
                AbiValue::Bytes(raw.to_vec())
            }
            AbiType::String => {
                let raw = read_tail_bytes(data, at)?;
                self.charge(raw.len())?;
                AbiValue::String(
                    String::from_utf8(raw.to_vec())
                        .map_err(|_| malformed("string is not UTF-8"))?,
                )
            }
            AbiType::Array(inner, Some(len)) => {
                if *len > data.len() {
                    return Err(malformed("fixed array longer than payload"));
                }
                AbiValue::Array(self.sequence(iter::repeat(inner.as_ref()).take(*len), at)?)
            }
            AbiType::Array(inner, None) => {
                let len = read_length(data, at)?;
                AbiValue::Array(self.sequence(
                    iter::repeat(inner.as_ref()).take(len),
                    at + WORD,
                )?)
            }
            AbiType::Tuple(members) => AbiValue::Tuple(self.sequence(members.iter(), at)?),
            AbiType::Other(_) => {
                let mut word = [0u8; WORD];
                word.copy_from_slice(read_word(data, at)?);
                AbiValue::Word(word)
            }
        };
        Ok(value)
    }
}

fn encode_sequence<'a>(
    items: impl Iterator<Item = (&'a AbiType, &'a AbiValue)>,
) -> Result<Vec<u8>, BridgeError> {
    let items: Vec<_> = items.collect();
    let head_len: usize = items
        .iter()
        .map(|(ty, _)| if ty.is_dynamic() { WORD } else { ty.head_size() })
        .sum();

    let mut head = Vec::new();
    let mut tail = Vec::new();
    for (ty, value) in items {
        let encoded = encode_value(ty, value)?;
        if ty.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend_from_slice(&encoded);
        } else {
            head.extend_from_slice(&encoded);
        }
    }
    head.extend_from_slice(&tail);
    Ok(head)
}

fn encode_value(ty: &AbiType, value: &AbiValue) -> Result<Vec<u8>, BridgeError> {
    let encoded = match (ty, value) {
        (AbiType::Address, AbiValue::Address(address)) => {
            let mut word = vec![0u8; WORD];
            word[12..].copy_from_slice(address.as_bytes());
            word
        }
        (AbiType::Uint(bits), AbiValue::Uint(n)) => {
            if n.bits() > *bits {
                return Err(BridgeError::UnsupportedAbiType(format!(
                    "{} does not fit in uint{}",
                    n, bits
                )));
            }
            u256_word(n).to_vec()
        }
        (AbiType::Int(_), AbiValue::Int(raw)) => u256_word(raw).to_vec(),
        (AbiType::Bool, AbiValue::Bool(flag)) => u256_word(&U256::from(*flag as u8)).to_vec(),
        (AbiType::FixedBytes(size), AbiValue::FixedBytes(bytes)) if bytes.len() == *size => {
            let mut word = vec![0u8; WORD];
            word[..*size].copy_from_slice(bytes);
            word
        }
        (AbiType::Bytes, AbiValue::Bytes(bytes)) => encode_tail_bytes(bytes),
        (AbiType::String, AbiValue::String(text)) => encode_tail_bytes(text.as_bytes()),
        (AbiType::Array(inner, Some(len)), AbiValue::Array(items)) => {
            if items.len() != *len {
                return Err(BridgeError::UnsupportedAbiType(format!(
                    "{} expects {} elements, got {}",
                    ty.canonical(),
                    len,
                    items.len()
                )));
            }
            encode_sequence(iter::repeat(inner.as_ref()).zip(items))?
        }
        (AbiType::Array(inner, None), AbiValue::Array(items)) => {
            let mut out = usize_word(items.len()).to_vec();
            out.extend(encode_sequence(iter::repeat(inner.as_ref()).zip(items))?);
            out
        }
        (AbiType::Tuple(members), AbiValue::Tuple(items)) => {
            if members.len() != items.len() {
                return Err(BridgeError::UnsupportedAbiType(format!(
                    "{} has {} components, got {}",
                    ty.canonical(),
                    members.len(),
                    items.len()
                )));
            }
            encode_sequence(members.iter().zip(items))?
        }
        (AbiType::Other(_), AbiValue::Word(word)) => word.to_vec(),
        (ty, value) => {
            return Err(BridgeError::UnsupportedAbiType(format!(
                "value {:?} cannot be encoded as {}",
                value,
                ty.canonical()
            )))
        }
    };
    Ok(encoded)
}

fn read_word(data: &[u8], at: usize) -> Result<&[u8], BridgeError> {
    at.checked_add(WORD)
        .and_then(|end| data.get(at..end))
        .ok_or_else(|| malformed("payload ends inside a word"))
}

fn read_length(data: &[u8], at: usize) -> Result<usize, BridgeError> {
    let value = U256::from_big_endian(read_word(data, at)?);
    if value > U256::from(data.len()) {
        return Err(malformed("length or offset beyond payload"));
    }
    Ok(value.as_usize())
}

fn read_tail_bytes(data: &[u8], at: usize) -> Result<&[u8], BridgeError> {
    let len = read_length(data, at)?;
    let start = at + WORD;
    data.get(start..start + len)
        .ok_or_else(|| malformed("byte string runs past payload"))
}

fn encode_tail_bytes(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = usize_word(bytes.len()).to_vec();
    out.extend_from_slice(bytes);
    out.resize(WORD + padded, 0);
    out
}

fn u256_word(value: &U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

fn usize_word(value: usize) -> [u8; WORD] {
    u256_word(&U256::from(value))
}

fn malformed(reason: &str) -> BridgeError {
    BridgeError::MalformedTransaction(format!("constructor arguments: {}", reason))
}
