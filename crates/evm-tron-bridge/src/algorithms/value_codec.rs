//! Value Codec: origin-chain ABI values to Tron-native values and back.
//!
//! Dispatch is by declared ABI type only. Containers recurse into their
//! declared component types; values are never inspected to guess a type.

use crate::domain::{AbiType, AbiValue, BridgeError, TronAddress, TronValue};
use primitive_types::U256;
use tracing::warn;

/// Translate one decoded origin value into its Tron representation.
pub fn encode_for_target(value: &AbiValue, ty: &AbiType) -> Result<TronValue, BridgeError> {
    let translated = match (ty, value) {
        (AbiType::Address, AbiValue::Address(address)) => {
            TronValue::Address(TronAddress::from_evm(address))
        }
        (AbiType::Uint(_), AbiValue::Uint(n)) => TronValue::Integer(n.to_string()),
        (AbiType::Int(_), AbiValue::Int(raw)) => TronValue::Integer(signed_decimal(raw)),
        (AbiType::Bool, AbiValue::Bool(flag)) => TronValue::Bool(*flag),
        (AbiType::String, AbiValue::String(text)) => TronValue::Text(text.clone()),
        (AbiType::Bytes, AbiValue::Bytes(bytes))
        | (AbiType::FixedBytes(_), AbiValue::FixedBytes(bytes)) => {
            TronValue::Bytes(format!("0x{}", hex::encode(bytes)))
        }
        (AbiType::Array(inner, len), AbiValue::Array(items)) => {
            check_length(ty, *len, items.len())?;
            TronValue::List(
                items
                    .iter()
                    .map(|item| encode_for_target(item, inner))
                    .collect::<Result<_, _>>()?,
            )
        }
        (AbiType::Tuple(members), AbiValue::Tuple(items)) => {
            check_arity(ty, members.len(), items.len())?;
            TronValue::List(
                items
                    .iter()
                    .zip(members)
                    .map(|(item, member)| encode_for_target(item, member))
                    .collect::<Result<_, _>>()?,
            )
        }
        (AbiType::Other(name), AbiValue::Word(word)) => {
            warn!(abi_type = %name, "Passing untranslated ABI value through unchanged");
            TronValue::Untranslated(format!("0x{}", hex::encode(word)))
        }
        (ty, value) => return Err(mismatch(ty, value)),
    };
    Ok(translated)
}

/// Inverse of [`encode_for_target`].
pub fn decode_from_target(value: &TronValue, ty: &AbiType) -> Result<AbiValue, BridgeError> {
    let decoded = match (ty, value) {
        (AbiType::Address, TronValue::Address(address)) => AbiValue::Address(address.evm()),
        (AbiType::Address, TronValue::Text(text)) => AbiValue::Address(
            TronAddress::parse(text)
                .map_err(|e| BridgeError::UnsupportedAbiType(e.to_string()))?
                .evm(),
        ),
        (AbiType::Uint(bits), TronValue::Integer(text)) => {
            AbiValue::Uint(parse_unsigned(text, *bits)?)
        }
        (AbiType::Int(bits), TronValue::Integer(text)) => AbiValue::Int(parse_signed(text, *bits)?),
        (AbiType::Bool, TronValue::Bool(flag)) => AbiValue::Bool(*flag),
        (AbiType::String, TronValue::Text(text)) => AbiValue::String(text.clone()),
        (AbiType::Bytes, TronValue::Bytes(text)) => AbiValue::Bytes(parse_hex(text)?),
        (AbiType::FixedBytes(size), TronValue::Bytes(text)) => {
            let bytes = parse_hex(text)?;
            if bytes.len() != *size {
                return Err(BridgeError::UnsupportedAbiType(format!(
                    "bytes{} value has {} bytes",
                    size,
                    bytes.len()
                )));
            }
            AbiValue::FixedBytes(bytes)
        }
        (AbiType::Array(inner, len), TronValue::List(items)) => {
            check_length(ty, *len, items.len())?;
            AbiValue::Array(
                items
                    .iter()
                    .map(|item| decode_from_target(item, inner))
                    .collect::<Result<_, _>>()?,
            )
        }
        (AbiType::Tuple(members), TronValue::List(items)) => {
            check_arity(ty, members.len(), items.len())?;
            AbiValue::Tuple(
                items
                    .iter()
                    .zip(members)
                    .map(|(item, member)| decode_from_target(item, member))
                    .collect::<Result<_, _>>()?,
            )
        }
        (AbiType::Other(_), TronValue::Untranslated(text)) => {
            let bytes = parse_hex(text)?;
            let word: [u8; 32] = bytes.try_into().map_err(|_| {
                BridgeError::UnsupportedAbiType("untranslated value is not one word".into())
            })?;
            AbiValue::Word(word)
        }
        (ty, value) => {
            return Err(BridgeError::UnsupportedAbiType(format!(
                "{:?} cannot be read as {}",
                value,
                ty.canonical()
            )))
        }
    };
    Ok(decoded)
}

/// Translate an argument list, pairing each value with its declared type.
pub fn encode_all_for_target(
    values: &[AbiValue],
    types: &[AbiType],
) -> Result<Vec<TronValue>, BridgeError> {
    if values.len() != types.len() {
        return Err(BridgeError::UnsupportedAbiType(format!(
            "{} arguments for {} declared inputs",
            values.len(),
            types.len()
        )));
    }
    values
        .iter()
        .zip(types)
        .map(|(value, ty)| encode_for_target(value, ty))
        .collect()
}

/// Inverse of [`encode_all_for_target`].
pub fn decode_all_from_target(
    values: &[TronValue],
    types: &[AbiType],
) -> Result<Vec<AbiValue>, BridgeError> {
    if values.len() != types.len() {
        return Err(BridgeError::UnsupportedAbiType(format!(
            "{} arguments for {} declared inputs",
            values.len(),
            types.len()
        )));
    }
    values
        .iter()
        .zip(types)
        .map(|(value, ty)| decode_from_target(value, ty))
        .collect()
}

/// Decimal rendering of a 256-bit two's-complement word.
pub fn signed_decimal(raw: &U256) -> String {
    if raw.bit(255) {
        format!("-{}", negate(raw))
    } else {
        raw.to_string()
    }
}

fn negate(value: &U256) -> U256 {
    (!*value).overflowing_add(U256::one()).0
}

fn parse_unsigned(text: &str, bits: usize) -> Result<U256, BridgeError> {
    let value = U256::from_dec_str(text)
        .map_err(|_| BridgeError::UnsupportedAbiType(format!("'{}' is not an integer", text)))?;
    if value.bits() > bits {
        return Err(BridgeError::UnsupportedAbiType(format!(
            "{} does not fit in uint{}",
            text, bits
        )));
    }
    Ok(value)
}

fn parse_signed(text: &str, bits: usize) -> Result<U256, BridgeError> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text),
    };
    let magnitude = U256::from_dec_str(digits)
        .map_err(|_| BridgeError::UnsupportedAbiType(format!("'{}' is not an integer", text)))?;

    // 2^(bits-1): one past the largest positive value, the magnitude of the smallest.
    let limit = U256::one() << (bits - 1);
    let in_range = if negative {
        magnitude <= limit
    } else {
        magnitude < limit
    };
    if !in_range {
        return Err(BridgeError::UnsupportedAbiType(format!(
            "{} does not fit in int{}",
            text, bits
        )));
    }

    Ok(if negative { negate(&magnitude) } else { magnitude })
}

fn parse_hex(text: &str) -> Result<Vec<u8>, BridgeError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|e| BridgeError::UnsupportedAbiType(format!("bad hex: {}", e)))
}

fn check_length(ty: &AbiType, declared: Option<usize>, actual: usize) -> Result<(), BridgeError> {
    match declared {
        Some(len) if len != actual => Err(BridgeError::UnsupportedAbiType(format!(
            "{} expects {} elements, got {}",
            ty.canonical(),
            len,
            actual
        ))),
        _ => Ok(()),
    }
}

fn check_arity(ty: &AbiType, declared: usize, actual: usize) -> Result<(), BridgeError> {
    if declared != actual {
        return Err(BridgeError::UnsupportedAbiType(format!(
            "{} has {} components, got {}",
            ty.canonical(),
            declared,
            actual
        )));
    }
    Ok(())
}

fn mismatch(ty: &AbiType, value: &AbiValue) -> BridgeError {
    BridgeError::UnsupportedAbiType(format!(
        "{:?} is not a {} value",
        value,
        ty.canonical()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Address;
    use proptest::prelude::*;
    use serde_json::json;

    fn int_word(value: i64) -> U256 {
        if value < 0 {
            negate(&U256::from(value.unsigned_abs()))
        } else {
            U256::from(value as u64)
        }
    }

    #[test]
    fn test_scalars_translate_to_native_forms() {
        let address = Address::from_slice(
            &hex::decode("a614f803b6fd780986a42c78ec9c7f77e6ded13c").unwrap(),
        );
        let cases = vec![
            (
                AbiType::Address,
                AbiValue::Address(address),
                json!("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t"),
            ),
            (AbiType::Uint(256), AbiValue::Uint(U256::MAX), json!(U256::MAX.to_string())),
            (AbiType::Int(8), AbiValue::Int(int_word(-128)), json!("-128")),
            (AbiType::Bool, AbiValue::Bool(false), json!(false)),
            (AbiType::String, AbiValue::String("hé".into()), json!("hé")),
            (AbiType::FixedBytes(2), AbiValue::FixedBytes(vec![0xbe, 0xef]), json!("0xbeef")),
            (AbiType::Bytes, AbiValue::Bytes(vec![]), json!("0x")),
        ];
        for (ty, value, expected) in cases {
            let translated = encode_for_target(&value, &ty).unwrap();
            assert_eq!(serde_json::to_value(&translated).unwrap(), expected);
            assert_eq!(decode_from_target(&translated, &ty).unwrap(), value);
        }
    }

    #[test]
    fn test_large_integers_keep_every_digit() {
        let big = U256::from_dec_str("115792089237316195423570985008687907853269984665640564039457584007913129639935").unwrap();
        let translated = encode_for_target(&AbiValue::Uint(big), &AbiType::Uint(256)).unwrap();
        assert_eq!(
            translated,
            TronValue::Integer(
                "115792089237316195423570985008687907853269984665640564039457584007913129639935"
                    .into()
            )
        );
    }

    #[test]
    fn test_int256_min_renders_exactly() {
        let min = U256::one() << 255;
        assert_eq!(
            signed_decimal(&min),
            "-57896044618658097711785492504343953926634992332820282019728792003956564819968"
        );
        assert_eq!(parse_signed(&signed_decimal(&min), 256).unwrap(), min);
    }

    #[test]
    fn test_nested_containers_recurse_by_declared_type() {
        let ty = AbiType::Tuple(vec![
            AbiType::Array(Box::new(AbiType::Address), None),
            AbiType::Tuple(vec![AbiType::Uint(8), AbiType::Bytes]),
        ]);
        let value = AbiValue::Tuple(vec![
            AbiValue::Array(vec![AbiValue::Address(Address::repeat_byte(1))]),
            AbiValue::Tuple(vec![AbiValue::Uint(U256::from(7)), AbiValue::Bytes(vec![1, 2])]),
        ]);
        let translated = encode_for_target(&value, &ty).unwrap();
        let json = serde_json::to_value(&translated).unwrap();
        assert!(json[0][0].as_str().unwrap().starts_with('T'));
        assert_eq!(json[1], json!(["7", "0x0102"]));
        assert_eq!(decode_from_target(&translated, &ty).unwrap(), value);
    }

    #[test]
    fn test_tuple_arity_mismatch_fails() {
        let ty = AbiType::Tuple(vec![AbiType::Bool, AbiType::Bool]);
        let value = AbiValue::Tuple(vec![AbiValue::Bool(true)]);
        assert!(matches!(
            encode_for_target(&value, &ty),
            Err(BridgeError::UnsupportedAbiType(_))
        ));
    }

    #[test]
    fn test_fixed_array_length_mismatch_fails() {
        let ty = AbiType::Array(Box::new(AbiType::Bool), Some(2));
        let value = TronValue::List(vec![TronValue::Bool(true)]);
        assert!(decode_from_target(&value, &ty).is_err());
    }

    #[test]
    fn test_unknown_type_passes_through() {
        let ty = AbiType::Other("function".into());
        let word = [0x11u8; 32];
        let translated = encode_for_target(&AbiValue::Word(word), &ty).unwrap();
        assert_eq!(translated, TronValue::Untranslated(format!("0x{}", "11".repeat(32))));
        assert_eq!(decode_from_target(&translated, &ty).unwrap(), AbiValue::Word(word));
    }

    #[test]
    fn test_out_of_range_integers_rejected_on_the_way_back() {
        assert!(decode_from_target(&TronValue::Integer("256".into()), &AbiType::Uint(8)).is_err());
        assert!(decode_from_target(&TronValue::Integer("128".into()), &AbiType::Int(8)).is_err());
        assert!(decode_from_target(&TronValue::Integer("-129".into()), &AbiType::Int(8)).is_err());
        assert!(decode_from_target(&TronValue::Integer("1.5".into()), &AbiType::Uint(256)).is_err());
    }

    proptest! {
        #[test]
        fn prop_argument_list_round_trips(
            address in proptest::array::uniform20(any::<u8>()),
            unsigned in any::<u128>(),
            signed in any::<i64>(),
            text in ".{0,40}",
            blob in proptest::collection::vec(any::<u8>(), 0..80),
            flags in proptest::collection::vec(any::<bool>(), 0..6),
        ) {
            let types = vec![
                AbiType::Address,
                AbiType::Uint(128),
                AbiType::Int(64),
                AbiType::String,
                AbiType::Bytes,
                AbiType::Array(Box::new(AbiType::Bool), None),
            ];
            let values = vec![
                AbiValue::Address(Address::from(address)),
                AbiValue::Uint(U256::from(unsigned)),
                AbiValue::Int(int_word(signed)),
                AbiValue::String(text),
                AbiValue::Bytes(blob),
                AbiValue::Array(flags.into_iter().map(AbiValue::Bool).collect()),
            ];
            let translated = encode_all_for_target(&values, &types).unwrap();
            prop_assert_eq!(decode_all_from_target(&translated, &types).unwrap(), values);
        }
    }
}
