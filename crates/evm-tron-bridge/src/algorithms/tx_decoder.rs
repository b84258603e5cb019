//! Transaction Decoder for `eth_sendRawTransaction` payloads.
//!
//! Parses legacy, EIP-2930 and EIP-1559 envelopes, rejects value transfers,
//! and recovers the sender. Pure: no I/O, no state.

use crate::domain::entities::{SignedTransaction, TxType};
use crate::domain::types::{Address, Hash, U256};
use crate::domain::BridgeError;
use rlp::{DecoderError, Rlp};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1};
use sha3::{Digest, Keccak256};
use tracing::debug;

/// Maximum accepted envelope size (128 KB)
const MAX_TX_SIZE: usize = 128 * 1024;

/// Half the secp256k1 curve order; `s` above this is malleable (EIP-2).
const HALF_N: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// Decode a signed envelope.
///
/// Fails with `UnsupportedFeature` as soon as a non-zero value is seen, before
/// the signature is looked at, and with `MalformedTransaction` for anything
/// that does not parse or recover.
pub fn decode_signed_transaction(raw: &[u8]) -> Result<SignedTransaction, BridgeError> {
    if raw.is_empty() {
        return Err(malformed("empty transaction"));
    }
    if raw.len() > MAX_TX_SIZE {
        return Err(malformed(format!(
            "size {} exceeds limit {}",
            raw.len(),
            MAX_TX_SIZE
        )));
    }

    let (tx_type, rlp_data) = detect_tx_type(raw)?;

    let fields = match tx_type {
        TxType::Legacy => parse_legacy_tx(rlp_data)?,
        TxType::AccessList => parse_access_list_tx(rlp_data)?,
        TxType::DynamicFee => parse_dynamic_fee_tx(rlp_data)?,
    };

    if !fields.value.is_zero() {
        return Err(BridgeError::UnsupportedFeature(format!(
            "native value transfers are not supported (value {})",
            fields.value
        )));
    }

    let hash = Hash::from_slice(&Keccak256::digest(raw));
    let sender = recover_sender(&fields, tx_type, rlp_data)?;

    debug!(
        hash = %hash,
        sender = %sender,
        nonce = fields.nonce,
        tx_type = ?tx_type,
        creation = fields.to.is_none(),
        "Decoded raw transaction"
    );

    Ok(SignedTransaction {
        hash,
        sender,
        to: fields.to,
        nonce: fields.nonce,
        gas_price: fields.gas_price,
        gas_limit: fields.gas_limit,
        value: fields.value,
        payload: fields.data,
        chain_id: fields.chain_id,
        tx_type,
    })
}

fn detect_tx_type(raw: &[u8]) -> Result<(TxType, &[u8]), BridgeError> {
    // EIP-2718: typed envelopes start below 0x7f, legacy with an RLP list prefix
    match raw[0] {
        0x01 => Ok((TxType::AccessList, &raw[1..])),
        0x02 => Ok((TxType::DynamicFee, &raw[1..])),
        b if b < 0x7f => Err(BridgeError::UnsupportedFeature(format!(
            "transaction type 0x{:02x}",
            b
        ))),
        _ => Ok((TxType::Legacy, raw)),
    }
}

/// Fields common to every envelope type.
struct ParsedTxFields {
    chain_id: Option<u64>,
    nonce: u64,
    gas_price: U256,
    gas_limit: u64,
    to: Option<Address>,
    value: U256,
    data: Vec<u8>,
    v: u64,
    r: [u8; 32],
    s: [u8; 32],
}

fn open_list<'a>(data: &'a [u8], expected: usize, label: &str) -> Result<Rlp<'a>, BridgeError> {
    let rlp = Rlp::new(data);
    if !rlp.is_list() {
        return Err(malformed("transaction must be an RLP list"));
    }
    let item_count = rlp.item_count().map_err(|e| rlp_error("item count", e))?;
    if item_count != expected {
        return Err(malformed(format!(
            "{} transaction must have {} fields, got {}",
            label, expected, item_count
        )));
    }
    Ok(rlp)
}

/// [nonce, gasPrice, gasLimit, to, value, data, v, r, s]
fn parse_legacy_tx(data: &[u8]) -> Result<ParsedTxFields, BridgeError> {
    let rlp = open_list(data, 9, "legacy")?;
    let v = decode_u64(&rlp, 6)?;
    Ok(ParsedTxFields {
        chain_id: (v >= 35).then(|| (v - 35) / 2),
        nonce: decode_u64(&rlp, 0)?,
        gas_price: decode_u256(&rlp, 1)?,
        gas_limit: decode_u64(&rlp, 2)?,
        to: decode_optional_address(&rlp, 3)?,
        value: decode_u256(&rlp, 4)?,
        data: decode_bytes(&rlp, 5)?,
        v,
        r: decode_bytes32(&rlp, 7)?,
        s: decode_bytes32(&rlp, 8)?,
    })
}

/// [chainId, nonce, gasPrice, gasLimit, to, value, data, accessList, yParity, r, s]
fn parse_access_list_tx(data: &[u8]) -> Result<ParsedTxFields, BridgeError> {
    let rlp = open_list(data, 11, "EIP-2930")?;
    Ok(ParsedTxFields {
        chain_id: Some(decode_u64(&rlp, 0)?),
        nonce: decode_u64(&rlp, 1)?,
        gas_price: decode_u256(&rlp, 2)?,
        gas_limit: decode_u64(&rlp, 3)?,
        to: decode_optional_address(&rlp, 4)?,
        value: decode_u256(&rlp, 5)?,
        data: decode_bytes(&rlp, 6)?,
        v: decode_u64(&rlp, 8)?,
        r: decode_bytes32(&rlp, 9)?,
        s: decode_bytes32(&rlp, 10)?,
    })
}

/// [chainId, nonce, maxPriorityFee, maxFee, gasLimit, to, value, data, accessList, yParity, r, s]
fn parse_dynamic_fee_tx(data: &[u8]) -> Result<ParsedTxFields, BridgeError> {
    let rlp = open_list(data, 12, "EIP-1559")?;
    Ok(ParsedTxFields {
        chain_id: Some(decode_u64(&rlp, 0)?),
        nonce: decode_u64(&rlp, 1)?,
        gas_price: decode_u256(&rlp, 3)?, // maxFeePerGas
        gas_limit: decode_u64(&rlp, 4)?,
        to: decode_optional_address(&rlp, 5)?,
        value: decode_u256(&rlp, 6)?,
        data: decode_bytes(&rlp, 7)?,
        v: decode_u64(&rlp, 9)?,
        r: decode_bytes32(&rlp, 10)?,
        s: decode_bytes32(&rlp, 11)?,
    })
}

fn recover_sender(
    tx: &ParsedTxFields,
    tx_type: TxType,
    rlp_data: &[u8],
) -> Result<Address, BridgeError> {
    if tx.r == [0u8; 32] || tx.s == [0u8; 32] {
        return Err(malformed("signature r or s is zero"));
    }
    if tx.s > HALF_N {
        return Err(malformed("signature s value too high (EIP-2)"));
    }

    let recovery_id = match tx_type {
        TxType::Legacy => match tx.v {
            27 | 28 => (tx.v - 27) as i32,
            v if v >= 35 => ((v - 35) % 2) as i32,
            v => return Err(malformed(format!("invalid v value for legacy tx: {}", v))),
        },
        TxType::AccessList | TxType::DynamicFee => {
            if tx.v > 1 {
                return Err(malformed(format!("invalid yParity value: {}", tx.v)));
            }
            tx.v as i32
        }
    };

    let signing_hash = compute_signing_hash(tx, tx_type, rlp_data)?;

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&tx.r);
    sig_bytes[32..].copy_from_slice(&tx.s);

    let rec_id =
        RecoveryId::from_i32(recovery_id).map_err(|_| malformed("invalid recovery id"))?;
    let signature = RecoverableSignature::from_compact(&sig_bytes, rec_id)
        .map_err(|e| malformed(format!("invalid signature: {}", e)))?;
    let message = Message::from_digest_slice(&signing_hash)
        .map_err(|e| malformed(format!("invalid message hash: {}", e)))?;

    let public_key = Secp256k1::verification_only()
        .recover_ecdsa(&message, &signature)
        .map_err(|e| malformed(format!("signature recovery failed: {}", e)))?;

    Ok(public_key_address(&public_key))
}

/// Origin-chain address of a secp256k1 public key.
pub fn public_key_address(public_key: &secp256k1::PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = Keccak256::digest(&uncompressed[1..]);
    Address::from_slice(&hash[12..])
}

fn compute_signing_hash(
    tx: &ParsedTxFields,
    tx_type: TxType,
    rlp_data: &[u8],
) -> Result<[u8; 32], BridgeError> {
    let rlp = Rlp::new(rlp_data);

    let mut hasher = Keccak256::new();
    match tx_type {
        TxType::Legacy => {
            let legacy_chain = tx.chain_id;
            let mut stream = rlp::RlpStream::new_list(if legacy_chain.is_some() { 9 } else { 6 });
            append_common(&mut stream, tx);
            if let Some(chain_id) = legacy_chain {
                stream.append(&chain_id);
                stream.append(&0u8);
                stream.append(&0u8);
            }
            hasher.update(stream.as_raw());
        }
        TxType::AccessList => {
            let mut stream = rlp::RlpStream::new_list(8);
            stream.append(&decode_u64(&rlp, 0)?);
            append_common(&mut stream, tx);
            stream.append_raw(raw_item(&rlp, 7)?, 1);
            hasher.update([0x01]);
            hasher.update(stream.as_raw());
        }
        TxType::DynamicFee => {
            let mut stream = rlp::RlpStream::new_list(9);
            stream.append(&decode_u64(&rlp, 0)?);
            stream.append(&tx.nonce);
            stream.append(&decode_u256(&rlp, 2)?.inner());
            stream.append(&tx.gas_price.inner());
            stream.append(&tx.gas_limit);
            append_destination(&mut stream, tx);
            stream.append(&tx.value.inner());
            stream.append(&tx.data);
            stream.append_raw(raw_item(&rlp, 8)?, 1);
            hasher.update([0x02]);
            hasher.update(stream.as_raw());
        }
    }
    Ok(hasher.finalize().into())
}

/// nonce, gasPrice, gasLimit, to, value, data
fn append_common(stream: &mut rlp::RlpStream, tx: &ParsedTxFields) {
    stream.append(&tx.nonce);
    stream.append(&tx.gas_price.inner());
    stream.append(&tx.gas_limit);
    append_destination(stream, tx);
    stream.append(&tx.value.inner());
    stream.append(&tx.data);
}

fn append_destination(stream: &mut rlp::RlpStream, tx: &ParsedTxFields) {
    match &tx.to {
        Some(to) => stream.append(to),
        None => stream.append_empty_data(),
    };
}

fn raw_item<'a>(rlp: &Rlp<'a>, index: usize) -> Result<&'a [u8], BridgeError> {
    rlp.at(index)
        .map(|item| item.as_raw())
        .map_err(|e| rlp_error(&format!("field {}", index), e))
}

fn decode_u64(rlp: &Rlp, index: usize) -> Result<u64, BridgeError> {
    rlp.at(index)
        .and_then(|r| r.as_val())
        .map_err(|e| rlp_error(&format!("field {}", index), e))
}

fn decode_u256(rlp: &Rlp, index: usize) -> Result<U256, BridgeError> {
    let bytes = decode_bytes(rlp, index)?;
    if bytes.len() > 32 {
        return Err(malformed(format!(
            "U256 field {} too large: {} bytes",
            index,
            bytes.len()
        )));
    }
    Ok(U256::from_be_slice(&bytes))
}

fn decode_bytes(rlp: &Rlp, index: usize) -> Result<Vec<u8>, BridgeError> {
    rlp.at(index)
        .and_then(|r| r.as_val::<Vec<u8>>())
        .map_err(|e| rlp_error(&format!("field {}", index), e))
}

fn decode_bytes32(rlp: &Rlp, index: usize) -> Result<[u8; 32], BridgeError> {
    let bytes = decode_bytes(rlp, index)?;
    if bytes.len() > 32 {
        return Err(malformed(format!(
            "bytes32 field {} too large: {} bytes",
            index,
            bytes.len()
        )));
    }
    let mut arr = [0u8; 32];
    arr[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(arr)
}

fn decode_optional_address(rlp: &Rlp, index: usize) -> Result<Option<Address>, BridgeError> {
    let bytes = decode_bytes(rlp, index)?;
    match bytes.len() {
        0 => Ok(None),
        20 => Ok(Some(Address::from_slice(&bytes))),
        n => Err(malformed(format!(
            "invalid address length at field {}: {} bytes",
            index, n
        ))),
    }
}

fn rlp_error(field: &str, e: DecoderError) -> BridgeError {
    malformed(format!("RLP decode error for {}: {:?}", field, e))
}

fn malformed(reason: impl Into<String>) -> BridgeError {
    BridgeError::MalformedTransaction(reason.into())
}
