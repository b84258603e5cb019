//! Shared helpers for unit tests: a fixed signer and envelope builders.

use crate::algorithms::tx_decoder::public_key_address;
use crate::domain::{Address, Hash};
use primitive_types::U256;
use rlp::RlpStream;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};

/// Key the gateway signs with in tests.
pub const SIGNER_KEY_HEX: &str =
    "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

/// A key the gateway does not hold.
pub const STRANGER_KEY_HEX: &str =
    "8da4ef21b864d2cc526dbdb2a120bd2874c36c9d0a1fb7f8c63d7f7a8b41de8f";

pub fn signer_key() -> SecretKey {
    key(SIGNER_KEY_HEX)
}

pub fn stranger_key() -> SecretKey {
    key(STRANGER_KEY_HEX)
}

pub fn signer_address() -> Address {
    address_of(&signer_key())
}

pub fn address_of(secret: &SecretKey) -> Address {
    public_key_address(&PublicKey::from_secret_key(&Secp256k1::new(), secret))
}

fn key(hex_digits: &str) -> SecretKey {
    SecretKey::from_slice(&hex::decode(hex_digits).unwrap()).unwrap()
}

/// Fields of an envelope before signing.
#[derive(Debug, Clone)]
pub struct UnsignedTx {
    pub nonce: u64,
    pub gas_price: u64,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: u64,
    pub data: Vec<u8>,
}

impl UnsignedTx {
    pub fn creation(nonce: u64, data: Vec<u8>) -> Self {
        Self {
            nonce,
            gas_price: 10_000_000_000,
            gas_limit: 8_000_000,
            to: None,
            value: 0,
            data,
        }
    }

    pub fn call(nonce: u64, to: Address, data: Vec<u8>) -> Self {
        Self {
            to: Some(to),
            ..Self::creation(nonce, data)
        }
    }

    fn append_body(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&U256::from(self.gas_price));
        stream.append(&self.gas_limit);
        self.append_tail(stream);
    }

    fn append_tail(&self, stream: &mut RlpStream) {
        match &self.to {
            Some(to) => stream.append(to),
            None => stream.append_empty_data(),
        };
        stream.append(&U256::from(self.value));
        stream.append(&self.data);
    }
}

fn sign_digest(secret: &SecretKey, digest: &[u8]) -> (u64, U256, U256) {
    let message = Message::from_digest_slice(digest).unwrap();
    let signature = Secp256k1::new().sign_ecdsa_recoverable(&message, secret);
    let (recovery_id, compact) = signature.serialize_compact();
    (
        recovery_id.to_i32() as u64,
        U256::from_big_endian(&compact[..32]),
        U256::from_big_endian(&compact[32..]),
    )
}

/// Legacy envelope, EIP-155 when `chain_id` is set.
pub fn sign_legacy(secret: &SecretKey, tx: &UnsignedTx, chain_id: Option<u64>) -> Vec<u8> {
    let mut unsigned = RlpStream::new_list(if chain_id.is_some() { 9 } else { 6 });
    tx.append_body(&mut unsigned);
    if let Some(chain_id) = chain_id {
        unsigned.append(&chain_id);
        unsigned.append(&0u8);
        unsigned.append(&0u8);
    }
    let (parity, r, s) = sign_digest(secret, &Keccak256::digest(unsigned.as_raw()));
    let v = match chain_id {
        Some(chain_id) => chain_id * 2 + 35 + parity,
        None => 27 + parity,
    };

    let mut signed = RlpStream::new_list(9);
    tx.append_body(&mut signed);
    signed.append(&v);
    signed.append(&r);
    signed.append(&s);
    signed.out().to_vec()
}

fn append_access_list(stream: &mut RlpStream) {
    stream.begin_list(1);
    stream.begin_list(2);
    stream.append(&Address::repeat_byte(0x77));
    stream.begin_list(1);
    stream.append(&Hash::repeat_byte(0x01));
}

/// EIP-1559 envelope carrying a one-entry access list.
pub fn sign_dynamic_fee(secret: &SecretKey, tx: &UnsignedTx, chain_id: u64) -> Vec<u8> {
    let append_fields = |stream: &mut RlpStream| {
        stream.append(&chain_id);
        stream.append(&tx.nonce);
        stream.append(&U256::one());
        stream.append(&U256::from(tx.gas_price));
        stream.append(&tx.gas_limit);
        tx.append_tail(stream);
        append_access_list(stream);
    };

    let mut unsigned = RlpStream::new_list(9);
    append_fields(&mut unsigned);
    let mut preimage = vec![0x02];
    preimage.extend_from_slice(unsigned.as_raw());
    let (parity, r, s) = sign_digest(secret, &Keccak256::digest(&preimage));

    let mut signed = RlpStream::new_list(12);
    append_fields(&mut signed);
    signed.append(&parity);
    signed.append(&r);
    signed.append(&s);

    let mut raw = vec![0x02];
    raw.extend_from_slice(&signed.out());
    raw
}
