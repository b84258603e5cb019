//! The gateway's own key: signs Tron transactions and defines the only
//! sender the bridge accepts.

use crate::algorithms::tx_decoder::public_key_address;
use crate::domain::{Address, BridgeError, PrivateKey, TronAddress, TronTransaction};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use std::fmt;

pub struct GatewaySigner {
    secret: SecretKey,
    address: Address,
}

impl GatewaySigner {
    pub fn new(key: &PrivateKey) -> Result<Self, BridgeError> {
        let raw = hex::decode(key.expose())
            .map_err(|_| BridgeError::InvalidParams("private key is not hex".into()))?;
        let secret = SecretKey::from_slice(&raw)
            .map_err(|_| BridgeError::InvalidParams("private key out of range".into()))?;
        let address = public_key_address(&PublicKey::from_secret_key(&Secp256k1::new(), &secret));
        Ok(Self { secret, address })
    }

    /// Address clients must sign their transactions with.
    pub fn evm_address(&self) -> Address {
        self.address
    }

    /// Same key, as the Tron owner address.
    pub fn tron_address(&self) -> TronAddress {
        TronAddress::from_evm(&self.address)
    }

    /// Sign a node-built transaction.
    ///
    /// The node's `txID` must be the SHA-256 of `raw_data_hex`.
    pub fn sign(&self, mut tx: TronTransaction) -> Result<TronTransaction, BridgeError> {
        let raw = hex::decode(&tx.raw_data_hex)
            .map_err(|_| BridgeError::TargetChain("raw_data_hex is not hex".into()))?;
        let digest = Sha256::digest(&raw);
        if hex::encode(digest) != tx.tx_id.to_ascii_lowercase() {
            return Err(BridgeError::TargetChain(format!(
                "txID {} does not match raw data digest",
                tx.tx_id
            )));
        }

        let message = Message::from_digest_slice(&digest)
            .map_err(|e| BridgeError::TargetChain(e.to_string()))?;
        let signature = Secp256k1::new().sign_ecdsa_recoverable(&message, &self.secret);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut encoded = compact.to_vec();
        encoded.push(recovery_id.to_i32() as u8 + 27);
        tx.signature = vec![hex::encode(encoded)];
        Ok(tx)
    }
}

impl fmt::Debug for GatewaySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewaySigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{signer_address, SIGNER_KEY_HEX};
    use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
    use serde_json::Value;

    fn unsigned(raw: &[u8]) -> TronTransaction {
        TronTransaction {
            tx_id: hex::encode(Sha256::digest(raw)),
            raw_data: Value::Null,
            raw_data_hex: hex::encode(raw),
            signature: Vec::new(),
            visible: false,
        }
    }

    #[test]
    fn test_addresses_derive_from_key() {
        let signer = GatewaySigner::new(&PrivateKey::new(format!("0x{SIGNER_KEY_HEX}"))).unwrap();
        assert_eq!(signer.evm_address(), signer_address());
        assert_eq!(signer.tron_address().evm(), signer_address());
    }

    #[test]
    fn test_signature_recovers_to_signer() {
        let signer = GatewaySigner::new(&PrivateKey::new(SIGNER_KEY_HEX)).unwrap();
        let signed = signer.sign(unsigned(b"raw transaction bytes")).unwrap();

        let sig = hex::decode(&signed.signature[0]).unwrap();
        assert_eq!(sig.len(), 65);
        assert!(sig[64] == 27 || sig[64] == 28);

        let recovery_id = RecoveryId::from_i32(sig[64] as i32 - 27).unwrap();
        let recoverable = RecoverableSignature::from_compact(&sig[..64], recovery_id).unwrap();
        let digest = Sha256::digest(b"raw transaction bytes");
        let message = Message::from_digest_slice(&digest).unwrap();
        let recovered = Secp256k1::new().recover_ecdsa(&message, &recoverable).unwrap();
        assert_eq!(public_key_address(&recovered), signer_address());
    }

    #[test]
    fn test_refuses_mismatched_txid() {
        let signer = GatewaySigner::new(&PrivateKey::new(SIGNER_KEY_HEX)).unwrap();
        let mut tx = unsigned(b"one");
        tx.tx_id = hex::encode(Sha256::digest(b"two"));
        assert!(matches!(signer.sign(tx), Err(BridgeError::TargetChain(_))));
    }

    #[test]
    fn test_rejects_bad_key() {
        assert!(GatewaySigner::new(&PrivateKey::new("zz")).is_err());
        assert!(GatewaySigner::new(&PrivateKey::new("00".repeat(32))).is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let signer = GatewaySigner::new(&PrivateKey::new(SIGNER_KEY_HEX)).unwrap();
        assert!(!format!("{signer:?}").contains(SIGNER_KEY_HEX));
    }
}
