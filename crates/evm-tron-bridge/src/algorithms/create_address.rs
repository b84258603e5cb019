//! Contract address an origin-chain client expects for a creation.

use crate::domain::Address;
use rlp::RlpStream;
use sha3::{Digest, Keccak256};

/// `keccak256(rlp([sender, nonce]))[12..]`
pub fn predict_create_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(sender);
    stream.append(&nonce);
    let hash = Keccak256::digest(stream.as_raw());
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_known_create_addresses() {
        let sender = Address::from_str("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
        let expected = [
            "cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d",
            "343c43a37d37dff08ae8c4a11544c718abb4fcf8",
            "f778b86fa74e846c4f0a1fbd1335fe81c00a0c91",
        ];
        for (nonce, address) in expected.iter().enumerate() {
            assert_eq!(
                predict_create_address(&sender, nonce as u64),
                Address::from_str(address).unwrap()
            );
        }
    }
}
