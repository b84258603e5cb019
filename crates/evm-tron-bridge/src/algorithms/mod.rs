//! Pure translation logic: no I/O, no shared state.

pub mod abi_codec;
pub mod artifact_matcher;
pub mod create_address;
pub mod tx_decoder;
pub mod value_codec;

pub use abi_codec::{decode_params, encode_params};
pub use artifact_matcher::{match_artifact, strip_metadata, ArtifactMatch};
pub use create_address::predict_create_address;
pub use tx_decoder::{decode_signed_transaction, public_key_address};
pub use value_codec::{
    decode_all_from_target, decode_from_target, encode_all_for_target, encode_for_target,
};
