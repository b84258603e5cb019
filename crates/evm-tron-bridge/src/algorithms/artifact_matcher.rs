//! Artifact Matcher: recover the constructor-argument boundary of a creation
//! payload by content-matching it against compiled artifacts.
//!
//! The compiler's CBOR metadata trailer differs between otherwise identical
//! builds, so it is cut from the stored bytecode before the prefix test.

use crate::domain::{BridgeError, ConstructorArtifact};
use tracing::debug;

/// CBOR map headers that open a solc metadata trailer (ipfs, bzzr0, bzzr1).
const METADATA_MARKERS: [&[u8]; 3] = [
    &[0xa2, 0x64, 0x69, 0x70, 0x66, 0x73, 0x58, 0x22],
    &[0xa1, 0x65, 0x62, 0x7a, 0x7a, 0x72, 0x30, 0x58, 0x20],
    &[0xa2, 0x65, 0x62, 0x7a, 0x7a, 0x72, 0x31, 0x58, 0x20],
];

/// A matched artifact and the payload bytes after its bytecode.
#[derive(Debug, Clone)]
pub struct ArtifactMatch {
    pub artifact: ConstructorArtifact,
    pub constructor_args: Vec<u8>,
}

/// Bytecode without its metadata trailer.
///
/// Cuts at the first known marker; failing that, trusts the trailing
/// two-byte CBOR length if it points at a map header; otherwise returns the
/// code unchanged.
pub fn strip_metadata(code: &[u8]) -> &[u8] {
    let first_marker = METADATA_MARKERS
        .iter()
        .filter_map(|marker| find(code, marker))
        .min();
    if let Some(cut) = first_marker {
        return &code[..cut];
    }

    let n = code.len();
    if n >= 2 {
        let trailer = u16::from_be_bytes([code[n - 2], code[n - 1]]) as usize;
        if let Some(start) = n.checked_sub(2 + trailer) {
            if (0xa1..=0xa5).contains(&code[start]) {
                return &code[..start];
            }
        }
    }
    code
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// First artifact, in the given order, whose stripped bytecode prefixes
/// `payload`.
pub fn match_artifact(
    artifacts: &[ConstructorArtifact],
    payload: &[u8],
) -> Result<ArtifactMatch, BridgeError> {
    for artifact in artifacts {
        let prefix = strip_metadata(&artifact.bytecode);
        if prefix.is_empty() || payload.len() < artifact.bytecode.len() {
            continue;
        }
        if payload.starts_with(prefix) {
            debug!(
                name = %artifact.name,
                source = %artifact.source.display(),
                args_len = payload.len() - artifact.bytecode.len(),
                "Matched creation payload to artifact"
            );
            return Ok(ArtifactMatch {
                artifact: artifact.clone(),
                constructor_args: payload[artifact.bytecode.len()..].to_vec(),
            });
        }
    }

    Err(BridgeError::NoArtifactMatch {
        payload_len: payload.len(),
    })
}
