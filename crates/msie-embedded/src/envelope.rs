//! Serialized-script envelope
//!
//! Layout (little endian):
//!
//! ```text
//! magic(4) | version(4) | flags(4) | crc32(4) | sha256(32) | source_len(8)
//! ```
//!
//! The envelope binds the buffer to the exact source text; the compiled form
//! itself stays in the context's code cache, keyed by the digest.

use sha2::{Digest, Sha256};

/// Magic number at the start of every serialized buffer.
pub const MAGIC: [u8; 4] = *b"MSJS";

const VERSION: u32 = 1;
const HEADER_SIZE: usize = 48;

/// Size in bytes of every serialized buffer.
pub const ENVELOPE_SIZE: usize = HEADER_SIZE + 8;

/// SHA-256 of a script source.
pub(crate) type SourceDigest = [u8; 32];

pub(crate) fn digest(source: &str) -> SourceDigest {
    Sha256::digest(source.as_bytes()).into()
}

pub(crate) fn encode(source: &str, flags: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(ENVELOPE_SIZE);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(source.as_bytes()).to_le_bytes());
    out.extend_from_slice(&digest(source));
    out.extend_from_slice(&(source.len() as u64).to_le_bytes());
    out
}

/// Check that `buffer` was produced from `source`; returns the digest.
pub(crate) fn verify(buffer: &[u8], source: &str) -> Option<SourceDigest> {
    if buffer.len() < ENVELOPE_SIZE || buffer[0..4] != MAGIC {
        return None;
    }

    let version = u32::from_le_bytes(buffer[4..8].try_into().ok()?);
    if version != VERSION {
        return None;
    }

    let crc = u32::from_le_bytes(buffer[12..16].try_into().ok()?);
    let length = u64::from_le_bytes(buffer[48..56].try_into().ok()?);
    if crc != crc32fast::hash(source.as_bytes()) || length != source.len() as u64 {
        return None;
    }

    let expected: SourceDigest = buffer[16..48].try_into().ok()?;
    if expected != digest(source) {
        return None;
    }
    Some(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_size() {
        assert_eq!(encode("1 + 1", 0).len(), ENVELOPE_SIZE);
    }

    #[test]
    fn test_verify_matching_source() {
        let buffer = encode("var a = 1;", 0);
        assert_eq!(verify(&buffer, "var a = 1;"), Some(digest("var a = 1;")));
    }

    #[test]
    fn test_verify_rejects_other_source() {
        let buffer = encode("var a = 1;", 0);
        assert_eq!(verify(&buffer, "var a = 2;"), None);
    }

    #[test]
    fn test_verify_rejects_corrupt_magic() {
        let mut buffer = encode("x", 0);
        buffer[0] = b'X';
        assert_eq!(verify(&buffer, "x"), None);
        assert_eq!(verify(&buffer[..10], "x"), None);
    }
}
