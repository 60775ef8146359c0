//! # Domain-Separated SHA3 Hashing
//!
//! Thin wrappers around SHA3-256/512 adding:
//!
//! - Canonical `Animica|<name>` domain tags
//! - Length-prefixed concatenation to avoid ambiguity in multi-part hashing
//!
//! ## Design rules
//!
//! - Never concatenate raw variable-length fields without a length prefix.
//! - Always domain-separate multi-part transcripts with a canonical ASCII tag.
//! - Prefer SHA3-256 unless a larger digest is required.

use sha3::{Digest, Sha3_256, Sha3_512};

/// 256-bit digest output.
pub type Hash32 = [u8; 32];

const ANIMICA_PREFIX: &[u8] = b"Animica|";

/// Return the canonical domain tag bytes for a given ASCII name.
///
/// Example: `"proof:ai"` -> `b"Animica|proof:ai"`. Panics in debug builds if
/// the name is not ASCII; domain names are compile-time constants.
pub fn domain_tag(name: &str) -> Vec<u8> {
    debug_assert!(name.is_ascii(), "domain name must be ASCII");
    let mut out = Vec::with_capacity(ANIMICA_PREFIX.len() + name.len());
    out.extend_from_slice(ANIMICA_PREFIX);
    out.extend_from_slice(name.as_bytes());
    out
}

/// Concatenate parts, each length-prefixed with a u64 big-endian length.
pub fn concat_lp<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Vec<u8> {
    let mut out = Vec::new();
    for p in parts {
        out.extend_from_slice(&(p.len() as u64).to_be_bytes());
        out.extend_from_slice(p);
    }
    out
}

/// Build a domain-separated, length-prefixed byte string:
/// `domain_tag(tag) || 0x00 || LP(part1) || LP(part2) || ...`
pub fn tag_bytes<'a>(tag: &str, parts: impl IntoIterator<Item = &'a [u8]>) -> Vec<u8> {
    let mut out = domain_tag(tag);
    out.push(0x00);
    out.extend_from_slice(&concat_lp(parts));
    out
}

/// One-shot SHA3-256.
pub fn sha3_256(data: &[u8]) -> Hash32 {
    let mut h = Sha3_256::new();
    h.update(data);
    h.finalize().into()
}

/// One-shot SHA3-256 over several segments without length prefixes.
///
/// Used for fixed-layout transcripts where every segment has a known width
/// (Merkle nodes, nullifier preimages).
pub fn sha3_256_concat<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Hash32 {
    let mut h = Sha3_256::new();
    for p in parts {
        h.update(p);
    }
    h.finalize().into()
}

/// One-shot SHA3-512.
pub fn sha3_512(data: &[u8]) -> [u8; 64] {
    let mut h = Sha3_512::new();
    h.update(data);
    h.finalize().into()
}

/// Tagged SHA3-256: hash of [`tag_bytes`] over the given tag and parts.
pub fn sha3_256_tag<'a>(tag: &str, parts: impl IntoIterator<Item = &'a [u8]>) -> Hash32 {
    sha3_256(&tag_bytes(tag, parts))
}
