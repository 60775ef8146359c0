//! # Proofs-Codec: Canonical CBOR Surface
//!
//! Deterministic encode/decode for proof envelopes and bodies plus the
//! structural validation that runs before any heavy verifier.
//!
//! ## Components
//!
//! - `encode` - Canonical CBOR encoder (sorted maps, minimal heads, no floats)
//! - `decode` - Strict decoder for the envelope surface and a lenient decoder
//!   for foreign attestation payloads (COSE tokens)
//! - `shape` - Per-kind body field rules and `validate_body`
//! - `envelope` - `encode_envelope` / `decode_envelope`
//! - `schema` - Embedded CDDL files and per-type schema root digests
//!
//! ## Canonical form
//!
//! Map keys sort by their encoded representation compared as
//! (length, bytes); for ASCII/UTF-8 text keys this is exactly
//! (UTF-8 length, UTF-8 bytes). Integers use minimal heads, lengths are
//! definite, and floats are rejected outright. The strict decoder enforces
//! the same rules on input, so `encode(decode(b)) == b` for every accepted
//! byte string and `decode(encode(v)) == v` for every encodable value.

#![warn(missing_docs)]

pub mod decode;
pub mod encode;
pub mod envelope;
pub mod schema;
pub mod shape;

pub use decode::{decode, decode_lenient};
pub use encode::encode;
pub use envelope::{decode_envelope, encode_envelope};
pub use schema::{schema_hex_map, schema_root};
pub use shape::validate_body;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
