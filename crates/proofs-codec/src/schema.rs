//! # Schema Roots
//!
//! Stable digests binding each proof type to the exact schema set in force,
//! so block headers can commit to the wire format. The CDDL sources are
//! embedded at compile time; hashing happens over the raw file bytes.
//!
//! Root formula:
//!
//! ```text
//! root = SHA3_256( "env=" || SHA3_256(envelope.cddl)
//!                  || "|type_id=" || ascii(int(type))
//!                  || ("|" || SHA3_256(schema_file_i))* )
//! ```

use std::collections::BTreeMap;

use proofs_crypto::{sha3_256, Hash32};
use proofs_types::ProofType;

const ENVELOPE_CDDL: &str = include_str!("../schemas/envelope.cddl");
const HASHSHARE_CDDL: &str = include_str!("../schemas/hashshare.cddl");
const AI_CDDL: &str = include_str!("../schemas/ai.cddl");
const QUANTUM_CDDL: &str = include_str!("../schemas/quantum.cddl");
const STORAGE_CDDL: &str = include_str!("../schemas/storage.cddl");
const VDF_CDDL: &str = include_str!("../schemas/vdf.cddl");

/// The embedded CDDL sources for a proof type, in declared order.
pub fn schema_files(pt: ProofType) -> &'static [&'static str] {
    match pt {
        ProofType::HashShare => &[HASHSHARE_CDDL],
        ProofType::Ai => &[AI_CDDL],
        ProofType::Quantum => &[QUANTUM_CDDL],
        ProofType::Storage => &[STORAGE_CDDL],
        ProofType::Vdf => &[VDF_CDDL],
    }
}

/// Digest of the generic envelope schema.
pub fn envelope_digest() -> Hash32 {
    sha3_256(ENVELOPE_CDDL.as_bytes())
}

/// Stable root digest for all schemas covering the given proof type.
pub fn schema_root(pt: ProofType) -> Hash32 {
    let mut buf = Vec::with_capacity(128);
    buf.extend_from_slice(b"env=");
    buf.extend_from_slice(&envelope_digest());
    buf.extend_from_slice(b"|type_id=");
    buf.extend_from_slice(pt.as_u64().to_string().as_bytes());
    for file in schema_files(pt) {
        buf.push(b'|');
        buf.extend_from_slice(&sha3_256(file.as_bytes()));
    }
    sha3_256(&buf)
}

/// `{ type_id -> root hex }` map for header binding.
pub fn schema_hex_map() -> BTreeMap<u64, String> {
    ProofType::ALL
        .iter()
        .map(|pt| (pt.as_u64(), hex::encode(schema_root(*pt))))
        .collect()
}
