//! # Envelope Encode/Decode
//!
//! The wire envelope is a canonical CBOR map
//! `{ "body": map, "nullifier": bstr(32), "type_id": uint }` (shown in
//! canonical key order). Decoding validates the shape of both the envelope
//! and the kind-specific body before returning a typed [`ProofEnvelope`].

use proofs_types::value::Value;
use proofs_types::{ProofEnvelope, ProofError, ProofType, Result};
use tracing::debug;

use crate::decode::decode;
use crate::encode::encode;
use crate::shape::validate_body;

/// Encode a [`ProofEnvelope`] to canonical CBOR. Validates before encoding.
pub fn encode_envelope(env: &ProofEnvelope) -> Result<Vec<u8>> {
    validate_body(env.type_id, &env.body)?;
    let wire = Value::text_map(vec![
        ("type_id", Value::Int(env.type_id.as_u64() as i128)),
        ("body", env.body.clone()),
        ("nullifier", Value::Bytes(env.nullifier.to_vec())),
    ]);
    encode(&wire)
}

/// Decode canonical CBOR bytes into a [`ProofEnvelope`], then run schema
/// checks on the body.
pub fn decode_envelope(bytes: &[u8]) -> Result<ProofEnvelope> {
    let wire = decode(bytes)?;
    if wire.as_map().is_none() {
        return Err(ProofError::schema("envelope must be a map"));
    }

    let type_raw = wire
        .get("type_id")
        .ok_or_else(|| ProofError::schema("envelope missing required key \"type_id\""))?
        .as_u64()
        .ok_or_else(|| ProofError::schema("type_id must be an unsigned integer"))?;
    let type_id = ProofType::try_from(type_raw)?;

    let nullifier = wire
        .get("nullifier")
        .ok_or_else(|| ProofError::schema("envelope missing required key \"nullifier\""))?
        .as_bytes()
        .ok_or_else(|| ProofError::schema("nullifier must be a byte string"))?;
    if nullifier.len() != 32 {
        return Err(ProofError::schema(format!(
            "nullifier must be 32 bytes, got {}",
            nullifier.len()
        )));
    }

    let body = wire
        .get("body")
        .ok_or_else(|| ProofError::schema("envelope missing required key \"body\""))?
        .clone();
    validate_body(type_id, &body)?;

    debug!(type_id = type_raw, "decoded proof envelope");
    ProofEnvelope::new(type_id, body, nullifier)
}
