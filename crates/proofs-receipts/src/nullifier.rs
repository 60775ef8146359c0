//! # Nullifier Derivation
//!
//! A nullifier is a 32-byte domain-separated commitment preventing replay
//! of the same work instance within the consensus TTL window. Design:
//!
//! - Per-kind ASCII domains `Animica/ProofNullifier/<Kind>/v1`.
//! - A per-kind reducer extracts only the identity-defining fields; no
//!   block-local data ever flows in. Large opaque blobs (attestations,
//!   certificates, group elements) are pre-hashed.
//! - The reduced struct is canonical-CBOR hashed, so body key ordering
//!   cannot influence the tag.
//! - Optional salts segment networks (`chain_id`) and policy epochs
//!   (`policy_root`).
//!
//! Preimage:
//! `domain || 0x00 || canon_hash(identity) || (0x01 || u32_be(chain_id))? || (0x02 || policy_root)?`

use proofs_codec::{encode, validate_body};
use proofs_crypto::hash::sha3_256;
use proofs_types::value::Value;
use proofs_types::{ProofEnvelope, ProofError, ProofType, Result};

/// Domain prefix shared by all proof kinds.
const DOMAIN_PREFIX: &[u8] = b"Animica/ProofNullifier/";

/// Per-kind domain suffix.
fn domain_for(pt: ProofType) -> &'static [u8] {
    match pt {
        ProofType::HashShare => b"HashShare/v1",
        ProofType::Ai => b"AI/v1",
        ProofType::Quantum => b"Quantum/v1",
        ProofType::Storage => b"Storage/v1",
        ProofType::Vdf => b"VDF/v1",
    }
}

/// Optional global salts mixed into every nullifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullifierSalt<'a> {
    /// Chain id (u32 big-endian on the preimage); avoids cross-network replay.
    pub chain_id: Option<u32>,
    /// Policy root bytes, appended verbatim; segments policy epochs.
    pub policy_root: Option<&'a [u8]>,
}

/// Canonical CBOR → SHA3-256 of a reduced identity struct.
fn canon_hash(v: &Value) -> Result<[u8; 32]> {
    Ok(sha3_256(&encode(v)?))
}

/// Digest for large/opaque subfields.
fn opaque_digest(bytes: &[u8]) -> Value {
    Value::Bytes(sha3_256(bytes).to_vec())
}

fn field<'a>(body: &'a Value, path: &[&str]) -> Result<&'a Value> {
    let mut cur = body;
    for key in path {
        cur = cur.get(key).ok_or_else(|| {
            ProofError::schema(format!("missing field {} in nullifier reducer", path.join(".")))
        })?;
    }
    Ok(cur)
}

fn bytes_of<'a>(body: &'a Value, path: &[&str]) -> Result<&'a [u8]> {
    field(body, path)?
        .as_bytes()
        .ok_or_else(|| ProofError::schema(format!("field {} must be bytes", path.join("."))))
}

fn uint_of(body: &Value, path: &[&str]) -> Result<u64> {
    field(body, path)?
        .as_u64()
        .ok_or_else(|| ProofError::schema(format!("field {} must be uint", path.join("."))))
}

/// Reduce a body to its identity-defining struct.
///
/// The reduced maps use short stable keys; changing any salient field of
/// the underlying work changes the resulting tag.
fn reduce(pt: ProofType, body: &Value) -> Result<Value> {
    let reduced = match pt {
        ProofType::HashShare => {
            let mut entries = vec![
                (
                    "headerHash",
                    Value::Bytes(bytes_of(body, &["headerHash"])?.to_vec()),
                ),
                ("u", Value::Bytes(bytes_of(body, &["u"])?.to_vec())),
                ("nonce", Value::Int(uint_of(body, &["nonce"])? as i128)),
            ];
            if let Some(mix) = body.get("mixSeed").and_then(Value::as_bytes) {
                entries.push(("mixSeed", Value::Bytes(mix.to_vec())));
            }
            Value::text_map(entries)
        }
        ProofType::Ai => Value::text_map(vec![
            (
                "evidenceDigest",
                opaque_digest(bytes_of(body, &["tee", "evidence"])?),
            ),
            ("trapsDigest", Value::Bytes(canon_hash(field(body, &["traps"])?)?.to_vec())),
            (
                "outputDigest",
                Value::Bytes(bytes_of(body, &["job", "outputDigest"])?.to_vec()),
            ),
        ]),
        ProofType::Quantum => Value::text_map(vec![
            (
                "providerDigest",
                opaque_digest(bytes_of(body, &["provider", "certChain"])?),
            ),
            ("trapsDigest", Value::Bytes(canon_hash(field(body, &["traps"])?)?.to_vec())),
            (
                "circuitDigest",
                Value::Bytes(bytes_of(body, &["job", "circuitDigest"])?.to_vec()),
            ),
            ("shots", Value::Int(uint_of(body, &["job", "shots"])? as i128)),
            ("depth", Value::Int(uint_of(body, &["job", "depth"])? as i128)),
            ("width", Value::Int(uint_of(body, &["job", "width"])? as i128)),
        ]),
        ProofType::Storage => Value::text_map(vec![
            (
                "providerId",
                Value::Bytes(bytes_of(body, &["provider", "providerId"])?.to_vec()),
            ),
            (
                "sectorRoot",
                Value::Bytes(bytes_of(body, &["commit", "sectorRoot"])?.to_vec()),
            ),
            ("epoch", Value::Int(uint_of(body, &["challenge", "epoch"])? as i128)),
            (
                "seedDigest",
                opaque_digest(bytes_of(body, &["challenge", "seed"])?),
            ),
        ]),
        ProofType::Vdf => Value::text_map(vec![
            (
                "modulusDigest",
                opaque_digest(bytes_of(body, &["group", "N"])?),
            ),
            ("gDigest", opaque_digest(bytes_of(body, &["g"])?)),
            ("yDigest", opaque_digest(bytes_of(body, &["y"])?)),
            ("T", Value::Int(uint_of(body, &["T"])? as i128)),
        ]),
    };
    Ok(reduced)
}

/// Compute the domain-separated nullifier for a proof body.
///
/// The body is structurally validated first; the result is independent of
/// the body's map key ordering.
pub fn compute_nullifier(pt: ProofType, body: &Value, salt: NullifierSalt<'_>) -> Result<[u8; 32]> {
    validate_body(pt, body)?;

    let identity = reduce(pt, body)?;
    let identity_hash = canon_hash(&identity)?;

    let mut preimage = Vec::with_capacity(64);
    preimage.extend_from_slice(DOMAIN_PREFIX);
    preimage.extend_from_slice(domain_for(pt));
    preimage.push(0x00);
    preimage.extend_from_slice(&identity_hash);
    if let Some(chain_id) = salt.chain_id {
        preimage.push(0x01);
        preimage.extend_from_slice(&chain_id.to_be_bytes());
    }
    if let Some(policy_root) = salt.policy_root {
        preimage.push(0x02);
        preimage.extend_from_slice(policy_root);
    }
    Ok(sha3_256(&preimage))
}

/// Recompute a nullifier from an envelope's body (the embedded tag is
/// ignored; callers compare against it).
pub fn compute_envelope_nullifier(
    env: &ProofEnvelope,
    salt: NullifierSalt<'_>,
) -> Result<[u8; 32]> {
    compute_nullifier(env.type_id, &env.body, salt)
}
