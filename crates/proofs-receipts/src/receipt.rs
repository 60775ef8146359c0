//! # Proof Receipts & `proofsRoot` Aggregation
//!
//! Compact, consensus-stable receipts derived from verified proofs: the
//! Merkle-leaf material committed by block headers. Floats never hit the
//! wire: ψ-signals quantize to fixed-point integers with deterministic
//! per-key scales before the receipt is CBOR-encoded with small integer
//! keys.
//!
//! Wire format (canonical CBOR):
//! `{ 0: version, 1: type_id, 2: nullifier, 3: proof_digest, 4: [[key, int], ...] }`

use proofs_codec::encode;
use proofs_crypto::hash::{sha3_256, sha3_256_concat};
use proofs_types::value::{MapKey, Value};
use proofs_types::{ProofType, Result};
use std::collections::BTreeMap;

/// Receipt leaf hash domain.
pub const DOMAIN_LEAF: &[u8] = b"animica/proofReceipt/leaf/v1";
/// Proof body digest domain.
pub const DOMAIN_PROOF_BODY: &[u8] = b"animica/proofBody/digest/v1";
/// Merkle internal node domain.
pub const DOMAIN_NODE: &[u8] = b"animica/merkle/node/v1";

/// Receipt schema version.
pub const RECEIPT_VERSION: u64 = 1;

/// Fixed-point scale for a signal key.
///
/// Ratios get 1e9 ticks, units/seconds 1e6, boolean flags 1.
fn scale_for(key: &str) -> u64 {
    match key {
        "d_ratio" | "traps_ratio" | "qos" => 1_000_000_000,
        "heartbeat" | "retrieval_bonus" => 1,
        // units, seconds, redundancy and any future positive reals.
        _ => 1_000_000,
    }
}

/// Clamp/normalize a signal before quantization, mirroring the policy
/// adapter's conventions.
fn sanitize(key: &str, value: f64) -> f64 {
    let v = if value.is_finite() { value } else { 0.0 };
    match key {
        "d_ratio" | "traps_ratio" | "qos" => v.clamp(0.0, 1.0),
        "heartbeat" | "retrieval_bonus" => {
            if v != 0.0 {
                1.0
            } else {
                0.0
            }
        }
        "redundancy" => v.max(1.0),
        _ => v.max(0.0),
    }
}

/// Convert float signals to fixed-point integers with deterministic
/// scales, sorted ascending by key.
pub fn quantize_signals(signals: &BTreeMap<String, f64>) -> Vec<(String, u64)> {
    // BTreeMap iteration is already ascending by key.
    signals
        .iter()
        .map(|(key, value)| {
            let q = (sanitize(key, *value) * scale_for(key) as f64).round();
            (key.clone(), if q < 0.0 { 0 } else { q as u64 })
        })
        .collect()
}

/// Compact receipt hashed into `proofsRoot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofReceipt {
    /// Schema version (1).
    pub version: u64,
    /// Proof kind.
    pub type_id: ProofType,
    /// 32-byte domain-separated nullifier.
    pub nullifier: [u8; 32],
    /// 32-byte commitment to the proof body.
    pub proof_digest: [u8; 32],
    /// Quantized signals, sorted by key.
    pub signals_q: Vec<(String, u64)>,
}

impl ProofReceipt {
    /// The integer-keyed CBOR object for this receipt.
    pub fn to_cbor_value(&self) -> Value {
        Value::map(vec![
            (MapKey::Int(0), Value::Int(self.version as i128)),
            (MapKey::Int(1), Value::Int(self.type_id.as_u64() as i128)),
            (MapKey::Int(2), Value::Bytes(self.nullifier.to_vec())),
            (MapKey::Int(3), Value::Bytes(self.proof_digest.to_vec())),
            (
                MapKey::Int(4),
                Value::Array(
                    self.signals_q
                        .iter()
                        .map(|(k, v)| {
                            Value::Array(vec![
                                Value::Text(k.clone()),
                                Value::Int(*v as i128),
                            ])
                        })
                        .collect(),
                ),
            ),
        ])
    }

    /// Canonical CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        encode(&self.to_cbor_value())
    }

    /// Leaf hash: `SHA3-256(leaf_domain || cbor(receipt))`.
    pub fn leaf_hash(&self) -> Result<[u8; 32]> {
        Ok(sha3_256_concat([DOMAIN_LEAF, &self.to_cbor()?]))
    }
}

/// Proof body commitment: `SHA3-256(body_domain || canonical_body_cbor)`.
pub fn digest_proof_body(body_cbor: &[u8]) -> [u8; 32] {
    sha3_256_concat([DOMAIN_PROOF_BODY, body_cbor])
}

/// Build a receipt from verified material.
pub fn build_receipt(
    type_id: ProofType,
    nullifier: [u8; 32],
    proof_body_cbor: &[u8],
    psi_signals: &BTreeMap<String, f64>,
) -> ProofReceipt {
    ProofReceipt {
        version: RECEIPT_VERSION,
        type_id,
        nullifier,
        proof_digest: digest_proof_body(proof_body_cbor),
        signals_q: quantize_signals(psi_signals),
    }
}

/// Re-quantize signals and compare to the receipt bit-for-bit.
pub fn verify_signals_match(receipt: &ProofReceipt, psi_signals: &BTreeMap<String, f64>) -> bool {
    quantize_signals(psi_signals) == receipt.signals_q
}

/// Canonical Merkle root over receipt leaf hashes.
///
/// Odd nodes are duplicated; the empty set yields the sentinel
/// `SHA3-256(leaf_domain)`.
pub fn merkleize_receipts(receipts: &[ProofReceipt]) -> Result<[u8; 32]> {
    if receipts.is_empty() {
        return Ok(sha3_256(DOMAIN_LEAF));
    }
    let mut level = Vec::with_capacity(receipts.len());
    for receipt in receipts {
        level.push(receipt.leaf_hash()?);
    }
    Ok(proofs_crypto::merkle::fold_nodes(DOMAIN_NODE, level))
}
