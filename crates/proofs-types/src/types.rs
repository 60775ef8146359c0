//! # Proof Envelope
//!
//! The universal wire object consumed by the verification core.
//!
//! ## Invariants (enforced by verifiers / validators)
//!
//! - Nullifier uniqueness within an acceptance TTL window belongs to the
//!   consensus layer; the envelope only carries the 32-byte tag.
//! - Body schema validity is checked by the codec before any verifier runs.
//! - The envelope's nullifier is independently recomputable from the body.

use crate::errors::{ProofError, Result};
use crate::value::Value;

/// Canonical ids for each proof family. Values are fixed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ProofType {
    /// PoW-style hash share bound to a header hash.
    HashShare = 1,
    /// TEE-attested AI compute job.
    Ai = 2,
    /// Trap-circuit attested quantum compute job.
    Quantum = 3,
    /// Storage heartbeat (PoSt-style inclusion sampling).
    Storage = 4,
    /// Wesolowski verifiable delay function.
    Vdf = 5,
}

impl ProofType {
    /// All known proof types in wire-id order.
    pub const ALL: [ProofType; 5] = [
        ProofType::HashShare,
        ProofType::Ai,
        ProofType::Quantum,
        ProofType::Storage,
        ProofType::Vdf,
    ];

    /// Wire id.
    pub fn as_u64(self) -> u64 {
        self as u64
    }

    /// Short lowercase name used in logs and domain subtags.
    pub fn name(self) -> &'static str {
        match self {
            ProofType::HashShare => "hashshare",
            ProofType::Ai => "ai",
            ProofType::Quantum => "quantum",
            ProofType::Storage => "storage",
            ProofType::Vdf => "vdf",
        }
    }
}

impl TryFrom<u64> for ProofType {
    type Error = ProofError;

    fn try_from(v: u64) -> Result<Self> {
        match v {
            1 => Ok(ProofType::HashShare),
            2 => Ok(ProofType::Ai),
            3 => Ok(ProofType::Quantum),
            4 => Ok(ProofType::Storage),
            5 => Ok(ProofType::Vdf),
            other => {
                Err(ProofError::schema(format!("unknown type_id: {other}"))
                    .with_context("type_id", other.to_string()))
            }
        }
    }
}

/// Length-check a slice into a 32-byte array.
pub fn b32(x: &[u8]) -> Result<[u8; 32]> {
    <[u8; 32]>::try_from(x)
        .map_err(|_| ProofError::schema(format!("expected 32 bytes, got {}", x.len())))
}

/// Generic proof envelope carried in blocks and the mempool.
///
/// The body stays a canonical [`Value`] map so unknown forward-compatible
/// keys survive round-trips; verifiers parse typed views out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofEnvelope {
    /// Proof family discriminator.
    pub type_id: ProofType,
    /// Kind-specific body map (canonical key order).
    pub body: Value,
    /// 32-byte domain-separated nullifier, recomputable from the body.
    pub nullifier: [u8; 32],
}

impl ProofEnvelope {
    /// Construct an envelope, length-checking the nullifier.
    pub fn new(type_id: ProofType, body: Value, nullifier: &[u8]) -> Result<Self> {
        if body.as_map().is_none() {
            return Err(ProofError::schema("proof body must be a map"));
        }
        Ok(Self {
            type_id,
            body,
            nullifier: b32(nullifier)?,
        })
    }

    /// Small human/debug summary; safe to log.
    pub fn summary(&self) -> String {
        let nullifier_prefix = hex::encode(&self.nullifier[..8]);
        match self.type_id {
            ProofType::HashShare => {
                let nonce = self
                    .body
                    .get("nonce")
                    .and_then(Value::as_u64)
                    .unwrap_or_default();
                format!("hashshare(nonce={nonce:#x}, nullifier={nullifier_prefix}…)")
            }
            ProofType::Ai => {
                let traps = self
                    .body
                    .get("traps")
                    .and_then(|t| t.get("receipts"))
                    .and_then(Value::as_array)
                    .map(|r| r.len())
                    .unwrap_or(0);
                format!("ai(traps={traps}, nullifier={nullifier_prefix}…)")
            }
            ProofType::Quantum => {
                let shots = self
                    .body
                    .get("job")
                    .and_then(|j| j.get("shots"))
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                format!("quantum(shots={shots}, nullifier={nullifier_prefix}…)")
            }
            ProofType::Storage => {
                let samples = self
                    .body
                    .get("proof")
                    .and_then(|p| p.get("samples"))
                    .and_then(Value::as_array)
                    .map(|s| s.len())
                    .unwrap_or(0);
                format!("storage(samples={samples}, nullifier={nullifier_prefix}…)")
            }
            ProofType::Vdf => {
                let t = self.body.get("T").and_then(Value::as_u64).unwrap_or(0);
                format!("vdf(T={t}, nullifier={nullifier_prefix}…)")
            }
        }
    }
}
