//! # Hash-Share Verification
//!
//! Recomputes the uniform draw `u` from `(headerHash, nonce[, mixSeed])`
//! over a domain-separated SHA3-256 transcript, converts it to work in
//! µ-nats via `S = -ln(u)`, and optionally enforces a µ-nat difficulty
//! target. Only the header hash binds the share; nothing else block-local
//! is mixed in.

use proofs_crypto::hash::{sha3_256, Hash32};
use proofs_crypto::math::{h_of_u, to_micro_nats};
use proofs_types::value::Value;
use proofs_types::{b32, ProofError, ProofMetrics, ProofType, Result};
use tracing::debug;

use proofs_codec::validate_body;

/// Domain tag for the u-draw transcript.
pub const U_DOMAIN: &[u8] = b"Animica/HashShare/u-draw/v1";

/// Details record for observability; safe to log.
#[derive(Debug, Clone, PartialEq)]
pub struct HashShareDetails {
    /// Work in nats, `-ln(u)`.
    pub s_nats: f64,
    /// Work in µ-nats (integer, consensus-exact).
    pub s_mu: u64,
    /// The uniform scalar in `(0, 1]`.
    pub u_scalar: f64,
    /// Enforced target, when present.
    pub target_mu: Option<u64>,
    /// Whether the target was met (None when no target).
    pub meets_target: Option<bool>,
}

/// `u_digest = SHA3-256(domain || headerHash || u64_be(nonce) || [mixSeed])`.
pub fn compute_u_digest(header_hash: &[u8; 32], nonce: u64, mix_seed: Option<&[u8; 32]>) -> Hash32 {
    let mut preimage = Vec::with_capacity(U_DOMAIN.len() + 32 + 8 + 32);
    preimage.extend_from_slice(U_DOMAIN);
    preimage.extend_from_slice(header_hash);
    preimage.extend_from_slice(&nonce.to_be_bytes());
    if let Some(seed) = mix_seed {
        preimage.extend_from_slice(seed);
    }
    sha3_256(&preimage)
}

/// Map a 32-byte digest to a uniform scalar in `(0, 1]` as `(x+1)/2^256`.
pub fn digest_to_u_scalar(digest: &Hash32) -> f64 {
    let mut x = 0.0f64;
    for b in digest {
        x = x * 256.0 + *b as f64;
    }
    ((x + 1.0) / 2f64.powi(256)).clamp(f64::MIN_POSITIVE, 1.0)
}

/// Verify a hash-share body and return `(metrics, details)`.
pub fn verify_body(body: &Value) -> Result<(ProofMetrics, HashShareDetails)> {
    validate_body(ProofType::HashShare, body)?;

    let header_hash = b32(body.get("headerHash").unwrap().as_bytes().unwrap())?;
    let nonce = body.get("nonce").unwrap().as_u64().unwrap();
    let claim_u = b32(body.get("u").unwrap().as_bytes().unwrap())?;
    let mix_seed = match body.get("mixSeed") {
        Some(v) => Some(b32(v.as_bytes().unwrap())?),
        None => None,
    };

    if let Some(algo) = body.get("algo").and_then(Value::as_text) {
        if algo != "sha3-256" {
            return Err(ProofError::schema(format!("unsupported u-draw algo: {algo}")));
        }
    }

    let recomputed = compute_u_digest(&header_hash, nonce, mix_seed.as_ref());
    if recomputed != claim_u {
        return Err(ProofError::proof(
            "u digest mismatch (headerHash/nonce/mixSeed binding failed)",
        )
        .with_context("nonce", format!("{nonce:#x}"))
        .with_context("headerHash", hex::encode(header_hash)));
    }

    let u_scalar = digest_to_u_scalar(&recomputed);
    let s_nats = h_of_u(u_scalar).ok_or_else(|| ProofError::proof("u scalar out of range"))?;
    let s_mu = to_micro_nats(s_nats).ok_or_else(|| ProofError::proof("work overflows µ-nats"))?;
    debug!(s_mu, "hash share draw verified");

    let target_mu = body.get("targetMu").and_then(Value::as_u64);
    let (d_ratio, meets_target) = match target_mu {
        Some(0) => {
            return Err(ProofError::schema("targetMu must be positive when provided"));
        }
        Some(target) => {
            if s_mu < target {
                return Err(ProofError::proof(format!(
                    "share below target (S_mu={s_mu} < targetMu={target})"
                )));
            }
            (s_mu as f64 / target as f64, Some(true))
        }
        None => (0.0, None),
    };

    let metrics = ProofMetrics {
        d_ratio: Some(d_ratio),
        ..Default::default()
    };
    let details = HashShareDetails {
        s_nats,
        s_mu,
        u_scalar,
        target_mu,
        meets_target,
    };
    Ok((metrics, details))
}
