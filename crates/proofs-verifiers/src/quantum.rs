//! # Quantum Proof Verification
//!
//! 1. Provider identity: compact JWS (or hybrid envelope) resolved against
//!    the local JWKS cache, optional X.509 binding to the pinned QPU root,
//!    optional post-quantum bundle, all under the context's QPU policy.
//! 2. Trap circuits: seed commit→reveal, Merkle root over
//!    `trapDigest || u64_be(count) || okByte` leaves, shot-weighted pass
//!    ratio with a Wilson lower bound reported for observability.
//! 3. Work units from `quantumUnits` or the reference mapping.
//! 4. QoS composite tuned for queue-bound QPU latencies.

use proofs_attest::qpu::{provider_cert, units_for};
use proofs_codec::validate_body;
use proofs_crypto::hash::sha3_256;
use proofs_crypto::merkle::tagged_tree_root;
use proofs_crypto::stats::wilson_interval;
use proofs_types::value::Value;
use proofs_types::{b32, ProofError, ProofMetrics, ProofType, Result};
use tracing::debug;

use crate::ai::qos_score;
use crate::context::VerifyContext;

/// Trap circuit leaf domain.
pub const TRAP_ITEM_DOMAIN: &[u8] = b"Animica/QTrapItem/v1";
/// Trap tree node domain.
pub const TRAP_ROOT_DOMAIN: &[u8] = b"Animica/QTrapRoot/v1";

/// Significance level for the reported trap lower bound.
const TRAP_ALPHA: f64 = 0.05;

/// Observability record for a verified quantum proof.
#[derive(Debug, Clone)]
pub struct QuantumDetails {
    /// Job task id (hex).
    pub task_id: String,
    /// Circuit shape: (depth, width, shots).
    pub shape: (u64, u64, u64),
    /// Provider JWS key id, when resolved.
    pub provider_kid: Option<String>,
    /// Provider JWKS slug that verified the identity.
    pub provider_slug: Option<String>,
    /// Trap shots that passed.
    pub trap_ok_shots: u64,
    /// Total trap shots.
    pub trap_total_shots: u64,
    /// Wilson lower bound on the trap pass ratio at α=0.05.
    pub trap_ratio_lb95: f64,
    /// Recomputed trap root (hex).
    pub trap_root: String,
    /// Derived work units.
    pub quantum_units: u64,
}

/// Trap leaf: `trapDigest || u64_be(count) || okByte`.
fn trap_item_bytes(digest: &[u8; 32], count: u64, ok: bool) -> Vec<u8> {
    let mut item = Vec::with_capacity(41);
    item.extend_from_slice(digest);
    item.extend_from_slice(&count.to_be_bytes());
    item.push(u8::from(ok));
    item
}

/// Verify the traps section; returns `(ratio, ok_shots, total_shots, root)`.
fn verify_traps(traps: &Value) -> Result<(f64, u64, u64, [u8; 32])> {
    let seed_commit = b32(traps.get("seedCommit").unwrap().as_bytes().unwrap())?;
    let seed_reveal = b32(traps.get("seedReveal").unwrap().as_bytes().unwrap())?;
    if sha3_256(&seed_reveal) != seed_commit {
        return Err(ProofError::proof("trap seed commit mismatch"));
    }

    let receipts = traps
        .get("receipts")
        .and_then(Value::as_array)
        .ok_or_else(|| ProofError::schema("traps.receipts must be an array"))?;

    let mut leaves: Vec<Vec<u8>> = Vec::with_capacity(receipts.len());
    let mut ok_shots = 0u64;
    let mut total_shots = 0u64;
    for (idx, receipt) in receipts.iter().enumerate() {
        let invalid =
            |msg: &str| ProofError::schema(format!("invalid traps.receipts[{idx}]: {msg}"));
        let digest = b32(receipt
            .get("trapDigest")
            .and_then(Value::as_bytes)
            .ok_or_else(|| invalid("trapDigest must be 32 bytes"))?)?;
        let count = receipt
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| invalid("count must be a non-negative integer"))?;
        let ok = receipt
            .get("ok")
            .and_then(Value::as_bool)
            .ok_or_else(|| invalid("ok must be bool"))?;
        leaves.push(trap_item_bytes(&digest, count, ok));
        total_shots = total_shots.saturating_add(count);
        if ok {
            ok_shots = ok_shots.saturating_add(count);
        }
    }

    let root = tagged_tree_root(
        TRAP_ITEM_DOMAIN,
        TRAP_ROOT_DOMAIN,
        leaves.iter().map(Vec::as_slice),
    );
    let declared = b32(traps.get("root").unwrap().as_bytes().unwrap())?;
    if root != declared {
        return Err(ProofError::proof("trap receipts Merkle root mismatch"));
    }

    let ratio = ok_shots as f64 / total_shots.max(1) as f64;
    Ok((ratio, ok_shots, total_shots, root))
}

/// Units: explicit `quantumUnits` wins, else the reference mapping.
fn derive_units(job: &Value) -> Result<u64> {
    if let Some(units) = job.get("quantumUnits").and_then(Value::as_u64) {
        return Ok(units);
    }
    let depth = job.get("depth").unwrap().as_u64().unwrap();
    let width = job.get("width").unwrap().as_u64().unwrap();
    let shots = job.get("shots").unwrap().as_u64().unwrap();
    if shots == 0 {
        return Err(ProofError::schema("shots must be >= 1"));
    }
    Ok(units_for(depth, width, shots))
}

/// Verify a quantum proof body and return `(metrics, details)`.
pub fn verify_body(body: &Value, ctx: &VerifyContext) -> Result<(ProofMetrics, QuantumDetails)> {
    validate_body(ProofType::Quantum, body)?;

    let provider = body.get("provider").unwrap();
    let cert_bytes = provider
        .get("certChain")
        .and_then(Value::as_bytes)
        .ok_or_else(|| ProofError::schema("provider.certChain must be bytes"))?;
    let identity = provider_cert::verify_provider(
        cert_bytes,
        &ctx.qpu.jwks,
        ctx.qpu.root_pem.as_deref(),
        &ctx.qpu.policy,
        ctx.now_unix,
    )?;
    if !identity.overall_ok {
        let mut err = ProofError::attestation(
            "quantum provider certificate failed verification",
        );
        for (mechanism, note) in &identity.decisions {
            err = err.with_context(mechanism.clone(), note.clone());
        }
        return Err(err);
    }
    debug!(kid = ?identity.kid, "quantum provider identity accepted");

    let (traps_ratio, trap_ok_shots, trap_total_shots, trap_root) =
        verify_traps(body.get("traps").unwrap())?;
    let trap_ratio_lb95 = if trap_total_shots > 0 {
        wilson_interval(trap_ok_shots, trap_total_shots, TRAP_ALPHA)
            .map(|ci| ci.lower)
            .unwrap_or(0.0)
    } else {
        0.0
    };

    let (qos, _lat) = qos_score(body.get("qos").unwrap(), 1500.0, (0.45, 0.30, 0.25))?;

    let job = body.get("job").unwrap();
    let quantum_units = derive_units(job)?;
    let task_id = hex::encode(job.get("taskId").unwrap().as_bytes().unwrap());
    let shape = (
        job.get("depth").unwrap().as_u64().unwrap(),
        job.get("width").unwrap().as_u64().unwrap(),
        job.get("shots").unwrap().as_u64().unwrap(),
    );

    let metrics = ProofMetrics {
        quantum_units: Some(quantum_units),
        traps_ratio: Some(traps_ratio),
        qos: Some(qos),
        ..Default::default()
    };
    let details = QuantumDetails {
        task_id,
        shape,
        provider_kid: identity.kid,
        provider_slug: identity.key_ref.map(|k| k.slug),
        trap_ok_shots,
        trap_total_shots,
        trap_ratio_lb95,
        trap_root: hex::encode(trap_root),
        quantum_units,
    };
    Ok((metrics, details))
}
