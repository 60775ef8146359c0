//! # AI Proof Verification
//!
//! Checks that a job ran inside a genuine TEE and passed its correctness
//! beacons:
//!
//! 1. Vendor attestation (SGX/TDX, SEV-SNP, CCA, or TPM) parsed and
//!    evaluated against the context's expected measurements and policy.
//! 2. Trap receipts: seed commit→reveal, then a domain-separated Merkle
//!    root over `promptDigest || answerDigest || okByte` leaves.
//! 3. Cross-provider redundancy bounds (`agree <= total <= replicas`).
//! 4. QoS composite from P95 latency, success rate and uptime.
//! 5. Work units from `aiUnits` or the runtime baseline.

use proofs_attest::tee::{cca, sev_snp, sgx, tpm_dice};
use proofs_attest::{evaluate_attestation, TeeEvidence, TeeKind};
use proofs_codec::validate_body;
use proofs_crypto::hash::sha3_256;
use proofs_crypto::math::clamp01;
use proofs_crypto::merkle::tagged_tree_root;
use proofs_types::value::Value;
use proofs_types::{b32, ProofError, ProofMetrics, ProofType, Result};
use tracing::debug;

use crate::context::VerifyContext;

/// Trap receipt leaf domain.
pub const TRAP_ITEM_DOMAIN: &[u8] = b"Animica/AITrapItem/v1";
/// Trap tree node domain.
pub const TRAP_ROOT_DOMAIN: &[u8] = b"Animica/AITrapRoot/v1";

/// Units credited per runtime second when `aiUnits` is absent.
const UNITS_PER_RUNTIME_SEC: u64 = 100;

/// Observability record for a verified AI proof.
#[derive(Debug, Clone)]
pub struct AiDetails {
    /// Job task id (hex).
    pub task_id: String,
    /// TEE vendor that produced the evidence.
    pub tee_vendor: &'static str,
    /// Measurement binding digest from policy evaluation.
    pub measurement_binding: [u8; 32],
    /// Trap receipts that passed.
    pub traps_ok: u64,
    /// Total trap receipts.
    pub traps_total: u64,
    /// Recomputed trap root (hex).
    pub trap_root: String,
    /// Redundancy section echo: (replicas, agree, total).
    pub redundancy: (u64, u64, u64),
    /// Raw agreement ratio in `[0,1]`.
    pub redundancy_score: f64,
    /// Latency component of the QoS score.
    pub latency_component: f64,
    /// Derived work units.
    pub ai_units: u64,
}

/// Dispatch the TEE section to the right vendor parser.
fn parse_tee_evidence(tee: &Value, ctx: &VerifyContext) -> Result<TeeEvidence> {
    let kind_str = tee
        .get("kind")
        .and_then(Value::as_text)
        .ok_or_else(|| ProofError::schema("tee.kind must be text"))?;
    let kind = TeeKind::parse(kind_str)
        .ok_or_else(|| ProofError::schema(format!("unknown TEE vendor: {kind_str}")))?;
    let evidence = tee
        .get("evidence")
        .and_then(Value::as_bytes)
        .ok_or_else(|| ProofError::schema("tee.evidence must be bytes"))?;

    match kind {
        TeeKind::Sgx => sgx::verify_quote(
            evidence,
            ctx.tee.pck_chain_pem.as_deref(),
            ctx.tee.qe_identity_json.as_deref(),
            ctx.now_unix,
        ),
        TeeKind::SevSnp => sev_snp::verify_attestation(
            evidence,
            ctx.tee.vcek_pem.as_deref(),
            ctx.tee.sev_chain_pem.as_deref(),
            ctx.tee.sev_root_pem.as_deref(),
        ),
        TeeKind::Cca => cca::verify_realm_token(evidence, ctx.tee.cca_root_pem.as_deref(), b""),
        TeeKind::Tpm => tpm_dice::verify_tpm_evidence(
            evidence,
            &[0, 1, 2, 3, 4, 5, 6, 7],
            "sha256",
            tpm_dice::QuoteInput::default(),
            &[],
            None,
        ),
    }
}

/// Trap item leaf: `promptDigest || answerDigest || okByte`.
fn trap_item_bytes(prompt: &[u8; 32], answer: &[u8; 32], ok: bool) -> Vec<u8> {
    let mut item = Vec::with_capacity(65);
    item.extend_from_slice(prompt);
    item.extend_from_slice(answer);
    item.push(u8::from(ok));
    item
}

/// Verify the traps section; returns `(ratio, ok_count, total, root)`.
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
    let mut ok_count = 0u64;
    for (idx, receipt) in receipts.iter().enumerate() {
        let invalid =
            |msg: &str| ProofError::schema(format!("invalid trap receipt at index {idx}: {msg}"));
        let prompt = b32(receipt
            .get("promptDigest")
            .and_then(Value::as_bytes)
            .ok_or_else(|| invalid("promptDigest must be 32 bytes"))?)?;
        let answer = b32(receipt
            .get("answerDigest")
            .and_then(Value::as_bytes)
            .ok_or_else(|| invalid("answerDigest must be 32 bytes"))?)?;
        let ok = receipt
            .get("ok")
            .and_then(Value::as_bool)
            .ok_or_else(|| invalid("ok must be bool"))?;
        leaves.push(trap_item_bytes(&prompt, &answer, ok));
        ok_count += u64::from(ok);
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

    let total = receipts.len() as u64;
    let ratio = ok_count as f64 / total.max(1) as f64;
    Ok((ratio, ok_count, total, root))
}

/// Redundancy bounds and agreement score.
fn redundancy_score(section: &Value) -> Result<(f64, (u64, u64, u64))> {
    let replicas = section.get("replicas").unwrap().as_u64().unwrap();
    let agree = section.get("agree").unwrap().as_u64().unwrap();
    let total = section.get("total").unwrap().as_u64().unwrap();
    if replicas == 0 {
        return Err(ProofError::schema("redundancy.replicas must be positive"));
    }
    if agree > total || total > replicas {
        return Err(ProofError::schema(
            "redundancy must satisfy agree <= total <= replicas",
        ));
    }
    let score = if total == 0 {
        0.0
    } else {
        agree as f64 / total as f64
    };
    Ok((clamp01(score), (replicas, agree, total)))
}

/// QoS composite. Latency squashes on a 1 s scale (0 ms → 1.0,
/// 1000 ms → ~0.5, 4000 ms → 0); weights 0.4/0.3/0.3.
pub(crate) fn qos_score(
    qos: &Value,
    latency_scale_ms: f64,
    weights: (f64, f64, f64),
) -> Result<(f64, f64)> {
    let p95 = qos.get("latencyMsP95").unwrap().as_u64().unwrap();
    let success = qos.get("successPermil").unwrap().as_u64().unwrap();
    let uptime = qos.get("uptimePermil").unwrap().as_u64().unwrap();
    if success > 1000 || uptime > 1000 {
        return Err(ProofError::schema(
            "successPermil/uptimePermil must be 0..1000",
        ));
    }
    let lat_norm = clamp01(1.0 - (p95 as f64 / latency_scale_ms).ln_1p() / 4.0f64.ln_1p());
    let (wl, ws, wu) = weights;
    let score = clamp01(
        wl * lat_norm + ws * (success as f64 / 1000.0) + wu * (uptime as f64 / 1000.0),
    );
    Ok((score, lat_norm))
}

/// Work units: explicit `aiUnits` wins, else runtime baseline.
fn derive_units(job: &Value) -> Result<u64> {
    if let Some(units) = job.get("aiUnits").and_then(Value::as_u64) {
        return Ok(units);
    }
    let runtime = job.get("runtimeSec").unwrap().as_u64().unwrap();
    Ok(runtime.saturating_mul(UNITS_PER_RUNTIME_SEC))
}

/// Verify an AI proof body and return `(metrics, details)`.
pub fn verify_body(body: &Value, ctx: &VerifyContext) -> Result<(ProofMetrics, AiDetails)> {
    validate_body(ProofType::Ai, body)?;

    let evidence = parse_tee_evidence(body.get("tee").unwrap(), ctx)?;
    let attestation =
        evaluate_attestation(&evidence, &ctx.tee.expected, &ctx.tee.policy, ctx.now_unix);
    attestation.require_ok()?;
    debug!(vendor = evidence.vendor, "TEE attestation accepted");

    let (traps_ratio, traps_ok, traps_total, trap_root) = verify_traps(body.get("traps").unwrap())?;
    let (red_score, red_counts) = redundancy_score(body.get("redundancy").unwrap())?;
    let (qos, lat_component) = qos_score(body.get("qos").unwrap(), 1000.0, (0.4, 0.3, 0.3))?;

    let job = body.get("job").unwrap();
    let ai_units = derive_units(job)?;
    let task_id = hex::encode(job.get("taskId").unwrap().as_bytes().unwrap());

    // Effective redundancy factor: agreement-weighted replica count,
    // floored at a single honest provider.
    let redundancy = (red_score * red_counts.0 as f64).max(1.0);

    let metrics = ProofMetrics {
        ai_units: Some(ai_units),
        traps_ratio: Some(traps_ratio),
        redundancy: Some(redundancy),
        qos: Some(qos),
        ..Default::default()
    };
    let details = AiDetails {
        task_id,
        tee_vendor: evidence.vendor,
        measurement_binding: attestation.measurement_binding,
        traps_ok,
        traps_total,
        trap_root: hex::encode(trap_root),
        redundancy: red_counts,
        redundancy_score: red_score,
        latency_component: lat_component,
        ai_units,
    };
    Ok((metrics, details))
}
