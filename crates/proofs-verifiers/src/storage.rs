//! # Storage Heartbeat Verification
//!
//! PoSt-style liveness: the provider proves random leaves of a committed
//! sector tree at a challenge epoch/seed.
//!
//! - Inclusion paths use the storage leaf/node domains with the index LSB
//!   selecting sibling position; path height must match the tree.
//! - Challenge binding re-derives sample indices from `(seed, epoch)` in
//!   SHA3 counter mode and requires them to be covered by the provided set.
//! - An optional half-open heartbeat window `[start, end)` is enforced
//!   against the context epoch.
//! - Optional retrieval tickets earn a bonus that also lifts the QoS
//!   composite.

use proofs_codec::validate_body;
use proofs_crypto::hash::sha3_256_concat;
use proofs_crypto::math::clamp01;
use proofs_crypto::merkle::path_root;
use proofs_types::value::Value;
use proofs_types::{b32, ProofError, ProofMetrics, ProofType, Result};
use tracing::debug;

use crate::context::VerifyContext;

/// Sector leaf domain.
pub const LEAF_DOMAIN: &[u8] = b"Animica/StorageLeaf/v1";
/// Sector node domain.
pub const NODE_DOMAIN: &[u8] = b"Animica/StorageNode/v1";
/// Challenge index stream domain.
pub const CHALLENGE_DOMAIN: &[u8] = b"Animica/StorageChallenge/v1";

/// Observability record for a verified storage heartbeat.
#[derive(Debug, Clone)]
pub struct StorageDetails {
    /// Provider id (hex).
    pub provider_id: String,
    /// Sector root (hex).
    pub sector_root: String,
    /// Samples provided / verified.
    pub samples_valid: u64,
    /// Policy minimum.
    pub min_samples: u64,
    /// Tree size used for challenge binding.
    pub tree_size: u64,
    /// Proof quality factor in `[0.5, 1.0]`.
    pub quality: f64,
    /// Nominal bytes proven live.
    pub storage_bytes: u64,
    /// Retrieval tickets seen / succeeded.
    pub tickets: (u64, u64),
    /// Retrieval bonus in `[0,1]`.
    pub retrieval_bonus: f64,
}

/// Deterministic sample index stream from `(seed, epoch)`.
///
/// Each digest of `SHA3-256(domain || seed || u64_be(epoch) || u64_be(ctr))`
/// yields four big-endian u64 indices.
pub fn derive_sample_indices(seed: &[u8; 32], epoch: u64, count: usize) -> Vec<u64> {
    let mut out = Vec::with_capacity(count);
    let mut ctr = 0u64;
    while out.len() < count {
        let digest = sha3_256_concat([
            CHALLENGE_DOMAIN,
            seed.as_ref(),
            &epoch.to_be_bytes(),
            &ctr.to_be_bytes(),
        ]);
        for chunk in digest.chunks(8) {
            if out.len() == count {
                break;
            }
            out.push(u64::from_be_bytes(chunk.try_into().unwrap()));
        }
        ctr += 1;
    }
    out
}

fn next_pow2(v: u64) -> u64 {
    v.max(1).next_power_of_two()
}

/// Retrieval bonus from tickets: `0.7·success_ratio + 0.3·latency_avg`,
/// where per-ticket latency squashes on a 500 ms scale.
fn retrieval_bonus(tickets: &[Value]) -> Result<(f64, u64, u64)> {
    if tickets.is_empty() {
        return Ok((0.0, 0, 0));
    }
    let mut oks = 0u64;
    let mut lat_sum = 0.0f64;
    for (idx, ticket) in tickets.iter().enumerate() {
        let invalid =
            |msg: &str| ProofError::schema(format!("invalid retrieval.tickets[{idx}]: {msg}"));
        b32(ticket
            .get("blobCommitment")
            .and_then(Value::as_bytes)
            .ok_or_else(|| invalid("blobCommitment must be 32 bytes"))?)?;
        let latency = ticket
            .get("latencyMs")
            .and_then(Value::as_u64)
            .ok_or_else(|| invalid("latencyMs must be a non-negative integer"))?;
        let ok = ticket
            .get("ok")
            .and_then(Value::as_bool)
            .ok_or_else(|| invalid("ok must be bool"))?;
        if ok {
            oks += 1;
            lat_sum += clamp01(1.0 - (latency as f64 / 500.0).ln_1p() / 4.0f64.ln_1p());
        }
    }
    let success = oks as f64 / tickets.len() as f64;
    let lat_avg = if oks > 0 { lat_sum / oks as f64 } else { 0.0 };
    let bonus = clamp01(0.7 * success + 0.3 * lat_avg);
    Ok((bonus, tickets.len() as u64, oks))
}

/// Verify a storage heartbeat body and return `(metrics, details)`.
pub fn verify_body(body: &Value, ctx: &VerifyContext) -> Result<(ProofMetrics, StorageDetails)> {
    validate_body(ProofType::Storage, body)?;

    let provider_id = b32(body
        .get("provider")
        .unwrap()
        .get("providerId")
        .unwrap()
        .as_bytes()
        .unwrap())?;

    let commit = body.get("commit").unwrap();
    let sector_root = b32(commit.get("sectorRoot").unwrap().as_bytes().unwrap())?;
    let sector_size = commit.get("sectorSize").unwrap().as_u64().unwrap();
    let replicas = commit.get("replicas").unwrap().as_u64().unwrap();
    let min_samples = commit.get("minSamples").unwrap().as_u64().unwrap();
    if sector_size == 0 || replicas == 0 || min_samples == 0 {
        return Err(ProofError::schema(
            "sectorSize, replicas, minSamples must be positive",
        ));
    }

    let challenge = body.get("challenge").unwrap();
    let epoch = challenge.get("epoch").unwrap().as_u64().unwrap();
    let seed = b32(challenge.get("seed").unwrap().as_bytes().unwrap())?;

    // Half-open heartbeat window [start, end) against the chain clock.
    if let (Some(window), Some(now)) = (challenge.get("window"), ctx.now_epoch) {
        let start = window.get("start").unwrap().as_u64().unwrap();
        let end = window.get("end").unwrap().as_u64().unwrap();
        if now < start || now >= end {
            return Err(ProofError::proof(format!(
                "heartbeat outside window [{start},{end}): now={now}"
            ))
            .with_context("epoch", epoch.to_string()));
        }
    }

    // Inclusion samples.
    let samples = body
        .get("proof")
        .unwrap()
        .get("samples")
        .and_then(Value::as_array)
        .ok_or_else(|| ProofError::schema("proof.samples must be an array"))?;
    if (samples.len() as u64) < min_samples {
        return Err(ProofError::proof(format!(
            "insufficient samples: got {}, need >= {min_samples}",
            samples.len()
        )));
    }

    let mut provided_indices = std::collections::BTreeSet::new();
    let mut max_index = 0u64;
    for (i, sample) in samples.iter().enumerate() {
        let invalid = |msg: &str| ProofError::schema(format!("invalid proof.samples[{i}]: {msg}"));
        let leaf = sample
            .get("leaf")
            .and_then(Value::as_bytes)
            .filter(|l| l.len() == 32)
            .ok_or_else(|| invalid("leaf must be 32 bytes"))?;
        let index = sample
            .get("index")
            .and_then(Value::as_u64)
            .ok_or_else(|| invalid("index must be a non-negative integer"))?;
        let path_vals = sample
            .get("path")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("path must be an array of 32-byte nodes"))?;
        let mut path = Vec::with_capacity(path_vals.len());
        for node in path_vals {
            path.push(b32(node
                .as_bytes()
                .ok_or_else(|| invalid("path nodes must be 32 bytes"))?)?);
        }

        if !provided_indices.insert(index) {
            return Err(ProofError::proof("duplicate sample indices provided"));
        }
        max_index = max_index.max(index);

        let leaf_hash = sha3_256_concat([LEAF_DOMAIN, leaf]);
        if path_root(leaf_hash, index, &path, NODE_DOMAIN) != sector_root {
            return Err(ProofError::proof(format!(
                "invalid Merkle path for sample index {index}"
            )));
        }
    }
    let valid = samples.len() as u64;

    // Challenge binding: the derived indices must be covered. The tree size
    // comes from the committed height when present, else the size guess.
    let tree_size = match commit.get("treeHeight").and_then(Value::as_u64) {
        Some(height) if height < 64 => 1u64 << height,
        Some(_) => return Err(ProofError::schema("treeHeight out of range")),
        None => next_pow2(max_index + 1),
    };
    let derived = derive_sample_indices(&seed, epoch, min_samples as usize);
    for d in &derived {
        if !provided_indices.contains(&(d % tree_size)) {
            return Err(ProofError::proof(
                "derived challenge indices are not fully covered by provided samples",
            ));
        }
    }
    debug!(valid, tree_size, "storage samples verified");

    // Quality from sample coverage; bytes scale by replicas and quality.
    let coverage = valid as f64 / valid.min(min_samples).max(1) as f64;
    let quality = clamp01(0.5 + 0.5 * coverage);
    let storage_bytes = (sector_size as f64 * replicas as f64 * quality) as u64;

    // Optional retrieval tickets.
    let (bonus, ticket_count, ticket_oks) = match body.get("retrieval") {
        Some(section) => {
            let tickets = section
                .get("tickets")
                .and_then(Value::as_array)
                .ok_or_else(|| ProofError::schema("retrieval.tickets must be an array"))?;
            retrieval_bonus(tickets)?
        }
        None => (0.0, 0, 0),
    };

    // A successful retrieval strictly lifts the composite.
    let qos = clamp01(0.7 * quality + 0.3 * bonus);

    let metrics = ProofMetrics {
        storage_bytes: Some(storage_bytes),
        retrieval_bonus: Some(bonus),
        qos: Some(qos),
        ..Default::default()
    };
    let details = StorageDetails {
        provider_id: hex::encode(provider_id),
        sector_root: hex::encode(sector_root),
        samples_valid: valid,
        min_samples,
        tree_size,
        quality,
        storage_bytes,
        tickets: (ticket_count, ticket_oks),
        retrieval_bonus: bonus,
    };
    Ok((metrics, details))
}
