//! # Verifier Registry
//!
//! Eager mapping `ProofType -> (verifier, shape rules, schema root)`.
//! All verifiers register at construction; the instance is immutable
//! afterwards and safe to share across verification threads. Dispatch is a
//! static table of tagged variants; nothing loads at runtime.

use std::collections::BTreeMap;

use proofs_codec::schema_root;
use proofs_types::{ProofEnvelope, ProofError, ProofMetrics, ProofType, Result};
use tracing::debug;

use crate::ai::{self, AiDetails};
use crate::context::VerifyContext;
use crate::hashshare::{self, HashShareDetails};
use crate::quantum::{self, QuantumDetails};
use crate::storage::{self, StorageDetails};
use crate::vdf::{self, VdfDetails};

/// Kind-specific detail records returned alongside metrics.
#[derive(Debug, Clone)]
pub enum VerifyDetails {
    /// Hash-share details.
    HashShare(HashShareDetails),
    /// AI proof details.
    Ai(AiDetails),
    /// Quantum proof details.
    Quantum(QuantumDetails),
    /// Storage heartbeat details.
    Storage(StorageDetails),
    /// VDF details.
    Vdf(VdfDetails),
}

/// A per-kind verifier. Implementations are stateless and shareable.
pub trait Verifier: Send + Sync {
    /// The proof family this verifier handles.
    fn proof_type(&self) -> ProofType;

    /// Verify an envelope, returning bounded metrics and details.
    fn verify(
        &self,
        env: &ProofEnvelope,
        ctx: &VerifyContext,
    ) -> Result<(ProofMetrics, VerifyDetails)>;
}

fn check_type(env: &ProofEnvelope, expected: ProofType) -> Result<()> {
    if env.type_id != expected {
        return Err(ProofError::schema(format!(
            "wrong proof type for {} verifier: {}",
            expected.name(),
            env.type_id.as_u64()
        )));
    }
    Ok(())
}

struct HashShareVerifier;

impl Verifier for HashShareVerifier {
    fn proof_type(&self) -> ProofType {
        ProofType::HashShare
    }

    fn verify(
        &self,
        env: &ProofEnvelope,
        _ctx: &VerifyContext,
    ) -> Result<(ProofMetrics, VerifyDetails)> {
        check_type(env, ProofType::HashShare)?;
        let (metrics, details) = hashshare::verify_body(&env.body)?;
        Ok((metrics, VerifyDetails::HashShare(details)))
    }
}

struct AiVerifier;

impl Verifier for AiVerifier {
    fn proof_type(&self) -> ProofType {
        ProofType::Ai
    }

    fn verify(
        &self,
        env: &ProofEnvelope,
        ctx: &VerifyContext,
    ) -> Result<(ProofMetrics, VerifyDetails)> {
        check_type(env, ProofType::Ai)?;
        let (metrics, details) = ai::verify_body(&env.body, ctx)?;
        Ok((metrics, VerifyDetails::Ai(details)))
    }
}

struct QuantumVerifier;

impl Verifier for QuantumVerifier {
    fn proof_type(&self) -> ProofType {
        ProofType::Quantum
    }

    fn verify(
        &self,
        env: &ProofEnvelope,
        ctx: &VerifyContext,
    ) -> Result<(ProofMetrics, VerifyDetails)> {
        check_type(env, ProofType::Quantum)?;
        let (metrics, details) = quantum::verify_body(&env.body, ctx)?;
        Ok((metrics, VerifyDetails::Quantum(details)))
    }
}

struct StorageVerifier;

impl Verifier for StorageVerifier {
    fn proof_type(&self) -> ProofType {
        ProofType::Storage
    }

    fn verify(
        &self,
        env: &ProofEnvelope,
        ctx: &VerifyContext,
    ) -> Result<(ProofMetrics, VerifyDetails)> {
        check_type(env, ProofType::Storage)?;
        let (metrics, details) = storage::verify_body(&env.body, ctx)?;
        Ok((metrics, VerifyDetails::Storage(details)))
    }
}

struct VdfVerifier;

impl Verifier for VdfVerifier {
    fn proof_type(&self) -> ProofType {
        ProofType::Vdf
    }

    fn verify(
        &self,
        env: &ProofEnvelope,
        ctx: &VerifyContext,
    ) -> Result<(ProofMetrics, VerifyDetails)> {
        check_type(env, ProofType::Vdf)?;
        let (metrics, details) = vdf::verify_body(&env.body, ctx)?;
        Ok((metrics, VerifyDetails::Vdf(details)))
    }
}

static HASHSHARE: HashShareVerifier = HashShareVerifier;
static AI: AiVerifier = AiVerifier;
static QUANTUM: QuantumVerifier = QuantumVerifier;
static STORAGE: StorageVerifier = StorageVerifier;
static VDF: VdfVerifier = VdfVerifier;

/// Immutable registry of verifiers and schema roots.
pub struct Registry {
    entries: BTreeMap<ProofType, (&'static dyn Verifier, [u8; 32])>,
}

impl Registry {
    /// Eagerly register all built-in verifiers and compute schema roots.
    pub fn bootstrap() -> Self {
        let verifiers: [&'static dyn Verifier; 5] = [&HASHSHARE, &AI, &QUANTUM, &STORAGE, &VDF];
        let entries = verifiers
            .into_iter()
            .map(|v| (v.proof_type(), (v, schema_root(v.proof_type()))))
            .collect();
        Self { entries }
    }

    /// The verifier registered for a type.
    pub fn verifier(&self, pt: ProofType) -> &'static dyn Verifier {
        self.entries[&pt].0
    }

    /// The schema root bound to a type.
    pub fn schema_root(&self, pt: ProofType) -> [u8; 32] {
        self.entries[&pt].1
    }

    /// `{ type_id -> root hex }` for header binding.
    pub fn schema_hex_map(&self) -> BTreeMap<u64, String> {
        self.entries
            .iter()
            .map(|(pt, (_, root))| (pt.as_u64(), hex::encode(root)))
            .collect()
    }

    /// Dispatch an envelope to its verifier; metrics come back bounded.
    pub fn verify(
        &self,
        env: &ProofEnvelope,
        ctx: &VerifyContext,
    ) -> Result<(ProofMetrics, VerifyDetails)> {
        let (metrics, details) = self.verifier(env.type_id).verify(env, ctx)?;
        Ok((metrics.ensure_bounds(), details))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::bootstrap()
    }
}

/// Outcome of verifying an ordered batch of envelopes.
pub struct BatchOutcome {
    /// Per-envelope results, in input order.
    pub results: Vec<Result<(ProofMetrics, VerifyDetails)>>,
    /// Index and error of the first failure, if any.
    pub first_failure: Option<(usize, ProofError)>,
}

impl BatchOutcome {
    /// True when every envelope verified.
    pub fn all_ok(&self) -> bool {
        self.first_failure.is_none()
    }
}

/// Verify envelopes in order. Failures never abort the batch; the caller
/// decides whether to drop block assembly on `first_failure`.
pub fn verify_batch(
    registry: &Registry,
    envelopes: &[ProofEnvelope],
    ctx: &VerifyContext,
) -> BatchOutcome {
    let mut results = Vec::with_capacity(envelopes.len());
    let mut first_failure = None;
    for (index, env) in envelopes.iter().enumerate() {
        let outcome = registry.verify(env, ctx);
        if first_failure.is_none() {
            if let Err(e) = &outcome {
                debug!(index, error = %e, "batch envelope failed");
                first_failure = Some((index, e.clone()));
            }
        }
        results.push(outcome);
    }
    BatchOutcome {
        results,
        first_failure,
    }
}
