//! # Proof Metrics & ψ-Inputs
//!
//! `ProofMetrics` is the type-tagged measurement record emitted by each
//! verifier; fields are optional where a proof kind does not produce them.
//! `PsiInput` is the normalized signal map handed to the PoIES scorer.
//! No policy weighting or capping happens here.

use std::collections::BTreeMap;

use crate::types::ProofType;

/// Measurements produced by a successful verification.
///
/// Bounds (applied by [`ProofMetrics::ensure_bounds`]): ratios in `[0,1]`,
/// counts and units non-negative, redundancy at least 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProofMetrics {
    /// Share difficulty ratio vs the µ-nat target (hash share). `>= 0`.
    pub d_ratio: Option<f64>,
    /// Abstract AI work units. `>= 0`.
    pub ai_units: Option<u64>,
    /// Abstract quantum work units. `>= 0`.
    pub quantum_units: Option<u64>,
    /// Fraction of trap checks passed, in `[0,1]`.
    pub traps_ratio: Option<f64>,
    /// Quality-of-service composite, in `[0,1]`.
    pub qos: Option<f64>,
    /// Effective replication factor, `>= 1`.
    pub redundancy: Option<f64>,
    /// Nominal bytes proven live by a storage heartbeat. `>= 0`.
    pub storage_bytes: Option<u64>,
    /// Retrieval bonus component, in `[0,1]`.
    pub retrieval_bonus: Option<f64>,
    /// Seconds-equivalent delay for a verified VDF. `>= 0`.
    pub vdf_seconds: Option<f64>,
    /// Number of VDF squarings (consensus-critical).
    pub vdf_iterations: Option<u64>,
}

fn clamp01(x: f64) -> f64 {
    if x.is_nan() || x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}

fn floor0(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 {
        x
    } else {
        0.0
    }
}

impl ProofMetrics {
    /// Return a copy with numeric sanity applied: ratios clamped to `[0,1]`,
    /// reals floored at zero, redundancy floored at one.
    pub fn ensure_bounds(mut self) -> Self {
        self.d_ratio = self.d_ratio.map(floor0);
        self.traps_ratio = self.traps_ratio.map(clamp01);
        self.qos = self.qos.map(clamp01);
        self.retrieval_bonus = self.retrieval_bonus.map(clamp01);
        self.redundancy = self.redundancy.map(|r| floor0(r).max(1.0));
        self.vdf_seconds = self.vdf_seconds.map(floor0);
        self
    }
}

/// A single proof's normalized ψ-input signals.
#[derive(Debug, Clone, PartialEq)]
pub struct PsiInput {
    /// Source proof kind.
    pub type_id: ProofType,
    /// Stable-keyed signal map; ratios clamped, counts floored.
    pub signals: BTreeMap<String, f64>,
}
