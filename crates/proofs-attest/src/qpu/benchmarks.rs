//! # Quantum Unit Reference Scaling
//!
//! Deterministic mapping from job shape (depth × width × shots) to
//! "quantum units". Two layers:
//!
//! - [`units_for`] - the consensus fallback: simple, monotone in every
//!   argument, bounded. Used whenever a body omits `quantumUnits`.
//! - [`estimate_units`] - a richer device model (gate errors, readout,
//!   decoherence, shot parallelism) for provider calibration tooling.
//!   Parameters are illustrative defaults, not vendor claims.

use std::collections::BTreeMap;

/// Hard cap on derived units per job.
pub const MAX_UNITS_PER_JOB: u64 = 1_000_000_000;

/// Consensus fallback unit mapping: `max(1, depth·width·shots / 128)`,
/// capped. Monotone non-decreasing in each argument.
pub fn units_for(depth: u64, width: u64, shots: u64) -> u64 {
    let product = (depth as u128)
        .saturating_mul(width as u128)
        .saturating_mul(shots as u128);
    let units = (product / 128).max(1);
    units.min(MAX_UNITS_PER_JOB as u128) as u64
}

/// Nominal gate/readout characteristics for a QPU class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    /// 1-qubit gate error rate.
    pub eps_1q: f64,
    /// 2-qubit gate error rate.
    pub eps_2q: f64,
    /// Per-qubit readout error rate.
    pub eps_readout: f64,
    /// 1-qubit gate duration (seconds).
    pub t_1q: f64,
    /// 2-qubit gate duration (seconds).
    pub t_2q: f64,
    /// Readout duration per shot (seconds).
    pub t_readout: f64,
    /// Effective dephasing time, worst case across qubits (seconds).
    pub t2: f64,
    /// Shots that pipeline effectively.
    pub parallel_shots: u32,
    /// Profile label.
    pub qpu_class: &'static str,
}

/// Linear coefficients converting counts/time into units, plus quality
/// shaping bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitPricing {
    /// Units per 1-qubit gate.
    pub u_per_1q: f64,
    /// Units per 2-qubit gate.
    pub u_per_2q: f64,
    /// Units per shot.
    pub u_per_shot: f64,
    /// Units per wall-clock second.
    pub u_per_second: f64,
    /// Quality exponent.
    pub quality_gamma: f64,
    /// Multiplicative quality floor.
    pub quality_floor: f64,
}

impl Default for UnitPricing {
    fn default() -> Self {
        Self {
            u_per_1q: 1.0e-6,
            u_per_2q: 8.0e-6,
            u_per_shot: 2.0e-6,
            u_per_second: 1.0e-3,
            quality_gamma: 1.0,
            quality_floor: 0.05,
        }
    }
}

/// Job shape fed into the estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkInput {
    /// Qubits used.
    pub width: u64,
    /// Logical layers.
    pub depth: u64,
    /// Shots executed.
    pub shots: u64,
    /// Approximate 1q gates per qubit per layer.
    pub density_1q: f64,
    /// Fraction of (width-1) entangling pairs per layer.
    pub density_2q: f64,
}

impl BenchmarkInput {
    /// Shape with the default gate densities.
    pub fn new(width: u64, depth: u64, shots: u64) -> Self {
        Self {
            width,
            depth,
            shots,
            density_1q: 1.0,
            density_2q: 0.5,
        }
    }
}

/// Heuristic gate counts for a generic layered circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateCounts {
    /// 1-qubit gates.
    pub n_1q: u64,
    /// 2-qubit gates.
    pub n_2q: u64,
}

/// Per-shot correctness factors under an independent-error model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityBreakdown {
    /// Product of (1-eps) across all gates.
    pub p_gates: f64,
    /// Readout survival, `(1-e_ro)^width`.
    pub p_readout: f64,
    /// Decoherence survival, `exp(-t_circuit / T2)`.
    pub p_coherence: f64,
    /// Combined per-shot correctness.
    pub p_shot: f64,
}

/// Wall-clock estimate with shot pipelining.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeBreakdown {
    /// Seconds per shot.
    pub seconds_per_shot: f64,
    /// Total seconds across batches.
    pub total_seconds: f64,
    /// Number of pipelined batches.
    pub parallel_batches: u64,
}

/// Full estimate result.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    /// Gate counts used.
    pub counts: GateCounts,
    /// Quality factors.
    pub quality: QualityBreakdown,
    /// Runtime estimate.
    pub runtime: RuntimeBreakdown,
    /// Raw linear units before quality shaping.
    pub raw_units: f64,
    /// Quality-shaped, capped units.
    pub adjusted_units: f64,
}

/// Nominal reference profiles (conservative, illustrative).
pub fn reference_profiles() -> BTreeMap<&'static str, DeviceProfile> {
    BTreeMap::from([
        (
            "superconducting_nisq_v1",
            DeviceProfile {
                eps_1q: 1.0e-4,
                eps_2q: 1.2e-3,
                eps_readout: 2.0e-2,
                t_1q: 2.0e-8,
                t_2q: 2.0e-7,
                t_readout: 4.0e-7,
                t2: 5.0e-5,
                parallel_shots: 64,
                qpu_class: "superconducting_nisq_v1",
            },
        ),
        (
            "ion_trap_v1",
            DeviceProfile {
                eps_1q: 5.0e-5,
                eps_2q: 2.0e-3,
                eps_readout: 5.0e-3,
                t_1q: 1.0e-5,
                t_2q: 2.0e-4,
                t_readout: 4.0e-4,
                t2: 1.0,
                parallel_shots: 8,
                qpu_class: "ion_trap_v1",
            },
        ),
        (
            "neutral_atom_v1",
            DeviceProfile {
                eps_1q: 3.0e-4,
                eps_2q: 3.0e-3,
                eps_readout: 3.0e-2,
                t_1q: 1.0e-6,
                t_2q: 5.0e-6,
                t_readout: 2.0e-4,
                t2: 1.0e-4,
                parallel_shots: 16,
                qpu_class: "neutral_atom_v1",
            },
        ),
    ])
}

/// Heuristic gate counts for a layered circuit.
pub fn count_gates(inp: &BenchmarkInput) -> GateCounts {
    let n_1q = (inp.width as f64 * inp.depth as f64 * inp.density_1q.max(0.0)).ceil() as u64;
    let n_2q = (inp.width.saturating_sub(1) as f64 * inp.depth as f64 * inp.density_2q.max(0.0))
        .ceil() as u64;
    GateCounts { n_1q, n_2q }
}

/// Independent-error quality model.
pub fn quality_breakdown(
    counts: &GateCounts,
    inp: &BenchmarkInput,
    dev: &DeviceProfile,
) -> QualityBreakdown {
    let p_1q = (1.0 - dev.eps_1q).powi(counts.n_1q.min(i32::MAX as u64) as i32);
    let p_2q = (1.0 - dev.eps_2q).powi(counts.n_2q.min(i32::MAX as u64) as i32);
    let p_readout = (1.0 - dev.eps_readout).powi(inp.width.min(i32::MAX as u64) as i32);

    let t_layer = dev.t_1q.max(dev.t_2q);
    let t_circ = inp.depth as f64 * t_layer + dev.t_readout;
    let p_coherence = (-t_circ / dev.t2.max(1e-15)).exp();

    let p_shot = (p_1q * p_2q * p_readout * p_coherence).clamp(0.0, 1.0);
    QualityBreakdown {
        p_gates: p_1q * p_2q,
        p_readout,
        p_coherence,
        p_shot,
    }
}

/// Runtime with shot pipelining.
pub fn runtime_breakdown(inp: &BenchmarkInput, dev: &DeviceProfile) -> RuntimeBreakdown {
    let t_layer = dev.t_1q.max(dev.t_2q);
    let seconds_per_shot = inp.depth as f64 * t_layer + dev.t_readout;
    let parallel_batches = inp.shots.div_ceil(dev.parallel_shots.max(1) as u64);
    RuntimeBreakdown {
        seconds_per_shot,
        total_seconds: seconds_per_shot * parallel_batches as f64,
        parallel_batches,
    }
}

/// Full unit estimate for a job shape on a device profile.
pub fn estimate_units(
    inp: &BenchmarkInput,
    dev: &DeviceProfile,
    pricing: &UnitPricing,
) -> BenchmarkResult {
    let counts = count_gates(inp);
    let quality = quality_breakdown(&counts, inp, dev);
    let runtime = runtime_breakdown(inp, dev);

    let raw = pricing.u_per_1q * counts.n_1q as f64
        + pricing.u_per_2q * counts.n_2q as f64
        + pricing.u_per_shot * inp.shots as f64
        + pricing.u_per_second * runtime.total_seconds;

    let q = quality.p_shot.clamp(pricing.quality_floor, 1.0);
    let shaped = if pricing.quality_gamma == 1.0 {
        q
    } else {
        q.powf(pricing.quality_gamma)
    };
    let adjusted = (raw * shaped).min(MAX_UNITS_PER_JOB as f64);

    BenchmarkResult {
        counts,
        quality,
        runtime,
        raw_units: raw,
        adjusted_units: adjusted,
    }
}
