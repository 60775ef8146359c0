//! # Verification Context
//!
//! Everything a verifier needs beyond the envelope itself, made explicit:
//! clocks, salts, pinned trust material, and policy structs. The context is
//! built once by the validator at init and shared read-only across worker
//! threads.

use proofs_attest::qpu::provider_cert::QpuPolicy;
use proofs_attest::{AttestationPolicy, ExpectedMeasurements, JwksCache};

/// TEE trust material and policy for the AI verifier.
#[derive(Debug, Default)]
pub struct TeeConfig {
    /// Expected measurements for the deployed workload.
    pub expected: ExpectedMeasurements,
    /// Acceptance policy bits.
    pub policy: AttestationPolicy,
    /// Intel PCK certificate bundle (PEM), if pinned.
    pub pck_chain_pem: Option<Vec<u8>>,
    /// Intel QE identity JSON for TCB summaries.
    pub qe_identity_json: Option<Vec<u8>>,
    /// AMD VCEK/VLEK leaf (PEM).
    pub vcek_pem: Option<Vec<u8>>,
    /// AMD ASK intermediates (PEM).
    pub sev_chain_pem: Option<Vec<u8>>,
    /// AMD ARK root (PEM).
    pub sev_root_pem: Option<Vec<u8>>,
    /// Arm CCA root (PEM).
    pub cca_root_pem: Option<Vec<u8>>,
}

/// QPU provider trust material for the quantum verifier.
#[derive(Debug, Default)]
pub struct QpuConfig {
    /// Local JWKS cache (read-only after load).
    pub jwks: JwksCache,
    /// Pinned QPU vendor root (PEM) anchoring provider chains.
    pub root_pem: Option<Vec<u8>>,
    /// Identity requirements.
    pub policy: QpuPolicy,
}

/// VDF verification parameters.
#[derive(Debug, Clone)]
pub struct VdfConfig {
    /// Challenge prime width in bits (64..=256).
    pub challenge_bits: u32,
    /// Iteration budget for the deterministic prime search.
    pub prime_search_max_iter: u64,
}

impl Default for VdfConfig {
    fn default() -> Self {
        Self {
            challenge_bits: 128,
            prime_search_max_iter: 10_000,
        }
    }
}

/// Shared, read-only context for a verification run.
#[derive(Debug, Default)]
pub struct VerifyContext {
    /// Chain id salt for nullifier-adjacent checks and logs.
    pub chain_id: Option<u32>,
    /// Policy root salt.
    pub policy_root: Option<[u8; 32]>,
    /// Current epoch/height for storage window checks.
    pub now_epoch: Option<u64>,
    /// Current unix time for attestation freshness checks.
    pub now_unix: Option<u64>,
    /// TEE trust material.
    pub tee: TeeConfig,
    /// QPU trust material.
    pub qpu: QpuConfig,
    /// VDF parameters.
    pub vdf: VdfConfig,
}
