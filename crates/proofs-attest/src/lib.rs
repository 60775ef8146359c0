//! # Proofs-Attest: Evidence Parsing & Policy
//!
//! Vendor-specific attestation parsing normalized into two evidence shapes:
//!
//! - [`tee::TeeEvidence`] for confidential-compute reports (Intel SGX/TDX,
//!   AMD SEV-SNP, Arm CCA realm tokens, TPM event logs + quotes)
//! - [`qpu::ProviderEvidence`] for quantum provider identity (JWS over a
//!   local JWKS cache, optional X.509 binding, optional post-quantum bundle)
//!
//! Parsers always parse; cryptographic capability is reported through
//! explicit booleans (`signature_ok`, `chain_ok`, `x509_verified`) and a pure
//! policy layer decides acceptance. Nothing in this crate reads the system
//! clock; callers pass `now` explicitly so verification stays
//! deterministic and replayable.

#![warn(missing_docs)]

pub mod qpu;
pub mod tee;

pub use qpu::{JwksCache, ProviderEvidence, QpuKeyRef};
pub use tee::{
    evaluate_attestation, AttestationPolicy, AttestationResult, ExpectedMeasurements, TcbStatus,
    TeeEvidence, TeeKind,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
