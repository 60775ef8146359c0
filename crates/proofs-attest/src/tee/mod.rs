//! # TEE Attestation
//!
//! Vendor parsers and the shared policy layer. Dispatch happens on the
//! `tee.kind` body field; each parser emits a normalized [`TeeEvidence`]
//! that the pure policy evaluator accepts or rejects.

pub mod cca;
pub mod common;
pub mod sev_snp;
pub mod sgx;
pub mod tpm_dice;

#[cfg(feature = "x509")]
pub(crate) mod x509util;

pub use common::{
    evaluate_attestation, AttestationPolicy, AttestationResult, ClaimValue, ExpectedMeasurements,
    TcbStatus, TeeEvidence, TeeKind,
};
