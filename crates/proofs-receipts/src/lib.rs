//! # Proofs-Receipts: Nullifiers, ψ-Signals, Aggregation Leaves
//!
//! The tail of the verification pipeline:
//!
//! - `nullifier` - Domain-separated replay tags derived from the
//!   identity-defining body fields of each proof kind
//! - `policy` - `ProofMetrics` → normalized ψ-input signals (no weighting
//!   or caps; the PoIES scorer owns those)
//! - `receipt` - Fixed-point quantization, canonical CBOR receipt leaves,
//!   and the `proofsRoot` Merkle builder

#![warn(missing_docs)]

pub mod nullifier;
pub mod policy;
pub mod receipt;

pub use nullifier::{compute_envelope_nullifier, compute_nullifier, NullifierSalt};
pub use policy::{envelope_to_psi_input, metrics_to_signals};
pub use receipt::{
    build_receipt, digest_proof_body, merkleize_receipts, quantize_signals, verify_signals_match,
    ProofReceipt,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
