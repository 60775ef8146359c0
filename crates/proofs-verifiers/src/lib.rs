//! # Proofs-Verifiers: Per-Kind Verification
//!
//! One verifier per proof family, a shared [`VerifyContext`], and the
//! eager [`Registry`] dispatching envelopes to verifiers.
//!
//! ## Components
//!
//! - `hashshare` - Header-bound uniform draw (PoW-style share)
//! - `ai` - TEE-attested AI compute with trap receipts
//! - `quantum` - Provider-attested quantum compute with trap circuits
//! - `storage` - Sector inclusion sampling heartbeat
//! - `vdf` - Wesolowski VDF over an RSA group
//! - `registry` - `ProofType -> verifier` table, schema roots, batch entry
//!
//! Every verifier is a pure function over `(envelope, context)`: no I/O,
//! no clock reads, no shared mutable state. Batch verification never
//! aborts early; the first failing index is reported alongside the
//! per-envelope results so the caller decides whether to drop the block.

#![warn(missing_docs)]

pub mod ai;
pub mod context;
pub mod hashshare;
pub mod quantum;
pub mod registry;
pub mod storage;
pub mod vdf;

pub use context::{QpuConfig, TeeConfig, VdfConfig, VerifyContext};
pub use registry::{verify_batch, BatchOutcome, Registry, Verifier, VerifyDetails};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
