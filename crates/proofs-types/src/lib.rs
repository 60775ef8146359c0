//! # Proofs-Types: Envelope Data Model
//!
//! Core data types shared by every crate in the proof verification stack:
//!
//! - `value` - Owned canonical-CBOR value model (`Value`, `MapKey`)
//! - `types` - `ProofType` discriminator and the wire `ProofEnvelope`
//! - `errors` - Structured error taxonomy surfaced at the FFI boundary
//! - `metrics` - Verifier-produced `ProofMetrics` and normalized `PsiInput`
//!
//! The envelope body is kept as a `Value` map rather than a closed struct so
//! forward-compatible unknown keys survive decode/encode round-trips
//! byte-identically. Verifiers parse typed views out of the map and reject
//! structural violations with `ProofError::Schema`.

#![warn(missing_docs)]

pub mod errors;
pub mod metrics;
pub mod types;
pub mod value;

pub use errors::{ErrorContext, ProofError, Result};
pub use metrics::{ProofMetrics, PsiInput};
pub use types::{b32, ProofEnvelope, ProofType};
pub use value::{MapKey, Value};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
