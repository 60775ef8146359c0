//! # Animica Proofs Test Suite
//!
//! Unified test crate containing:
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Shared envelope/body builders (also used by benches)
//! └── integration/      # Cross-crate scenarios
//!     ├── envelope.rs   # Codec round-trips and determinism
//!     ├── hashshare.rs  # u-draw accept/tamper
//!     ├── ai.rs         # TEE + trap pipeline
//!     ├── quantum.rs    # Provider identity + trap circuits
//!     ├── storage.rs    # Sampling, windows, retrieval
//!     ├── vdf.rs        # Wesolowski round-trip
//!     └── receipts.rs   # Nullifiers, ψ-signals, proofsRoot
//! ```
//!
//! ## Running
//!
//! ```bash
//! cargo test -p proofs-tests
//! cargo bench -p proofs-tests
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;

/// Install a test subscriber honoring `RUST_LOG`; safe to call repeatedly.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
