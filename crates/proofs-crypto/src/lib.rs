//! # Proofs-Crypto: Deterministic Primitives
//!
//! Shared numeric and hashing primitives for the Animica proof core.
//!
//! ## Components
//!
//! - `hash` - Domain-separated SHA3 hashing with length-prefixed concatenation
//! - `math` - Clamps, safe logarithms, µ-nat fixed-point conversions
//! - `stats` - Binomial confidence intervals (Wilson, Clopper-Pearson,
//!   Hoeffding) and the SPRT used by trap verification
//! - `primes` - Miller-Rabin and deterministic hash-to-prime for the VDF
//! - `merkle` - Domain-separated Merkle folds and inclusion-path checks
//!
//! Every function here is a pure, deterministic mapping from inputs to
//! outputs. Consensus-critical digests flow through this crate, so the
//! byte layouts must never change without a domain-version bump.

#![warn(missing_docs)]

pub mod hash;
pub mod math;
pub mod merkle;
pub mod primes;
pub mod stats;

pub use hash::{
    concat_lp, domain_tag, sha3_256, sha3_256_concat, sha3_256_tag, sha3_512, tag_bytes, Hash32,
};
pub use math::{clamp, clamp01, from_micro_nats, h_of_u, log1p_safe, to_micro_nats};
pub use merkle::{fold_nodes, path_root, tagged_tree_root};
pub use primes::{hash_to_prime, is_probable_prime, PrimeError};
pub use stats::{
    clopper_pearson_interval, hoeffding_interval, interval_for, one_sided_p_value, sprt_one_sided,
    trap_batch_passes, wilson_interval, ConfidenceInterval, IntervalMethod, SprtDecision,
    StatsError, TrapStats,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
