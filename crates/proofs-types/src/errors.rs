//! # Error Taxonomy
//!
//! Structured errors for the proof verification core. Every error carries a
//! stable machine code, a human-readable message, and a small string-keyed
//! context map (hex identifiers, heights, key ids). No panics cross the
//! crate boundary; all fallible operations return [`Result`].

use std::collections::BTreeMap;

use thiserror::Error;

/// Small, log-safe context attached to errors (hex ids, heights, kids).
pub type ErrorContext = BTreeMap<String, String>;

/// Structured error for proof verification.
///
/// Variants map one-to-one onto the wire-level error taxonomy:
/// shape violations, malformed bytes, failed cryptographic relations,
/// rejected attestations, and nullifier reuse (reported by the consensus
/// layer, carried here for completeness).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProofError {
    /// Shape/type/size violation in an envelope or body.
    #[error("schema violation: {message}")]
    Schema {
        /// Human-readable summary.
        message: String,
        /// Contextual fields.
        context: ErrorContext,
    },

    /// Malformed CBOR (or other wire) bytes.
    #[error("malformed encoding: {message}")]
    Decode {
        /// Human-readable summary.
        message: String,
        /// Contextual fields.
        context: ErrorContext,
    },

    /// A cryptographic relation failed (Merkle, Wesolowski equation,
    /// u-draw mismatch, unmet target).
    #[error("proof check failed: {message}")]
    Proof {
        /// Human-readable summary.
        message: String,
        /// Contextual fields.
        context: ErrorContext,
    },

    /// TEE/QPU evidence parse, signature, chain or policy failure.
    #[error("attestation rejected: {message}")]
    Attestation {
        /// Human-readable summary.
        message: String,
        /// Contextual fields.
        context: ErrorContext,
    },

    /// Nullifier seen inside the consensus TTL window.
    #[error("nullifier already used: {message}")]
    NullifierReuse {
        /// Human-readable summary.
        message: String,
        /// Contextual fields.
        context: ErrorContext,
    },
}

impl ProofError {
    /// Schema violation with a message.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    /// Malformed-bytes error with a message.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    /// Failed cryptographic check with a message.
    pub fn proof(message: impl Into<String>) -> Self {
        Self::Proof {
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    /// Attestation failure with a message.
    pub fn attestation(message: impl Into<String>) -> Self {
        Self::Attestation {
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    /// Nullifier reuse with a message.
    pub fn nullifier_reuse(message: impl Into<String>) -> Self {
        Self::NullifierReuse {
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    /// Attach a context field, returning the enriched error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().insert(key.into(), value.into());
        self
    }

    /// Stable machine code for the FFI boundary.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "SCHEMA",
            Self::Decode { .. } => "DECODE",
            Self::Proof { .. } => "PROOF_INVALID",
            Self::Attestation { .. } => "ATTESTATION",
            Self::NullifierReuse { .. } => "NULLIFIER_REUSE",
        }
    }

    /// Read-only view of the context map.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Schema { context, .. }
            | Self::Decode { context, .. }
            | Self::Proof { context, .. }
            | Self::Attestation { context, .. }
            | Self::NullifierReuse { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Schema { context, .. }
            | Self::Decode { context, .. }
            | Self::Proof { context, .. }
            | Self::Attestation { context, .. }
            | Self::NullifierReuse { context, .. } => context,
        }
    }
}

/// Result alias used across the proof crates.
pub type Result<T> = std::result::Result<T, ProofError>;
