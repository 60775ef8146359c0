//! # Wesolowski VDF Verification
//!
//! RSA-group verifier: derive the challenge prime `ℓ` deterministically
//! from `(N, g, y)`, compute `r = 2^T mod ℓ`, and check
//! `π^ℓ · g^r ≡ y (mod N)`. Verification cost is a handful of modular
//! exponentiations with small exponents, independent of `T`.
//!
//! The seconds-equivalent metric comes from prover calibration when the
//! body carries one, else from a conservative per-modulus-size heuristic.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::One;
use proofs_codec::validate_body;
use proofs_crypto::primes::hash_to_prime;
use proofs_types::value::Value;
use proofs_types::{ProofError, ProofMetrics, ProofType, Result};
use tracing::debug;

use crate::context::VerifyContext;

/// Challenge derivation domain.
pub const CHALLENGE_DOMAIN: &[u8] = b"Animica/VDF/Wesolowski/challenge/v1";

/// Observability record for a verified VDF proof.
#[derive(Debug, Clone, PartialEq)]
pub struct VdfDetails {
    /// Modulus width in bits.
    pub mod_bits: u64,
    /// Challenge prime width in bits.
    pub ell_bits: u64,
    /// Challenge prime (hex).
    pub ell_hex: String,
    /// Whether prover calibration drove the seconds estimate.
    pub calibration_used: bool,
    /// Seconds-equivalent for `T` squarings.
    pub seconds_equiv: f64,
}

fn big(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Heuristic squaring throughput by modulus size (iterations/second).
///
/// Larger moduli never estimate faster than smaller ones.
fn heuristic_iters_per_sec(mod_bits: u64) -> f64 {
    if mod_bits <= 2048 {
        3.0e6
    } else if mod_bits <= 3072 {
        1.6e6
    } else {
        0.9e6
    }
}

/// Seconds-equivalent for `T` squarings.
pub fn estimate_seconds(t: u64, mod_bits: u64, calibration: Option<u64>) -> f64 {
    match calibration {
        Some(ips) if ips > 0 => t as f64 / ips as f64,
        _ => t as f64 / heuristic_iters_per_sec(mod_bits),
    }
}

/// Derive the challenge prime from `(N, g, y)`.
pub fn derive_challenge_prime(
    n: &BigUint,
    g: &BigUint,
    y: &BigUint,
    bits: u32,
    max_iter: u64,
) -> Result<BigUint> {
    let mut seed = Vec::new();
    seed.extend_from_slice(&n.to_bytes_be());
    seed.extend_from_slice(&g.to_bytes_be());
    seed.extend_from_slice(&y.to_bytes_be());
    hash_to_prime(CHALLENGE_DOMAIN, &seed, bits, max_iter).map_err(|e| match e {
        proofs_crypto::PrimeError::BadBitWidth(_) => {
            ProofError::schema(format!("bad challenge width: {e}"))
        }
        proofs_crypto::PrimeError::Exhausted(_) => {
            ProofError::proof("failed to derive a challenge prime within iteration budget")
        }
    })
}

fn require_group_element(label: &str, x: &BigUint, n: &BigUint) -> Result<()> {
    if x <= &BigUint::one() || x >= n || x.gcd(n) != BigUint::one() {
        return Err(ProofError::proof(format!(
            "{label} not in multiplicative group modulo N"
        )));
    }
    Ok(())
}

/// Verify a VDF proof body and return `(metrics, details)`.
pub fn verify_body(body: &Value, ctx: &VerifyContext) -> Result<(ProofMetrics, VdfDetails)> {
    validate_body(ProofType::Vdf, body)?;

    let group = body.get("group").unwrap();
    let kind = group.get("kind").unwrap().as_text().unwrap();
    if kind != "RSA" {
        return Err(ProofError::schema(format!(
            "only the RSA group is supported, got {kind:?}"
        )));
    }
    let n = big(group.get("N").unwrap().as_bytes().unwrap());
    if n < BigUint::from(3u8) || n.is_even() {
        return Err(ProofError::schema("RSA modulus must be an odd integer >= 3"));
    }

    let g = big(body.get("g").unwrap().as_bytes().unwrap());
    let y = big(body.get("y").unwrap().as_bytes().unwrap());
    let pi = big(body.get("proof").unwrap().get("pi").unwrap().as_bytes().unwrap());
    let t = body.get("T").unwrap().as_u64().unwrap();
    if t < 1 {
        return Err(ProofError::schema("T must be >= 1"));
    }

    require_group_element("generator g", &g, &n)?;
    require_group_element("output y", &y, &n)?;
    require_group_element("proof pi", &pi, &n)?;

    let mod_bits = n.bits();
    let ell = derive_challenge_prime(
        &n,
        &g,
        &y,
        ctx.vdf.challenge_bits,
        ctx.vdf.prime_search_max_iter,
    )?;

    // r = 2^T mod ell without materializing 2^T.
    let r = BigUint::from(2u8).modpow(&BigUint::from(t), &ell);

    // Wesolowski equation: pi^ell * g^r == y (mod N).
    let left = (pi.modpow(&ell, &n) * g.modpow(&r, &n)) % &n;
    if left != y {
        return Err(ProofError::proof(
            "VDF equation does not hold for provided (pi, ell, r)",
        )
        .with_context("T", t.to_string())
        .with_context("mod_bits", mod_bits.to_string()));
    }
    debug!(t, mod_bits, "VDF equation verified");

    let calibration = body
        .get("calibration")
        .and_then(|c| c.get("iters_per_sec"))
        .and_then(Value::as_u64);
    let seconds_equiv = estimate_seconds(t, mod_bits, calibration);

    let metrics = ProofMetrics {
        vdf_seconds: Some(seconds_equiv),
        vdf_iterations: Some(t),
        ..Default::default()
    };
    let details = VdfDetails {
        mod_bits,
        ell_bits: ell.bits(),
        ell_hex: format!("{ell:x}"),
        calibration_used: calibration.is_some(),
        seconds_equiv,
    };
    Ok((metrics, details))
}
