//! # Deterministic Prime Derivation
//!
//! Miller-Rabin probable-prime testing with fixed bases and the
//! counter-mode SHA3 hash-to-prime used to derive Wesolowski challenge
//! primes. Both are fully deterministic: the same seed always yields the
//! same prime on every implementation.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use thiserror::Error;

use crate::hash::sha3_256;

/// Errors from prime derivation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PrimeError {
    /// Requested challenge width outside the supported range.
    #[error("challenge prime size must be in [64,256] bits, got {0}")]
    BadBitWidth(u32),

    /// The deterministic search exhausted its iteration budget.
    #[error("failed to derive a challenge prime within {0} counter iterations")]
    Exhausted(u64),
}

const SMALL_PRIMES: [u32; 10] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29];
const MR_BASES: [u32; 7] = [2, 3, 5, 7, 11, 13, 17];

/// Deterministic Miller-Rabin for candidates up to 256 bits.
///
/// Uses a small-prime sieve followed by the fixed base set {2..17}.
pub fn is_probable_prime(n: &BigUint) -> bool {
    let two = BigUint::from(2u32);
    if n < &two {
        return false;
    }
    for p in SMALL_PRIMES {
        let p = BigUint::from(p);
        if n.is_multiple_of(&p) {
            return n == &p;
        }
    }
    // n - 1 = d * 2^s
    let n_minus_1 = n - BigUint::one();
    let s = n_minus_1.trailing_zeros().unwrap_or(0);
    let d = &n_minus_1 >> s;

    'bases: for a in MR_BASES {
        let a = BigUint::from(a) % n;
        if a.is_zero() {
            continue;
        }
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_1 {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_1 {
                continue 'bases;
            }
        }
        return false;
    }
    true
}

/// Deterministically map `domain || seed` to a probable prime of `bits` bits.
///
/// The candidate stream is `SHA3_256(domain || seed || ctr_be8)` masked to
/// the requested width with MSB and LSB forced; each digest is probed at
/// `cand + 2k` for `k in 0..=256` before the counter advances.
pub fn hash_to_prime(
    domain: &[u8],
    seed: &[u8],
    bits: u32,
    max_iter: u64,
) -> Result<BigUint, PrimeError> {
    if !(64..=256).contains(&bits) {
        return Err(PrimeError::BadBitWidth(bits));
    }
    let mask = (BigUint::one() << bits) - BigUint::one();
    let msb = BigUint::one() << (bits - 1);

    let mut preimage = Vec::with_capacity(domain.len() + seed.len() + 8);
    preimage.extend_from_slice(domain);
    preimage.extend_from_slice(seed);
    let ctr_offset = preimage.len();
    preimage.extend_from_slice(&[0u8; 8]);

    for ctr in 0..max_iter {
        preimage[ctr_offset..].copy_from_slice(&ctr.to_be_bytes());
        let digest = sha3_256(&preimage);
        let mut cand = BigUint::from_bytes_be(&digest);
        cand &= &mask;
        cand |= &msb;
        cand |= BigUint::one();
        for k in 0u32..=256 {
            let c = &cand + BigUint::from(2 * k);
            if is_probable_prime(&c) {
                return Ok(c);
            }
        }
    }
    Err(PrimeError::Exhausted(max_iter))
}
