//! # Trap-Sampling Statistics
//!
//! Deterministic binomial-proportion machinery for trap verification:
//!
//! - hit ratio statistics over trap outcomes
//! - confidence intervals (Wilson, Clopper-Pearson exact, Hoeffding)
//! - one-sided p-value against a target ratio
//! - minimal sample sizing helpers
//! - a sequential probability ratio test (SPRT)
//!
//! The pass rule used by verifiers is conservative: a trap batch passes iff
//! the *lower* confidence bound reaches the target ratio.

use thiserror::Error;

/// Statistics over an evaluated trap batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapStats {
    /// Number of traps evaluated.
    pub n: u64,
    /// Number of correct trap outcomes.
    pub k: u64,
    /// Empirical success rate `k/n`.
    pub p_hat: f64,
}

impl TrapStats {
    /// Build stats from pass/total counts. `n` must be positive and `k <= n`.
    pub fn new(k: u64, n: u64) -> Result<Self, StatsError> {
        if n == 0 {
            return Err(StatsError::EmptySample);
        }
        if k > n {
            return Err(StatsError::CountExceedsSample { k, n });
        }
        Ok(Self {
            n,
            k,
            p_hat: k as f64 / n as f64,
        })
    }
}

/// A two-sided confidence interval for a binomial proportion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInterval {
    /// Lower bound, clamped to `[0,1]`.
    pub lower: f64,
    /// Upper bound, clamped to `[0,1]`.
    pub upper: f64,
    /// Method used.
    pub method: IntervalMethod,
    /// Two-sided significance level.
    pub alpha: f64,
}

/// Supported confidence interval constructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalMethod {
    /// Wilson score interval.
    Wilson,
    /// Exact interval by inverting the binomial CDF.
    ClopperPearson,
    /// Distribution-free Hoeffding band.
    Hoeffding,
}

/// Errors from statistical helpers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StatsError {
    /// No samples were provided.
    #[error("no trap samples provided")]
    EmptySample,

    /// Success count larger than sample size.
    #[error("success count {k} exceeds sample size {n}")]
    CountExceedsSample {
        /// Successes.
        k: u64,
        /// Sample size.
        n: u64,
    },

    /// Significance level outside (0, 1).
    #[error("alpha must be in (0,1), got {0}")]
    BadAlpha(f64),

    /// Hypothesis ordering violated for the SPRT.
    #[error("SPRT requires 0 < p0 < p1 < 1")]
    BadHypotheses,
}

fn clamp01(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}

/// Two-sided alpha -> `z_{1-alpha/2}` via the Acklam rational approximation
/// of the inverse normal CDF. Accurate to roughly 1e-9, dependency-free.
pub fn z_from_alpha(alpha: f64) -> Result<f64, StatsError> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(StatsError::BadAlpha(alpha));
    }
    let p = 1.0 - alpha / 2.0;
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;
    let p_high = 1.0 - P_LOW;

    let x = if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p > p_high {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    };
    Ok(x)
}

/// Wilson score interval for `k` successes out of `n`.
pub fn wilson_interval(k: u64, n: u64, alpha: f64) -> Result<ConfidenceInterval, StatsError> {
    let stats = TrapStats::new(k, n)?;
    let z = z_from_alpha(alpha)?;
    let nf = n as f64;
    let p = stats.p_hat;
    let z2 = z * z;
    let denom = 1.0 + z2 / nf;
    let center = (p + z2 / (2.0 * nf)) / denom;
    let half = z * ((p * (1.0 - p) / nf) + (z2 / (4.0 * nf * nf))).sqrt() / denom;
    Ok(ConfidenceInterval {
        lower: clamp01(center - half),
        upper: clamp01(center + half),
        method: IntervalMethod::Wilson,
        alpha,
    })
}

/// Hoeffding band: `eps = sqrt(ln(2/alpha) / (2n))`.
pub fn hoeffding_interval(k: u64, n: u64, alpha: f64) -> Result<ConfidenceInterval, StatsError> {
    let stats = TrapStats::new(k, n)?;
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(StatsError::BadAlpha(alpha));
    }
    let eps = (0.5 * (2.0 / alpha).ln() / n as f64).sqrt();
    Ok(ConfidenceInterval {
        lower: clamp01(stats.p_hat - eps),
        upper: clamp01(stats.p_hat + eps),
        method: IntervalMethod::Hoeffding,
        alpha,
    })
}

/// Log-space binomial CDF `P[X <= k]` for X ~ Bin(n, p).
///
/// Iterative pmf recurrence keeps this stable for the sample sizes trap
/// batches use (up to a few tens of thousands of shots).
fn binom_cdf(k: i64, n: u64, p: f64) -> f64 {
    if k < 0 {
        return 0.0;
    }
    let k = k as u64;
    if k >= n {
        return 1.0;
    }
    if p <= 0.0 {
        return 1.0;
    }
    if p >= 1.0 {
        return 0.0;
    }
    let ln_p = p.ln();
    let ln_q = (1.0 - p).ln();
    // ln pmf(0) = n ln(1-p)
    let mut ln_pmf = n as f64 * ln_q;
    let mut acc = ln_pmf.exp();
    for i in 0..k {
        // pmf(i+1) = pmf(i) * (n-i)/(i+1) * p/(1-p)
        ln_pmf += ((n - i) as f64).ln() - ((i + 1) as f64).ln() + ln_p - ln_q;
        acc += ln_pmf.exp();
    }
    acc.min(1.0)
}

/// Survival function `P[X >= k]`.
fn binom_sf(k: i64, n: u64, p: f64) -> f64 {
    1.0 - binom_cdf(k - 1, n, p)
}

/// Exact Clopper-Pearson interval by monotone bisection of the binomial CDF.
pub fn clopper_pearson_interval(
    k: u64,
    n: u64,
    alpha: f64,
) -> Result<ConfidenceInterval, StatsError> {
    let stats = TrapStats::new(k, n)?;
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(StatsError::BadAlpha(alpha));
    }
    let target = alpha / 2.0;

    let lower = if k == 0 {
        0.0
    } else {
        let (mut lo, mut hi) = (0.0f64, stats.p_hat);
        for _ in 0..80 {
            let mid = 0.5 * (lo + hi);
            if binom_cdf(k as i64 - 1, n, mid) > target {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        lo
    };

    let upper = if k == n {
        1.0
    } else {
        let (mut lo, mut hi) = (stats.p_hat, 1.0f64);
        for _ in 0..80 {
            let mid = 0.5 * (lo + hi);
            if binom_sf(k as i64, n, mid) > target {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        hi
    };

    Ok(ConfidenceInterval {
        lower: clamp01(lower),
        upper: clamp01(upper),
        method: IntervalMethod::ClopperPearson,
        alpha,
    })
}

/// Compute the interval for the chosen method.
pub fn interval_for(
    method: IntervalMethod,
    k: u64,
    n: u64,
    alpha: f64,
) -> Result<ConfidenceInterval, StatsError> {
    match method {
        IntervalMethod::Wilson => wilson_interval(k, n, alpha),
        IntervalMethod::ClopperPearson => clopper_pearson_interval(k, n, alpha),
        IntervalMethod::Hoeffding => hoeffding_interval(k, n, alpha),
    }
}

/// Conservative pass rule: the interval's lower bound must reach the target.
pub fn trap_batch_passes(
    method: IntervalMethod,
    k: u64,
    n: u64,
    target_ratio: f64,
    alpha: f64,
) -> Result<bool, StatsError> {
    let ci = interval_for(method, k, n, alpha)?;
    Ok(ci.lower >= target_ratio - 1e-15)
}

/// Binomial right-tail p-value for `H0: p = target_ratio`.
pub fn one_sided_p_value(k: u64, n: u64, target_ratio: f64) -> f64 {
    binom_sf(k as i64, n, clamp01(target_ratio))
}

/// Conservative sample size so the Wilson half-width stays within `margin`.
pub fn min_samples_for_margin(
    target_ratio: f64,
    margin: f64,
    alpha: f64,
) -> Result<u64, StatsError> {
    if !(margin > 0.0 && margin < 0.5) {
        return Err(StatsError::BadAlpha(margin));
    }
    let z = z_from_alpha(alpha)?;
    let p = clamp01(target_ratio);
    let p_var = (p * (1.0 - p)).max(0.25);
    Ok(((z * z) * p_var / (margin * margin)).ceil() as u64)
}

/// Distribution-free Hoeffding sample size for a given margin.
pub fn min_samples_hoeffding(margin: f64, alpha: f64) -> Result<u64, StatsError> {
    if !(margin > 0.0 && margin < 0.5) {
        return Err(StatsError::BadAlpha(margin));
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(StatsError::BadAlpha(alpha));
    }
    Ok(((2.0 / alpha).ln() / (2.0 * margin * margin)).ceil() as u64)
}

/// Outcome of a sequential probability ratio test step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SprtDecision {
    /// Whether a decision boundary was crossed.
    pub decided: bool,
    /// When decided: true accepts H1 (`p >= p1`), false accepts H0.
    pub accept: bool,
    /// Log likelihood ratio after `n` trials.
    pub log_likelihood_ratio: f64,
}

/// SPRT for `H0: p = p0` vs `H1: p = p1` with `p1 > p0`.
///
/// Thresholds `A = (1-beta)/alpha`, `B = beta/(1-alpha)`; crossing `A`
/// accepts H1, crossing `B` accepts H0, otherwise keep sampling.
pub fn sprt_one_sided(
    k: u64,
    n: u64,
    p0: f64,
    p1: f64,
    alpha: f64,
    beta: f64,
) -> Result<SprtDecision, StatsError> {
    if !(p0 > 0.0 && p0 < p1 && p1 < 1.0) {
        return Err(StatsError::BadHypotheses);
    }
    if k > n {
        return Err(StatsError::CountExceedsSample { k, n });
    }
    let a = (1.0 - beta) / alpha;
    let b = beta / (1.0 - alpha);
    let llr = k as f64 * (p1 / p0).ln() + (n - k) as f64 * ((1.0 - p1) / (1.0 - p0)).ln();
    let l = llr.exp();
    let (decided, accept) = if l >= a {
        (true, true)
    } else if l <= b {
        (true, false)
    } else {
        (false, false)
    };
    Ok(SprtDecision {
        decided,
        accept,
        log_likelihood_ratio: llr,
    })
}
