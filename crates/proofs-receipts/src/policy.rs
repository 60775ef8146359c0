//! # Policy Adapter
//!
//! Translates verifier-produced [`ProofMetrics`] into the normalized
//! ψ-input signals the PoIES scorer consumes. Only normalization happens
//! here: ratios clamp to `[0,1]`, counts floor at 0, redundancy floors at
//! 1, booleans map to {0,1}. Weights and caps belong to the scorer policy.
//!
//! Signal keys are stable strings referenced by the scorer policy; do not
//! rename them without a policy-root bump.

use std::collections::BTreeMap;

use proofs_crypto::clamp01;
use proofs_types::{ProofEnvelope, ProofMetrics, ProofType, PsiInput};

fn floor0(x: Option<f64>) -> f64 {
    match x {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

fn floor0_u(x: Option<u64>) -> f64 {
    x.unwrap_or(0) as f64
}

fn at_least_one(x: Option<f64>) -> f64 {
    floor0(x).max(1.0)
}

fn bool01(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

/// Map one proof's metrics to its ψ-input signal dict.
pub fn metrics_to_signals(pt: ProofType, m: &ProofMetrics) -> BTreeMap<String, f64> {
    let mut signals = BTreeMap::new();
    match pt {
        ProofType::HashShare => {
            signals.insert("d_ratio".to_string(), floor0(m.d_ratio));
        }
        ProofType::Ai => {
            signals.insert("units".to_string(), floor0_u(m.ai_units));
            signals.insert(
                "traps_ratio".to_string(),
                clamp01(m.traps_ratio.unwrap_or(0.0)),
            );
            signals.insert("qos".to_string(), clamp01(m.qos.unwrap_or(0.0)));
            signals.insert("redundancy".to_string(), at_least_one(m.redundancy));
        }
        ProofType::Quantum => {
            signals.insert("units".to_string(), floor0_u(m.quantum_units));
            signals.insert(
                "traps_ratio".to_string(),
                clamp01(m.traps_ratio.unwrap_or(0.0)),
            );
            signals.insert("qos".to_string(), clamp01(m.qos.unwrap_or(0.0)));
        }
        ProofType::Storage => {
            // A storage proof only reaches the adapter after verification,
            // so the heartbeat flag reflects proven liveness.
            signals.insert(
                "heartbeat".to_string(),
                bool01(m.storage_bytes.is_some()),
            );
            signals.insert(
                "retrieval_bonus".to_string(),
                bool01(m.retrieval_bonus.unwrap_or(0.0) > 0.0),
            );
            signals.insert("qos".to_string(), clamp01(m.qos.unwrap_or(0.0)));
        }
        ProofType::Vdf => {
            signals.insert("seconds".to_string(), floor0(m.vdf_seconds));
        }
    }
    signals
}

/// Convenience: map `(envelope, verified metrics)` to a [`PsiInput`].
pub fn envelope_to_psi_input(env: &ProofEnvelope, metrics: &ProofMetrics) -> PsiInput {
    PsiInput {
        type_id: env.type_id,
        signals: metrics_to_signals(env.type_id, metrics),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_signals() {
        let m = ProofMetrics {
            d_ratio: Some(1.25),
            ..Default::default()
        };
        let s = metrics_to_signals(ProofType::HashShare, &m);
        assert_eq!(s.len(), 1);
        assert_eq!(s["d_ratio"], 1.25);
    }

    #[test]
    fn test_ai_signals_clamped_and_floored() {
        let m = ProofMetrics {
            ai_units: Some(1200),
            traps_ratio: Some(1.7),
            qos: Some(-0.3),
            redundancy: Some(0.4),
            ..Default::default()
        };
        let s = metrics_to_signals(ProofType::Ai, &m);
        assert_eq!(s["units"], 1200.0);
        assert_eq!(s["traps_ratio"], 1.0);
        assert_eq!(s["qos"], 0.0);
        assert_eq!(s["redundancy"], 1.0);
    }

    #[test]
    fn test_quantum_signals_have_no_redundancy() {
        let m = ProofMetrics {
            quantum_units: Some(8192),
            traps_ratio: Some(0.8),
            qos: Some(0.9),
            ..Default::default()
        };
        let s = metrics_to_signals(ProofType::Quantum, &m);
        assert_eq!(
            s.keys().collect::<Vec<_>>(),
            vec!["qos", "traps_ratio", "units"]
        );
    }

    #[test]
    fn test_storage_booleans() {
        let m = ProofMetrics {
            storage_bytes: Some(1 << 25),
            retrieval_bonus: Some(0.6),
            qos: Some(0.88),
            ..Default::default()
        };
        let s = metrics_to_signals(ProofType::Storage, &m);
        assert_eq!(s["heartbeat"], 1.0);
        assert_eq!(s["retrieval_bonus"], 1.0);

        let none = metrics_to_signals(ProofType::Storage, &ProofMetrics::default());
        assert_eq!(none["heartbeat"], 0.0);
        assert_eq!(none["retrieval_bonus"], 0.0);
    }

    #[test]
    fn test_vdf_seconds_floor() {
        let s = metrics_to_signals(
            ProofType::Vdf,
            &ProofMetrics {
                vdf_seconds: Some(-4.0),
                ..Default::default()
            },
        );
        assert_eq!(s["seconds"], 0.0);
    }

    #[test]
    fn test_missing_metrics_yield_neutral_defaults() {
        let s = metrics_to_signals(ProofType::Ai, &ProofMetrics::default());
        assert_eq!(s["units"], 0.0);
        assert_eq!(s["traps_ratio"], 0.0);
        assert_eq!(s["redundancy"], 1.0);
    }
}
