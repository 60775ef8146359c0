//! Quantum pipeline: provider identity via JWKS, trap circuits, units.

#[cfg(test)]
mod tests {
    use crate::fixtures;
    use proofs_types::ProofType;
    use proofs_verifiers::{QpuConfig, Registry, VerifyContext, VerifyDetails};

    fn ctx(kid: &str) -> VerifyContext {
        VerifyContext {
            qpu: QpuConfig {
                jwks: fixtures::jwks_cache(kid),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_quantum_proof_accepts() {
        let registry = Registry::bootstrap();
        let traps = fixtures::quantum_traps(&[(1, 400, true), (2, 400, true), (3, 200, false)]);
        let env = fixtures::envelope_for(ProofType::Quantum, fixtures::quantum_body("qpu-key-1", traps));
        let (metrics, details) = registry.verify(&env, &ctx("qpu-key-1")).unwrap();
        let VerifyDetails::Quantum(details) = details else {
            panic!("wrong detail kind");
        };
        assert!((metrics.traps_ratio.unwrap() - 0.8).abs() < 1e-12);
        assert_eq!(metrics.quantum_units, Some(8192));
        assert_eq!(details.provider_slug.as_deref(), Some("test_qpu"));
        assert!(details.trap_ratio_lb95 > 0.7 && details.trap_ratio_lb95 < 0.8);
    }

    #[test]
    fn test_missing_kid_rejects_with_no_metrics() {
        let registry = Registry::bootstrap();
        let traps = fixtures::quantum_traps(&[(1, 100, true)]);
        let env = fixtures::envelope_for(ProofType::Quantum, fixtures::quantum_body("kid-x", traps));
        // Cache only trusts a different kid.
        let err = registry.verify(&env, &ctx("kid-y")).unwrap_err();
        assert_eq!(err.code(), "ATTESTATION");
        assert!(err.context()["jws"].contains("not found"));
    }

    #[test]
    fn test_units_monotone_in_job_shape() {
        use proofs_attest::qpu::units_for;
        let base = units_for(64, 16, 1024);
        assert!(units_for(65, 16, 1024) >= base);
        assert!(units_for(64, 17, 1024) >= base);
        assert!(units_for(64, 16, 1025) >= base);
    }

    #[test]
    fn test_psi_signals_shape() {
        let registry = Registry::bootstrap();
        let traps = fixtures::quantum_traps(&[(9, 1000, true)]);
        let env = fixtures::envelope_for(ProofType::Quantum, fixtures::quantum_body("qpu-key-1", traps));
        let (metrics, _) = registry.verify(&env, &ctx("qpu-key-1")).unwrap();
        let psi = proofs_receipts::envelope_to_psi_input(&env, &metrics);
        assert_eq!(
            psi.signals.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["qos", "traps_ratio", "units"]
        );
        assert_eq!(psi.signals["traps_ratio"], 1.0);
    }
}
