//! AI pipeline: trap acceptance with the Wilson bound, strict-mode TEE
//! rejection, Merkle tamper detection.

#[cfg(test)]
mod tests {
    use crate::fixtures;
    use proofs_attest::AttestationPolicy;
    use proofs_crypto::{trap_batch_passes, wilson_interval, IntervalMethod};
    use proofs_types::ProofType;
    use proofs_verifiers::{Registry, TeeConfig, VerifyContext, VerifyDetails};

    fn lax_ctx() -> VerifyContext {
        VerifyContext {
            tee: TeeConfig {
                policy: AttestationPolicy::permissive(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_thousand_traps_accept_with_wilson_bound() {
        let registry = Registry::bootstrap();
        let env = fixtures::envelope_for(ProofType::Ai, fixtures::ai_body(fixtures::ai_traps(970, 1000)));
        let (metrics, details) = registry.verify(&env, &lax_ctx()).unwrap();
        let VerifyDetails::Ai(details) = details else {
            panic!("wrong detail kind");
        };

        assert_eq!(details.traps_total, 1000);
        assert_eq!(details.traps_ok, 970);
        assert!((metrics.traps_ratio.unwrap() - 0.970).abs() < 1e-12);

        // Wilson lower bound at alpha = 0.05 lands near 0.958.
        let ci = wilson_interval(970, 1000, 0.05).unwrap();
        assert!(ci.lower > 0.95 && ci.lower < 0.96);
        assert!(trap_batch_passes(IntervalMethod::Wilson, 970, 1000, 0.9, 0.05).unwrap());
    }

    #[test]
    fn test_trap_decision_rule_at_threshold() {
        // Threshold 0.9 with z ~ 1.96: 950/1000 accepts, 850/1000 rejects.
        assert!(trap_batch_passes(IntervalMethod::Wilson, 950, 1000, 0.9, 0.05).unwrap());
        assert!(!trap_batch_passes(IntervalMethod::Wilson, 850, 1000, 0.9, 0.05).unwrap());
    }

    #[test]
    fn test_strict_mode_rejects_bitflipped_quote() {
        let registry = Registry::bootstrap();
        // Flip one bit at offset 5 of the quote (inside the tee_type word):
        // the measurements disappear and the strict policy rejects.
        let mut quote = fixtures::sgx_quote();
        quote[5] ^= 0x01;
        let env = fixtures::envelope_for(
            ProofType::Ai,
            fixtures::ai_body_with_quote(fixtures::ai_traps(10, 10), quote),
        );
        let strict_ctx = VerifyContext {
            tee: TeeConfig {
                expected: proofs_attest::ExpectedMeasurements {
                    mrenclave: Some(vec![0xEE; 32]),
                    ..Default::default()
                },
                policy: AttestationPolicy {
                    require_chain_ok: false,
                    require_tcb_up_to_date: false,
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        };
        let err = registry.verify(&env, &strict_ctx).unwrap_err();
        assert_eq!(err.code(), "ATTESTATION");

        // The untampered quote passes the same policy.
        let good = fixtures::envelope_for(ProofType::Ai, fixtures::ai_body(fixtures::ai_traps(10, 10)));
        registry.verify(&good, &strict_ctx).unwrap();
    }

    #[test]
    fn test_flipping_receipt_breaks_root() {
        let registry = Registry::bootstrap();
        // Declare 969 passes but carry the 970-pass root.
        let good = fixtures::ai_traps(970, 1000);
        let bad_receipts = fixtures::ai_traps(969, 1000);
        let tampered = fixtures::replace_field(
            &good,
            "receipts",
            bad_receipts.get("receipts").unwrap().clone(),
        );
        let env = fixtures::envelope_for(
            ProofType::Ai,
            fixtures::ai_body(fixtures::replace_field(
                &fixtures::ai_traps(970, 1000),
                "receipts",
                tampered.get("receipts").unwrap().clone(),
            )),
        );
        let err = registry.verify(&env, &lax_ctx()).unwrap_err();
        assert_eq!(err.code(), "PROOF_INVALID");
        assert!(err.to_string().contains("Merkle root"));
    }

    #[test]
    fn test_psi_signals_from_verified_ai_proof() {
        let registry = Registry::bootstrap();
        let env = fixtures::envelope_for(ProofType::Ai, fixtures::ai_body(fixtures::ai_traps(970, 1000)));
        let (metrics, _) = registry.verify(&env, &lax_ctx()).unwrap();
        let psi = proofs_receipts::envelope_to_psi_input(&env, &metrics);
        assert_eq!(psi.type_id, ProofType::Ai);
        assert_eq!(psi.signals["units"], 1200.0);
        assert!((psi.signals["traps_ratio"] - 0.97).abs() < 1e-12);
        assert!(psi.signals["redundancy"] >= 1.0);
        assert!(psi.signals["qos"] > 0.0 && psi.signals["qos"] <= 1.0);
    }
}
