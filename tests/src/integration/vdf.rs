//! Wesolowski VDF: honest round-trip, tamper rejection, calibration.

#[cfg(test)]
mod tests {
    use crate::fixtures;
    use num_bigint::BigUint;
    use proofs_types::ProofType;
    use proofs_verifiers::{Registry, VerifyContext, VerifyDetails};

    #[test]
    fn test_honest_vdf_roundtrip() {
        let registry = Registry::bootstrap();
        let n = fixtures::vdf_modulus();
        let g = BigUint::from(2u8);
        let t = 20_000;
        let (y, pi) = fixtures::vdf_prove(&n, &g, t);

        let env = fixtures::envelope_for(
            ProofType::Vdf,
            fixtures::vdf_body(&n, &g, &y, &pi, t, None),
        );
        let (metrics, details) = registry.verify(&env, &VerifyContext::default()).unwrap();
        let VerifyDetails::Vdf(details) = details else {
            panic!("wrong detail kind");
        };
        assert_eq!(metrics.vdf_iterations, Some(t));
        assert_eq!(details.mod_bits, 2048);
        // Heuristic for a 2048-bit modulus: T / 3.0e6 seconds.
        assert!((metrics.vdf_seconds.unwrap() - t as f64 / 3.0e6).abs() < 1e-9);
    }

    #[test]
    fn test_flipping_pi_msb_rejects() {
        let registry = Registry::bootstrap();
        let n = fixtures::vdf_modulus();
        let g = BigUint::from(2u8);
        let (y, pi) = fixtures::vdf_prove(&n, &g, 1024);
        let pi_bad = &pi ^ (BigUint::from(1u8) << (pi.bits() - 1) as usize);

        let env = fixtures::envelope_for(
            ProofType::Vdf,
            fixtures::vdf_body(&n, &g, &y, &pi_bad, 1024, None),
        );
        let err = registry
            .verify(&env, &VerifyContext::default())
            .unwrap_err();
        assert_eq!(err.code(), "PROOF_INVALID");
    }

    #[test]
    fn test_flipping_y_rejects() {
        let registry = Registry::bootstrap();
        let n = fixtures::vdf_modulus();
        let g = BigUint::from(2u8);
        let (y, pi) = fixtures::vdf_prove(&n, &g, 1024);
        let y_bad = &y ^ BigUint::from(1u8);

        let env = fixtures::envelope_for(
            ProofType::Vdf,
            fixtures::vdf_body(&n, &g, &y_bad, &pi, 1024, None),
        );
        assert!(registry.verify(&env, &VerifyContext::default()).is_err());
    }

    #[test]
    fn test_calibration_drives_seconds() {
        let registry = Registry::bootstrap();
        let n = fixtures::vdf_modulus();
        let g = BigUint::from(2u8);
        let t = 2_000;
        let (y, pi) = fixtures::vdf_prove(&n, &g, t);

        let env = fixtures::envelope_for(
            ProofType::Vdf,
            fixtures::vdf_body(&n, &g, &y, &pi, t, Some(1_000)),
        );
        let (metrics, details) = registry.verify(&env, &VerifyContext::default()).unwrap();
        let VerifyDetails::Vdf(details) = details else {
            panic!("wrong detail kind");
        };
        assert!(details.calibration_used);
        assert!((metrics.vdf_seconds.unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_seconds_scale_with_iterations() {
        let registry = Registry::bootstrap();
        let n = fixtures::vdf_modulus();
        let g = BigUint::from(2u8);
        let verify_t = |t: u64| {
            let (y, pi) = fixtures::vdf_prove(&n, &g, t);
            let env = fixtures::envelope_for(
                ProofType::Vdf,
                fixtures::vdf_body(&n, &g, &y, &pi, t, None),
            );
            registry
                .verify(&env, &VerifyContext::default())
                .unwrap()
                .0
                .vdf_seconds
                .unwrap()
        };
        let s1 = verify_t(1_000);
        let s2 = verify_t(2_000);
        assert!(s2 > s1);
        assert!((s2 / s1 - 2.0).abs() < 0.15);
    }
}
