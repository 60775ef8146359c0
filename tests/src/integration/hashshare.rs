//! Hash-share end-to-end: accept, target enforcement, tamper rejection.

#[cfg(test)]
mod tests {
    use crate::fixtures;
    use proofs_types::value::Value;
    use proofs_types::ProofType;
    use proofs_verifiers::{Registry, VerifyContext, VerifyDetails};

    const HEADER: [u8; 32] = [0x11; 32];
    const NONCE: u64 = 0xdead_beef_cafe_babe;
    const MIX: [u8; 32] = [0x22; 32];

    #[test]
    fn test_share_accepts_and_meets_target() {
        let registry = Registry::bootstrap();

        // Probe the actual work for this (header, nonce, mix) tuple, then
        // demand exactly that much: d_ratio must come out >= 1.0.
        let probe = fixtures::envelope_for(
            ProofType::HashShare,
            fixtures::hashshare_body(HEADER, NONCE, Some(MIX), None),
        );
        let (_, details) = registry.verify(&probe, &VerifyContext::default()).unwrap();
        let VerifyDetails::HashShare(details) = details else {
            panic!("wrong detail kind");
        };
        assert!(details.s_mu > 0);

        let env = fixtures::envelope_for(
            ProofType::HashShare,
            fixtures::hashshare_body(HEADER, NONCE, Some(MIX), Some(details.s_mu)),
        );
        let (metrics, _) = registry.verify(&env, &VerifyContext::default()).unwrap();
        assert!(metrics.d_ratio.unwrap() >= 1.0);
    }

    #[test]
    fn test_doubling_target_halves_ratio() {
        let registry = Registry::bootstrap();
        let probe = fixtures::envelope_for(
            ProofType::HashShare,
            fixtures::hashshare_body(HEADER, NONCE, Some(MIX), None),
        );
        let (_, details) = registry.verify(&probe, &VerifyContext::default()).unwrap();
        let VerifyDetails::HashShare(details) = details else {
            panic!("wrong detail kind");
        };
        let quarter = details.s_mu / 4;
        let half = details.s_mu / 2;

        let verify_with = |target: u64| {
            let env = fixtures::envelope_for(
                ProofType::HashShare,
                fixtures::hashshare_body(HEADER, NONCE, Some(MIX), Some(target)),
            );
            registry
                .verify(&env, &VerifyContext::default())
                .unwrap()
                .0
                .d_ratio
                .unwrap()
        };
        let r_quarter = verify_with(quarter);
        let r_half = verify_with(half);
        assert!(r_quarter > r_half, "smaller target, larger ratio");
        assert!((r_quarter / r_half - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_header_tamper_is_proof_error() {
        let registry = Registry::bootstrap();
        let body = fixtures::hashshare_body(HEADER, NONCE, Some(MIX), None);
        let mut bad_header = HEADER;
        bad_header[0] ^= 0x01;
        let tampered =
            fixtures::replace_field(&body, "headerHash", Value::Bytes(bad_header.to_vec()));
        let env = fixtures::envelope_for(ProofType::HashShare, tampered);
        let err = registry
            .verify(&env, &VerifyContext::default())
            .unwrap_err();
        assert_eq!(err.code(), "PROOF_INVALID");
    }

    #[test]
    fn test_different_nonces_yield_different_draws() {
        let a = fixtures::hashshare_body(HEADER, 1, None, None);
        let b = fixtures::hashshare_body(HEADER, 2, None, None);
        assert_ne!(
            a.get("u").unwrap().as_bytes().unwrap(),
            b.get("u").unwrap().as_bytes().unwrap()
        );
    }
}
