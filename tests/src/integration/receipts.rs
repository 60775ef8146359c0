//! Nullifiers and receipts over verified envelopes: determinism, domain
//! separation, quantization, and the `proofsRoot` builder.

#[cfg(test)]
mod tests {
    use crate::fixtures;
    use proofs_codec::encode;
    use proofs_crypto::sha3_256;
    use proofs_receipts::{
        build_receipt, compute_envelope_nullifier, compute_nullifier, merkleize_receipts,
        metrics_to_signals, verify_signals_match, NullifierSalt,
    };
    use proofs_types::value::Value;
    use proofs_types::ProofType;
    use proofs_verifiers::{verify_batch, Registry, VerifyContext};

    #[test]
    fn test_nullifier_matches_embedded_tag() {
        let env = fixtures::envelope_for(
            ProofType::HashShare,
            fixtures::hashshare_body([0x11; 32], 7, None, None),
        );
        let recomputed = compute_envelope_nullifier(&env, NullifierSalt::default()).unwrap();
        assert_eq!(recomputed, env.nullifier);
    }

    #[test]
    fn test_nullifiers_differ_across_kinds() {
        // Five kinds over fixed fixtures: all tags pairwise distinct.
        let fixture = fixtures::build_sector(16);
        let n = fixtures::vdf_modulus();
        let g = num_bigint::BigUint::from(2u8);
        let (y, pi) = fixtures::vdf_prove(&n, &g, 64);
        let tags = [
            fixtures::envelope_for(
                ProofType::HashShare,
                fixtures::hashshare_body([0x11; 32], 7, None, None),
            ),
            fixtures::envelope_for(ProofType::Ai, fixtures::ai_body(fixtures::ai_traps(5, 5))),
            fixtures::envelope_for(
                ProofType::Quantum,
                fixtures::quantum_body("qpu-key-1", fixtures::quantum_traps(&[(1, 10, true)])),
            ),
            fixtures::envelope_for(
                ProofType::Storage,
                fixtures::storage_body(
                    &fixture,
                    fixtures::covering_samples(&fixture, 42, 4),
                    None,
                    None,
                ),
            ),
            fixtures::envelope_for(ProofType::Vdf, fixtures::vdf_body(&n, &g, &y, &pi, 64, None)),
        ]
        .map(|env| env.nullifier);
        let distinct: std::collections::BTreeSet<[u8; 32]> = tags.iter().copied().collect();
        assert_eq!(distinct.len(), 5);
    }

    #[test]
    fn test_chain_salt_segments_networks() {
        let body = fixtures::hashshare_body([0x11; 32], 7, None, None);
        let mainnet = compute_nullifier(
            ProofType::HashShare,
            &body,
            NullifierSalt {
                chain_id: Some(1),
                policy_root: None,
            },
        )
        .unwrap();
        let testnet = compute_nullifier(
            ProofType::HashShare,
            &body,
            NullifierSalt {
                chain_id: Some(2),
                policy_root: None,
            },
        )
        .unwrap();
        assert_ne!(mainnet, testnet);
    }

    #[test]
    fn test_receipt_identical_for_identical_metrics() {
        let registry = Registry::bootstrap();
        let env = fixtures::envelope_for(
            ProofType::HashShare,
            fixtures::hashshare_body([0x11; 32], 7, None, None),
        );
        let body_cbor = encode(&env.body).unwrap();

        let mut receipts = Vec::new();
        for _ in 0..2 {
            let (metrics, _) = registry.verify(&env, &VerifyContext::default()).unwrap();
            let signals = metrics_to_signals(env.type_id, &metrics);
            receipts.push(build_receipt(env.type_id, env.nullifier, &body_cbor, &signals));
        }
        assert_eq!(
            receipts[0].to_cbor().unwrap(),
            receipts[1].to_cbor().unwrap()
        );
        assert_eq!(
            receipts[0].leaf_hash().unwrap(),
            receipts[1].leaf_hash().unwrap()
        );
    }

    #[test]
    fn test_signals_match_iff_requantization_matches() {
        let registry = Registry::bootstrap();
        let env = fixtures::envelope_for(
            ProofType::HashShare,
            fixtures::hashshare_body([0x11; 32], 7, None, None),
        );
        let body_cbor = encode(&env.body).unwrap();
        let (metrics, _) = registry.verify(&env, &VerifyContext::default()).unwrap();
        let signals = metrics_to_signals(env.type_id, &metrics);
        let receipt = build_receipt(env.type_id, env.nullifier, &body_cbor, &signals);

        assert!(verify_signals_match(&receipt, &signals));
        let mut skewed = signals.clone();
        skewed.insert("d_ratio".to_string(), signals["d_ratio"] + 0.5);
        assert!(!verify_signals_match(&receipt, &skewed));
    }

    #[test]
    fn test_empty_receipt_set_sentinel() {
        assert_eq!(
            merkleize_receipts(&[]).unwrap(),
            sha3_256(b"animica/proofReceipt/leaf/v1")
        );
    }

    #[test]
    fn test_batch_to_proofs_root_pipeline() {
        // Verify an ordered batch, convert to receipts, and fold the root.
        let registry = Registry::bootstrap();
        let envs = vec![
            fixtures::envelope_for(
                ProofType::HashShare,
                fixtures::hashshare_body([0x11; 32], 1, None, None),
            ),
            fixtures::envelope_for(
                ProofType::HashShare,
                fixtures::hashshare_body([0x11; 32], 2, None, None),
            ),
            fixtures::envelope_for(
                ProofType::HashShare,
                fixtures::hashshare_body([0x11; 32], 3, None, None),
            ),
        ];
        let ctx = VerifyContext::default();
        let outcome = verify_batch(&registry, &envs, &ctx);
        assert!(outcome.all_ok());

        let mut receipts = Vec::new();
        for (env, result) in envs.iter().zip(outcome.results.iter()) {
            let (metrics, _) = result.as_ref().unwrap();
            let signals = metrics_to_signals(env.type_id, metrics);
            let body_cbor = encode(&env.body).unwrap();
            receipts.push(build_receipt(env.type_id, env.nullifier, &body_cbor, &signals));
        }
        let root = merkleize_receipts(&receipts).unwrap();

        // Reordering the batch changes the committed root.
        receipts.swap(0, 2);
        assert_ne!(root, merkleize_receipts(&receipts).unwrap());
    }

    #[test]
    fn test_receipt_wire_uses_integer_keys() {
        let receipt = build_receipt(
            ProofType::Vdf,
            [0x33; 32],
            b"body",
            &[("seconds".to_string(), 2.5)].into_iter().collect(),
        );
        let value = receipt.to_cbor_value();
        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 5);
        assert!(map
            .iter()
            .all(|(k, _)| matches!(k, proofs_types::value::MapKey::Int(_))));
        // Quantized seconds at the 1e6 scale.
        let Value::Array(signals) = &map[4].1 else {
            panic!("signals must be an array");
        };
        let Value::Array(pair) = &signals[0] else {
            panic!("signal entries are [key, int] pairs");
        };
        assert_eq!(pair[1], Value::Int(2_500_000));
    }
}
