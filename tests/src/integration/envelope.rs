//! Envelope codec round-trips and determinism across the full pipeline.

#[cfg(test)]
mod tests {
    use crate::fixtures;
    use proofs_codec::{decode_envelope, encode_envelope};
    use proofs_types::value::Value;
    use proofs_types::ProofType;

    #[test]
    fn test_envelope_roundtrip_all_kinds() {
        crate::init_tracing();
        let fixture = fixtures::build_sector(16);
        let n = fixtures::vdf_modulus();
        let g = num_bigint::BigUint::from(2u8);
        let (y, pi) = fixtures::vdf_prove(&n, &g, 64);

        let bodies = vec![
            (
                ProofType::HashShare,
                fixtures::hashshare_body([0x11; 32], 7, Some([0x22; 32]), None),
            ),
            (ProofType::Ai, fixtures::ai_body(fixtures::ai_traps(9, 10))),
            (
                ProofType::Quantum,
                fixtures::quantum_body("qpu-key-1", fixtures::quantum_traps(&[(1, 500, true)])),
            ),
            (
                ProofType::Storage,
                fixtures::storage_body(
                    &fixture,
                    fixtures::covering_samples(&fixture, 42, 4),
                    None,
                    None,
                ),
            ),
            (ProofType::Vdf, fixtures::vdf_body(&n, &g, &y, &pi, 64, None)),
        ];

        for (pt, body) in bodies {
            let env = fixtures::envelope_for(pt, body);
            let bytes = encode_envelope(&env).unwrap();
            let back = decode_envelope(&bytes).unwrap();
            assert_eq!(back, env, "round-trip for {}", pt.name());
            assert_eq!(
                encode_envelope(&back).unwrap(),
                bytes,
                "re-encode idempotent for {}",
                pt.name()
            );
        }
    }

    #[test]
    fn test_unknown_body_keys_survive_roundtrip() {
        let body = fixtures::hashshare_body([0x11; 32], 7, None, None);
        let extended = fixtures::replace_field(&body, "vendorExtension", Value::Text("x".into()));
        let env = fixtures::envelope_for(ProofType::HashShare, extended);
        let bytes = encode_envelope(&env).unwrap();
        let back = decode_envelope(&bytes).unwrap();
        assert!(back.body.get("vendorExtension").is_some());
        assert_eq!(encode_envelope(&back).unwrap(), bytes);
    }

    #[test]
    fn test_corrupt_bytes_are_decode_errors() {
        let env = fixtures::envelope_for(
            ProofType::HashShare,
            fixtures::hashshare_body([0x11; 32], 7, None, None),
        );
        let bytes = encode_envelope(&env).unwrap();

        // Truncation.
        assert_eq!(
            decode_envelope(&bytes[..bytes.len() - 3]).unwrap_err().code(),
            "DECODE"
        );
        // Trailing garbage.
        let mut padded = bytes.clone();
        padded.push(0x00);
        assert_eq!(decode_envelope(&padded).unwrap_err().code(), "DECODE");
    }

    #[test]
    fn test_schema_roots_exposed_for_header_binding() {
        let registry = proofs_verifiers::Registry::bootstrap();
        let map = registry.schema_hex_map();
        assert_eq!(map.len(), 5);
        let distinct: std::collections::BTreeSet<&String> = map.values().collect();
        assert_eq!(distinct.len(), 5);
        // Registry roots agree with the codec's direct computation.
        for pt in ProofType::ALL {
            assert_eq!(
                map[&pt.as_u64()],
                hex::encode(proofs_codec::schema_root(pt))
            );
        }
    }
}
