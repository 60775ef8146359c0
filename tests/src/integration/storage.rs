//! Storage heartbeat: windows, coverage binding, retrieval bonus.

#[cfg(test)]
mod tests {
    use crate::fixtures;
    use proofs_types::ProofType;
    use proofs_verifiers::{Registry, VerifyContext};

    fn ctx_at(now: Option<u64>) -> VerifyContext {
        VerifyContext {
            now_epoch: now,
            ..Default::default()
        }
    }

    #[test]
    fn test_heartbeat_window_boundaries() {
        let registry = Registry::bootstrap();
        let fixture = fixtures::build_sector(16);
        let verify_at = |now: u64| {
            let body = fixtures::storage_body(
                &fixture,
                fixtures::covering_samples(&fixture, 42, 4),
                Some((1000, 2000)),
                None,
            );
            let env = fixtures::envelope_for(ProofType::Storage, body);
            registry.verify(&env, &ctx_at(Some(now)))
        };

        assert!(verify_at(1000).is_ok(), "window start is inclusive");
        assert!(verify_at(1500).is_ok(), "midpoint accepted");
        let at_end = verify_at(2000).unwrap_err();
        assert_eq!(at_end.code(), "PROOF_INVALID");
        assert!(verify_at(999).is_err(), "window start - 1 rejected");
    }

    #[test]
    fn test_retrieval_ticket_raises_qos_and_sets_flag() {
        let registry = Registry::bootstrap();
        let fixture = fixtures::build_sector(16);
        let without = fixtures::envelope_for(
            ProofType::Storage,
            fixtures::storage_body(
                &fixture,
                fixtures::covering_samples(&fixture, 42, 4),
                None,
                None,
            ),
        );
        let with = fixtures::envelope_for(
            ProofType::Storage,
            fixtures::storage_body(
                &fixture,
                fixtures::covering_samples(&fixture, 42, 4),
                None,
                Some(vec![(120, true), (250, true)]),
            ),
        );

        let (m0, _) = registry.verify(&without, &ctx_at(None)).unwrap();
        let (m1, _) = registry.verify(&with, &ctx_at(None)).unwrap();
        assert!(m1.qos.unwrap() > m0.qos.unwrap());

        let psi0 = proofs_receipts::envelope_to_psi_input(&without, &m0);
        let psi1 = proofs_receipts::envelope_to_psi_input(&with, &m1);
        assert_eq!(psi0.signals["retrieval_bonus"], 0.0);
        assert_eq!(psi1.signals["retrieval_bonus"], 1.0);
        assert_eq!(psi1.signals["heartbeat"], 1.0);
    }

    #[test]
    fn test_storage_bytes_scale_with_replicas() {
        let registry = Registry::bootstrap();
        let fixture = fixtures::build_sector(16);
        let env = fixtures::envelope_for(
            ProofType::Storage,
            fixtures::storage_body(
                &fixture,
                fixtures::covering_samples(&fixture, 42, 4),
                None,
                None,
            ),
        );
        let (metrics, _) = registry.verify(&env, &ctx_at(None)).unwrap();
        // sectorSize 32 MiB x 2 replicas at full quality.
        assert_eq!(metrics.storage_bytes, Some(64 * 1024 * 1024));
    }
}
