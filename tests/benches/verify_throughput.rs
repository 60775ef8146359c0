//! Verification throughput benchmarks.
//!
//! Measures the per-envelope cost of the cheap paths (hash share, receipt
//! construction) and the heavy path (Wesolowski verification), which bound
//! block validation latency.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use num_bigint::BigUint;
use proofs_codec::{decode_envelope, encode, encode_envelope};
use proofs_receipts::{build_receipt, metrics_to_signals};
use proofs_tests::fixtures;
use proofs_types::ProofType;
use proofs_verifiers::{Registry, VerifyContext};

fn bench_hashshare_verify(c: &mut Criterion) {
    let registry = Registry::bootstrap();
    let ctx = VerifyContext::default();
    let env = fixtures::envelope_for(
        ProofType::HashShare,
        fixtures::hashshare_body([0x11; 32], 7, Some([0x22; 32]), None),
    );
    c.bench_function("hashshare_verify", |b| {
        b.iter(|| registry.verify(&env, &ctx).unwrap())
    });
}

fn bench_envelope_codec(c: &mut Criterion) {
    let env = fixtures::envelope_for(ProofType::Ai, fixtures::ai_body(fixtures::ai_traps(95, 100)));
    let bytes = encode_envelope(&env).unwrap();
    c.bench_function("envelope_decode_ai_100_traps", |b| {
        b.iter(|| decode_envelope(&bytes).unwrap())
    });
}

fn bench_vdf_verify(c: &mut Criterion) {
    let registry = Registry::bootstrap();
    let ctx = VerifyContext::default();
    let n = fixtures::vdf_modulus();
    let g = BigUint::from(2u8);
    let (y, pi) = fixtures::vdf_prove(&n, &g, 4096);
    let env = fixtures::envelope_for(
        ProofType::Vdf,
        fixtures::vdf_body(&n, &g, &y, &pi, 4096, None),
    );
    c.bench_function("vdf_verify_2048bit_t4096", |b| {
        b.iter(|| registry.verify(&env, &ctx).unwrap())
    });
}

fn bench_receipt_pipeline(c: &mut Criterion) {
    let registry = Registry::bootstrap();
    let ctx = VerifyContext::default();
    let env = fixtures::envelope_for(
        ProofType::HashShare,
        fixtures::hashshare_body([0x11; 32], 9, None, None),
    );
    let body_cbor = encode(&env.body).unwrap();
    c.bench_function("receipt_build_and_leaf", |b| {
        b.iter_batched(
            || registry.verify(&env, &ctx).unwrap().0,
            |metrics| {
                let signals = metrics_to_signals(env.type_id, &metrics);
                let receipt = build_receipt(env.type_id, env.nullifier, &body_cbor, &signals);
                receipt.leaf_hash().unwrap()
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_hashshare_verify,
    bench_envelope_codec,
    bench_vdf_verify,
    bench_receipt_pipeline
);
criterion_main!(benches);
