//! Shared builders for well-formed proof bodies and envelopes.
//!
//! Everything here is deterministic; the same fixture call always yields
//! the same bytes, so scenario tests can assert on exact digests.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::Signer as _;
use num_bigint::BigUint;
use proofs_attest::JwksCache;
use proofs_crypto::hash::{sha3_256, sha3_256_concat};
use proofs_crypto::merkle::tagged_tree_root;
use proofs_receipts::{compute_nullifier, NullifierSalt};
use proofs_types::value::Value;
use proofs_types::{ProofEnvelope, ProofType};
use proofs_verifiers::storage::derive_sample_indices;
use proofs_verifiers::vdf::derive_challenge_prime;
use proofs_verifiers::{ai, hashshare, quantum, storage};

/// RFC 8037 Ed25519 test key pair used for provider identities.
pub const PROVIDER_D_B64: &str = "nWGxne_9WmC6hEr0kuwsxERJxWl7MmkZcDusAxyuf2A";
/// Matching public key (base64url, JWK `x`).
pub const PROVIDER_X_B64: &str = "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo";

/// Envelope with the correct nullifier for its body.
pub fn envelope_for(type_id: ProofType, body: Value) -> ProofEnvelope {
    let nullifier = compute_nullifier(type_id, &body, NullifierSalt::default()).unwrap();
    ProofEnvelope::new(type_id, body, &nullifier).unwrap()
}

// ---------------------------------------------------------------- hashshare

/// Hash-share body with a correctly recomputed u-draw.
pub fn hashshare_body(
    header: [u8; 32],
    nonce: u64,
    mix: Option<[u8; 32]>,
    target_mu: Option<u64>,
) -> Value {
    let u = hashshare::compute_u_digest(&header, nonce, mix.as_ref());
    let mut entries = vec![
        ("headerHash", Value::Bytes(header.to_vec())),
        ("nonce", Value::Int(nonce as i128)),
        ("u", Value::Bytes(u.to_vec())),
        ("algo", Value::Text("sha3-256".into())),
    ];
    if let Some(m) = mix {
        entries.push(("mixSeed", Value::Bytes(m.to_vec())));
    }
    if let Some(t) = target_mu {
        entries.push(("targetMu", Value::Int(t as i128)));
    }
    Value::text_map(entries)
}

// ----------------------------------------------------------------------- ai

/// AI trap section: `total` receipts of which the first `ok_count` pass.
pub fn ai_traps(ok_count: usize, total: usize) -> Value {
    let seed_reveal = [0xA5u8; 32];
    let seed_commit = sha3_256(&seed_reveal);

    let receipt_fields = |i: usize| {
        let prompt = sha3_256(format!("prompt/{i}").as_bytes());
        let answer = sha3_256(format!("answer/{i}").as_bytes());
        (prompt, answer, i < ok_count)
    };

    let leaves: Vec<Vec<u8>> = (0..total)
        .map(|i| {
            let (prompt, answer, ok) = receipt_fields(i);
            let mut leaf = Vec::with_capacity(65);
            leaf.extend_from_slice(&prompt);
            leaf.extend_from_slice(&answer);
            leaf.push(u8::from(ok));
            leaf
        })
        .collect();
    let root = tagged_tree_root(
        ai::TRAP_ITEM_DOMAIN,
        ai::TRAP_ROOT_DOMAIN,
        leaves.iter().map(Vec::as_slice),
    );

    Value::text_map(vec![
        ("seedCommit", Value::Bytes(seed_commit.to_vec())),
        ("seedReveal", Value::Bytes(seed_reveal.to_vec())),
        (
            "receipts",
            Value::Array(
                (0..total)
                    .map(|i| {
                        let (prompt, answer, ok) = receipt_fields(i);
                        Value::text_map(vec![
                            ("promptDigest", Value::Bytes(prompt.to_vec())),
                            ("answerDigest", Value::Bytes(answer.to_vec())),
                            ("ok", Value::Bool(ok)),
                        ])
                    })
                    .collect(),
            ),
        ),
        ("root", Value::Bytes(root.to_vec())),
    ])
}

/// Well-formed synthetic SGX quote (version 3, SGX tee_type, fixed
/// measurements, debug clear).
pub fn sgx_quote() -> Vec<u8> {
    let mut quote = vec![0u8; 48 + 384];
    quote[0..2].copy_from_slice(&3u16.to_le_bytes());
    let body = 48;
    quote[body + 64..body + 96].fill(0xEE); // mrenclave
    quote[body + 128..body + 160].fill(0x5E); // mrsigner
    quote[body + 256..body + 258].copy_from_slice(&42u16.to_le_bytes());
    quote[body + 258..body + 260].copy_from_slice(&9u16.to_le_bytes());
    quote
}

/// Full AI body around the given traps section.
pub fn ai_body(traps: Value) -> Value {
    ai_body_with_quote(traps, sgx_quote())
}

/// AI body with an explicit quote (for tamper scenarios).
pub fn ai_body_with_quote(traps: Value, quote: Vec<u8>) -> Value {
    Value::text_map(vec![
        (
            "tee",
            Value::text_map(vec![
                ("kind", Value::Text("sgx".into())),
                ("evidence", Value::Bytes(quote)),
            ]),
        ),
        (
            "job",
            Value::text_map(vec![
                ("taskId", Value::Bytes(vec![0x70; 32])),
                ("inputDigest", Value::Bytes(vec![0x71; 32])),
                ("outputDigest", Value::Bytes(vec![0x72; 32])),
                ("runtimeSec", Value::Int(12)),
            ]),
        ),
        ("traps", traps),
        (
            "redundancy",
            Value::text_map(vec![
                ("replicas", Value::Int(3)),
                ("agree", Value::Int(3)),
                ("total", Value::Int(3)),
            ]),
        ),
        (
            "qos",
            Value::text_map(vec![
                ("latencyMsP95", Value::Int(250)),
                ("successPermil", Value::Int(990)),
                ("uptimePermil", Value::Int(995)),
            ]),
        ),
    ])
}

// ------------------------------------------------------------------ quantum

/// Compact JWS over provider claims, signed with the fixture key.
pub fn provider_jws(kid: &str) -> String {
    let d: [u8; 32] = URL_SAFE_NO_PAD
        .decode(PROVIDER_D_B64)
        .unwrap()
        .try_into()
        .unwrap();
    let sk = ed25519_dalek::SigningKey::from_bytes(&d);
    let header = serde_json::json!({"alg": "EdDSA", "kid": kid});
    let payload = serde_json::json!({"provider": "test_qpu", "region": "eu"});
    let h = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
    let p = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());
    let signing_input = format!("{h}.{p}");
    let sig = sk.sign(signing_input.as_bytes());
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(sig.to_bytes()))
}

/// JWKS cache trusting the fixture key under the given kid.
pub fn jwks_cache(kid: &str) -> JwksCache {
    let jwks = format!(
        r#"{{"keys":[{{"kty":"OKP","crv":"Ed25519","kid":"{kid}","alg":"EdDSA","x":"{PROVIDER_X_B64}"}}]}}"#
    );
    let mut cache = JwksCache::new();
    cache.insert_json("test_qpu", &jwks).unwrap();
    cache
}

/// Quantum trap section from `(tag, count, ok)` triples.
pub fn quantum_traps(receipts: &[(u8, u64, bool)]) -> Value {
    let seed_reveal = [0x5Au8; 32];
    let seed_commit = sha3_256(&seed_reveal);
    let leaves: Vec<Vec<u8>> = receipts
        .iter()
        .map(|(tag, count, ok)| {
            let mut leaf = Vec::with_capacity(41);
            leaf.extend_from_slice(&[*tag; 32]);
            leaf.extend_from_slice(&count.to_be_bytes());
            leaf.push(u8::from(*ok));
            leaf
        })
        .collect();
    let root = tagged_tree_root(
        quantum::TRAP_ITEM_DOMAIN,
        quantum::TRAP_ROOT_DOMAIN,
        leaves.iter().map(Vec::as_slice),
    );
    Value::text_map(vec![
        ("seedCommit", Value::Bytes(seed_commit.to_vec())),
        ("seedReveal", Value::Bytes(seed_reveal.to_vec())),
        (
            "receipts",
            Value::Array(
                receipts
                    .iter()
                    .map(|(tag, count, ok)| {
                        Value::text_map(vec![
                            ("trapDigest", Value::Bytes(vec![*tag; 32])),
                            ("count", Value::Int(*count as i128)),
                            ("ok", Value::Bool(*ok)),
                        ])
                    })
                    .collect(),
            ),
        ),
        ("root", Value::Bytes(root.to_vec())),
    ])
}

/// Full quantum body with the fixture provider identity.
pub fn quantum_body(kid: &str, traps: Value) -> Value {
    Value::text_map(vec![
        (
            "provider",
            Value::text_map(vec![
                ("certChain", Value::Bytes(provider_jws(kid).into_bytes())),
                (
                    "endorsedAlgs",
                    Value::Array(vec![Value::Text("qaoa".into()), Value::Text("vqe".into())]),
                ),
            ]),
        ),
        (
            "job",
            Value::text_map(vec![
                ("taskId", Value::Bytes(vec![0x60; 32])),
                ("circuitDigest", Value::Bytes(vec![0x61; 32])),
                ("resultDigest", Value::Bytes(vec![0x62; 32])),
                ("depth", Value::Int(64)),
                ("width", Value::Int(16)),
                ("shots", Value::Int(1024)),
            ]),
        ),
        ("traps", traps),
        (
            "qos",
            Value::text_map(vec![
                ("latencyMsP95", Value::Int(700)),
                ("successPermil", Value::Int(980)),
                ("uptimePermil", Value::Int(990)),
            ]),
        ),
    ])
}

// ------------------------------------------------------------------ storage

/// A committed sector tree with inclusion paths for every leaf.
pub struct SectorFixture {
    /// Sector root.
    pub root: [u8; 32],
    /// Raw leaves.
    pub leaves: Vec<[u8; 32]>,
    /// Per-leaf sibling paths.
    pub paths: Vec<Vec<[u8; 32]>>,
}

/// Build a power-of-two sector tree.
pub fn build_sector(n: usize) -> SectorFixture {
    assert!(n.is_power_of_two());
    let leaves: Vec<[u8; 32]> = (0..n).map(|i| sha3_256(&(i as u64).to_be_bytes())).collect();
    let hashed: Vec<[u8; 32]> = leaves
        .iter()
        .map(|l| sha3_256_concat([storage::LEAF_DOMAIN, l.as_ref()]))
        .collect();

    let mut levels = vec![hashed];
    while levels.last().unwrap().len() > 1 {
        let prev = levels.last().unwrap();
        let mut next = Vec::with_capacity(prev.len() / 2);
        for pair in prev.chunks(2) {
            next.push(sha3_256_concat([
                storage::NODE_DOMAIN,
                pair[0].as_ref(),
                pair[1].as_ref(),
            ]));
        }
        levels.push(next);
    }
    let root = levels.last().unwrap()[0];

    let mut paths = Vec::with_capacity(n);
    for index in 0..n {
        let mut path = Vec::new();
        let mut idx = index;
        for level in &levels[..levels.len() - 1] {
            path.push(level[idx ^ 1]);
            idx >>= 1;
        }
        paths.push(path);
    }
    SectorFixture {
        root,
        leaves,
        paths,
    }
}

/// Challenge seed used by all storage fixtures.
pub fn storage_seed() -> [u8; 32] {
    [0xCE; 32]
}

/// Samples covering the derived challenge for a 16-leaf sector.
pub fn covering_samples(fixture: &SectorFixture, epoch: u64, min: usize) -> Value {
    let mut wanted: std::collections::BTreeSet<u64> =
        derive_sample_indices(&storage_seed(), epoch, min)
            .iter()
            .map(|d| d % 16)
            .collect();
    wanted.insert(15);
    let mut filler = 0u64;
    while wanted.len() < min {
        wanted.insert(filler);
        filler += 1;
    }
    Value::Array(
        wanted
            .iter()
            .map(|i| {
                let i = *i as usize;
                Value::text_map(vec![
                    ("leaf", Value::Bytes(fixture.leaves[i].to_vec())),
                    ("index", Value::Int(i as i128)),
                    (
                        "path",
                        Value::Array(
                            fixture.paths[i]
                                .iter()
                                .map(|p| Value::Bytes(p.to_vec()))
                                .collect(),
                        ),
                    ),
                ])
            })
            .collect(),
    )
}

/// Full storage body.
pub fn storage_body(
    fixture: &SectorFixture,
    samples: Value,
    window: Option<(u64, u64)>,
    tickets: Option<Vec<(u64, bool)>>,
) -> Value {
    let mut challenge = vec![
        ("epoch", Value::Int(42)),
        ("seed", Value::Bytes(storage_seed().to_vec())),
    ];
    if let Some((start, end)) = window {
        challenge.push((
            "window",
            Value::text_map(vec![
                ("start", Value::Int(start as i128)),
                ("end", Value::Int(end as i128)),
            ]),
        ));
    }
    let mut entries = vec![
        (
            "provider",
            Value::text_map(vec![("providerId", Value::Bytes(vec![0x1D; 32]))]),
        ),
        (
            "commit",
            Value::text_map(vec![
                ("sectorRoot", Value::Bytes(fixture.root.to_vec())),
                ("sectorSize", Value::Int(32 * 1024 * 1024)),
                ("replicas", Value::Int(2)),
                ("minSamples", Value::Int(4)),
            ]),
        ),
        ("challenge", Value::text_map(challenge)),
        ("proof", Value::text_map(vec![("samples", samples)])),
    ];
    if let Some(t) = tickets {
        entries.push((
            "retrieval",
            Value::text_map(vec![(
                "tickets",
                Value::Array(
                    t.iter()
                        .map(|(lat, ok)| {
                            Value::text_map(vec![
                                ("blobCommitment", Value::Bytes(vec![0xB1; 32])),
                                ("latencyMs", Value::Int(*lat as i128)),
                                ("ok", Value::Bool(*ok)),
                            ])
                        })
                        .collect(),
                ),
            )]),
        ));
    }
    Value::text_map(entries)
}

// ---------------------------------------------------------------------- vdf

/// Deterministic 2048-bit odd modulus for VDF scenarios.
pub fn vdf_modulus() -> BigUint {
    let mut bytes = Vec::with_capacity(256);
    let mut ctr = 0u64;
    while bytes.len() < 256 {
        bytes.extend_from_slice(&sha3_256(format!("vdf-fixture-modulus/{ctr}").as_bytes()));
        ctr += 1;
    }
    bytes[0] |= 0x80;
    bytes[255] |= 0x01;
    BigUint::from_bytes_be(&bytes)
}

/// Honest Wesolowski prover: `(y, pi)` for `g^(2^T) mod N`.
pub fn vdf_prove(n: &BigUint, g: &BigUint, t: u64) -> (BigUint, BigUint) {
    let mut y = g.clone();
    for _ in 0..t {
        y = (&y * &y) % n;
    }
    let ell = derive_challenge_prime(n, g, &y, 128, 10_000).unwrap();
    let exponent = BigUint::from(1u8) << t as usize;
    let pi = g.modpow(&(&exponent / &ell), n);
    (y, pi)
}

/// Full VDF body.
pub fn vdf_body(
    n: &BigUint,
    g: &BigUint,
    y: &BigUint,
    pi: &BigUint,
    t: u64,
    calibration: Option<u64>,
) -> Value {
    let mut entries = vec![
        (
            "group",
            Value::text_map(vec![
                ("kind", Value::Text("RSA".into())),
                ("N", Value::Bytes(n.to_bytes_be())),
            ]),
        ),
        ("g", Value::Bytes(g.to_bytes_be())),
        ("y", Value::Bytes(y.to_bytes_be())),
        ("T", Value::Int(t as i128)),
        (
            "proof",
            Value::text_map(vec![("pi", Value::Bytes(pi.to_bytes_be()))]),
        ),
    ];
    if let Some(ips) = calibration {
        entries.push((
            "calibration",
            Value::text_map(vec![("iters_per_sec", Value::Int(ips as i128))]),
        ));
    }
    Value::text_map(entries)
}

/// Replace (or insert) a top-level entry of a text-keyed map body.
pub fn replace_field(body: &Value, key: &str, new_value: Value) -> Value {
    let mut entries = body.as_map().unwrap().to_vec();
    let mut replaced = false;
    for (k, v) in entries.iter_mut() {
        if matches!(k, proofs_types::value::MapKey::Text(t) if t == key) {
            *v = new_value.clone();
            replaced = true;
            break;
        }
    }
    if !replaced {
        entries.push((proofs_types::value::MapKey::Text(key.to_string()), new_value));
    }
    Value::map(entries)
}
