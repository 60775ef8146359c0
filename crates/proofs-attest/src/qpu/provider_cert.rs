//! # QPU Provider Identity Certificates
//!
//! Providers present either a bare compact JWS over their claims or a
//! hybrid JSON envelope carrying the JWS plus optional X.509 chain and
//! optional post-quantum signature:
//!
//! ```json
//! {
//!   "format": "hybrid-v1",
//!   "claims": { ... },
//!   "jws": "eyJhbGciOi...",
//!   "x509_chain_pem": "-----BEGIN CERTIFICATE-----...",
//!   "pq": { "alg": "dilithium3", "pub": "<hex|b64>", "sig": "<hex|b64>" }
//! }
//! ```
//!
//! Verification resolves the JWS key by `kid` from the local JWKS cache,
//! checks nbf/exp against a caller-supplied clock (±60 s skew), optionally
//! walks the X.509 chain to the pinned QPU root and binds the leaf key to
//! the JWS key, and surfaces any PQ bundle. No network I/O happens here.

use std::collections::BTreeMap;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use proofs_types::{ProofError, Result};
use tracing::debug;

use super::jwks::{JwksCache, QpuKeyRef};

/// Post-quantum signature bundle (surfaced; no local verify backend).
#[derive(Debug, Clone)]
pub struct PqBundle {
    /// Advertised algorithm (e.g. "dilithium3").
    pub alg: String,
    /// Raw public key bytes.
    pub public_key: Vec<u8>,
    /// Signature over the canonical JSON claims.
    pub signature: Vec<u8>,
}

/// Parsed provider certificate envelope.
#[derive(Debug, Clone)]
pub struct ProviderBundle {
    /// Provider claims (from the JWS payload or the envelope).
    pub claims: serde_json::Value,
    /// Compact JWS, when present.
    pub jws_compact: Option<String>,
    /// Concatenated PEM chain, when present.
    pub x509_chain_pem: Option<String>,
    /// Post-quantum bundle, when present.
    pub pq: Option<PqBundle>,
}

/// Requirements the quantum verifier imposes on provider identity.
#[derive(Debug, Clone, Default)]
pub struct QpuPolicy {
    /// Reject bundles without a verifying X.509 chain binding.
    pub require_x509: bool,
    /// Reject bundles without a verified post-quantum signature.
    pub require_pq: bool,
}

/// Verification outcome per mechanism plus the combined decision.
#[derive(Debug, Clone)]
pub struct ProviderEvidence {
    /// Provider claims.
    pub claims: serde_json::Value,
    /// Compact JWS verified against the JWKS cache.
    pub jws_verified: bool,
    /// X.509 chain walked and bound to the JWS key.
    pub x509_verified: bool,
    /// Post-quantum signature verified (no backend in this build).
    pub pq_verified: bool,
    /// The cache key that verified the JWS.
    pub key_ref: Option<QpuKeyRef>,
    /// JWS key id.
    pub kid: Option<String>,
    /// JWS algorithm.
    pub alg: Option<String>,
    /// Per-mechanism notes ("ok", "absent", or the failure reason).
    pub decisions: BTreeMap<String, String>,
    /// Combined decision under the supplied policy.
    pub overall_ok: bool,
}

fn decode_hex_or_b64(s: &str) -> Option<Vec<u8>> {
    let t = s.trim();
    let stripped = t.strip_prefix("0x").unwrap_or(t);
    if !stripped.is_empty() && stripped.len() % 2 == 0 {
        if let Ok(raw) = hex::decode(stripped) {
            return Some(raw);
        }
    }
    STANDARD
        .decode(t)
        .ok()
        .or_else(|| URL_SAFE_NO_PAD.decode(t).ok())
}

fn b64url_json(segment: &str) -> Result<serde_json::Value> {
    let raw = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| ProofError::attestation(format!("bad base64url in JWS segment: {e}")))?;
    serde_json::from_slice(&raw)
        .map_err(|e| ProofError::attestation(format!("bad JSON in JWS segment: {e}")))
}

/// Parse raw provider certificate bytes (compact JWS or hybrid envelope).
pub fn parse_bundle(data: &[u8]) -> Result<ProviderBundle> {
    let text = std::str::from_utf8(data)
        .map_err(|_| ProofError::attestation("provider certificate must be UTF-8"))?;
    let trimmed = text.trim();

    // Compact JWS: three dot-separated base64url segments.
    if trimmed.matches('.').count() == 2 && !trimmed.starts_with('{') {
        let payload_b64 = trimmed.split('.').nth(1).unwrap_or_default();
        let claims = b64url_json(payload_b64)?;
        return Ok(ProviderBundle {
            claims,
            jws_compact: Some(trimmed.to_string()),
            x509_chain_pem: None,
            pq: None,
        });
    }

    let obj: serde_json::Value = serde_json::from_str(trimmed)
        .map_err(|e| ProofError::attestation(format!("unrecognized provider cert format: {e}")))?;
    let claims = obj
        .get("claims")
        .cloned()
        .filter(serde_json::Value::is_object)
        .ok_or_else(|| ProofError::attestation("hybrid envelope missing object 'claims'"))?;

    let jws_compact = obj
        .get("jws")
        .and_then(|v| v.as_str())
        .filter(|s| s.matches('.').count() == 2)
        .map(str::to_string);

    let x509_chain_pem = obj
        .get("x509_chain_pem")
        .and_then(|v| v.as_str())
        .filter(|s| s.contains("BEGIN CERTIFICATE"))
        .map(str::to_string);

    let pq = obj.get("pq").and_then(|p| {
        let alg = p.get("alg")?.as_str()?.to_lowercase();
        let public_key = decode_hex_or_b64(p.get("pub")?.as_str()?)?;
        let signature = decode_hex_or_b64(p.get("sig")?.as_str()?)?;
        Some(PqBundle {
            alg,
            public_key,
            signature,
        })
    });

    Ok(ProviderBundle {
        claims,
        jws_compact,
        x509_chain_pem,
        pq,
    })
}

/// Verify a compact JWS against the JWKS cache.
///
/// Returns `(verified, key_ref, kid, alg, note)`. nbf/exp claims are checked
/// against `now_unix` with ±60 s skew; `None` skips time checks.
fn verify_jws(
    compact: &str,
    cache: &JwksCache,
    now_unix: Option<u64>,
) -> (
    bool,
    Option<QpuKeyRef>,
    Option<String>,
    Option<String>,
    String,
) {
    let header = match jsonwebtoken::decode_header(compact) {
        Ok(h) => h,
        Err(e) => return (false, None, None, None, format!("bad JWS header: {e}")),
    };
    let alg_name = format!("{:?}", header.alg);
    let Some(kid) = header.kid.clone() else {
        return (false, None, None, Some(alg_name), "JWS header missing 'kid'".into());
    };

    let Some(key_ref) = cache.find_key(&kid, Some(alg_name.as_str())) else {
        return (
            false,
            None,
            Some(kid.clone()),
            Some(alg_name),
            format!("kid {kid} not found in JWKS cache"),
        );
    };

    let jwk: jsonwebtoken::jwk::Jwk = match serde_json::from_value(key_ref.raw.clone()) {
        Ok(j) => j,
        Err(e) => {
            return (
                false,
                Some(key_ref),
                Some(kid),
                Some(alg_name),
                format!("cached JWK unusable: {e}"),
            )
        }
    };
    let decoding_key = match jsonwebtoken::DecodingKey::from_jwk(&jwk) {
        Ok(k) => k,
        Err(e) => {
            return (
                false,
                Some(key_ref),
                Some(kid),
                Some(alg_name),
                format!("cached JWK unusable: {e}"),
            )
        }
    };

    let mut validation = jsonwebtoken::Validation::new(header.alg);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let payload =
        match jsonwebtoken::decode::<serde_json::Value>(compact, &decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                return (
                    false,
                    Some(key_ref),
                    Some(kid),
                    Some(alg_name),
                    format!("bad JWS signature: {e}"),
                )
            }
        };

    // Deterministic time checks from the caller's clock.
    if let Some(now) = now_unix {
        if let Some(nbf) = payload.get("nbf").and_then(|v| v.as_u64()) {
            if nbf > now + 60 {
                return (
                    false,
                    Some(key_ref),
                    Some(kid),
                    Some(alg_name),
                    "nbf in the future".into(),
                );
            }
        }
        if let Some(exp) = payload.get("exp").and_then(|v| v.as_u64()) {
            if exp + 60 < now {
                return (
                    false,
                    Some(key_ref),
                    Some(kid),
                    Some(alg_name),
                    "exp in the past".into(),
                );
            }
        }
    }

    (true, Some(key_ref), Some(kid), Some(alg_name), "ok".into())
}

/// Compare DER-extracted leaf key material with a cached JWK.
#[cfg(feature = "x509")]
fn leaf_matches_jwk(leaf_der: &[u8], jwk: &super::jwks::Jwk) -> bool {
    use crate::tee::x509util::{spki_key, SpkiKey};

    let b64 = |s: &Option<String>| {
        s.as_deref()
            .and_then(|v| URL_SAFE_NO_PAD.decode(v).ok())
            .unwrap_or_default()
    };
    match spki_key(leaf_der) {
        Some(SpkiKey::Ed25519(raw)) => jwk.kty == "OKP" && raw == b64(&jwk.x),
        Some(SpkiKey::EcP256(sec1)) => {
            // SEC1 uncompressed point: 0x04 || X || Y.
            jwk.kty == "EC"
                && sec1.len() == 65
                && sec1[0] == 0x04
                && sec1[1..33] == b64(&jwk.x)[..]
                && sec1[33..65] == b64(&jwk.y)[..]
        }
        Some(SpkiKey::Rsa(pkcs1)) => {
            use rsa::pkcs1::DecodeRsaPublicKey;
            use rsa::traits::PublicKeyParts;
            let Ok(key) = rsa::RsaPublicKey::from_pkcs1_der(&pkcs1) else {
                return false;
            };
            let strip = |b: Vec<u8>| b.into_iter().skip_while(|x| *x == 0).collect::<Vec<u8>>();
            jwk.kty == "RSA"
                && strip(key.n().to_bytes_be()) == strip(b64(&jwk.n))
                && strip(key.e().to_bytes_be()) == strip(b64(&jwk.e))
        }
        _ => false,
    }
}

/// Walk the provided chain to the pinned QPU root and bind the leaf key to
/// the JWS key. Returns `(verified, note)`.
#[cfg(feature = "x509")]
fn verify_x509_binding(
    chain_pem: &str,
    key_ref: Option<&QpuKeyRef>,
    qpu_root_pem: Option<&[u8]>,
    now_unix: Option<u64>,
) -> (bool, String) {
    use crate::tee::x509util::{chain_walk, leaf_validity, pem_to_der_chain};

    let ders = pem_to_der_chain(chain_pem.as_bytes());
    let Some(leaf) = ders.first() else {
        return (false, "no certificates in PEM chain".into());
    };

    if let (Some(now), Some((nb, na))) = (now_unix, leaf_validity(leaf)) {
        if now < nb {
            return (false, "leaf cert not yet valid".into());
        }
        if now > na {
            return (false, "leaf cert expired".into());
        }
    }

    let root = qpu_root_pem.map(pem_to_der_chain);
    if !chain_walk(
        leaf,
        &ders[1..],
        root.as_ref().and_then(|r| r.first()).map(Vec::as_slice),
    ) {
        return (false, "chain walk failed".into());
    }

    match key_ref {
        Some(kr) => {
            if leaf_matches_jwk(leaf, &kr.jwk) {
                (true, "ok".into())
            } else {
                (false, "leaf public key does not match JWS key".into())
            }
        }
        None => (false, "no JWS key to bind against".into()),
    }
}

#[cfg(not(feature = "x509"))]
fn verify_x509_binding(
    _chain_pem: &str,
    _key_ref: Option<&QpuKeyRef>,
    _qpu_root_pem: Option<&[u8]>,
    _now_unix: Option<u64>,
) -> (bool, String) {
    (false, "x509 capability not compiled in".into())
}

/// Verify a provider certificate bundle under the given policy.
///
/// Structural problems (unparseable bytes) raise
/// `ProofError::Attestation`; verification failures are reported through
/// the evidence flags and `overall_ok`.
pub fn verify_provider(
    data: &[u8],
    cache: &JwksCache,
    qpu_root_pem: Option<&[u8]>,
    policy: &QpuPolicy,
    now_unix: Option<u64>,
) -> Result<ProviderEvidence> {
    let bundle = parse_bundle(data)?;
    let mut decisions = BTreeMap::new();

    let (jws_verified, key_ref, kid, alg, note) = match &bundle.jws_compact {
        Some(compact) => verify_jws(compact, cache, now_unix),
        None => (false, None, None, None, "absent".into()),
    };
    decisions.insert("jws".to_string(), note);

    let x509_verified = match &bundle.x509_chain_pem {
        Some(chain) => {
            let (ok, note) = verify_x509_binding(chain, key_ref.as_ref(), qpu_root_pem, now_unix);
            decisions.insert("x509".to_string(), note);
            ok
        }
        None => {
            decisions.insert("x509".to_string(), "absent".into());
            false
        }
    };

    let pq_verified = match &bundle.pq {
        Some(pq) => {
            decisions.insert(
                "pq".to_string(),
                format!("pq backend unavailable (alg {})", pq.alg),
            );
            false
        }
        None => {
            decisions.insert("pq".to_string(), "absent".into());
            false
        }
    };

    // Overall: the JWS must verify; each optional mechanism must verify
    // when present; policy may require presence outright.
    let x509_gate = match &bundle.x509_chain_pem {
        Some(_) => x509_verified,
        None => !policy.require_x509,
    };
    let pq_gate = match &bundle.pq {
        Some(_) => pq_verified,
        None => !policy.require_pq,
    };
    let overall_ok = jws_verified && x509_gate && pq_gate;
    debug!(jws_verified, x509_verified, pq_verified, overall_ok, "provider verification");

    Ok(ProviderEvidence {
        claims: bundle.claims,
        jws_verified,
        x509_verified,
        pq_verified,
        key_ref,
        kid,
        alg,
        decisions,
        overall_ok,
    })
}
