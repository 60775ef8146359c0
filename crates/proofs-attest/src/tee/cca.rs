//! # Arm CCA Realm Tokens (EAT / COSE_Sign1)
//!
//! Parses a COSE_Sign1 realm token, extracts the x5chain (COSE header
//! label 33, RFC 9360), verifies the signature over the canonical
//! `Sig_structure`, walks the chain to a pinned CCA root, and surfaces the
//! realm claims. Claim keys vary slightly by profile; common spellings are
//! accepted and the full decoded map is preserved in the claims.

use std::collections::BTreeMap;

use ed25519_dalek::Verifier as _;
use proofs_codec::{decode_lenient, encode};
use proofs_types::value::{MapKey, Value};
use proofs_types::{ProofError, Result};
use tracing::debug;

use super::common::{ClaimValue, TcbStatus, TeeEvidence, TeeKind};

/// COSE header label for `alg`.
pub const COSE_HEADER_ALG: i128 = 1;
/// COSE header label for `kid`.
pub const COSE_HEADER_KID: i128 = 4;
/// COSE header label for `x5chain` (RFC 9360).
pub const COSE_HEADER_X5C: i128 = 33;

/// COSE algorithm identifiers handled here.
pub const ALG_ES256: i64 = -7;
/// ECDSA w/ SHA-384.
pub const ALG_ES384: i64 = -35;
/// ECDSA w/ SHA-512.
pub const ALG_ES512: i64 = -36;
/// EdDSA (Ed25519 supported).
pub const ALG_EDDSA: i64 = -8;

/// Parsed COSE_Sign1 structure.
#[derive(Debug, Clone)]
pub struct CoseSign1 {
    /// Raw protected header byte string (needed for Sig_structure).
    pub protected_bstr: Vec<u8>,
    /// Decoded protected header map.
    pub protected: Value,
    /// Decoded unprotected header map.
    pub unprotected: Value,
    /// Payload bytes (CBOR-encoded EAT claims).
    pub payload: Vec<u8>,
    /// Signature bytes (raw r||s for ECDSA, 64 bytes for Ed25519).
    pub signature: Vec<u8>,
    /// Algorithm from the protected header.
    pub alg: i64,
    /// DER certificates from x5chain, leaf first. May be empty.
    pub x5chain_der: Vec<Vec<u8>>,
    /// Key id, if present.
    pub kid: Option<Vec<u8>>,
}

fn get_label<'a>(map: &'a Value, label: i128) -> Option<&'a Value> {
    map.as_map()?.iter().find_map(|(k, v)| match k {
        MapKey::Int(i) if *i == label => Some(v),
        _ => None,
    })
}

/// Parse a COSE_Sign1 token (optionally tag-wrapped).
pub fn parse_cose_sign1(token: &[u8]) -> Result<CoseSign1> {
    let arr = decode_lenient(token)
        .map_err(|e| ProofError::attestation(format!("COSE token is not valid CBOR: {e}")))?;
    let items = arr
        .as_array()
        .ok_or_else(|| ProofError::attestation("not a COSE_Sign1 (expected 4-element array)"))?;
    if items.len() != 4 {
        return Err(ProofError::attestation(
            "not a COSE_Sign1 (expected 4-element array)",
        ));
    }

    let protected_bstr = items[0]
        .as_bytes()
        .ok_or_else(|| ProofError::attestation("COSE protected header must be bstr"))?
        .to_vec();
    let unprotected = items[1].clone();
    if unprotected.as_map().is_none() {
        return Err(ProofError::attestation("COSE unprotected header must be map"));
    }
    let payload = items[2]
        .as_bytes()
        .ok_or_else(|| ProofError::attestation("COSE payload must be bstr"))?
        .to_vec();
    let signature = items[3]
        .as_bytes()
        .ok_or_else(|| ProofError::attestation("COSE signature must be bstr"))?
        .to_vec();

    let protected = if protected_bstr.is_empty() {
        Value::Map(vec![])
    } else {
        decode_lenient(&protected_bstr)
            .map_err(|e| ProofError::attestation(format!("bad COSE protected header: {e}")))?
    };
    if protected.as_map().is_none() {
        return Err(ProofError::attestation(
            "COSE protected header (decoded) must be map",
        ));
    }

    let alg = get_label(&protected, COSE_HEADER_ALG)
        .and_then(Value::as_i128)
        .ok_or_else(|| ProofError::attestation("COSE protected header missing alg"))?
        as i64;
    if ![ALG_ES256, ALG_ES384, ALG_ES512, ALG_EDDSA].contains(&alg) {
        return Err(ProofError::attestation(format!(
            "unsupported COSE alg: {alg}"
        )));
    }

    let kid = get_label(&protected, COSE_HEADER_KID)
        .or_else(|| get_label(&unprotected, COSE_HEADER_KID))
        .and_then(Value::as_bytes)
        .map(<[u8]>::to_vec);

    let mut x5chain_der = Vec::new();
    if let Some(x5c) = get_label(&unprotected, COSE_HEADER_X5C)
        .or_else(|| get_label(&protected, COSE_HEADER_X5C))
    {
        // A single certificate may appear as a bare bstr.
        if let Some(der) = x5c.as_bytes() {
            x5chain_der.push(der.to_vec());
        } else if let Some(items) = x5c.as_array() {
            for c in items {
                let der = c.as_bytes().ok_or_else(|| {
                    ProofError::attestation("x5chain must contain DER certificate byte strings")
                })?;
                x5chain_der.push(der.to_vec());
            }
        } else {
            return Err(ProofError::attestation(
                "x5chain must be a bstr or array of bstr",
            ));
        }
    }

    Ok(CoseSign1 {
        protected_bstr,
        protected,
        unprotected,
        payload,
        signature,
        alg,
        x5chain_der,
        kid,
    })
}

/// Salient realm claims extracted from the EAT payload.
#[derive(Debug, Clone, Default)]
pub struct CcaClaims {
    /// Realm initial measurement.
    pub measurement: Option<Vec<u8>>,
    /// Realm challenge / nonce.
    pub nonce: Option<Vec<u8>>,
    /// Realm public key hash.
    pub pubkey_hash: Option<Vec<u8>>,
    /// Platform (CCA system) hash.
    pub platform_hash: Option<Vec<u8>>,
    /// Realm personalization value.
    pub personalization: Option<Vec<u8>>,
}

fn first_claim(claims: &Value, keys: &[&str]) -> Option<Vec<u8>> {
    for key in keys {
        if let Some(v) = claims.get(key) {
            if let Some(b) = v.as_bytes() {
                return Some(b.to_vec());
            }
            if let Some(s) = v.as_text() {
                return Some(hex::decode(s).unwrap_or_else(|_| s.as_bytes().to_vec()));
            }
        }
    }
    None
}

/// Decode the CBOR payload and pick out the common CCA claim spellings.
pub fn parse_cca_payload(payload: &[u8]) -> Result<(CcaClaims, Value)> {
    let claims = decode_lenient(payload)
        .map_err(|e| ProofError::attestation(format!("bad CCA payload CBOR: {e}")))?;
    if claims.as_map().is_none() {
        return Err(ProofError::attestation(
            "CCA payload (decoded) must be a map of claims",
        ));
    }
    let parsed = CcaClaims {
        measurement: first_claim(
            &claims,
            &["cca-realm-measurement", "cca-realm-hash", "realm_measurement"],
        ),
        nonce: first_claim(&claims, &["cca-realm-challenge", "nonce", "challenge"]),
        pubkey_hash: first_claim(
            &claims,
            &[
                "cca-realm-public-key-hash",
                "realm_pubkey_hash",
                "realm-public-key-hash",
            ],
        ),
        platform_hash: first_claim(&claims, &["cca-platform-hash", "platform_hash"]),
        personalization: first_claim(
            &claims,
            &["cca-realm-personalization-value", "realm_personalization"],
        ),
    };
    Ok((parsed, claims))
}

/// Build the canonical COSE `Sig_structure` for Signature1.
pub fn sig_structure(protected_bstr: &[u8], external_aad: &[u8], payload: &[u8]) -> Vec<u8> {
    let v = Value::Array(vec![
        Value::Text("Signature1".into()),
        Value::Bytes(protected_bstr.to_vec()),
        Value::Bytes(external_aad.to_vec()),
        Value::Bytes(payload.to_vec()),
    ]);
    // Arrays of definite scalars always encode; the expect is unreachable.
    encode(&v).expect("Sig_structure encodes")
}

/// Verify a COSE signature with a raw public key of the right scheme.
///
/// ECDSA signatures arrive as raw r||s per COSE; Ed25519 as 64 bytes.
pub fn verify_with_key(alg: i64, key: &CoseVerifyKey, to_be_signed: &[u8], sig: &[u8]) -> bool {
    match (alg, key) {
        (ALG_EDDSA, CoseVerifyKey::Ed25519(pk)) => {
            let Ok(pk) = ed25519_dalek::VerifyingKey::from_bytes(pk) else {
                return false;
            };
            let Ok(sig) = ed25519_dalek::Signature::from_slice(sig) else {
                return false;
            };
            pk.verify(to_be_signed, &sig).is_ok()
        }
        (ALG_ES256, CoseVerifyKey::P256(sec1)) => {
            use p256::ecdsa::signature::Verifier;
            let Ok(vk) = p256::ecdsa::VerifyingKey::from_sec1_bytes(sec1) else {
                return false;
            };
            let Ok(sig) = p256::ecdsa::Signature::from_slice(sig) else {
                return false;
            };
            vk.verify(to_be_signed, &sig).is_ok()
        }
        (ALG_ES384, CoseVerifyKey::P384(sec1)) => {
            use p384::ecdsa::signature::Verifier;
            let Ok(vk) = p384::ecdsa::VerifyingKey::from_sec1_bytes(sec1) else {
                return false;
            };
            let Ok(sig) = p384::ecdsa::Signature::from_slice(sig) else {
                return false;
            };
            vk.verify(to_be_signed, &sig).is_ok()
        }
        // ES512 (P-521) has no verification backend in this build.
        _ => false,
    }
}

/// Raw public key material for COSE verification.
#[derive(Debug, Clone)]
pub enum CoseVerifyKey {
    /// 32-byte Ed25519 key.
    Ed25519([u8; 32]),
    /// SEC1 point on P-256.
    P256(Vec<u8>),
    /// SEC1 point on P-384.
    P384(Vec<u8>),
}

#[cfg(feature = "x509")]
fn leaf_verify_key(leaf_der: &[u8]) -> Option<CoseVerifyKey> {
    use super::x509util::{spki_key, SpkiKey};
    match spki_key(leaf_der)? {
        SpkiKey::Ed25519(raw) => raw.try_into().ok().map(CoseVerifyKey::Ed25519),
        SpkiKey::EcP256(sec1) => Some(CoseVerifyKey::P256(sec1)),
        SpkiKey::EcP384(sec1) => Some(CoseVerifyKey::P384(sec1)),
        SpkiKey::Rsa(_) => None,
    }
}

/// Verify a CCA realm token into normalized evidence.
///
/// `cca_root_pem` anchors the x5chain when provided; `external_aad` binds
/// additional data into the Sig_structure (normally empty).
pub fn verify_realm_token(
    token: &[u8],
    cca_root_pem: Option<&[u8]>,
    external_aad: &[u8],
) -> Result<TeeEvidence> {
    let cose = parse_cose_sign1(token)?;
    let (claims, raw_claims) = parse_cca_payload(&cose.payload)?;
    let to_be_signed = sig_structure(&cose.protected_bstr, external_aad, &cose.payload);
    debug!(alg = cose.alg, certs = cose.x5chain_der.len(), "parsed CCA token");

    #[cfg(feature = "x509")]
    let (signature_ok, chain_ok) = {
        let signature_ok = cose
            .x5chain_der
            .first()
            .and_then(|leaf| leaf_verify_key(leaf))
            .map(|key| verify_with_key(cose.alg, &key, &to_be_signed, &cose.signature))
            .unwrap_or(false);
        let chain_ok = match (cose.x5chain_der.first(), cca_root_pem) {
            (Some(leaf), Some(root_pem)) => {
                let root = super::x509util::pem_to_der_chain(root_pem);
                super::x509util::chain_walk(
                    leaf,
                    &cose.x5chain_der[1..],
                    root.first().map(Vec::as_slice),
                )
            }
            _ => false,
        };
        (signature_ok, chain_ok)
    };
    #[cfg(not(feature = "x509"))]
    let (signature_ok, chain_ok) = {
        let _ = (&to_be_signed, cca_root_pem);
        (false, false)
    };

    let mut claim_map = BTreeMap::new();
    claim_map.insert("vendor".to_string(), ClaimValue::Text("arm".into()));
    claim_map.insert("product".to_string(), ClaimValue::Text("cca".into()));
    claim_map.insert("debug".to_string(), ClaimValue::Int(0));
    claim_map.insert("alg".to_string(), ClaimValue::Int(cose.alg));
    if let Some(m) = &claims.measurement {
        claim_map.insert(
            "realm_measurement".to_string(),
            ClaimValue::Bytes(m.clone()),
        );
    }
    if let Some(h) = &claims.pubkey_hash {
        claim_map.insert("realm_pubkey_hash".to_string(), ClaimValue::Bytes(h.clone()));
    }
    if let Some(p) = &claims.personalization {
        claim_map.insert("personalization".to_string(), ClaimValue::Bytes(p.clone()));
    }
    if let Some(kid) = &cose.kid {
        claim_map.insert("kid".to_string(), ClaimValue::Bytes(kid.clone()));
    }
    // Keep a digest of the full claim map for audit trails without
    // inflating the evidence.
    if let Ok(bytes) = encode(&raw_claims) {
        claim_map.insert(
            "claims_digest".to_string(),
            ClaimValue::Bytes(proofs_crypto::sha3_256(&bytes).to_vec()),
        );
    }

    Ok(TeeEvidence {
        kind: TeeKind::Cca,
        vendor: "arm",
        report: token.to_vec(),
        measurement: claims.measurement.unwrap_or_default(),
        report_data: claims.nonce.unwrap_or_default(),
        host_data: claims.platform_hash.unwrap_or_default(),
        claims: claim_map,
        signature_ok,
        chain_ok,
        tcb_status: TcbStatus::Unknown,
        not_before: None,
        not_after: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Signer as _;

    /// Build a realm token signed with a raw Ed25519 key (no x5chain).
    fn build_token(sk: &ed25519_dalek::SigningKey, tamper_payload: bool) -> Vec<u8> {
        let protected = Value::map(vec![(MapKey::Int(1), Value::Int(ALG_EDDSA as i128))]);
        let protected_bstr = encode(&protected).unwrap();

        let payload_map = Value::text_map(vec![
            ("cca-realm-measurement", Value::Bytes(vec![0x7E; 32])),
            ("cca-realm-challenge", Value::Bytes(vec![0x0C; 32])),
            ("cca-platform-hash", Value::Bytes(vec![0x9A; 32])),
        ]);
        let mut payload = encode(&payload_map).unwrap();

        let tbs = sig_structure(&protected_bstr, b"", &payload);
        let sig = sk.sign(&tbs);
        if tamper_payload {
            let len = payload.len();
            payload[len - 1] ^= 0x01;
        }

        let token = Value::Array(vec![
            Value::Bytes(protected_bstr),
            Value::Map(vec![]),
            Value::Bytes(payload),
            Value::Bytes(sig.to_bytes().to_vec()),
        ]);
        encode(&token).unwrap()
    }

    fn test_key() -> ed25519_dalek::SigningKey {
        ed25519_dalek::SigningKey::from_bytes(&[0x51; 32])
    }

    #[test]
    fn test_parse_and_extract_claims() {
        let token = build_token(&test_key(), false);
        let ev = verify_realm_token(&token, None, b"").unwrap();
        assert_eq!(ev.kind, TeeKind::Cca);
        assert_eq!(ev.measurement, vec![0x7E; 32]);
        assert_eq!(ev.report_data, vec![0x0C; 32]);
        assert_eq!(ev.host_data, vec![0x9A; 32]);
        // No x5chain: the signature cannot be attributed to a key.
        assert!(!ev.signature_ok && !ev.chain_ok);
    }

    #[test]
    fn test_direct_signature_verification() {
        let sk = test_key();
        let token = build_token(&sk, false);
        let cose = parse_cose_sign1(&token).unwrap();
        let tbs = sig_structure(&cose.protected_bstr, b"", &cose.payload);
        let key = CoseVerifyKey::Ed25519(sk.verifying_key().to_bytes());
        assert!(verify_with_key(cose.alg, &key, &tbs, &cose.signature));
    }

    #[test]
    fn test_tampered_payload_fails_signature() {
        let sk = test_key();
        let token = build_token(&sk, true);
        let cose = parse_cose_sign1(&token).unwrap();
        let tbs = sig_structure(&cose.protected_bstr, b"", &cose.payload);
        let key = CoseVerifyKey::Ed25519(sk.verifying_key().to_bytes());
        assert!(!verify_with_key(cose.alg, &key, &tbs, &cose.signature));
    }

    #[test]
    fn test_rejects_wrong_shapes() {
        assert!(parse_cose_sign1(&[0x01]).is_err());
        // 3-element array.
        let bad = encode(&Value::Array(vec![
            Value::Bytes(vec![]),
            Value::Map(vec![]),
            Value::Bytes(vec![]),
        ]))
        .unwrap();
        assert!(parse_cose_sign1(&bad).is_err());
    }

    #[test]
    fn test_unknown_alg_rejected() {
        let protected = Value::map(vec![(MapKey::Int(1), Value::Int(-999))]);
        let token = Value::Array(vec![
            Value::Bytes(encode(&protected).unwrap()),
            Value::Map(vec![]),
            Value::Bytes(vec![0xa0]),
            Value::Bytes(vec![0u8; 64]),
        ]);
        assert!(parse_cose_sign1(&encode(&token).unwrap()).is_err());
    }
}
