//! Minimal X.509 helpers shared by the attestation parsers.
//!
//! Pinned-root chain walks only: parse certificates, check leaf validity
//! windows, verify issuer→subject signatures up to a provided root. This is
//! deliberately not a full PKI path validator (no CRLs, no OCSP, no name
//! constraints).

use x509_parser::oid_registry::{
    OID_EC_P256, OID_KEY_TYPE_EC_PUBLIC_KEY, OID_PKCS1_RSAENCRYPTION, OID_SIG_ED25519,
};
use x509_parser::pem::Pem;
use x509_parser::prelude::*;

/// NIST P-384 named-curve OID (1.3.132.0.34).
const OID_SECP384R1: &str = "1.3.132.0.34";

/// Split a PEM bundle into DER certificate blobs, in order.
pub fn pem_to_der_chain(pem_bundle: &[u8]) -> Vec<Vec<u8>> {
    Pem::iter_from_buffer(pem_bundle)
        .filter_map(|p| p.ok())
        .filter(|p| p.label == "CERTIFICATE")
        .map(|p| p.contents)
        .collect()
}

/// Leaf validity window as unix seconds, if the DER parses.
pub fn leaf_validity(der: &[u8]) -> Option<(u64, u64)> {
    let (_, cert) = X509Certificate::from_der(der).ok()?;
    let nb = cert.validity().not_before.timestamp();
    let na = cert.validity().not_after.timestamp();
    Some((nb.max(0) as u64, na.max(0) as u64))
}

/// Public key material extracted from a certificate SPKI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpkiKey {
    /// SEC1 uncompressed point on P-256.
    EcP256(Vec<u8>),
    /// SEC1 uncompressed point on P-384.
    EcP384(Vec<u8>),
    /// Raw 32-byte Ed25519 key.
    Ed25519(Vec<u8>),
    /// PKCS#1 RSAPublicKey DER.
    Rsa(Vec<u8>),
}

/// Extract the SPKI key from a DER certificate.
pub fn spki_key(der: &[u8]) -> Option<SpkiKey> {
    let (_, cert) = X509Certificate::from_der(der).ok()?;
    spki_key_of(cert.public_key())
}

/// Extract the key material from a parsed SPKI.
pub fn spki_key_of(spki: &SubjectPublicKeyInfo<'_>) -> Option<SpkiKey> {
    let alg = &spki.algorithm.algorithm;
    let bits = spki.subject_public_key.data.to_vec();
    if *alg == OID_KEY_TYPE_EC_PUBLIC_KEY {
        let params = spki.algorithm.parameters.as_ref()?;
        let curve = params.as_oid().ok()?;
        if curve == OID_EC_P256 {
            return Some(SpkiKey::EcP256(bits));
        }
        if curve.to_id_string() == OID_SECP384R1 {
            return Some(SpkiKey::EcP384(bits));
        }
        return None;
    }
    if *alg == OID_SIG_ED25519 {
        return Some(SpkiKey::Ed25519(bits));
    }
    if *alg == OID_PKCS1_RSAENCRYPTION {
        return Some(SpkiKey::Rsa(bits));
    }
    None
}

/// Issuer→subject signature walk from a leaf up to an optional pinned root.
///
/// Intermediates may arrive in any order; subjects index them. With a root
/// supplied, the walk must terminate at a self-signed certificate whose DER
/// equals the root's. Without one, a dangling issuer passes leniently
/// (the caller's policy decides whether that is acceptable).
pub fn chain_walk<'a>(
    leaf_der: &'a [u8],
    intermediates: &'a [Vec<u8>],
    root_der: Option<&'a [u8]>,
) -> bool {
    let Ok((_, leaf)) = X509Certificate::from_der(leaf_der) else {
        return false;
    };

    let mut pool: Vec<(X509Certificate<'a>, &'a [u8])> = Vec::new();
    for der in intermediates {
        if let Ok((_, c)) = X509Certificate::from_der(der) {
            pool.push((c, der));
        }
    }
    let root = root_der.and_then(|d| X509Certificate::from_der(d).ok().map(|(_, c)| (c, d)));
    if let Some((c, d)) = root {
        pool.push((c, d));
    }

    let mut current = leaf;
    let mut current_der: &[u8] = leaf_der;
    for _depth in 0..8 {
        if current.issuer() == current.subject() {
            // Self-signed terminus; anchor to the pinned root when present.
            if let Some(rd) = root_der {
                if current_der != rd {
                    return false;
                }
            }
            return current.verify_signature(None).is_ok();
        }
        let parent = pool
            .iter()
            .find(|(c, _)| c.subject() == current.issuer());
        match parent {
            Some((p, pder)) => {
                if current.verify_signature(Some(p.public_key())).is_err() {
                    return false;
                }
                current_der = pder;
                current = p.clone();
            }
            // Dangling issuer: lenient pass only when no root is pinned.
            None => return root_der.is_none(),
        }
    }
    false
}
