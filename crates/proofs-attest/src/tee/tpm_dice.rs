//! # TPM 2.0 Event Logs, Quotes, and DICE Chains
//!
//! A lightweight validator that avoids platform TPM stacks:
//!
//! 1. Canonical JSON event logs are replayed into PCR values
//!    (`PCR[n] <- H(PCR[n] || digest)`, SHA-1 or SHA-256).
//! 2. An optional TPM Quote (TPMS_ATTEST + signature + AK public key) is
//!    checked: the PCR composite must match the quoted digest and the AK
//!    signature must verify (RSA-PSS, RSASSA-PKCS1v1_5, or ECDSA P-256/384).
//! 3. An optional DICE certificate chain gets a basic issuer→subject walk.
//!
//! Structural problems raise `ProofError::Attestation`; failed or
//! unavailable crypto only clears the corresponding evidence flag.

use std::collections::BTreeMap;

use proofs_types::{ProofError, Result};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::common::{ClaimValue, TcbStatus, TeeEvidence, TeeKind};

/// TPM_GENERATED magic at the head of TPMS_ATTEST.
pub const TPM_GENERATED: u32 = 0xFF54_4347;
/// TPM_ST_ATTEST_QUOTE structure tag.
pub const TPM_ST_ATTEST_QUOTE: u16 = 0x8018;

/// One parsed event-log entry digest relevant to replay.
#[derive(Debug, Clone)]
pub struct LogEvent {
    /// PCR index the event extends.
    pub pcr_index: u32,
    /// (hash algorithm, digest) pairs recorded for the event.
    pub digests: Vec<(String, Vec<u8>)>,
}

/// Parse a canonical JSON event log (go-tpm-tools shape).
pub fn parse_eventlog_json(buf: &[u8]) -> Result<Vec<LogEvent>> {
    let doc: serde_json::Value = serde_json::from_slice(buf)
        .map_err(|e| ProofError::attestation(format!("failed to parse event log JSON: {e}")))?;
    let entries = doc
        .as_array()
        .ok_or_else(|| ProofError::attestation("event log JSON must be a list of events"))?;

    let mut events = Vec::with_capacity(entries.len());
    for entry in entries {
        let obj = entry
            .as_object()
            .ok_or_else(|| ProofError::attestation("event log entries must be objects"))?;
        let pcr_index = obj
            .get("pcrIndex")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| ProofError::attestation("event missing required key pcrIndex"))?
            as u32;
        let digests_raw = obj
            .get("digests")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ProofError::attestation("event missing required key digests"))?;
        let mut digests = Vec::new();
        for d in digests_raw {
            let alg = d.get("hashAlg").and_then(|v| v.as_str()).unwrap_or("");
            let hex_digest = d.get("digest").and_then(|v| v.as_str()).unwrap_or("");
            if let Ok(raw) = hex::decode(hex_digest) {
                digests.push((alg.to_ascii_lowercase(), raw));
            }
        }
        events.push(LogEvent { pcr_index, digests });
    }
    Ok(events)
}

fn digest_width(alg: &str) -> Result<usize> {
    match alg {
        "sha1" => Ok(20),
        "sha256" => Ok(32),
        other => Err(ProofError::attestation(format!(
            "unsupported PCR hash algorithm: {other}"
        ))),
    }
}

fn extend(alg: &str, pcr: &[u8], digest: &[u8]) -> Vec<u8> {
    match alg {
        "sha1" => {
            let mut h = Sha1::new();
            h.update(pcr);
            h.update(digest);
            h.finalize().to_vec()
        }
        _ => {
            let mut h = Sha256::new();
            h.update(pcr);
            h.update(digest);
            h.finalize().to_vec()
        }
    }
}

/// Replay PCR extends for the selected registers with the chosen algorithm.
pub fn replay_pcrs(
    events: &[LogEvent],
    pcr_selection: &[u32],
    alg: &str,
) -> Result<BTreeMap<u32, Vec<u8>>> {
    let width = digest_width(alg)?;
    let mut pcrs: BTreeMap<u32, Vec<u8>> =
        pcr_selection.iter().map(|i| (*i, vec![0u8; width])).collect();
    for event in events {
        let Some(current) = pcrs.get(&event.pcr_index) else {
            continue;
        };
        let Some((_, digest)) = event
            .digests
            .iter()
            .find(|(a, d)| a == alg && d.len() == width)
        else {
            continue;
        };
        let next = extend(alg, current, digest);
        pcrs.insert(event.pcr_index, next);
    }
    Ok(pcrs)
}

/// Composite digest over the selected PCR values in ascending index order.
pub fn pcr_composite(pcrs: &BTreeMap<u32, Vec<u8>>) -> Vec<u8> {
    let mut h = Sha256::new();
    for value in pcrs.values() {
        h.update(value);
    }
    h.finalize().to_vec()
}

/// Best-effort view of a TPMS_ATTEST quote structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmsAttestInfo {
    /// extraData field (the caller's nonce).
    pub nonce: Vec<u8>,
    /// Quoted PCR digest.
    pub pcr_digest: Vec<u8>,
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let out = self.buf.get(self.pos..self.pos + n)?;
        self.pos += n;
        Some(out)
    }
    fn u16(&mut self) -> Option<u16> {
        Some(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }
    fn u32(&mut self) -> Option<u32> {
        Some(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }
    fn sized16(&mut self) -> Option<&'a [u8]> {
        let len = self.u16()? as usize;
        self.take(len)
    }
}

/// Parse the nonce and PCR digest out of a TPMS_ATTEST blob.
///
/// Returns `None` rather than erroring: quote formats vary by stack and an
/// unparseable quote simply leaves `signature_ok` unset.
pub fn parse_tpms_attest(attest: &[u8]) -> Option<TpmsAttestInfo> {
    let mut r = Reader {
        buf: attest,
        pos: 0,
    };
    if r.u32()? != TPM_GENERATED {
        return None;
    }
    if r.u16()? != TPM_ST_ATTEST_QUOTE {
        return None;
    }
    let _qualified_signer = r.sized16()?;
    let nonce = r.sized16()?.to_vec();
    let _clock_info = r.take(17)?;
    let _firmware_version = r.take(8)?;
    // TPML_PCR_SELECTION
    let count = r.u32()?;
    if count > 8 {
        return None;
    }
    for _ in 0..count {
        let _hash_alg = r.u16()?;
        let size_of_select = *r.take(1)?.first()?;
        r.take(size_of_select as usize)?;
    }
    let pcr_digest = r.sized16()?.to_vec();
    Some(TpmsAttestInfo { nonce, pcr_digest })
}

/// Verify an AK signature over the TPMS_ATTEST bytes.
///
/// The AK public key arrives as a SubjectPublicKeyInfo PEM. Every common AK
/// scheme is tried: RSASSA-PKCS1v1_5/SHA-256, RSA-PSS/SHA-256, and ECDSA
/// P-256/P-384 (DER or raw signatures).
pub fn verify_ak_signature(attest: &[u8], signature: &[u8], ak_pub_pem: &str) -> bool {
    use rsa::pkcs8::DecodePublicKey;
    use rsa::signature::Verifier;

    if let Ok(rsa_pub) = rsa::RsaPublicKey::from_public_key_pem(ak_pub_pem) {
        let pkcs1 = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(rsa_pub.clone());
        if let Ok(sig) = rsa::pkcs1v15::Signature::try_from(signature) {
            if pkcs1.verify(attest, &sig).is_ok() {
                return true;
            }
        }
        let pss = rsa::pss::VerifyingKey::<Sha256>::new(rsa_pub);
        if let Ok(sig) = rsa::pss::Signature::try_from(signature) {
            if pss.verify(attest, &sig).is_ok() {
                return true;
            }
        }
        return false;
    }

    if let Ok(vk) = <p256::ecdsa::VerifyingKey as p256::pkcs8::DecodePublicKey>::from_public_key_pem(
        ak_pub_pem,
    ) {
        use p256::ecdsa::signature::Verifier;
        if let Ok(sig) = p256::ecdsa::Signature::from_der(signature) {
            if vk.verify(attest, &sig).is_ok() {
                return true;
            }
        }
        if let Ok(sig) = p256::ecdsa::Signature::from_slice(signature) {
            return vk.verify(attest, &sig).is_ok();
        }
        return false;
    }

    if let Ok(vk) = <p384::ecdsa::VerifyingKey as p384::pkcs8::DecodePublicKey>::from_public_key_pem(
        ak_pub_pem,
    ) {
        use p384::ecdsa::signature::Verifier;
        if let Ok(sig) = p384::ecdsa::Signature::from_der(signature) {
            if vk.verify(attest, &sig).is_ok() {
                return true;
            }
        }
        if let Ok(sig) = p384::ecdsa::Signature::from_slice(signature) {
            return vk.verify(attest, &sig).is_ok();
        }
    }
    false
}

/// Optional quote material accompanying an event log.
#[derive(Debug, Clone, Default)]
pub struct QuoteInput<'a> {
    /// Raw TPMS_ATTEST bytes.
    pub attest: Option<&'a [u8]>,
    /// Signature over the attest blob.
    pub signature: Option<&'a [u8]>,
    /// AK public key (SubjectPublicKeyInfo PEM).
    pub ak_pub_pem: Option<&'a str>,
}

/// Validate an event log (+ optional quote, + optional DICE chain) into
/// normalized evidence.
pub fn verify_tpm_evidence(
    eventlog_json: &[u8],
    pcr_selection: &[u32],
    pcr_alg: &str,
    quote: QuoteInput<'_>,
    dice_chain_der: &[Vec<u8>],
    dice_root_pem: Option<&[u8]>,
) -> Result<TeeEvidence> {
    let events = parse_eventlog_json(eventlog_json)?;
    let pcrs = replay_pcrs(&events, pcr_selection, pcr_alg)?;
    let composite = pcr_composite(&pcrs);
    debug!(
        events = events.len(),
        pcrs = pcrs.len(),
        "replayed TPM event log"
    );

    let attest_info = quote.attest.and_then(parse_tpms_attest);

    // The quote binds the composite: a parsed quote whose digest does not
    // match the replayed PCRs is a structural failure, not a soft flag.
    if let Some(info) = &attest_info {
        if info.pcr_digest != composite {
            return Err(ProofError::attestation(
                "quote PCR digest does not match replayed event log",
            )
            .with_context("quoted", hex::encode(&info.pcr_digest))
            .with_context("replayed", hex::encode(&composite)));
        }
    }

    let signature_ok = match (quote.attest, quote.signature, quote.ak_pub_pem) {
        (Some(attest), Some(sig), Some(pem)) => verify_ak_signature(attest, sig, pem),
        _ => false,
    };

    #[cfg(feature = "x509")]
    let chain_ok = match dice_chain_der.first() {
        Some(leaf) => {
            let root = dice_root_pem.map(super::x509util::pem_to_der_chain);
            super::x509util::chain_walk(
                leaf,
                &dice_chain_der[1..],
                root.as_ref().and_then(|r| r.first()).map(Vec::as_slice),
            )
        }
        // No DICE chain supplied: nothing to distrust.
        None => true,
    };
    #[cfg(not(feature = "x509"))]
    let chain_ok = {
        let _ = (dice_chain_der, dice_root_pem);
        false
    };

    let measurement = attest_info
        .as_ref()
        .map(|i| i.pcr_digest.clone())
        .unwrap_or_else(|| composite.clone());
    let nonce = attest_info.map(|i| i.nonce).unwrap_or_default();

    let mut claims = BTreeMap::new();
    claims.insert("vendor".to_string(), ClaimValue::Text("tpm".into()));
    claims.insert("product".to_string(), ClaimValue::Text("tpm2".into()));
    claims.insert("debug".to_string(), ClaimValue::Int(0));
    claims.insert(
        "pcr_alg".to_string(),
        ClaimValue::Text(pcr_alg.to_string()),
    );
    claims.insert(
        "pcr_selection".to_string(),
        ClaimValue::Text(
            pcr_selection
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
    );
    for (idx, value) in &pcrs {
        claims.insert(format!("pcr{idx}"), ClaimValue::Bytes(value.clone()));
    }

    Ok(TeeEvidence {
        kind: TeeKind::Tpm,
        vendor: "tpm",
        report: quote.attest.map(<[u8]>::to_vec).unwrap_or_default(),
        measurement,
        report_data: nonce,
        host_data: Sha256::digest(eventlog_json).to_vec(),
        claims,
        signature_ok,
        chain_ok,
        tcb_status: TcbStatus::Unknown,
        not_before: None,
        not_after: None,
    })
}
