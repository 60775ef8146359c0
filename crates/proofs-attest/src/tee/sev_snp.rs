//! # AMD SEV-SNP Attestation Reports
//!
//! Fixed-layout parsing of the ATTESTATION_REPORT structure (firmware ABI
//! rev 1.58, Table 23; signature covers bytes 0x000..0x2A0) plus ECDSA
//! P-384/SHA-384 signature verification against a provided VCEK/VLEK leaf
//! and a simple issuer→subject walk up to the pinned ARK root.

use std::collections::BTreeMap;

use p384::ecdsa::signature::Verifier;
use p384::ecdsa::{Signature, VerifyingKey};
use proofs_types::{ProofError, Result};
use tracing::debug;

use super::common::{ClaimValue, TcbStatus, TeeEvidence, TeeKind};

/// Bytes covered by the report signature.
pub const SIGNED_REGION: usize = 0x2A0;

// Field offsets (Table 23).
const OFF_VERSION: usize = 0x00;
const OFF_GUEST_SVN: usize = 0x04;
const OFF_POLICY: usize = 0x08;
const OFF_FAMILY_ID: usize = 0x10;
const OFF_IMAGE_ID: usize = 0x20;
const OFF_VMPL: usize = 0x30;
const OFF_SIGNATURE_ALG: usize = 0x34;
const OFF_CURRENT_TCB: usize = 0x38;
const OFF_PLATFORM_INFO: usize = 0x40;
const OFF_SIGNING_KEY: usize = 0x48;
const OFF_REPORT_DATA: usize = 0x50;
const OFF_MEASUREMENT: usize = 0x90;
const OFF_HOST_DATA: usize = 0xC0;
const OFF_ID_KEY_DIGEST: usize = 0xE0;
const OFF_AUTHOR_DIGEST: usize = 0x110;
const OFF_REPORT_ID: usize = 0x140;
const OFF_REPORTED_TCB: usize = 0x180;
const OFF_CHIP_ID: usize = 0x1A0;
const OFF_COMMITTED_TCB: usize = 0x1E0;

/// SIGNING_KEY selection values (bits 2:0 at 0x48).
pub const SIGNING_KEY_VCEK: u8 = 0;
/// VLEK selection.
pub const SIGNING_KEY_VLEK: u8 = 1;

// PLATFORM_INFO bits (Table 24).
const PLAT_SMT_EN: u64 = 1 << 0;
const PLAT_TSME_EN: u64 = 1 << 1;
const PLAT_ECC_EN: u64 = 1 << 2;

fn u32_le(b: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(b[off..off + 4].try_into().unwrap())
}

fn u64_le(b: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(b[off..off + 8].try_into().unwrap())
}

/// Parsed ATTESTATION_REPORT fields the chain consumes.
#[derive(Debug, Clone)]
pub struct SnpReport {
    /// Report format version.
    pub version: u32,
    /// Guest security version number.
    pub guest_svn: u32,
    /// Guest launch policy bits.
    pub policy: u64,
    /// Family id (16 bytes).
    pub family_id: Vec<u8>,
    /// Image id (16 bytes).
    pub image_id: Vec<u8>,
    /// VM permission level.
    pub vmpl: u32,
    /// Signature algorithm selector.
    pub signature_algo: u32,
    /// Current platform TCB version.
    pub current_tcb: u64,
    /// Reported TCB version.
    pub reported_tcb: u64,
    /// Committed TCB version.
    pub committed_tcb: u64,
    /// Raw PLATFORM_INFO word.
    pub platform_info: u64,
    /// Signing key selection (bits 2:0 at 0x48).
    pub signing_key_sel: u8,
    /// Guest-supplied report data (64 bytes).
    pub report_data: Vec<u8>,
    /// Launch measurement (48 bytes, SHA-384).
    pub measurement: Vec<u8>,
    /// Host-supplied data (32 bytes).
    pub host_data: Vec<u8>,
    /// Identity key digest.
    pub id_key_digest: Vec<u8>,
    /// Author key digest.
    pub author_key_digest: Vec<u8>,
    /// Report id.
    pub report_id: Vec<u8>,
    /// Chip id (64 bytes).
    pub chip_id: Vec<u8>,
    /// Signature bytes (DER or raw r||s), everything after 0x2A0.
    pub signature: Vec<u8>,
}

/// Decode the PLATFORM_INFO feature bits the chain reports.
pub fn decode_platform_info(pi: u64) -> BTreeMap<&'static str, bool> {
    BTreeMap::from([
        ("smt_en", pi & PLAT_SMT_EN != 0),
        ("tsme_en", pi & PLAT_TSME_EN != 0),
        ("ecc_en", pi & PLAT_ECC_EN != 0),
    ])
}

/// Parse an ATTESTATION_REPORT buffer. Fails on short input.
pub fn parse_report(report: &[u8]) -> Result<SnpReport> {
    if report.len() < SIGNED_REGION {
        return Err(ProofError::attestation(format!(
            "SEV-SNP report too short: {} < {SIGNED_REGION}",
            report.len()
        )));
    }
    Ok(SnpReport {
        version: u32_le(report, OFF_VERSION),
        guest_svn: u32_le(report, OFF_GUEST_SVN),
        policy: u64_le(report, OFF_POLICY),
        family_id: report[OFF_FAMILY_ID..OFF_FAMILY_ID + 16].to_vec(),
        image_id: report[OFF_IMAGE_ID..OFF_IMAGE_ID + 16].to_vec(),
        vmpl: u32_le(report, OFF_VMPL),
        signature_algo: u32_le(report, OFF_SIGNATURE_ALG),
        current_tcb: u64_le(report, OFF_CURRENT_TCB),
        reported_tcb: u64_le(report, OFF_REPORTED_TCB),
        committed_tcb: u64_le(report, OFF_COMMITTED_TCB),
        platform_info: u64_le(report, OFF_PLATFORM_INFO),
        signing_key_sel: (u32_le(report, OFF_SIGNING_KEY) & 0b111) as u8,
        report_data: report[OFF_REPORT_DATA..OFF_REPORT_DATA + 64].to_vec(),
        measurement: report[OFF_MEASUREMENT..OFF_MEASUREMENT + 48].to_vec(),
        host_data: report[OFF_HOST_DATA..OFF_HOST_DATA + 32].to_vec(),
        id_key_digest: report[OFF_ID_KEY_DIGEST..OFF_ID_KEY_DIGEST + 48].to_vec(),
        author_key_digest: report[OFF_AUTHOR_DIGEST..OFF_AUTHOR_DIGEST + 48].to_vec(),
        report_id: report[OFF_REPORT_ID..OFF_REPORT_ID + 32].to_vec(),
        chip_id: report[OFF_CHIP_ID..OFF_CHIP_ID + 64].to_vec(),
        signature: report[SIGNED_REGION..].to_vec(),
    })
}

/// Verify the report signature (ECDSA P-384 / SHA-384) with a VCEK/VLEK
/// public key in SEC1 form. Accepts DER or raw 96-byte r||s signatures.
pub fn verify_signature_with_key(report: &[u8], sec1_key: &[u8]) -> bool {
    if report.len() < SIGNED_REGION {
        return false;
    }
    let Ok(vk) = VerifyingKey::from_sec1_bytes(sec1_key) else {
        return false;
    };
    let msg = &report[..SIGNED_REGION];
    let sig_bytes = &report[SIGNED_REGION..];

    if let Ok(sig) = Signature::from_der(sig_bytes) {
        if vk.verify(msg, &sig).is_ok() {
            return true;
        }
    }
    if sig_bytes.len() == 96 {
        if let Ok(sig) = Signature::from_slice(sig_bytes) {
            return vk.verify(msg, &sig).is_ok();
        }
    }
    false
}

/// Verify the report signature against a VCEK/VLEK leaf certificate (PEM).
#[cfg(feature = "x509")]
pub fn verify_report_signature(report: &[u8], leaf_cert_pem: &[u8]) -> Result<bool> {
    use super::x509util::{pem_to_der_chain, spki_key, SpkiKey};
    let ders = pem_to_der_chain(leaf_cert_pem);
    let leaf = ders
        .first()
        .ok_or_else(|| ProofError::attestation("no certificate in VCEK/VLEK PEM"))?;
    match spki_key(leaf) {
        Some(SpkiKey::EcP384(sec1)) => Ok(verify_signature_with_key(report, &sec1)),
        Some(_) => Err(ProofError::attestation(
            "SEV-SNP VCEK/VLEK must be an ECDSA P-384 public key",
        )),
        None => Err(ProofError::attestation(
            "failed to extract public key from leaf certificate",
        )),
    }
}

/// Without the `x509` capability certificates cannot be loaded.
#[cfg(not(feature = "x509"))]
pub fn verify_report_signature(_report: &[u8], _leaf_cert_pem: &[u8]) -> Result<bool> {
    Ok(false)
}

/// Parse and (optionally) verify a SEV-SNP report into normalized evidence.
///
/// `vcek_or_vlek_pem` is the signing leaf; `chain_pem` holds ASK
/// intermediates; `root_pem` the pinned ARK. Missing material degrades the
/// corresponding flag instead of failing the parse.
pub fn verify_attestation(
    report: &[u8],
    vcek_or_vlek_pem: Option<&[u8]>,
    chain_pem: Option<&[u8]>,
    root_pem: Option<&[u8]>,
) -> Result<TeeEvidence> {
    let parsed = parse_report(report)?;
    debug!(
        version = parsed.version,
        signing_key = parsed.signing_key_sel,
        "parsed SEV-SNP report"
    );

    let signature_ok = match vcek_or_vlek_pem {
        Some(pem) if report.len() >= SIGNED_REGION + 80 => {
            verify_report_signature(report, pem).unwrap_or(false)
        }
        _ => false,
    };

    #[cfg(feature = "x509")]
    let chain_ok = match (vcek_or_vlek_pem, chain_pem.is_some() || root_pem.is_some()) {
        (Some(leaf_pem), true) => {
            use super::x509util::{chain_walk, pem_to_der_chain};
            let leaf = pem_to_der_chain(leaf_pem);
            let inters = chain_pem.map(pem_to_der_chain).unwrap_or_default();
            let root = root_pem.map(pem_to_der_chain).unwrap_or_default();
            match (leaf.first(), root.first()) {
                (Some(l), r) => chain_walk(l, &inters, r.map(Vec::as_slice)),
                _ => false,
            }
        }
        _ => false,
    };
    #[cfg(not(feature = "x509"))]
    let chain_ok = {
        let _ = (chain_pem, root_pem);
        false
    };

    let signing_key = match parsed.signing_key_sel {
        SIGNING_KEY_VCEK => "vcek",
        SIGNING_KEY_VLEK => "vlek",
        _ => "unknown",
    };

    // Reported TCB running ahead of the platform's current TCB is the one
    // inconsistency detectable without the vendor TCB service.
    let tcb_status = if parsed.reported_tcb > parsed.current_tcb {
        TcbStatus::OutOfDate
    } else {
        TcbStatus::UpToDate
    };

    let mut claims = BTreeMap::new();
    claims.insert("vendor".to_string(), ClaimValue::Text("amd".into()));
    claims.insert("product".to_string(), ClaimValue::Text("sev_snp".into()));
    claims.insert(
        "report_version".to_string(),
        ClaimValue::Int(parsed.version as i64),
    );
    claims.insert(
        "measurement".to_string(),
        ClaimValue::Bytes(parsed.measurement.clone()),
    );
    claims.insert(
        "family_id".to_string(),
        ClaimValue::Bytes(parsed.family_id.clone()),
    );
    claims.insert(
        "image_id".to_string(),
        ClaimValue::Bytes(parsed.image_id.clone()),
    );
    claims.insert(
        "tcb_svn".to_string(),
        ClaimValue::Int(parsed.reported_tcb as i64),
    );
    claims.insert(
        "guest_svn".to_string(),
        ClaimValue::Int(parsed.guest_svn as i64),
    );
    claims.insert("vmpl".to_string(), ClaimValue::Int(parsed.vmpl as i64));
    claims.insert(
        "signing_key".to_string(),
        ClaimValue::Text(signing_key.into()),
    );
    // Debug policy bit 19 of the guest policy allows debugging of the guest.
    claims.insert(
        "debug".to_string(),
        ClaimValue::Int(if parsed.policy & (1 << 19) != 0 { 1 } else { 0 }),
    );
    for (name, set) in decode_platform_info(parsed.platform_info) {
        claims.insert(format!("platform_{name}"), ClaimValue::Bool(set));
    }

    Ok(TeeEvidence {
        kind: TeeKind::SevSnp,
        vendor: "amd",
        report: report.to_vec(),
        measurement: parsed.measurement,
        report_data: parsed.report_data,
        host_data: parsed.host_data,
        claims,
        signature_ok,
        chain_ok,
        tcb_status,
        not_before: None,
        not_after: None,
    })
}
