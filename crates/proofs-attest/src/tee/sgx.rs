//! # Intel SGX / TDX Quote Parsing
//!
//! Fixed-offset parsing of ECDSA quote v3 structures plus best-effort PCK
//! bundle checks. Full DCAP verification (quote signature against the PCK
//! leaf, CRLs, TCB info service) is outside the chain's scope; evidence
//! produced here never claims `signature_ok` and only claims `chain_ok`
//! when a PCK bundle parses with a currently-valid leaf.
//!
//! Layout reference (public Intel DCAP docs):
//! header 48 bytes, REPORTBODY 384 bytes, signature data after (unparsed).

use std::collections::BTreeMap;

use proofs_types::{ProofError, Result};
use tracing::debug;

use super::common::{ClaimValue, TcbStatus, TeeEvidence, TeeKind};

/// Quote header size in bytes.
pub const QUOTE_HEADER_SIZE: usize = 48;
/// SGX REPORTBODY size in bytes.
pub const REPORT_BODY_SIZE: usize = 384;

/// TEE type tag for plain SGX quotes.
pub const TEE_TYPE_SGX: u32 = 0x0000_0000;
/// TEE type tag for TDX quotes.
pub const TEE_TYPE_TDX: u32 = 0x0000_0081;

/// Debug bit of `attributes.flags`.
const SGX_FLAGS_DEBUG: u64 = 0x0000_0002;

fn u16_le(b: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([b[off], b[off + 1]])
}

fn u32_le(b: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
}

fn u64_le(b: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(b[off..off + 8].try_into().unwrap())
}

/// Parsed quote header (subset of fields the chain cares about).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteHeader {
    /// Quote format version (3 for ECDSA quotes).
    pub version: u16,
    /// Attestation key type.
    pub att_key_type: u16,
    /// TEE type: 0 = SGX, 0x81 = TDX.
    pub tee_type: u32,
    /// Quoting enclave SVN.
    pub qe_svn: u16,
    /// Provisioning certification enclave SVN.
    pub pce_svn: u16,
    /// QE vendor id (16 bytes).
    pub qe_vendor_id: [u8; 16],
    /// User data (20 bytes).
    pub user_data: [u8; 20],
}

/// Parsed SGX REPORTBODY (subset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportBody {
    /// attributes.flags (little-endian u64 at offset 48).
    pub attributes_flags: u64,
    /// attributes.xfrm.
    pub attributes_xfrm: u64,
    /// Enclave measurement at offset 64.
    pub mrenclave: [u8; 32],
    /// Signer measurement at offset 128.
    pub mrsigner: [u8; 32],
    /// ISV product id at offset 256.
    pub isvprodid: u16,
    /// ISV security version at offset 258.
    pub isvsvn: u16,
    /// Debug attribute bit.
    pub debug: bool,
}

/// Parse the 48-byte quote header.
pub fn parse_quote_header(quote: &[u8]) -> Result<QuoteHeader> {
    if quote.len() < QUOTE_HEADER_SIZE {
        return Err(ProofError::attestation(format!(
            "SGX quote too short for header: {} < {QUOTE_HEADER_SIZE}",
            quote.len()
        )));
    }
    Ok(QuoteHeader {
        version: u16_le(quote, 0),
        att_key_type: u16_le(quote, 2),
        tee_type: u32_le(quote, 4),
        qe_svn: u16_le(quote, 8),
        pce_svn: u16_le(quote, 10),
        qe_vendor_id: quote[12..28].try_into().unwrap(),
        user_data: quote[28..48].try_into().unwrap(),
    })
}

/// Parse a 384-byte SGX REPORTBODY.
pub fn parse_report_body(body: &[u8]) -> Result<ReportBody> {
    if body.len() < REPORT_BODY_SIZE {
        return Err(ProofError::attestation(format!(
            "SGX report body too short: {} < {REPORT_BODY_SIZE}",
            body.len()
        )));
    }
    let flags = u64_le(body, 48);
    Ok(ReportBody {
        attributes_flags: flags,
        attributes_xfrm: u64_le(body, 56),
        mrenclave: body[64..96].try_into().unwrap(),
        mrsigner: body[128..160].try_into().unwrap(),
        isvprodid: u16_le(body, 256),
        isvsvn: u16_le(body, 258),
        debug: flags & SGX_FLAGS_DEBUG != 0,
    })
}

/// Parse the header and, for plain SGX, the REPORTBODY that follows it.
///
/// TDX quotes carry a structurally different TDREPORT; only the header is
/// returned for those.
pub fn parse_quote(quote: &[u8]) -> Result<(QuoteHeader, Option<ReportBody>)> {
    let header = parse_quote_header(quote)?;
    if header.tee_type == TEE_TYPE_SGX {
        let body = parse_report_body(
            quote
                .get(QUOTE_HEADER_SIZE..QUOTE_HEADER_SIZE + REPORT_BODY_SIZE)
                .ok_or_else(|| ProofError::attestation("SGX quote truncated before REPORTBODY"))?,
        )?;
        Ok((header, Some(body)))
    } else {
        Ok((header, None))
    }
}

/// Best-effort PCK bundle check: with the `x509` capability the first
/// certificate is treated as the leaf and its validity window is tested at
/// `now_unix`. Returns `(chain_ok, not_before, not_after)`.
#[cfg(feature = "x509")]
pub fn verify_pck_bundle(
    pem_bundle: Option<&[u8]>,
    now_unix: Option<u64>,
) -> (bool, Option<u64>, Option<u64>) {
    let Some(bundle) = pem_bundle else {
        return (false, None, None);
    };
    let ders = super::x509util::pem_to_der_chain(bundle);
    let Some(leaf) = ders.first() else {
        return (false, None, None);
    };
    let Some((nb, na)) = super::x509util::leaf_validity(leaf) else {
        return (false, None, None);
    };
    let ok = match now_unix {
        Some(now) => nb <= now && now <= na,
        None => true,
    };
    (ok, Some(nb), Some(na))
}

/// Without the `x509` capability the bundle cannot be validated.
#[cfg(not(feature = "x509"))]
pub fn verify_pck_bundle(
    _pem_bundle: Option<&[u8]>,
    _now_unix: Option<u64>,
) -> (bool, Option<u64>, Option<u64>) {
    (false, None, None)
}

/// Map Intel QE identity JSON (tcbLevels[].status) to a coarse status,
/// conservatively taking the worst level present.
pub fn summarize_tcb_status(qe_identity_json: Option<&[u8]>) -> TcbStatus {
    let Some(raw) = qe_identity_json else {
        return TcbStatus::Unknown;
    };
    let Ok(doc) = serde_json::from_slice::<serde_json::Value>(raw) else {
        return TcbStatus::Unknown;
    };
    let Some(levels) = doc.get("tcbLevels").and_then(|v| v.as_array()) else {
        return TcbStatus::Unknown;
    };
    let mut worst = TcbStatus::UpToDate;
    for level in levels {
        let status = level
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if status.contains("revoked") {
            return TcbStatus::Revoked;
        }
        if status.contains("outofdate") || status.contains("configurationneeded") {
            worst = TcbStatus::OutOfDate;
        }
    }
    worst
}

/// Parse an SGX (or TDX) quote into normalized evidence.
pub fn verify_quote(
    quote: &[u8],
    pck_chain_pem: Option<&[u8]>,
    qe_identity_json: Option<&[u8]>,
    now_unix: Option<u64>,
) -> Result<TeeEvidence> {
    let (header, body) = parse_quote(quote)?;
    let product = if header.tee_type == TEE_TYPE_SGX {
        "sgx"
    } else {
        "tdx"
    };
    debug!(product, version = header.version, "parsed quote header");

    let mut claims = BTreeMap::new();
    claims.insert("vendor".to_string(), ClaimValue::Text("intel".into()));
    claims.insert("product".to_string(), ClaimValue::Text(product.into()));
    claims.insert(
        "report_version".to_string(),
        ClaimValue::Int(header.version as i64),
    );

    let measurement = match &body {
        Some(rb) => {
            claims.insert(
                "mrenclave".to_string(),
                ClaimValue::Bytes(rb.mrenclave.to_vec()),
            );
            claims.insert(
                "mrsigner".to_string(),
                ClaimValue::Bytes(rb.mrsigner.to_vec()),
            );
            claims.insert(
                "isvprodid".to_string(),
                ClaimValue::Int(rb.isvprodid as i64),
            );
            claims.insert("isvsvn".to_string(), ClaimValue::Int(rb.isvsvn as i64));
            claims.insert(
                "debug".to_string(),
                ClaimValue::Int(if rb.debug { 1 } else { 0 }),
            );
            rb.mrenclave.to_vec()
        }
        None => {
            claims.insert("debug".to_string(), ClaimValue::Int(0));
            Vec::new()
        }
    };

    let (chain_ok, not_before, not_after) = verify_pck_bundle(pck_chain_pem, now_unix);
    let tcb_status = summarize_tcb_status(qe_identity_json);

    Ok(TeeEvidence {
        kind: TeeKind::Sgx,
        vendor: "intel",
        report: quote.to_vec(),
        measurement,
        report_data: header.user_data.to_vec(),
        host_data: Vec::new(),
        claims,
        signature_ok: false,
        chain_ok,
        tcb_status,
        not_before,
        not_after,
    })
}
