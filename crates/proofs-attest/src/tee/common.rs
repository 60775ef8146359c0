//! # Shared Attestation Structures & Policy
//!
//! Canonical evidence container, expected-measurement set, policy flags,
//! measurement binding, and the pure acceptance evaluator. This module
//! contains no vendor-specific parsing or signature verification; those
//! live in the sibling modules.

use std::collections::BTreeMap;

use proofs_crypto::hash::sha3_512;
use proofs_types::{ProofError, Result};
use sha3::{Digest, Sha3_256};

/// Domain for the measurement-binding commitment.
const DOMAIN_MEASUREMENT_BIND_V1: &[u8] = b"ANIMICA::TEE_MEASUREMENT_BINDING/v1";

/// Supported TEE families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeeKind {
    /// Intel SGX / TDX quotes.
    Sgx,
    /// AMD SEV-SNP attestation reports.
    SevSnp,
    /// Arm CCA realm tokens.
    Cca,
    /// TPM 2.0 event log + quote (with optional DICE chain).
    Tpm,
}

impl TeeKind {
    /// Parse the wire string used in `tee.kind`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sgx" => Some(TeeKind::Sgx),
            "sev_snp" => Some(TeeKind::SevSnp),
            "cca" => Some(TeeKind::Cca),
            "tpm" => Some(TeeKind::Tpm),
            _ => None,
        }
    }

    /// Wire string.
    pub fn as_str(self) -> &'static str {
        match self {
            TeeKind::Sgx => "sgx",
            TeeKind::SevSnp => "sev_snp",
            TeeKind::Cca => "cca",
            TeeKind::Tpm => "tpm",
        }
    }
}

/// Coarse trusted-computing-base freshness summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TcbStatus {
    /// No information available.
    Unknown,
    /// Vendor reports the platform as current.
    UpToDate,
    /// Updates or configuration changes are pending.
    OutOfDate,
    /// The platform or key material has been revoked.
    Revoked,
}

/// A parsed claim surfaced by a vendor module.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimValue {
    /// Integer claim (versions, SVNs, flags).
    Int(i64),
    /// Text claim (vendor, product).
    Text(String),
    /// Binary claim (measurements, digests).
    Bytes(Vec<u8>),
    /// Boolean claim.
    Bool(bool),
}

impl ClaimValue {
    /// Binary view, if this claim is bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ClaimValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Integer view.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ClaimValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Normalized evidence produced by a vendor parser, before policy.
///
/// The vendor module is responsible for the cryptographic integrity flags;
/// `signature_ok`/`chain_ok` are `false` whenever a check could not run
/// (missing material or compiled-out capability), never silently skipped.
#[derive(Debug, Clone)]
pub struct TeeEvidence {
    /// TEE family.
    pub kind: TeeKind,
    /// Vendor label ("intel", "amd", "arm", "tpm").
    pub vendor: &'static str,
    /// Canonical binary report/quote/token as produced on the device.
    pub report: Vec<u8>,
    /// Primary code/realm measurement (width is vendor-specific).
    pub measurement: Vec<u8>,
    /// Freshness/nonce material bound into the report.
    pub report_data: Vec<u8>,
    /// Host-supplied data (SEV) or platform hash (CCA), empty if absent.
    pub host_data: Vec<u8>,
    /// Parsed high-level claims keyed by stable names.
    pub claims: BTreeMap<String, ClaimValue>,
    /// Report signature verified against the vendor leaf key.
    pub signature_ok: bool,
    /// Leaf chained to a pinned vendor root (basic issuer→subject walk).
    pub chain_ok: bool,
    /// Coarse TCB summary.
    pub tcb_status: TcbStatus,
    /// Validity window start (unix seconds), if the evidence carries one.
    pub not_before: Option<u64>,
    /// Validity window end (unix seconds), if the evidence carries one.
    pub not_after: Option<u64>,
}

impl TeeEvidence {
    /// Debug-mode flag from the claims, defaulting to false.
    pub fn debug_mode(&self) -> bool {
        match self.claims.get("debug") {
            Some(ClaimValue::Bool(b)) => *b,
            Some(ClaimValue::Int(i)) => *i != 0,
            _ => false,
        }
    }
}

/// Toolchain-level expectations bound to the work product.
///
/// Fields are optional because not every TEE kind exposes all of them.
#[derive(Debug, Clone, Default)]
pub struct ExpectedMeasurements {
    /// SGX enclave measurement.
    pub mrenclave: Option<Vec<u8>>,
    /// SGX signer measurement.
    pub mrsigner: Option<Vec<u8>>,
    /// SGX product id.
    pub isvprodid: Option<u16>,
    /// SGX minimum security version.
    pub isvsvn: Option<u16>,
    /// SEV-SNP launch measurement (48 bytes).
    pub sev_measurement: Option<Vec<u8>>,
    /// SEV-SNP family id.
    pub sev_family_id: Option<Vec<u8>>,
    /// SEV-SNP image id.
    pub sev_image_id: Option<Vec<u8>>,
    /// SEV-SNP minimum TCB version.
    pub sev_tcb_svn: Option<u64>,
    /// CCA realm measurement.
    pub cca_realm_measurement: Option<Vec<u8>>,
    /// CCA realm public key hash.
    pub cca_pubkey_hash: Option<Vec<u8>>,
    /// SHA3-256 of the deployed code artifact.
    pub code_hash: Option<Vec<u8>>,
    /// SHA3-256 of the canonical job manifest.
    pub manifest_hash: Option<Vec<u8>>,
    /// Chain-specific salt preventing cross-network replay.
    pub network_salt: Option<Vec<u8>>,
}

/// Policy flags deciding what evidence the chain accepts.
#[derive(Debug, Clone)]
pub struct AttestationPolicy {
    /// Accept debug-mode reports.
    pub allow_debug: bool,
    /// Reject evidence whose vendor chain did not verify.
    pub require_chain_ok: bool,
    /// Reject evidence whose report signature did not verify.
    pub require_signature_ok: bool,
    /// Require TCB status `UpToDate`.
    pub require_tcb_up_to_date: bool,
    /// Restrict accepted TEE families (None = any).
    pub accepted_kinds: Option<Vec<TeeKind>>,
    /// Require a manifest hash in the expectations.
    pub bind_manifest: bool,
    /// Require a code hash in the expectations.
    pub bind_code: bool,
    /// Maximum evidence age in seconds, measured from `not_before`.
    pub freshness_max_age_s: Option<u64>,
}

impl Default for AttestationPolicy {
    fn default() -> Self {
        Self {
            allow_debug: false,
            require_chain_ok: true,
            require_signature_ok: false,
            require_tcb_up_to_date: true,
            accepted_kinds: None,
            bind_manifest: false,
            bind_code: false,
            freshness_max_age_s: Some(86_400),
        }
    }
}

impl AttestationPolicy {
    /// A policy accepting any parseable evidence; used when an upstream
    /// producer has already vetted the chain and the node only scores.
    pub fn permissive() -> Self {
        Self {
            allow_debug: true,
            require_chain_ok: false,
            require_signature_ok: false,
            require_tcb_up_to_date: false,
            accepted_kinds: None,
            bind_manifest: false,
            bind_code: false,
            freshness_max_age_s: None,
        }
    }
}

/// Outcome of policy evaluation over a single evidence object.
#[derive(Debug, Clone)]
pub struct AttestationResult {
    /// All checks passed.
    pub ok: bool,
    /// "ok" or a semicolon-joined violation list.
    pub reason: String,
    /// The evidence reported debug mode.
    pub debug_mode: bool,
    /// TCB status carried through from the evidence.
    pub tcb_status: TcbStatus,
    /// Deterministic binding digest over expectations and report.
    pub measurement_binding: [u8; 32],
    /// Individual violations, empty when `ok`.
    pub violations: Vec<String>,
}

impl AttestationResult {
    /// Convert a rejection into a typed error.
    pub fn require_ok(&self) -> Result<()> {
        if self.ok {
            Ok(())
        } else {
            Err(ProofError::attestation(self.reason.clone()))
        }
    }
}

/// Constant-time byte comparison; `false` when either side is absent.
fn bytes_eq_ct(a: Option<&[u8]>, b: Option<&[u8]>) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return false;
    };
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn claim_bytes<'a>(e: &'a TeeEvidence, key: &str) -> Option<&'a [u8]> {
    e.claims.get(key).and_then(ClaimValue::as_bytes)
}

fn claim_int(e: &TeeEvidence, key: &str) -> Option<i64> {
    e.claims.get(key).and_then(ClaimValue::as_int)
}

/// Vendor-agnostic measurement matching. Returns collected violations.
pub fn check_measurements(exp: &ExpectedMeasurements, e: &TeeEvidence) -> Vec<String> {
    let mut violations = Vec::new();
    match e.kind {
        TeeKind::Sgx => {
            if exp.mrenclave.is_some()
                && !bytes_eq_ct(exp.mrenclave.as_deref(), claim_bytes(e, "mrenclave"))
            {
                violations.push("mrenclave mismatch".into());
            }
            if exp.mrsigner.is_some()
                && !bytes_eq_ct(exp.mrsigner.as_deref(), claim_bytes(e, "mrsigner"))
            {
                violations.push("mrsigner mismatch".into());
            }
            if let Some(want) = exp.isvprodid {
                if claim_int(e, "isvprodid") != Some(want as i64) {
                    violations.push("isvprodid mismatch".into());
                }
            }
            if let Some(min) = exp.isvsvn {
                if claim_int(e, "isvsvn").unwrap_or(-1) < min as i64 {
                    violations.push("isvsvn below minimum".into());
                }
            }
        }
        TeeKind::SevSnp => {
            if exp.sev_measurement.is_some()
                && !bytes_eq_ct(exp.sev_measurement.as_deref(), Some(&e.measurement))
            {
                violations.push("SEV-SNP measurement mismatch".into());
            }
            if exp.sev_family_id.is_some()
                && !bytes_eq_ct(exp.sev_family_id.as_deref(), claim_bytes(e, "family_id"))
            {
                violations.push("SEV-SNP family_id mismatch".into());
            }
            if exp.sev_image_id.is_some()
                && !bytes_eq_ct(exp.sev_image_id.as_deref(), claim_bytes(e, "image_id"))
            {
                violations.push("SEV-SNP image_id mismatch".into());
            }
            if let Some(min) = exp.sev_tcb_svn {
                if claim_int(e, "tcb_svn").unwrap_or(-1) < min as i64 {
                    violations.push("SEV-SNP tcb_svn below minimum".into());
                }
            }
        }
        TeeKind::Cca => {
            if exp.cca_realm_measurement.is_some()
                && !bytes_eq_ct(exp.cca_realm_measurement.as_deref(), Some(&e.measurement))
            {
                violations.push("CCA realm_measurement mismatch".into());
            }
            if exp.cca_pubkey_hash.is_some()
                && !bytes_eq_ct(
                    exp.cca_pubkey_hash.as_deref(),
                    claim_bytes(e, "realm_pubkey_hash"),
                )
            {
                violations.push("CCA realm_pubkey_hash mismatch".into());
            }
        }
        TeeKind::Tpm => {
            // TPM composite digests are compared through code_hash binding.
        }
    }
    violations
}

/// Domain-separated push: `u16_be(len(label)) || label || u32_be(len(payload)) || payload`.
fn dpush(h: &mut Sha3_256, label: &str, payload: Option<&[u8]>) {
    let lp = label.as_bytes();
    h.update((lp.len() as u16).to_be_bytes());
    h.update(lp);
    let data = payload.unwrap_or(&[]);
    h.update((data.len() as u32).to_be_bytes());
    h.update(data);
}

fn pack_u32(v: Option<u32>) -> [u8; 4] {
    v.unwrap_or(0).to_be_bytes()
}

/// Reduce vendor claims to a small, stable sorted-key JSON blob.
fn public_claims_subset(e: &TeeEvidence) -> Vec<u8> {
    const ALLOW: &[&str] = &[
        "mrenclave",
        "mrsigner",
        "isvprodid",
        "isvsvn",
        "debug",
        "measurement",
        "family_id",
        "image_id",
        "tcb_svn",
        "realm_measurement",
        "realm_pubkey_hash",
        "vendor",
        "product",
        "report_version",
    ];
    let mut out: BTreeMap<&str, serde_json::Value> = BTreeMap::new();
    for (k, v) in &e.claims {
        if !ALLOW.contains(&k.as_str()) {
            continue;
        }
        let jv = match v {
            ClaimValue::Int(i) => serde_json::Value::from(*i),
            ClaimValue::Bool(b) => serde_json::Value::from(*b),
            ClaimValue::Text(s) => serde_json::Value::from(s.clone()),
            ClaimValue::Bytes(b) => serde_json::Value::from(format!("0x{}", hex::encode(b))),
        };
        out.insert(k, jv);
    }
    // BTreeMap keys serialize sorted, matching the canonical-JSON convention.
    serde_json::to_vec(&out).unwrap_or_default()
}

/// Deterministic SHA3-256 commitment tying the expected measurements, the
/// raw report, and the toolchain artifacts together. Stored alongside AI
/// proof details and salted into cross-network replay defenses.
pub fn build_measurement_binding(exp: &ExpectedMeasurements, e: &TeeEvidence) -> [u8; 32] {
    let mut h = Sha3_256::new();
    h.update(DOMAIN_MEASUREMENT_BIND_V1);
    dpush(&mut h, "kind", Some(e.kind.as_str().as_bytes()));
    dpush(&mut h, "report_sha3_512", Some(&sha3_512(&e.report)));

    dpush(&mut h, "mrenclave", exp.mrenclave.as_deref());
    dpush(&mut h, "mrsigner", exp.mrsigner.as_deref());
    dpush(
        &mut h,
        "isvprodid",
        Some(&pack_u32(exp.isvprodid.map(u32::from))),
    );
    dpush(&mut h, "isvsvn", Some(&pack_u32(exp.isvsvn.map(u32::from))));

    dpush(&mut h, "sev_measurement", exp.sev_measurement.as_deref());
    dpush(&mut h, "sev_family_id", exp.sev_family_id.as_deref());
    dpush(&mut h, "sev_image_id", exp.sev_image_id.as_deref());
    dpush(
        &mut h,
        "sev_tcb_svn",
        Some(&pack_u32(exp.sev_tcb_svn.map(|v| v as u32))),
    );

    dpush(
        &mut h,
        "cca_realm_measurement",
        exp.cca_realm_measurement.as_deref(),
    );
    dpush(&mut h, "cca_pubkey_hash", exp.cca_pubkey_hash.as_deref());

    dpush(&mut h, "code_hash", exp.code_hash.as_deref());
    dpush(&mut h, "manifest_hash", exp.manifest_hash.as_deref());
    dpush(&mut h, "network_salt", exp.network_salt.as_deref());

    dpush(
        &mut h,
        "claims_sha3_512",
        Some(&sha3_512(&public_claims_subset(e))),
    );

    h.finalize().into()
}

/// Policy-level acceptance over already-parsed evidence.
///
/// `now_unix` drives freshness checks; pass `None` to skip them (the
/// producer vouches for freshness through other means).
pub fn evaluate_policy(
    e: &TeeEvidence,
    exp: &ExpectedMeasurements,
    policy: &AttestationPolicy,
    now_unix: Option<u64>,
) -> AttestationResult {
    let mut violations: Vec<String> = Vec::new();

    if let Some(kinds) = &policy.accepted_kinds {
        if !kinds.contains(&e.kind) {
            violations.push(format!("kind {} not in accepted set", e.kind.as_str()));
        }
    }
    if policy.require_chain_ok && !e.chain_ok {
        violations.push("vendor chain not trusted".into());
    }
    if policy.require_signature_ok && !e.signature_ok {
        violations.push("report signature not verified".into());
    }

    if let Some(now) = now_unix {
        if let (Some(max_age), Some(nb)) = (policy.freshness_max_age_s, e.not_before) {
            if now.saturating_sub(nb) > max_age {
                violations.push(format!(
                    "evidence too old ({}s > {max_age}s)",
                    now.saturating_sub(nb)
                ));
            }
        }
        if let Some(na) = e.not_after {
            if now > na {
                violations.push("evidence expired (not_after passed)".into());
            }
        }
    }

    let debug_mode = e.debug_mode();
    if debug_mode && !policy.allow_debug {
        violations.push("debug mode not permitted by policy".into());
    }

    if policy.require_tcb_up_to_date && e.tcb_status != TcbStatus::UpToDate {
        violations.push(format!("TCB status {:?} not acceptable", e.tcb_status));
    }

    if policy.bind_manifest && exp.manifest_hash.is_none() {
        violations.push("manifest binding required, manifest_hash missing".into());
    }
    if policy.bind_code && exp.code_hash.is_none() {
        violations.push("code binding required, code_hash missing".into());
    }

    let binding = build_measurement_binding(exp, e);
    let ok = violations.is_empty();
    AttestationResult {
        ok,
        reason: if ok { "ok".into() } else { violations.join("; ") },
        debug_mode,
        tcb_status: e.tcb_status,
        measurement_binding: binding,
        violations,
    }
}

/// Combine measurement matching and policy checks into a single result.
pub fn evaluate_attestation(
    e: &TeeEvidence,
    exp: &ExpectedMeasurements,
    policy: &AttestationPolicy,
    now_unix: Option<u64>,
) -> AttestationResult {
    let mut mviol = check_measurements(exp, e);
    let policy_res = evaluate_policy(e, exp, policy, now_unix);
    mviol.extend(policy_res.violations.iter().cloned());
    let ok = mviol.is_empty();
    AttestationResult {
        ok,
        reason: if ok { "ok".into() } else { mviol.join("; ") },
        violations: mviol,
        ..policy_res
    }
}
