//! # Body Shape Rules
//!
//! Minimal, fast structural validation run before the heavy verifiers.
//! Keys are intentionally short and stable to minimize CBOR size. Unknown
//! keys are tolerated for forward compatibility but must be text.

use proofs_types::value::Value;
use proofs_types::{ProofError, ProofType, Result};

/// Type constraint for a single body field.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Unsigned integer.
    Uint,
    /// Boolean.
    Bool,
    /// Text string.
    Text,
    /// Byte string, optionally with an exact size.
    Bstr(Option<usize>),
    /// Array (element shapes are the verifier's concern).
    Array,
    /// Nested map validated against its own rule table.
    Map(&'static [FieldRule]),
}

/// One field rule: key, requiredness, and type constraint.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Map key.
    pub key: &'static str,
    /// Whether the field must be present.
    pub required: bool,
    /// Expected type.
    pub kind: FieldKind,
}

const fn req(key: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule {
        key,
        required: true,
        kind,
    }
}

const fn opt(key: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule {
        key,
        required: false,
        kind,
    }
}

const B32: FieldKind = FieldKind::Bstr(Some(32));

// Hash-share: header binding, claimed u-draw, nonce, optional target.
const HASHSHARE_RULES: &[FieldRule] = &[
    req("headerHash", B32),
    req("nonce", FieldKind::Uint),
    req("u", B32),
    opt("mixSeed", B32),
    opt("targetMu", FieldKind::Uint),
    opt("algo", FieldKind::Text),
];

const AI_TEE_RULES: &[FieldRule] = &[
    req("kind", FieldKind::Text),
    req("evidence", FieldKind::Bstr(None)),
    opt("policy", FieldKind::Map(&[])),
];

const AI_JOB_RULES: &[FieldRule] = &[
    req("taskId", B32),
    req("inputDigest", B32),
    req("outputDigest", B32),
    req("runtimeSec", FieldKind::Uint),
    opt("aiUnits", FieldKind::Uint),
];

const TRAPS_RULES: &[FieldRule] = &[
    req("seedCommit", B32),
    req("seedReveal", B32),
    req("receipts", FieldKind::Array),
    req("root", B32),
];

const REDUNDANCY_RULES: &[FieldRule] = &[
    req("replicas", FieldKind::Uint),
    req("agree", FieldKind::Uint),
    req("total", FieldKind::Uint),
];

const QOS_RULES: &[FieldRule] = &[
    req("latencyMsP95", FieldKind::Uint),
    req("successPermil", FieldKind::Uint),
    req("uptimePermil", FieldKind::Uint),
];

const AI_RULES: &[FieldRule] = &[
    req("tee", FieldKind::Map(AI_TEE_RULES)),
    req("job", FieldKind::Map(AI_JOB_RULES)),
    req("traps", FieldKind::Map(TRAPS_RULES)),
    req("redundancy", FieldKind::Map(REDUNDANCY_RULES)),
    req("qos", FieldKind::Map(QOS_RULES)),
];

const QUANTUM_PROVIDER_RULES: &[FieldRule] = &[
    req("certChain", FieldKind::Bstr(None)),
    req("endorsedAlgs", FieldKind::Array),
    opt("policy", FieldKind::Map(&[])),
];

const QUANTUM_JOB_RULES: &[FieldRule] = &[
    req("taskId", B32),
    req("circuitDigest", B32),
    req("resultDigest", B32),
    req("depth", FieldKind::Uint),
    req("width", FieldKind::Uint),
    req("shots", FieldKind::Uint),
    opt("quantumUnits", FieldKind::Uint),
];

const QUANTUM_RULES: &[FieldRule] = &[
    req("provider", FieldKind::Map(QUANTUM_PROVIDER_RULES)),
    req("job", FieldKind::Map(QUANTUM_JOB_RULES)),
    req("traps", FieldKind::Map(TRAPS_RULES)),
    req("qos", FieldKind::Map(QOS_RULES)),
];

const STORAGE_PROVIDER_RULES: &[FieldRule] = &[req("providerId", B32)];

const STORAGE_COMMIT_RULES: &[FieldRule] = &[
    req("sectorRoot", B32),
    req("sectorSize", FieldKind::Uint),
    req("replicas", FieldKind::Uint),
    req("minSamples", FieldKind::Uint),
    opt("treeHeight", FieldKind::Uint),
];

const STORAGE_WINDOW_RULES: &[FieldRule] = &[
    req("start", FieldKind::Uint),
    req("end", FieldKind::Uint),
];

const STORAGE_CHALLENGE_RULES: &[FieldRule] = &[
    req("epoch", FieldKind::Uint),
    req("seed", B32),
    opt("window", FieldKind::Map(STORAGE_WINDOW_RULES)),
];

const STORAGE_PROOF_RULES: &[FieldRule] = &[req("samples", FieldKind::Array)];

const STORAGE_RETRIEVAL_RULES: &[FieldRule] = &[req("tickets", FieldKind::Array)];

const STORAGE_RULES: &[FieldRule] = &[
    req("provider", FieldKind::Map(STORAGE_PROVIDER_RULES)),
    req("commit", FieldKind::Map(STORAGE_COMMIT_RULES)),
    req("challenge", FieldKind::Map(STORAGE_CHALLENGE_RULES)),
    req("proof", FieldKind::Map(STORAGE_PROOF_RULES)),
    opt("retrieval", FieldKind::Map(STORAGE_RETRIEVAL_RULES)),
];

const VDF_GROUP_RULES: &[FieldRule] = &[
    req("kind", FieldKind::Text),
    req("N", FieldKind::Bstr(None)),
];

const VDF_PROOF_RULES: &[FieldRule] = &[req("pi", FieldKind::Bstr(None))];

const VDF_CALIBRATION_RULES: &[FieldRule] = &[req("iters_per_sec", FieldKind::Uint)];

const VDF_RULES: &[FieldRule] = &[
    req("group", FieldKind::Map(VDF_GROUP_RULES)),
    req("g", FieldKind::Bstr(None)),
    req("y", FieldKind::Bstr(None)),
    req("T", FieldKind::Uint),
    req("proof", FieldKind::Map(VDF_PROOF_RULES)),
    opt("calibration", FieldKind::Map(VDF_CALIBRATION_RULES)),
];

/// Rule table for a proof type.
pub fn rules_for(pt: ProofType) -> &'static [FieldRule] {
    match pt {
        ProofType::HashShare => HASHSHARE_RULES,
        ProofType::Ai => AI_RULES,
        ProofType::Quantum => QUANTUM_RULES,
        ProofType::Storage => STORAGE_RULES,
        ProofType::Vdf => VDF_RULES,
    }
}

fn check_field(path: &str, value: &Value, kind: FieldKind) -> Result<()> {
    let ok = match kind {
        FieldKind::Uint => value.as_u64().is_some(),
        FieldKind::Bool => value.as_bool().is_some(),
        FieldKind::Text => value.as_text().is_some(),
        FieldKind::Bstr(None) => value.as_bytes().is_some(),
        FieldKind::Bstr(Some(n)) => value.as_bytes().is_some_and(|b| b.len() == n),
        FieldKind::Array => value.as_array().is_some(),
        FieldKind::Map(nested) => {
            check_map(path, value, nested)?;
            true
        }
    };
    if !ok {
        return Err(
            ProofError::schema(format!("field {path:?} has wrong type or size"))
                .with_context("path", path.to_string()),
        );
    }
    Ok(())
}

fn check_map(path: &str, value: &Value, rules: &[FieldRule]) -> Result<()> {
    let entries = value
        .as_map()
        .ok_or_else(|| ProofError::schema(format!("field {path:?} must be a map")))?;

    // All keys must be text, known or not.
    for (key, _) in entries {
        if !key.is_text() {
            return Err(ProofError::schema(format!(
                "non-text key in map {path:?} not allowed"
            )));
        }
    }

    for rule in rules {
        let sub_path = if path.is_empty() {
            rule.key.to_string()
        } else {
            format!("{path}.{}", rule.key)
        };
        match value.get(rule.key) {
            Some(v) => check_field(&sub_path, v, rule.kind)?,
            None if rule.required => {
                return Err(
                    ProofError::schema(format!("missing required field {sub_path:?}"))
                        .with_context("path", sub_path),
                );
            }
            None => {}
        }
    }
    Ok(())
}

/// Structural validation of a proof body map for the given type.
///
/// Enforces required fields, field types/sizes, and text-only keys; unknown
/// text keys pass through untouched.
pub fn validate_body(pt: ProofType, body: &Value) -> Result<()> {
    check_map("", body, rules_for(pt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofs_types::value::MapKey;

    fn hashshare_body() -> Value {
        Value::text_map(vec![
            ("headerHash", Value::Bytes(vec![0x11; 32])),
            ("nonce", Value::Int(7)),
            ("u", Value::Bytes(vec![0x22; 32])),
        ])
    }

    #[test]
    fn test_hashshare_minimal_ok() {
        validate_body(ProofType::HashShare, &hashshare_body()).unwrap();
    }

    #[test]
    fn test_missing_required_field() {
        let body = Value::text_map(vec![
            ("headerHash", Value::Bytes(vec![0x11; 32])),
            ("nonce", Value::Int(7)),
        ]);
        let err = validate_body(ProofType::HashShare, &body).unwrap_err();
        assert_eq!(err.code(), "SCHEMA");
        assert!(err.to_string().contains('u'));
    }

    #[test]
    fn test_wrong_size_bstr() {
        let body = Value::text_map(vec![
            ("headerHash", Value::Bytes(vec![0x11; 31])),
            ("nonce", Value::Int(7)),
            ("u", Value::Bytes(vec![0x22; 32])),
        ]);
        assert!(validate_body(ProofType::HashShare, &body).is_err());
    }

    #[test]
    fn test_unknown_text_keys_tolerated() {
        let mut entries = hashshare_body().as_map().unwrap().to_vec();
        entries.push((MapKey::from("futureField"), Value::Int(1)));
        let body = Value::map(entries);
        validate_body(ProofType::HashShare, &body).unwrap();
    }

    #[test]
    fn test_non_text_key_rejected() {
        let mut entries = hashshare_body().as_map().unwrap().to_vec();
        entries.push((MapKey::Int(9), Value::Int(1)));
        let body = Value::map(entries);
        assert!(validate_body(ProofType::HashShare, &body).is_err());
    }

    #[test]
    fn test_nested_map_rules() {
        let body = Value::text_map(vec![
            (
                "group",
                Value::text_map(vec![("kind", Value::Text("RSA".into()))]),
            ),
            ("g", Value::Bytes(vec![2])),
            ("y", Value::Bytes(vec![4])),
            ("T", Value::Int(1)),
            (
                "proof",
                Value::text_map(vec![("pi", Value::Bytes(vec![9]))]),
            ),
        ]);
        // group.N missing.
        let err = validate_body(ProofType::Vdf, &body).unwrap_err();
        assert!(err.to_string().contains("group.N"));
    }
}
