//! # Canonical CBOR Encoder
//!
//! Writes a [`Value`] into its unique canonical byte form. Encoding fails
//! (never silently fixes) on values that violate canonical constraints:
//! out-of-range integers, unsorted or duplicate map keys, excessive depth.

use proofs_types::value::{encode_head, Value};
use proofs_types::{ProofError, Result};

/// Maximum nesting depth accepted on either codec direction.
pub const MAX_DEPTH: usize = 32;

/// CBOR 64-bit integer span: `[-2^64, 2^64 - 1]`.
const INT_MIN: i128 = -(1i128 << 64);
const INT_MAX: i128 = (1i128 << 64) - 1;

/// Encode a value into canonical CBOR bytes.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(128);
    write_value(value, &mut out, 0)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut Vec<u8>, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(ProofError::schema("value nesting exceeds codec depth limit"));
    }
    match value {
        Value::Int(i) => {
            if *i < INT_MIN || *i > INT_MAX {
                return Err(ProofError::schema(format!(
                    "integer {i} outside CBOR 64-bit range"
                )));
            }
            if *i >= 0 {
                encode_head(0, *i as u64, out);
            } else {
                encode_head(1, (-1 - *i) as u64, out);
            }
        }
        Value::Bytes(b) => {
            encode_head(2, b.len() as u64, out);
            out.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_head(3, s.len() as u64, out);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Bool(b) => out.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => out.push(0xf6),
        Value::Array(items) => {
            encode_head(4, items.len() as u64, out);
            for item in items {
                write_value(item, out, depth + 1)?;
            }
        }
        Value::Map(entries) => {
            for window in entries.windows(2) {
                match window[0].0.canonical_cmp(&window[1].0) {
                    std::cmp::Ordering::Less => {}
                    std::cmp::Ordering::Equal => {
                        return Err(ProofError::schema("duplicate map key"));
                    }
                    std::cmp::Ordering::Greater => {
                        return Err(ProofError::schema("map keys not in canonical order"));
                    }
                }
            }
            encode_head(5, entries.len() as u64, out);
            for (key, val) in entries {
                out.extend_from_slice(&key.canonical_bytes());
                write_value(val, out, depth + 1)?;
            }
        }
    }
    Ok(())
}
