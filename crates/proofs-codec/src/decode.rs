//! # CBOR Decoders
//!
//! Two decoding modes over the same grammar:
//!
//! - **Strict** (envelope surface): enforces minimal integer heads,
//!   canonical map-key order, no duplicate keys, no tags, no floats, no
//!   indefinite lengths, no trailing bytes. Together with the encoder this
//!   guarantees `encode(decode(b)) == b`.
//! - **Lenient** (attestation surface): same grammar but accepts any key
//!   order and non-minimal heads, and skips a leading semantic tag, since
//!   foreign COSE tokens are not canonical CBOR. Never used for envelopes.

use proofs_types::value::{MapKey, Value};
use proofs_types::{ProofError, Result};

use crate::encode::MAX_DEPTH;

/// Strict canonical decode of a complete byte string.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    Decoder::new(bytes, true).run()
}

/// Lenient decode for foreign CBOR (COSE tokens, vendor payloads).
pub fn decode_lenient(bytes: &[u8]) -> Result<Value> {
    Decoder::new(bytes, false).run()
}

struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
    strict: bool,
}

impl<'a> Decoder<'a> {
    fn new(buf: &'a [u8], strict: bool) -> Self {
        Self {
            buf,
            pos: 0,
            strict,
        }
    }

    fn run(mut self) -> Result<Value> {
        let value = self.read_value(0)?;
        if self.pos != self.buf.len() {
            return Err(ProofError::decode(format!(
                "{} trailing bytes after CBOR value",
                self.buf.len() - self.pos
            )));
        }
        Ok(value)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() - self.pos < n {
            return Err(ProofError::decode("unexpected end of CBOR input"));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a head argument, enforcing minimal form in strict mode.
    fn read_arg(&mut self, info: u8) -> Result<u64> {
        let value = match info {
            0..=23 => info as u64,
            24 => {
                let v = self.read_byte()? as u64;
                if self.strict && v < 24 {
                    return Err(ProofError::decode("non-minimal integer head"));
                }
                v
            }
            25 => {
                let v = u16::from_be_bytes(self.take(2)?.try_into().unwrap()) as u64;
                if self.strict && v <= u8::MAX as u64 {
                    return Err(ProofError::decode("non-minimal integer head"));
                }
                v
            }
            26 => {
                let v = u32::from_be_bytes(self.take(4)?.try_into().unwrap()) as u64;
                if self.strict && v <= u16::MAX as u64 {
                    return Err(ProofError::decode("non-minimal integer head"));
                }
                v
            }
            27 => {
                let v = u64::from_be_bytes(self.take(8)?.try_into().unwrap());
                if self.strict && v <= u32::MAX as u64 {
                    return Err(ProofError::decode("non-minimal integer head"));
                }
                v
            }
            31 => return Err(ProofError::decode("indefinite lengths not supported")),
            other => {
                return Err(ProofError::decode(format!(
                    "reserved additional info {other}"
                )))
            }
        };
        Ok(value)
    }

    fn read_value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(ProofError::decode("CBOR nesting exceeds codec depth limit"));
        }
        let head = self.read_byte()?;
        let major = head >> 5;
        let info = head & 0x1f;
        match major {
            0 => Ok(Value::Int(self.read_arg(info)? as i128)),
            1 => Ok(Value::Int(-1 - self.read_arg(info)? as i128)),
            2 => {
                let len = self.checked_len(info)?;
                Ok(Value::Bytes(self.take(len)?.to_vec()))
            }
            3 => {
                let len = self.checked_len(info)?;
                let raw = self.take(len)?;
                let s = std::str::from_utf8(raw)
                    .map_err(|_| ProofError::decode("invalid UTF-8 in text string"))?;
                Ok(Value::Text(s.to_owned()))
            }
            4 => {
                let len = self.checked_len(info)?;
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(self.read_value(depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            5 => self.read_map(info, depth),
            6 => {
                if self.strict {
                    Err(ProofError::decode("semantic tags not allowed"))
                } else {
                    // Foreign COSE tokens may be tag-wrapped; unwrap once.
                    let _tag = self.read_arg(info)?;
                    self.read_value(depth + 1)
                }
            }
            7 => match head {
                0xf4 => Ok(Value::Bool(false)),
                0xf5 => Ok(Value::Bool(true)),
                0xf6 => Ok(Value::Null),
                0xf9 | 0xfa | 0xfb => {
                    Err(ProofError::decode("floating-point values not allowed"))
                }
                other => Err(ProofError::decode(format!(
                    "unsupported simple value {other:#04x}"
                ))),
            },
            _ => unreachable!("major type is 3 bits"),
        }
    }

    fn read_map(&mut self, info: u8, depth: usize) -> Result<Value> {
        let len = self.checked_len(info)?;
        let mut entries: Vec<(MapKey, Value)> = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            let key = self.read_key(depth)?;
            if let Some(last) = entries.last() {
                match last.0.canonical_cmp(&key) {
                    std::cmp::Ordering::Less => {}
                    std::cmp::Ordering::Equal => {
                        return Err(ProofError::decode("duplicate map key"));
                    }
                    std::cmp::Ordering::Greater if self.strict => {
                        return Err(ProofError::decode("map keys not in canonical order"));
                    }
                    std::cmp::Ordering::Greater => {}
                }
            }
            if !self.strict && entries.iter().any(|(k, _)| k == &key) {
                return Err(ProofError::decode("duplicate map key"));
            }
            let value = self.read_value(depth + 1)?;
            entries.push((key, value));
        }
        if !self.strict {
            entries.sort_by(|a, b| a.0.canonical_cmp(&b.0));
        }
        Ok(Value::Map(entries))
    }

    fn read_key(&mut self, _depth: usize) -> Result<MapKey> {
        let head = self.read_byte()?;
        let major = head >> 5;
        let info = head & 0x1f;
        match major {
            0 => Ok(MapKey::Int(self.read_arg(info)? as i128)),
            1 => Ok(MapKey::Int(-1 - self.read_arg(info)? as i128)),
            3 => {
                let len = self.checked_len(info)?;
                let raw = self.take(len)?;
                let s = std::str::from_utf8(raw)
                    .map_err(|_| ProofError::decode("invalid UTF-8 in map key"))?;
                Ok(MapKey::Text(s.to_owned()))
            }
            other => Err(ProofError::decode(format!(
                "unsupported map key major type {other}"
            ))),
        }
    }

    /// Read a length argument and bound it by the remaining input so a
    /// hostile head cannot force a huge allocation.
    fn checked_len(&mut self, info: u8) -> Result<usize> {
        let len = self.read_arg(info)?;
        if len > (self.buf.len() - self.pos) as u64 {
            return Err(ProofError::decode("declared length exceeds input"));
        }
        Ok(len as usize)
    }
}
