//! Order-preserving tuple codec
//!
//! Encodes value sequences into byte keys whose lexicographic order matches
//! the tuple order under `Value::compare`: type tags follow the value tag
//! rank, numerics share one 8-byte monotone encoding, and variable-length
//! elements are terminated with an escaped sentinel so that prefixes sort
//! before their extensions.

use crate::types::Value;

const TAG_NULL: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_NUMERIC: u8 = 0x02;
const TAG_TEXT: u8 = 0x03;
const TAG_TIMESTAMP: u8 = 0x04;
const TAG_BYTES: u8 = 0x05;

/// Encode a tuple of values into a single ordered key.
pub fn encode_tuple(values: &[Value]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 9);
    for value in values {
        encode_value(value, &mut out);
    }
    out
}

/// Encode one value, appending to `out`.
pub fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(TAG_NULL),
        Value::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(u8::from(*b));
        }
        // Integers and doubles compare against each other, so both encode
        // through the same monotone f64 image. Integers beyond 2^53 collapse
        // onto their nearest double, matching the comparison semantics of
        // the value model.
        Value::Integer(i) => {
            out.push(TAG_NUMERIC);
            out.extend_from_slice(&order_preserving_f64(*i as f64));
        }
        Value::Double(d) => {
            out.push(TAG_NUMERIC);
            out.extend_from_slice(&order_preserving_f64(*d));
        }
        Value::Text(s) => {
            out.push(TAG_TEXT);
            escape_into(s.as_bytes(), out);
        }
        Value::Timestamp(ts) => {
            out.push(TAG_TIMESTAMP);
            out.extend_from_slice(&order_preserving_i64(ts.as_micros()));
        }
        Value::Bytes(b) => {
            out.push(TAG_BYTES);
            escape_into(b, out);
        }
    }
}

/// IEEE-754 bit trick: flip the sign bit for positives, flip every bit for
/// negatives. The resulting u64 big-endian bytes sort like the doubles.
fn order_preserving_f64(v: f64) -> [u8; 8] {
    let bits = v.to_bits();
    let mapped = if bits & 0x8000_0000_0000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000_0000_0000
    };
    mapped.to_be_bytes()
}

/// Bias a signed integer into unsigned order.
fn order_preserving_i64(v: i64) -> [u8; 8] {
    ((v as u64) ^ 0x8000_0000_0000_0000).to_be_bytes()
}

/// Append `data` with 0x00 escaped as 0x00 0xFF and a bare 0x00 terminator,
/// so shorter strings sort before their extensions.
fn escape_into(data: &[u8], out: &mut Vec<u8>) {
    for &b in data {
        out.push(b);
        if b == 0x00 {
            out.push(0xFF);
        }
    }
    out.push(0x00);
}

/// Smallest key strictly greater than every key starting with `key`, used
/// for exclusive upper bounds of prefix ranges.
///
/// Empty and all-0xFF inputs gain a trailing 0x00; otherwise trailing 0xFF
/// bytes are dropped and the rightmost non-0xFF byte is incremented.
pub fn increment_key(key: &[u8]) -> Vec<u8> {
    if key.is_empty() {
        return vec![0x00];
    }

    match key.iter().rposition(|&b| b != 0xFF) {
        Some(pos) => {
            let mut out = key[..=pos].to_vec();
            out[pos] += 1;
            out
        }
        None => {
            let mut out = key.to_vec();
            out.push(0x00);
            out
        }
    }
}
