//! Unified comparable value model
//!
//! Every predicate literal, histogram boundary, scan bound, and tuple element
//! is a `Value`. The type is totally ordered: null sorts first, integers and
//! doubles compare numerically against each other, and mixed tags fall back
//! to a fixed rank (null < bool < numeric < string < timestamp < bytes).

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Tagged value supporting every comparable field type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Null value (sorts before everything else)
    Null,

    /// Boolean value
    Bool(bool),

    /// 64-bit signed integer
    Integer(i64),

    /// 64-bit float
    Double(f64),

    /// UTF-8 string
    Text(String),

    /// Raw byte string
    Bytes(Vec<u8>),

    /// Microsecond timestamp
    Timestamp(Timestamp),
}

/// Coarse value classification, used for mixed-tag ordering and for typed
/// parameter bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Bool,
    Numeric,
    Text,
    Timestamp,
    Bytes,
}

impl ValueKind {
    /// Fixed rank for cross-tag comparison.
    fn rank(self) -> u8 {
        match self {
            ValueKind::Null => 0,
            ValueKind::Bool => 1,
            ValueKind::Numeric => 2,
            ValueKind::Text => 3,
            ValueKind::Timestamp => 4,
            ValueKind::Bytes => 5,
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Integer(_) | Value::Double(_) => ValueKind::Numeric,
            Value::Text(_) => ValueKind::Text,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Bytes(_) => ValueKind::Bytes,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the tag participates in a total value order usable for range
    /// reasoning (contradiction elimination requires this).
    pub fn is_orderable_scalar(&self) -> bool {
        matches!(
            self.kind(),
            ValueKind::Numeric | ValueKind::Text | ValueKind::Timestamp
        )
    }

    /// Numeric view, promoting integers. None for non-numeric tags.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Total order over all values.
    pub fn compare(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Double(a), Double(b)) => a.total_cmp(b),
            (Integer(a), Double(b)) => (*a as f64).total_cmp(b),
            (Double(a), Integer(b)) => a.total_cmp(&(*b as f64)),
            (Text(a), Text(b)) => a.cmp(b),
            (Bytes(a), Bytes(b)) => a.cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            _ => self.kind().rank().cmp(&other.kind().rank()),
        }
    }

    /// Canonical display form used in structural keys and explain output.
    pub fn render(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Double(d) => format!("{d:?}"),
            Value::Text(s) => format!("\"{s}\""),
            Value::Bytes(b) => format!("0x{}", hex_string(b)),
            Value::Timestamp(ts) => ts.to_string(),
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash must agree with Eq: Integer(1) == Double(1.0), so numerics
        // hash through a canonical form (integral doubles as i64).
        self.kind().rank().hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Double(d) => {
                if d.fract() == 0.0 && *d >= i64::MIN as f64 && *d <= i64::MAX as f64 {
                    (*d as i64).hash(state);
                } else {
                    d.to_bits().hash(state);
                }
            }
            Value::Text(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::Timestamp(ts) => ts.as_micros().hash(state),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Timestamp> for Value {
    fn from(v: Timestamp) -> Self {
        Value::Timestamp(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(v: &Value) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_null_sorts_first() {
        let values = [
            Value::Bool(false),
            Value::Integer(-5),
            Value::Text("a".into()),
            Value::Bytes(vec![0]),
            Value::Timestamp(Timestamp::from_micros(0)),
        ];
        for v in &values {
            assert_eq!(Value::Null.compare(v), Ordering::Less);
            assert_eq!(v.compare(&Value::Null), Ordering::Greater);
        }
    }

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(Value::Integer(1), Value::Double(1.0));
        assert!(Value::Integer(2) > Value::Double(1.5));
        assert!(Value::Double(0.5) < Value::Integer(1));
    }

    #[test]
    fn test_tag_rank_order() {
        assert!(Value::Bool(true) < Value::Integer(0));
        assert!(Value::Integer(i64::MAX) < Value::Text(String::new()));
        assert!(Value::Text("zzz".into()) < Value::Timestamp(Timestamp::from_micros(i64::MIN)));
        assert!(Value::Timestamp(Timestamp::from_micros(i64::MAX)) < Value::Bytes(vec![]));
    }

    #[test]
    fn test_hash_consistent_with_eq() {
        assert_eq!(hash_of(&Value::Integer(7)), hash_of(&Value::Double(7.0)));
        assert_ne!(hash_of(&Value::Integer(7)), hash_of(&Value::Double(7.5)));
    }

    #[test]
    fn test_text_ordering() {
        assert!(Value::Text("abc".into()) < Value::Text("abd".into()));
        assert!(Value::Text("ab".into()) < Value::Text("abc".into()));
    }

    #[test]
    fn test_render_stable() {
        assert_eq!(Value::Integer(5).render(), "5");
        assert_eq!(Value::Text("x".into()).render(), "\"x\"");
        assert_eq!(Value::Null.render(), "null");
        assert_eq!(Value::Bytes(vec![0xab, 0x01]).render(), "0xab01");
    }
}
