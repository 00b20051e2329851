//! Typed document values.
//!
//! `Value` is the in-memory representation of document fields as seen by the
//! query layer: predicates compare against values, and index bounds are
//! intervals over values. The ordering implemented here is the canonical
//! index-key ordering, so interval arithmetic can rely on `Ord` directly.

#![allow(clippy::match_same_arms)]

use std::cmp::Ordering;
use std::fmt::{self, Display};

use bytes::Bytes;

/// Canonical type class of a [`Value`].
///
/// Values order first by type class, then within the class. `MinKey` and
/// `MaxKey` are sentinels that sort below and above every other value and
/// are used for unbounded interval endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeClass {
    /// Sorts before every other value.
    MinKey,
    /// Missing / explicit null.
    Null,
    /// `Int` and `Double` share one class and compare numerically.
    Numeric,
    /// UTF-8 text.
    Text,
    /// Embedded document.
    Object,
    /// Array of values.
    Array,
    /// Raw bytes.
    Bytes,
    /// Boolean.
    Bool,
    /// Sorts after every other value.
    MaxKey,
}

/// A typed document value.
///
/// Note: `Double` uses total ordering (NaN < -Inf < values < +Inf) so that
/// values can serve as index-key interval endpoints.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Sentinel below all values.
    MinKey,
    /// Null.
    #[default]
    Null,
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point (IEEE 754 double precision).
    Double(f64),
    /// UTF-8 text string.
    Text(String),
    /// Embedded document (field order preserved).
    Object(Vec<(String, Value)>),
    /// Array of values.
    Array(Vec<Value>),
    /// Raw bytes (base64 encoded in JSON).
    Bytes(Bytes),
    /// Boolean value.
    Bool(bool),
    /// Sentinel above all values.
    MaxKey,
}

/// Total ordering for f64 values.
///
/// NaN < -Inf < negative values < -0.0 < +0.0 < positive values < +Inf
fn total_cmp_f64(a: f64, b: f64) -> Ordering {
    let a_bits = a.to_bits();
    let b_bits = b.to_bits();

    // Flip sign bit for negatives to get correct ordering
    let a_key = if a.is_sign_negative() {
        !a_bits
    } else {
        a_bits ^ (1u64 << 63)
    };

    let b_key = if b.is_sign_negative() {
        !b_bits
    } else {
        b_bits ^ (1u64 << 63)
    };

    a_key.cmp(&b_key)
}

impl Value {
    /// Returns the canonical type class of this value.
    pub fn type_class(&self) -> TypeClass {
        match self {
            Value::MinKey => TypeClass::MinKey,
            Value::Null => TypeClass::Null,
            Value::Int(_) | Value::Double(_) => TypeClass::Numeric,
            Value::Text(_) => TypeClass::Text,
            Value::Object(_) => TypeClass::Object,
            Value::Array(_) => TypeClass::Array,
            Value::Bytes(_) => TypeClass::Bytes,
            Value::Bool(_) => TypeClass::Bool,
            Value::MaxKey => TypeClass::MaxKey,
        }
    }

    /// Returns true if this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value is `Int` or `Double`.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Double(_))
    }

    /// Returns true if this value is an `Array`.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns the numeric value as f64, if this is `Int` or `Double`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the array elements, if this is an `Array`.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(elems) => Some(elems),
            _ => None,
        }
    }

    /// Converts a JSON document value into a typed value.
    ///
    /// Integers map to `Int`, other numbers to `Double`. The extended
    /// representations `{"$minKey": 1}` and `{"$maxKey": 1}` map to the
    /// corresponding sentinels.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Value::Double(n.as_f64().unwrap_or(f64::NAN)), Value::Int),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(elems) => {
                Value::Array(elems.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                if map.len() == 1 {
                    if map.contains_key("$minKey") {
                        return Value::MinKey;
                    }
                    if map.contains_key("$maxKey") {
                        return Value::MaxKey;
                    }
                }
                Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), Value::from_json(v)))
                        .collect(),
                )
            }
        }
    }

    /// Converts this value to JSON.
    ///
    /// Non-finite doubles become JSON null; bytes are base64 encoded.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::MinKey => serde_json::json!({ "$minKey": 1 }),
            Value::Null => serde_json::Value::Null,
            Value::Int(v) => serde_json::Value::Number((*v).into()),
            Value::Double(v) => serde_json::Number::from_f64(*v)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Array(elems) => {
                serde_json::Value::Array(elems.iter().map(Value::to_json).collect())
            }
            Value::Bytes(b) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(b);
                serde_json::Value::String(encoded)
            }
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::MaxKey => serde_json::json!({ "$maxKey": 1 }),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_class = self.type_class().cmp(&other.type_class());
        if by_class != Ordering::Equal {
            return by_class;
        }

        match (self, other) {
            (Value::MinKey, Value::MinKey)
            | (Value::Null, Value::Null)
            | (Value::MaxKey, Value::MaxKey) => Ordering::Equal,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(a), Value::Double(b)) => total_cmp_f64(*a as f64, *b),
            (Value::Double(a), Value::Int(b)) => total_cmp_f64(*a, *b as f64),
            (Value::Double(a), Value::Double(b)) => total_cmp_f64(*a, *b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Object(a), Value::Object(b)) => {
                for ((ak, av), (bk, bv)) in a.iter().zip(b.iter()) {
                    let by_key = ak.cmp(bk);
                    if by_key != Ordering::Equal {
                        return by_key;
                    }
                    let by_value = av.cmp(bv);
                    if by_value != Ordering::Equal {
                        return by_value;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Array(a), Value::Array(b)) => {
                for (av, bv) in a.iter().zip(b.iter()) {
                    let by_value = av.cmp(bv);
                    if by_value != Ordering::Equal {
                        return by_value;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Bytes(a), Value::Bytes(b)) => a.as_ref().cmp(b.as_ref()),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => unreachable!("type classes already compared equal"),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::MinKey => write!(f, "MinKey"),
            Value::Null => write!(f, "null"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "\"{s}\""),
            Value::Object(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Array(elems) => {
                write!(f, "[")?;
                for (i, v) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::MaxKey => write!(f, "MaxKey"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(elems: Vec<Value>) -> Self {
        Value::Array(elems)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}
