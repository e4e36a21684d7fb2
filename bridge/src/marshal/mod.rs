//! Native value model and classifier
//!
//! `NativeValue` is the tagged union used at the conversion boundary. It is
//! never stored inside a wrapper; it exists only while values cross between
//! Rust and the interpreter. `ValueKind` is the classifier output that the
//! conversion engine dispatches on.
//!
//! Conversion is deliberately not a bijection: `Symbol` crosses into Python
//! as a `str` and comes back as `Str`. That asymmetry is part of the contract.

use serde::{Deserialize, Serialize};

pub(crate) mod convert;

/// Host-side representation of a marshallable value
///
/// # Example
/// ```
/// use python_bridge_core_rs::NativeValue;
///
/// let v = NativeValue::List(vec![
///     NativeValue::Int(1),
///     NativeValue::Str("two".to_string()),
/// ]);
/// assert_eq!(v.kind(), python_bridge_core_rs::ValueKind::Sequence);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NativeValue {
    /// UTF-8 text; maps to a Python `str`
    Str(String),

    /// Signed 64-bit integer; maps to a Python `int`
    Int(i64),

    /// Double-precision float; maps to a Python `float`
    Float(f64),

    /// Ordered sequence; maps to a Python `list` unless tuple construction
    /// is explicitly requested via `PyObject::make_tuple`
    List(Vec<NativeValue>),

    /// Symbolic tag; maps to a Python `str` holding the tag's textual form.
    /// Unwrapping always yields `Str`, never `Symbol`.
    Symbol(String),

    /// Ordered key/value pairs; maps to a Python `dict`.
    ///
    /// Pairs rather than a hash map: keys may be floats (no total equality
    /// host-side) and CPython dicts iterate in insertion order, which this
    /// representation preserves in both directions.
    Map(Vec<(NativeValue, NativeValue)>),
}

/// Foreign representation a native value must become
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    /// Scalar text
    Text,
    /// Integer scalar
    Integer,
    /// Floating-point scalar
    Float,
    /// Ordered sequence of values
    Sequence,
    /// Symbolic tag (crosses as text)
    Symbol,
    /// Key/value mapping
    Mapping,
}

impl NativeValue {
    /// Classify this value for conversion dispatch
    pub fn kind(&self) -> ValueKind {
        match self {
            NativeValue::Str(_) => ValueKind::Text,
            NativeValue::Int(_) => ValueKind::Integer,
            NativeValue::Float(_) => ValueKind::Float,
            NativeValue::List(_) => ValueKind::Sequence,
            NativeValue::Symbol(_) => ValueKind::Symbol,
            NativeValue::Map(_) => ValueKind::Mapping,
        }
    }

    /// Text content, if this value is `Str`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, if this value is `Int`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            NativeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float content, if this value is `Float`
    pub fn as_float(&self) -> Option<f64> {
        match self {
            NativeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Sequence elements, if this value is `List`
    pub fn as_list(&self) -> Option<&[NativeValue]> {
        match self {
            NativeValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for NativeValue {
    fn from(s: &str) -> Self {
        NativeValue::Str(s.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(s: String) -> Self {
        NativeValue::Str(s)
    }
}

impl From<i64> for NativeValue {
    fn from(i: i64) -> Self {
        NativeValue::Int(i)
    }
}

impl From<f64> for NativeValue {
    fn from(f: f64) -> Self {
        NativeValue::Float(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_covers_every_kind() {
        assert_eq!(NativeValue::from("s").kind(), ValueKind::Text);
        assert_eq!(NativeValue::from(1i64).kind(), ValueKind::Integer);
        assert_eq!(NativeValue::from(1.5f64).kind(), ValueKind::Float);
        assert_eq!(NativeValue::List(vec![]).kind(), ValueKind::Sequence);
        assert_eq!(
            NativeValue::Symbol("tag".to_string()).kind(),
            ValueKind::Symbol
        );
        assert_eq!(NativeValue::Map(vec![]).kind(), ValueKind::Mapping);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(NativeValue::from("abc").as_str(), Some("abc"));
        assert_eq!(NativeValue::from(42i64).as_int(), Some(42));
        assert_eq!(NativeValue::from(2.5f64).as_float(), Some(2.5));
        assert_eq!(NativeValue::from(42i64).as_str(), None);

        let seq = NativeValue::List(vec![NativeValue::Int(1)]);
        assert_eq!(seq.as_list().map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_serde_round_trip() {
        let v = NativeValue::Map(vec![
            (
                NativeValue::Str("k".to_string()),
                NativeValue::List(vec![NativeValue::Int(1), NativeValue::Float(2.0)]),
            ),
            (
                NativeValue::Symbol("tag".to_string()),
                NativeValue::Str("v".to_string()),
            ),
        ]);

        let json = serde_json::to_string(&v).unwrap();
        let back: NativeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
