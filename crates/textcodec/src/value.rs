//! The dynamic value type shared by every codec.
//!
//! Decoded text becomes a [`Value`]; encoding walks a [`Value`] back into
//! text. Records preserve key insertion order so that a decode/encode round
//! trip reproduces the original key ordering.

use indexmap::IndexMap;
use num_rational::Ratio;

/// An ordered string-keyed mapping. Insertion order is preserved for
/// re-encoding.
pub type Record = IndexMap<String, Value>;

/// Any value a codec can decode or encode.
///
/// # Examples
///
/// ```
/// use textcodec::{Record, Value};
///
/// let mut record = Record::new();
/// record.insert("key".to_string(), Value::Integer(1));
/// let v = Value::Record(record);
/// assert!(v.as_record().is_some());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Rational(Ratio<i64>),
    String(String),
    Array(Vec<Value>),
    Record(Record),
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Ratio<i64>> for Value {
    fn from(v: Ratio<i64>) -> Self {
        Self::Rational(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Self::Record(v)
    }
}

impl Value {
    /// A short noun for error messages: `"null"`, `"integer"`, and so on.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Rational(_) => "rational",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Record(_) => "record",
        }
    }

    /// Returns `true` if the value is [`Null`].
    ///
    /// [`Null`]: Value::Null
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for [`Integer`], [`Float`] and [`Rational`] values.
    ///
    /// [`Integer`]: Value::Integer
    /// [`Float`]: Value::Float
    /// [`Rational`]: Value::Rational
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_) | Self::Rational(_))
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        if let Self::Boolean(v) = self { Some(*v) } else { None }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        if let Self::Integer(v) = self { Some(*v) } else { None }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(v) = self { Some(v) } else { None }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        if let Self::Array(v) = self { Some(v) } else { None }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        if let Self::Record(v) = self { Some(v) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_preserves_insertion_order() {
        let mut record = Record::new();
        record.insert("z".to_string(), Value::Integer(1));
        record.insert("a".to_string(), Value::Integer(2));
        record.insert("m".to_string(), Value::Integer(3));
        let keys: Vec<_> = record.keys().cloned().collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn kind_names() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::Rational(Ratio::new(1, 2)).kind(), "rational");
        assert_eq!(Value::Array(vec![]).kind(), "array");
    }
}
