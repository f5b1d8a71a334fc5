//! Dynamic record values
//!
//! Defines the [`Value`] union that record fields carry, along with the
//! literal parsing and coercing-comparison rules the condition evaluator
//! and aggregation engine are built on.
//!
//! Values are dynamically typed: a field may hold a null, boolean, integer,
//! float, string, list (aggregation output only) or nested object. Comparing
//! a numeric value against a string first tries to read the string as a
//! number, and only then falls back to comparing both sides lexically.

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A dynamically typed field value.
///
/// `List` only appears as the output of the `values`/`list` aggregations;
/// `Object` only appears in input records (nested mappings reachable via
/// dot-path lookup).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Parse an unquoted token into a typed literal.
    ///
    /// Recognizes (in order): surrounding quotes, `true`/`false`,
    /// `null`/`none`, integers, floats; anything else stays a string.
    pub fn parse_literal(token: &str) -> Value {
        let token = token.trim();

        if token.len() >= 2 {
            let bytes = token.as_bytes();
            let first = bytes[0];
            let last = bytes[bytes.len() - 1];
            if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
                return Value::Str(token[1..token.len() - 1].to_string());
            }
        }

        if token.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if token.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        if token.eq_ignore_ascii_case("null") || token.eq_ignore_ascii_case("none") {
            return Value::Null;
        }

        if token.contains('.') {
            if let Ok(f) = token.parse::<f64>() {
                return Value::Float(f);
            }
        } else if let Ok(i) = token.parse::<i64>() {
            return Value::Int(i);
        }

        Value::Str(token.to_string())
    }

    /// Numeric view for comparison purposes. Booleans count as 1/0, the
    /// way dynamically typed engines usually treat them.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Numeric view for aggregation: like [`Value::as_number`] but also
    /// accepts numeric strings (`"30"` sums as 30).
    pub fn to_f64_lossy(&self) -> Option<f64> {
        match self {
            Value::Str(s) => s.trim().parse::<f64>().ok(),
            other => other.as_number(),
        }
    }

    /// True for `Null` (a field holding null is treated as absent).
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Total ordering used by sort and the `values`/`min`/`max`
    /// aggregations over mixed-type data: booleans, then numbers, then
    /// strings, then everything else by rendered form. Nulls sort last.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Bool(_) => 0,
                Value::Int(_) | Value::Float(_) => 1,
                Value::Str(_) => 2,
                Value::List(_) | Value::Object(_) => 3,
                Value::Null => 4,
            }
        }

        match rank(self).cmp(&rank(other)) {
            Ordering::Equal => match (self, other) {
                (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
                (Value::Str(a), Value::Str(b)) => a.cmp(b),
                (a, b) => match (a.as_number(), b.as_number()) {
                    (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                    _ => a.to_string().cmp(&b.to_string()),
                },
            },
            unequal => unequal,
        }
    }
}

impl fmt::Display for Value {
    /// Bare rendering: strings print without quotes, null prints as
    /// `null`. Used for the lexical comparison fallback and for table
    /// output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(_) => {
                let json = serde_json::to_string(self).unwrap_or_default();
                write!(f, "{}", json)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// Equal to
    Eq,
    /// Not equal to
    Ne,
    /// Greater than
    Gt,
    /// Greater than or equal to
    Gte,
    /// Less than
    Lt,
    /// Less than or equal to
    Lte,
}

impl CmpOp {
    /// Compare two f64 values
    pub fn compare_f64(&self, a: f64, b: f64) -> bool {
        match self {
            Self::Eq => a == b,
            Self::Ne => a != b,
            Self::Gt => a > b,
            Self::Gte => a >= b,
            Self::Lt => a < b,
            Self::Lte => a <= b,
        }
    }

    /// Compare two strings (lexicographic for ordering operators)
    pub fn compare_str(&self, a: &str, b: &str) -> bool {
        match self {
            Self::Eq => a == b,
            Self::Ne => a != b,
            Self::Gt => a > b,
            Self::Gte => a >= b,
            Self::Lt => a < b,
            Self::Lte => a <= b,
        }
    }

    /// Evaluate `lhs <op> rhs` with type coercion.
    ///
    /// If exactly one side is numeric, the other side is coerced to a
    /// float (token contains `.`) or an int before comparing. When
    /// coercion fails the sides keep their kinds: equality across kinds
    /// is false (`!=` true), and ordering falls back to comparing both
    /// sides rendered as strings.
    pub fn compare_values(&self, lhs: &Value, rhs: &Value) -> bool {
        let lhs = coerce_towards(lhs, rhs);
        let rhs = coerce_towards(rhs, &lhs);

        match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => self.compare_f64(a, b),
            _ => match (&lhs, &rhs) {
                (Value::Str(a), Value::Str(b)) => self.compare_str(a, b),
                (Value::Null, Value::Null) => self.compare_eq_kind(true),
                (a, b) if a == b => self.compare_eq_kind(true),
                (a, b) => match self {
                    Self::Eq => false,
                    Self::Ne => true,
                    _ => self.compare_str(&a.to_string(), &b.to_string()),
                },
            },
        }
    }

    fn compare_eq_kind(&self, equal: bool) -> bool {
        match self {
            Self::Eq | Self::Gte | Self::Lte => equal,
            Self::Ne => !equal,
            Self::Gt | Self::Lt => false,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
        }
    }
}

/// If `target` is numeric and `v` is a string, try to parse `v` as a
/// number (`.` selects float, otherwise int). Returns `v` unchanged in
/// every other case.
fn coerce_towards(v: &Value, target: &Value) -> Value {
    if target.as_number().is_some() {
        if let Value::Str(s) = v {
            let s = s.trim();
            if s.contains('.') {
                if let Ok(f) = s.parse::<f64>() {
                    return Value::Float(f);
                }
            } else if let Ok(i) = s.parse::<i64>() {
                return Value::Int(i);
            }
        }
    }
    v.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal_quoted() {
        assert_eq!(Value::parse_literal("\"NYC\""), Value::Str("NYC".into()));
        assert_eq!(Value::parse_literal("'NYC'"), Value::Str("NYC".into()));
        // Quotes keep inner content verbatim, even if it looks numeric
        assert_eq!(Value::parse_literal("\"42\""), Value::Str("42".into()));
    }

    #[test]
    fn test_parse_literal_typed() {
        assert_eq!(Value::parse_literal("true"), Value::Bool(true));
        assert_eq!(Value::parse_literal("FALSE"), Value::Bool(false));
        assert_eq!(Value::parse_literal("null"), Value::Null);
        assert_eq!(Value::parse_literal("none"), Value::Null);
        assert_eq!(Value::parse_literal("42"), Value::Int(42));
        assert_eq!(Value::parse_literal("-7"), Value::Int(-7));
        assert_eq!(Value::parse_literal("3.5"), Value::Float(3.5));
        assert_eq!(Value::parse_literal("hello"), Value::Str("hello".into()));
    }

    #[test]
    fn test_compare_numeric_transitive() {
        assert!(CmpOp::Eq.compare_values(&Value::Int(5), &Value::Float(5.0)));
        assert!(CmpOp::Gt.compare_values(&Value::Float(5.5), &Value::Int(5)));
        assert!(CmpOp::Lte.compare_values(&Value::Int(5), &Value::Int(5)));
    }

    #[test]
    fn test_compare_coerces_numeric_strings() {
        // "30" coerced to 30 when the other side is numeric
        assert!(CmpOp::Eq.compare_values(&Value::Str("30".into()), &Value::Int(30)));
        assert!(CmpOp::Gt.compare_values(&Value::Int(35), &Value::Str("30".into())));
        assert!(CmpOp::Lt.compare_values(&Value::Str("2.5".into()), &Value::Float(3.0)));
    }

    #[test]
    fn test_compare_coercion_failure_falls_back() {
        // Unparseable string vs number: equality is plain false, ordering
        // compares rendered strings
        assert!(!CmpOp::Eq.compare_values(&Value::Str("abc".into()), &Value::Int(5)));
        assert!(CmpOp::Ne.compare_values(&Value::Str("abc".into()), &Value::Int(5)));
        assert!(CmpOp::Gt.compare_values(&Value::Str("abc".into()), &Value::Int(5)));
    }

    #[test]
    fn test_compare_strings_lexical() {
        assert!(CmpOp::Eq.compare_values(&Value::Str("a".into()), &Value::Str("a".into())));
        assert!(CmpOp::Lt.compare_values(&Value::Str("apple".into()), &Value::Str("banana".into())));
    }

    #[test]
    fn test_sort_cmp_mixed_types() {
        let b = Value::Bool(true);
        let i = Value::Int(10);
        let f = Value::Float(2.5);
        let s = Value::Str("x".into());
        let n = Value::Null;

        assert_eq!(b.sort_cmp(&i), Ordering::Less);
        assert_eq!(f.sort_cmp(&i), Ordering::Less);
        assert_eq!(i.sort_cmp(&s), Ordering::Less);
        assert_eq!(s.sort_cmp(&n), Ordering::Less);
        assert_eq!(i.sort_cmp(&Value::Int(10)), Ordering::Equal);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Str("hi".into()).to_string(), "hi");
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(Value::Float(3.5).to_string(), "3.5");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::Int(2)]).to_string(),
            "[1, 2]"
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let v: Value = serde_json::from_str("{\"a\": 1, \"b\": [1.5, \"x\", null]}").unwrap();
        match &v {
            Value::Object(map) => {
                assert_eq!(map.get("a"), Some(&Value::Int(1)));
                assert_eq!(
                    map.get("b"),
                    Some(&Value::List(vec![
                        Value::Float(1.5),
                        Value::Str("x".into()),
                        Value::Null
                    ]))
                );
            }
            other => panic!("expected object, got {:?}", other),
        }
    }
}
