//! Property bag values
//!
//! A `PropValue` is the arbitrarily nested mapping/sequence/scalar structure
//! a construct carries, with two extra leaves the core understands:
//! - `Token`: a deferred value replaced at resolution time
//! - `Concat`: a string built from resolved fragments (structural
//!   interpolation, no text markers survive into the tree)

use std::collections::BTreeMap;

use serde_json::{Number, Value};

use crate::token::Token;

/// Nested property value, possibly containing deferred tokens
#[derive(Debug, Clone)]
pub enum PropValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<PropValue>),
    Mapping(BTreeMap<String, PropValue>),
    Token(Token),
    /// String concatenation of resolved fragments
    Concat(Vec<PropValue>),
}

impl PropValue {
    /// Build a mapping from key/value pairs (insertion collapses to key order)
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, PropValue)>,
    {
        PropValue::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// Build a sequence
    pub fn array<I: IntoIterator<Item = PropValue>>(items: I) -> Self {
        PropValue::Sequence(items.into_iter().collect())
    }

    /// Build a concat expression from fragments
    pub fn concat<I: IntoIterator<Item = PropValue>>(fragments: I) -> Self {
        PropValue::Concat(fragments.into_iter().collect())
    }

    /// True if this value is a token leaf
    pub fn is_token(&self) -> bool {
        matches!(self, PropValue::Token(_))
    }

    /// Short name of the variant, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            PropValue::Null => "null",
            PropValue::Bool(_) => "bool",
            PropValue::Number(_) => "number",
            PropValue::String(_) => "string",
            PropValue::Sequence(_) => "sequence",
            PropValue::Mapping(_) => "mapping",
            PropValue::Token(_) => "token",
            PropValue::Concat(_) => "concat",
        }
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Number(Number::from(v))
    }
}

impl From<u64> for PropValue {
    fn from(v: u64) -> Self {
        PropValue::Number(Number::from(v))
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        match Number::from_f64(v) {
            Some(n) => PropValue::Number(n),
            None => PropValue::Null, // NaN/inf have no JSON form
        }
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::String(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::String(v)
    }
}

impl From<Token> for PropValue {
    fn from(v: Token) -> Self {
        PropValue::Token(v)
    }
}

impl From<Vec<PropValue>> for PropValue {
    fn from(v: Vec<PropValue>) -> Self {
        PropValue::Sequence(v)
    }
}

impl From<Value> for PropValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => PropValue::Null,
            Value::Bool(b) => PropValue::Bool(b),
            Value::Number(n) => PropValue::Number(n),
            Value::String(s) => PropValue::String(s),
            Value::Array(items) => {
                PropValue::Sequence(items.into_iter().map(PropValue::from).collect())
            }
            Value::Object(map) => PropValue::Mapping(
                map.into_iter().map(|(k, v)| (k, PropValue::from(v))).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_conversions() {
        assert!(matches!(PropValue::from(true), PropValue::Bool(true)));
        assert!(matches!(PropValue::from(42i64), PropValue::Number(_)));
        assert!(matches!(PropValue::from("x"), PropValue::String(_)));
        assert!(matches!(PropValue::from(f64::NAN), PropValue::Null));
    }

    #[test]
    fn object_builder_preserves_entries() {
        let v = PropValue::object([("b", PropValue::from(1i64)), ("a", PropValue::from(2i64))]);
        match v {
            PropValue::Mapping(map) => {
                assert_eq!(map.len(), 2);
                assert!(map.contains_key("a"));
                assert!(map.contains_key("b"));
            }
            other => panic!("expected mapping, got {}", other.kind_name()),
        }
    }

    #[test]
    fn json_value_roundtrips_into_prop_value() {
        let v = PropValue::from(json!({
            "name": "vpc",
            "cidrs": ["10.0.0.0/16", "10.1.0.0/16"],
            "count": 2,
            "nested": {"deep": null}
        }));

        match v {
            PropValue::Mapping(map) => {
                assert!(matches!(map.get("name"), Some(PropValue::String(_))));
                assert!(matches!(map.get("cidrs"), Some(PropValue::Sequence(s)) if s.len() == 2));
                assert!(matches!(map.get("nested"), Some(PropValue::Mapping(_))));
            }
            other => panic!("expected mapping, got {}", other.kind_name()),
        }
    }

    #[test]
    fn kind_names_cover_all_variants() {
        assert_eq!(PropValue::Null.kind_name(), "null");
        assert_eq!(PropValue::array([]).kind_name(), "sequence");
        assert_eq!(PropValue::concat([]).kind_name(), "concat");
    }
}
