//! Kubernetes `IntOrString` handling.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A field holding either a port number or a port name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntOrString {
    Int(i64),
    String(String),
}

impl IntOrString {
    /// Decide between number and name: an all-digit string is a number.
    pub fn unmarshal(value: Option<&str>) -> Option<Self> {
        let value = value?;
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = value.parse::<i64>() {
                return Some(IntOrString::Int(n));
            }
        }
        Some(IntOrString::String(value.to_string()))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            IntOrString::Int(n) => Some(*n),
            IntOrString::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            IntOrString::Int(_) => None,
            IntOrString::String(s) => Some(s),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            IntOrString::Int(n) => Value::from(*n),
            IntOrString::String(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for IntOrString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntOrString::Int(n) => write!(f, "{}", n),
            IntOrString::String(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmarshal() {
        assert_eq!(IntOrString::unmarshal(Some("8")), Some(IntOrString::Int(8)));
        assert_eq!(
            IntOrString::unmarshal(Some("asdf")),
            Some(IntOrString::String("asdf".to_string()))
        );
        assert_eq!(IntOrString::unmarshal(None), None);
    }

    #[test]
    fn test_signs_and_blanks_stay_strings() {
        assert_eq!(
            IntOrString::unmarshal(Some("-1")),
            Some(IntOrString::String("-1".to_string()))
        );
        assert_eq!(
            IntOrString::unmarshal(Some("")),
            Some(IntOrString::String(String::new()))
        );
    }

    #[test]
    fn test_to_value() {
        assert_eq!(IntOrString::Int(80).to_value(), serde_json::json!(80));
        assert_eq!(
            IntOrString::String("http".into()).to_value(),
            serde_json::json!("http")
        );
    }
}
