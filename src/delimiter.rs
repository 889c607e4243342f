//! Delimiter resolution
//!
//! Maps symbolic delimiter names to the literal separator. Anything that is
//! not a known name is treated as the literal delimiter itself.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Known delimiter names and the separators they stand for
const NAMED_DELIMITERS: &[(&str, &str)] = &[
    ("comma", ","),
    ("tab", "\t"),
    ("semicolon", ";"),
    ("pipe", "|"),
    ("space", " "),
];

/// Resolve a delimiter name (case-insensitive) or pass a literal through
pub fn resolve(name: &str) -> String {
    NAMED_DELIMITERS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map_or_else(|| name.to_string(), |(_, literal)| (*literal).to_string())
}

/// A resolved field separator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Delimiter(String);

impl Delimiter {
    /// Resolve a symbolic name or literal into a delimiter
    pub fn new(name_or_literal: &str) -> Self {
        Self(resolve(name_or_literal))
    }

    /// The resolved separator text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The separator as the single byte the CSV codec splits on
    pub fn as_byte(&self) -> Result<u8> {
        match self.0.as_bytes() {
            [byte] => Ok(*byte),
            _ => Err(Error::invalid_request(format!(
                "delimiter {:?} must be a single byte",
                self.0
            ))),
        }
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self(",".to_string())
    }
}

impl From<String> for Delimiter {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&str> for Delimiter {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Delimiter> for String {
    fn from(value: Delimiter) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("comma", ",")]
    #[test_case("TAB", "\t")]
    #[test_case("Semicolon", ";")]
    #[test_case("pipe", "|")]
    #[test_case("space", " ")]
    fn test_resolve_named(name: &str, expected: &str) {
        assert_eq!(resolve(name), expected);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        assert_eq!(resolve("comma"), resolve("comma"));
        assert_eq!(resolve(&resolve("tab")), "\t");
    }

    #[test_case("#")]
    #[test_case("::")]
    #[test_case("colon")]
    fn test_resolve_unknown_passthrough(literal: &str) {
        assert_eq!(resolve(literal), literal);
    }

    #[test]
    fn test_as_byte() {
        assert_eq!(Delimiter::new("pipe").as_byte().unwrap(), b'|');
        assert_eq!(Delimiter::new("#").as_byte().unwrap(), b'#');
        let err = Delimiter::new("::").as_byte().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_deserialize_resolves_names() {
        let d: Delimiter = serde_yaml::from_str("semicolon").unwrap();
        assert_eq!(d.as_str(), ";");
    }
}
