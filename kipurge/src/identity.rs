//! `library:name` identities for symbols and footprints.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::PurgeError;

/// Separates the library namespace from the item name.
pub const LIBRARY_DELIMITER: char = ':';

/// A library-qualified symbol or footprint name such as `Device:R`.
///
/// The library part never contains [`LIBRARY_DELIMITER`]; the name may, since
/// parsing splits on the first delimiter only. Equality is byte-exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedId {
    library: String,
    name: String,
}

impl QualifiedId {
    pub fn new(library: impl Into<String>, name: impl Into<String>) -> Result<Self, PurgeError> {
        let library = library.into();
        let name = name.into();
        if library.is_empty() || name.is_empty() || library.contains(LIBRARY_DELIMITER) {
            return Err(PurgeError::MalformedIdentity {
                raw: format!("{}{}{}", library, LIBRARY_DELIMITER, name),
            });
        }
        Ok(Self { library, name })
    }

    pub fn parse(raw: &str) -> Result<Self, PurgeError> {
        let malformed = || PurgeError::MalformedIdentity { raw: raw.to_string() };
        let (library, name) = raw.split_once(LIBRARY_DELIMITER).ok_or_else(malformed)?;
        if library.is_empty() || name.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            library: library.to_string(),
            name: name.to_string(),
        })
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Report ordering: case-insensitive, ties broken byte-wise so the order
    /// stays total.
    pub fn report_cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.to_string(), other.to_string());
        a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(&b))
    }
}

impl fmt::Display for QualifiedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.library, LIBRARY_DELIMITER, self.name)
    }
}

impl FromStr for QualifiedId {
    type Err = PurgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for QualifiedId {
    type Error = PurgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<QualifiedId> for String {
    fn from(id: QualifiedId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_on_first_delimiter() {
        let id = QualifiedId::parse("Connector:Conn_01x02:Alt").unwrap();
        assert_eq!(id.library(), "Connector");
        assert_eq!(id.name(), "Conn_01x02:Alt");
        assert_eq!(id.to_string(), "Connector:Conn_01x02:Alt");
    }

    #[test]
    fn test_format_then_parse_is_lossless() {
        for (lib, name) in [("LIBA", "Foo"), ("00_project_library", "+3V3"), ("a", "b:c d")] {
            let id = QualifiedId::new(lib, name).unwrap();
            assert_eq!(QualifiedId::parse(&id.to_string()).unwrap(), id);
        }
    }

    #[test]
    fn test_malformed_identities() {
        for raw in ["NoDelimiter", ":Foo", "LIBA:", ""] {
            assert!(
                matches!(QualifiedId::parse(raw), Err(PurgeError::MalformedIdentity { .. })),
                "{raw:?} should be rejected"
            );
        }
        assert!(QualifiedId::new("A:B", "C").is_err());
    }

    #[test]
    fn test_equality_is_case_sensitive() {
        assert_ne!(QualifiedId::parse("LIBA:foo").unwrap(), QualifiedId::parse("LIBA:Foo").unwrap());
    }

    #[test]
    fn test_report_order_ignores_case() {
        let mut ids: Vec<QualifiedId> = ["b:x", "A:y", "a:z", "B:w"]
            .iter()
            .map(|s| QualifiedId::parse(s).unwrap())
            .collect();
        ids.sort_by(QualifiedId::report_cmp);
        let rendered: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["A:y", "a:z", "B:w", "b:x"]);
    }

    #[test]
    fn test_serializes_as_string() {
        let id = QualifiedId::parse("LIBB:X").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"LIBB:X\"");
        let back: QualifiedId = serde_json::from_str("\"LIBB:X\"").unwrap();
        assert_eq!(back, id);
    }
}
