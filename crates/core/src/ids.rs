//! Record identifier allocation and classification.
//!
//! Records created while offline are keyed by a client-minted temporary id
//! until the remote store assigns the authoritative one during push. The
//! distinction is carried in the type, not re-derived by string inspection
//! at every call site.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix that marks an identifier as client-minted.
const TEMPORARY_PREFIX: &str = "local-";

/// Identifier of a syncable record.
///
/// Temporary ids are minted on the device and never leave it except as the
/// subject of a remote "create". Authoritative ids are assigned by the
/// remote store at creation time and are never minted here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordId {
    Temporary(String),
    Authoritative(String),
}

impl RecordId {
    /// Mint a fresh temporary identifier.
    ///
    /// Works fully offline: a millisecond timestamp plus a random suffix is
    /// enough to keep ids distinct on one device and recognizable by shape.
    pub fn new_temporary() -> Self {
        Self::Temporary(format!(
            "{}{}-{}",
            TEMPORARY_PREFIX,
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        ))
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Temporary(value) | Self::Authoritative(value) => value,
        }
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        if value.starts_with(TEMPORARY_PREFIX) {
            Self::Temporary(value)
        } else {
            Self::Authoritative(value)
        }
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<RecordId> for String {
    fn from(value: RecordId) -> Self {
        match value {
            RecordId::Temporary(inner) | RecordId::Authoritative(inner) => inner,
        }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_are_temporary_and_distinct() {
        let a = RecordId::new_temporary();
        let b = RecordId::new_temporary();
        assert!(a.is_temporary());
        assert!(b.is_temporary());
        assert_ne!(a, b);
    }

    #[test]
    fn classification_is_by_shape_alone() {
        assert!(RecordId::from("local-1714569600000-abc").is_temporary());
        assert!(!RecordId::from("tx_001").is_temporary());
        assert!(!RecordId::from("7d7f9356-9e42-4b7a-9f3a-2a6c0a9d8f11").is_temporary());
    }

    #[test]
    fn serde_round_trips_as_plain_string() {
        let id = RecordId::from("tx_001");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"tx_001\"");
        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let temp = RecordId::new_temporary();
        let json = serde_json::to_string(&temp).unwrap();
        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert!(back.is_temporary());
        assert_eq!(back, temp);
    }
}
