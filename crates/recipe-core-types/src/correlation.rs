//! Correlation identifiers
//!
//! A `SessionId` tags everything a single context instance logs, and a
//! `SaveId` ties together the batches and retry attempts of one save.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one context session (UUIDv7, time ordered)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new SessionId
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one `save_changes` call
///
/// Every retry attempt of the same save reuses the id, so the log of a
/// retried save can be reassembled by filtering on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaveId(String);

impl SaveId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SaveId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SaveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_session_ids_sort_by_creation() {
        let first = SessionId::new();
        let second = SessionId::new();
        assert!(first.as_str() <= second.as_str());
    }

    #[test]
    fn test_save_id_display() {
        let id = SaveId::new();
        assert_eq!(format!("{}", id), id.as_str());
    }

    #[test]
    fn test_serialization() {
        let id = SaveId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: SaveId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
