use serde::{Deserialize, Serialize};

use super::UNSAVED_ID;

/// A recipe category ("Desserts", "Seafood")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,

    /// At most 50 characters
    pub description: Option<String>,
}

impl Category {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: UNSAVED_ID,
            description: Some(description.into()),
        }
    }
}
