use serde::{Deserialize, Serialize};

use super::UNSAVED_ID;

/// One step of a recipe's method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub id: i64,

    /// Step position within the recipe
    pub line_number: i64,

    pub description: Option<String>,

    /// Owning recipe
    pub recipe_id: Option<i64>,
}

impl Direction {
    pub fn new(line_number: i64, description: impl Into<String>) -> Self {
        Self {
            id: UNSAVED_ID,
            line_number,
            description: Some(description.into()),
            recipe_id: None,
        }
    }
}
