use serde::{Deserialize, Serialize};

use super::UNSAVED_ID;

/// One ingredient line of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,

    /// Display position within the recipe
    pub sort_order: Option<i32>,

    /// Amount, kept as text ("1 1/2", "2-3")
    pub units: Option<String>,

    /// Unit of measure ("cup", "pn")
    pub unit_type: Option<String>,

    pub description: Option<String>,

    /// Owning recipe
    pub recipe_id: Option<i64>,
}

impl Ingredient {
    /// Create an unsaved ingredient line
    pub fn new(
        sort_order: i32,
        units: impl Into<String>,
        unit_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: UNSAVED_ID,
            sort_order: Some(sort_order),
            units: Some(units.into()),
            unit_type: Some(unit_type.into()),
            description: Some(description.into()),
            recipe_id: None,
        }
    }

    /// Render the line the way a recipe card shows it
    pub fn display_line(&self) -> String {
        format!(
            "{} {}: {}",
            self.units.as_deref().unwrap_or(""),
            self.unit_type.as_deref().unwrap_or(""),
            self.description.as_deref().unwrap_or("")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_line() {
        let ingredient = Ingredient::new(1, "2", "cup", "flour");
        assert_eq!(ingredient.display_line(), "2 cup: flour");
    }

    #[test]
    fn test_display_line_with_missing_parts() {
        let mut ingredient = Ingredient::new(1, "", "", "salt");
        ingredient.units = None;
        ingredient.unit_type = None;
        assert_eq!(ingredient.display_line(), " : salt");
    }
}
