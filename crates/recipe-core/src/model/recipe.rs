use serde::{Deserialize, Serialize};

use super::decimal::Decimal;
use super::UNSAVED_ID;

/// A recipe row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Store-generated key (0 before the recipe is added to a context)
    pub id: i64,

    /// Display title, at most 1024 characters
    pub title: String,

    /// How many servings the recipe makes, e.g. `4.00`
    pub serving_quantity: Option<Decimal>,

    /// Unit of the serving quantity, e.g. "Bites"
    pub serving_measure: Option<String>,
}

impl Recipe {
    /// Create an unsaved recipe with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: UNSAVED_ID,
            title: title.into(),
            serving_quantity: None,
            serving_measure: None,
        }
    }

    /// Set the serving quantity and measure
    pub fn with_servings(mut self, quantity: Decimal, measure: impl Into<String>) -> Self {
        self.serving_quantity = Some(quantity);
        self.serving_measure = Some(measure.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_recipe_is_unsaved() {
        let recipe = Recipe::new("Add Test");
        assert_eq!(recipe.id, UNSAVED_ID);
        assert_eq!(recipe.title, "Add Test");
        assert!(recipe.serving_quantity.is_none());
    }

    #[test]
    fn test_with_servings() {
        let recipe = Recipe::new("Add Test").with_servings(Decimal::from_whole(42), "Bites");
        assert_eq!(recipe.serving_quantity, Some(Decimal::from_whole(42)));
        assert_eq!(recipe.serving_measure.as_deref(), Some("Bites"));
    }
}
