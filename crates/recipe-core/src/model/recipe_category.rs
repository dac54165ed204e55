use serde::{Deserialize, Serialize};

/// Join row linking a recipe to a category
///
/// The pair `(recipe_id, category_id)` is the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipeCategory {
    pub recipe_id: i64,
    pub category_id: i64,
}

impl RecipeCategory {
    pub fn new(recipe_id: i64, category_id: i64) -> Self {
        Self {
            recipe_id,
            category_id,
        }
    }

    /// Composite key
    pub fn key(&self) -> (i64, i64) {
        (self.recipe_id, self.category_id)
    }
}
