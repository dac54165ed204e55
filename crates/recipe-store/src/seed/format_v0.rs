//! Seed format v0
//!
//! ```yaml
//! schema_version: 0
//! categories:
//!   - Seafood
//! recipes:
//!   - title: Grilled Salmon
//!     serving_quantity: "4"
//!     serving_measure: Servings
//!     categories: [Seafood]
//!     ingredients:
//!       - { units: "4", unit_type: ea, description: salmon fillets }
//!     directions:
//!       - Preheat the grill.
//! ```

use serde::{Deserialize, Serialize};

/// Top-level seed file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedV0 {
    /// Must be 0 for this format
    pub schema_version: u32,

    /// Category descriptions to create when missing
    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub recipes: Vec<SeedRecipe>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedRecipe {
    pub title: String,

    /// Decimal literal such as "4" or "1.5"
    #[serde(default)]
    pub serving_quantity: Option<String>,

    #[serde(default)]
    pub serving_measure: Option<String>,

    /// Descriptions of categories declared above or already stored
    #[serde(default)]
    pub categories: Vec<String>,

    /// In display order; a missing sort order is the position in the list
    #[serde(default)]
    pub ingredients: Vec<SeedIngredient>,

    /// Steps in order; line numbers start at 1
    #[serde(default)]
    pub directions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedIngredient {
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub unit_type: Option<String>,
    pub description: String,
}
