//! Seed parser with validation
//!
//! Checks what can be checked without a store: schema version, recipe
//! titles, sort order uniqueness and serving quantities. Category
//! references are resolved by the importer, which can see stored rows.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use recipe_core::model::Decimal;

use crate::errors::{seed_validation, Result};
use crate::seed::format_v0::SeedV0;

/// Parse a seed file from a path
///
/// # Errors
/// `Io` when the file cannot be read, `InvalidInput` for malformed YAML or
/// a seed that fails validation.
pub fn parse_seed_file(path: &Path) -> Result<SeedV0> {
    let content = fs::read_to_string(path).map_err(|e| crate::errors::io_error("read_seed", e))?;
    parse_seed_str(&content)
}

/// Parse a seed from a string
///
/// # Errors
/// `InvalidInput` for malformed YAML or a seed that fails validation.
pub fn parse_seed_str(content: &str) -> Result<SeedV0> {
    let seed: SeedV0 = serde_yaml::from_str(content)
        .map_err(|e| seed_validation(format!("YAML parse error: {}", e)))?;
    validate_seed(&seed)?;
    Ok(seed)
}

pub(crate) fn validate_seed(seed: &SeedV0) -> Result<()> {
    if seed.schema_version != 0 {
        return Err(seed_validation(format!(
            "Unsupported schema_version: {}. Expected 0",
            seed.schema_version
        )));
    }

    let mut declared = HashSet::new();
    for category in &seed.categories {
        if category.trim().is_empty() {
            return Err(seed_validation("Category description is empty"));
        }
        if !declared.insert(category.as_str()) {
            return Err(seed_validation(format!("Duplicate category '{}'", category)));
        }
    }

    let mut titles = HashSet::new();
    for recipe in &seed.recipes {
        if !titles.insert(recipe.title.as_str()) {
            return Err(seed_validation(format!("Duplicate recipe '{}'", recipe.title)));
        }

        if let Some(quantity) = &recipe.serving_quantity {
            quantity.parse::<Decimal>().map_err(|e| {
                seed_validation(format!("Recipe '{}': {}", recipe.title, e))
            })?;
        }

        let mut sort_orders = HashSet::new();
        for ingredient in &recipe.ingredients {
            if let Some(order) = ingredient.sort_order {
                if !sort_orders.insert(order) {
                    return Err(seed_validation(format!(
                        "Duplicate sort_order {} in recipe '{}'",
                        order, recipe.title
                    )));
                }
            }
        }

        let mut linked = HashSet::new();
        for category in &recipe.categories {
            if !linked.insert(category.as_str()) {
                return Err(seed_validation(format!(
                    "Recipe '{}' lists category '{}' twice",
                    recipe.title, category
                )));
            }
        }
    }

    Ok(())
}
