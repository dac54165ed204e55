use crate::errors::{RecipeError, Result};
use crate::model::limits::{
    CATEGORY_DESCRIPTION_MAX, INGREDIENT_DESCRIPTION_MAX, INGREDIENT_UNITS_MAX,
    INGREDIENT_UNIT_TYPE_MAX, RECIPE_SERVING_MEASURE_MAX, RECIPE_TITLE_MAX,
};
use crate::model::{Category, Direction, Ingredient, Recipe};

/// Check a text value against a column length, counting characters
fn check_len(entity: &'static str, field: &'static str, value: &str, max: usize) -> Result<()> {
    let actual = value.chars().count();
    if actual > max {
        return Err(RecipeError::FieldTooLong {
            entity,
            field,
            max,
            actual,
        });
    }
    Ok(())
}

fn check_optional_len(
    entity: &'static str,
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<()> {
    match value {
        Some(v) => check_len(entity, field, v, max),
        None => Ok(()),
    }
}

/// Validate a recipe
///
/// # Errors
/// `FieldRequired` for a blank title, `FieldTooLong` when the title or
/// serving measure exceeds its column.
pub fn validate_recipe(recipe: &Recipe) -> Result<()> {
    if recipe.title.trim().is_empty() {
        return Err(RecipeError::FieldRequired {
            entity: "Recipe",
            field: "title",
        });
    }
    check_len("Recipe", "title", &recipe.title, RECIPE_TITLE_MAX)?;
    check_optional_len(
        "Recipe",
        "serving_measure",
        recipe.serving_measure.as_deref(),
        RECIPE_SERVING_MEASURE_MAX,
    )
}

/// Validate an ingredient line
///
/// # Errors
/// `FieldTooLong` when units, unit type or description exceed 50 characters.
pub fn validate_ingredient(ingredient: &Ingredient) -> Result<()> {
    check_optional_len(
        "Ingredient",
        "units",
        ingredient.units.as_deref(),
        INGREDIENT_UNITS_MAX,
    )?;
    check_optional_len(
        "Ingredient",
        "unit_type",
        ingredient.unit_type.as_deref(),
        INGREDIENT_UNIT_TYPE_MAX,
    )?;
    check_optional_len(
        "Ingredient",
        "description",
        ingredient.description.as_deref(),
        INGREDIENT_DESCRIPTION_MAX,
    )
}

/// Directions carry no length limit; nothing to check beyond the types.
///
/// # Errors
/// Never fails today; kept so every entity goes through the same gate.
pub fn validate_direction(_direction: &Direction) -> Result<()> {
    Ok(())
}

/// Validate a category
///
/// # Errors
/// `FieldTooLong` when the description exceeds 50 characters.
pub fn validate_category(category: &Category) -> Result<()> {
    check_optional_len(
        "Category",
        "description",
        category.description.as_deref(),
        CATEGORY_DESCRIPTION_MAX,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_title_rejected() {
        let err = validate_recipe(&Recipe::new("   ")).unwrap_err();
        assert_eq!(
            err,
            RecipeError::FieldRequired {
                entity: "Recipe",
                field: "title"
            }
        );
    }

    #[test]
    fn test_title_limit_counts_characters_not_bytes() {
        // 1024 two-byte characters is within the limit
        let title: String = "é".repeat(RECIPE_TITLE_MAX);
        assert!(validate_recipe(&Recipe::new(title)).is_ok());
    }

    #[test]
    fn test_long_serving_measure_rejected() {
        let mut recipe = Recipe::new("Soup");
        recipe.serving_measure = Some("x".repeat(51));
        assert!(matches!(
            validate_recipe(&recipe),
            Err(RecipeError::FieldTooLong {
                field: "serving_measure",
                max: 50,
                actual: 51,
                ..
            })
        ));
    }

    #[test]
    fn test_ingredient_fields() {
        assert!(validate_ingredient(&Ingredient::new(0, "1", "pn", "salt")).is_ok());
        let long = Ingredient::new(0, "1", "pn", "s".repeat(60));
        assert!(validate_ingredient(&long).is_err());
    }

    #[test]
    fn test_category_description() {
        assert!(validate_category(&Category::new("Seafood")).is_ok());
        assert!(validate_category(&Category::new("c".repeat(51))).is_err());
    }
}
