//! Seed importer
//!
//! Writes a parsed seed through a `RecipeContext`, so the rows go through
//! the same validation, batching and retry as any other save. Categories
//! already stored under the same description are reused.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use recipe_core::model::{Category, Decimal, Direction, Ingredient, Recipe};
use recipe_core::{log_op_end, log_op_error, log_op_start};
use sha2::{Digest, Sha256};

use crate::context::{Filter, RecipeContext, SaveReport, Tracked};
use crate::errors::{seed_validation, Result};
use crate::schema::category;
use crate::seed::format_v0::{SeedRecipe, SeedV0};
use crate::seed::parser::{parse_seed_str, validate_seed};

/// Outcome of one import
#[derive(Debug, Clone)]
pub struct SeedReport {
    /// SHA-256 of the seed text
    pub digest: String,
    pub recipes: usize,
    pub categories_created: usize,
    pub categories_reused: usize,
    pub save: SaveReport,
}

/// Import a seed file
///
/// # Errors
/// Read and validation errors from the parser, then as `import_seed`.
pub fn import_seed_file(ctx: &mut RecipeContext, path: &Path) -> Result<SeedReport> {
    let content =
        std::fs::read_to_string(path).map_err(|e| crate::errors::io_error("read_seed", e))?;
    let seed = parse_seed_str(&content)?;
    let digest = hex::encode(Sha256::digest(content.as_bytes()));
    import_seed(ctx, &seed, digest)
}

/// Import a parsed seed in one save
///
/// The context must have no pending changes, so the save writes the seed
/// and nothing else.
///
/// # Errors
/// `InvalidInput` when the context has pending changes or a recipe names
/// a category that is neither declared nor stored, then any error of
/// `save_changes`.
pub fn import_seed(ctx: &mut RecipeContext, seed: &SeedV0, digest: String) -> Result<SeedReport> {
    let start = Instant::now();
    log_op_start!("seed_import", digest = digest.as_str());

    let result = import_inner(ctx, seed, digest);
    match &result {
        Ok(report) => {
            log_op_end!(
                "seed_import",
                duration_ms = start.elapsed().as_millis() as u64,
                recipes = report.recipes,
                categories_created = report.categories_created
            );
        }
        Err(err) => {
            log_op_error!(
                "seed_import",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
        }
    }
    result
}

fn import_inner(ctx: &mut RecipeContext, seed: &SeedV0, digest: String) -> Result<SeedReport> {
    if ctx.has_changes() {
        return Err(seed_validation(
            "The context has unsaved changes; save or discard them before importing",
        ));
    }
    validate_seed(seed)?;

    // A failed import must not leave part of the seed tracked
    let result = stage_and_save(ctx, seed, digest);
    if result.is_err() {
        ctx.detach_all();
    }
    result
}

fn stage_and_save(ctx: &mut RecipeContext, seed: &SeedV0, digest: String) -> Result<SeedReport> {

    let mut wanted: Vec<&str> = seed.categories.iter().map(String::as_str).collect();
    for recipe in &seed.recipes {
        for name in &recipe.categories {
            if !wanted.contains(&name.as_str()) {
                wanted.push(name);
            }
        }
    }

    let mut categories: HashMap<String, Tracked<Category>> = HashMap::new();
    if !wanted.is_empty() {
        let stored = ctx
            .categories()
            .filter(Filter::is_in(category::DESCRIPTION, wanted.iter().map(|s| s.to_string())))
            .to_list()?;
        for handle in stored {
            let description = handle.borrow().description.clone();
            if let Some(description) = description {
                categories.entry(description).or_insert(handle);
            }
        }
    }
    let categories_reused = categories.len();

    for recipe in &seed.recipes {
        for name in &recipe.categories {
            if !categories.contains_key(name) && !seed.categories.contains(name) {
                return Err(seed_validation(format!(
                    "Recipe '{}' names unknown category '{}'",
                    recipe.title, name
                )));
            }
        }
    }

    let mut categories_created = 0;
    for name in &seed.categories {
        if !categories.contains_key(name) {
            let handle = ctx.add_category(Category::new(name.clone()));
            categories.insert(name.clone(), handle);
            categories_created += 1;
        }
    }

    for seed_recipe in &seed.recipes {
        add_recipe(ctx, seed_recipe, &categories)?;
    }

    let save = ctx.save_changes()?;
    Ok(SeedReport {
        digest,
        recipes: seed.recipes.len(),
        categories_created,
        categories_reused,
        save,
    })
}

fn add_recipe(
    ctx: &mut RecipeContext,
    seed_recipe: &SeedRecipe,
    categories: &HashMap<String, Tracked<Category>>,
) -> Result<()> {
    let mut recipe = Recipe::new(seed_recipe.title.clone());
    if let Some(quantity) = &seed_recipe.serving_quantity {
        recipe.serving_quantity = Some(quantity.parse::<Decimal>()?);
    }
    recipe.serving_measure = seed_recipe.serving_measure.clone();
    let handle = ctx.add_recipe(recipe);

    for (position, line) in seed_recipe.ingredients.iter().enumerate() {
        let sort_order = match line.sort_order {
            Some(order) => order,
            None => i32::try_from(position + 1).unwrap_or(i32::MAX),
        };
        let mut ingredient = Ingredient::new(sort_order, "", "", line.description.clone());
        ingredient.units = line.units.clone();
        ingredient.unit_type = line.unit_type.clone();
        ctx.add_ingredient(&handle, ingredient)?;
    }

    for (line_number, text) in (1_i64..).zip(&seed_recipe.directions) {
        ctx.add_direction(&handle, Direction::new(line_number, text.clone()))?;
    }

    for name in &seed_recipe.categories {
        let category = categories.get(name).ok_or_else(|| {
            seed_validation(format!(
                "Recipe '{}' names unknown category '{}'",
                seed_recipe.title, name
            ))
        })?;
        ctx.link_category(&handle, category)?;
    }
    Ok(())
}
