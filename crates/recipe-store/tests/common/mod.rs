#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use recipe_core::model::{Direction, Ingredient, Recipe};
use recipe_store::{RecipeContext, Tracked};

/// A fresh private in-memory store
pub fn context() -> RecipeContext {
    RecipeContext::in_memory().expect("in-memory context")
}

/// Store name unique within the test process
pub fn unique_name(prefix: &str) -> String {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    format!(
        "{}_{}_{}",
        prefix,
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    )
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Add an unsaved recipe with `lines` ingredients and `lines` directions
pub fn add_recipe_with_lines(ctx: &mut RecipeContext, title: &str, lines: usize) -> Tracked<Recipe> {
    let recipe = ctx.add_recipe(Recipe::new(title));
    for n in 1..=lines {
        ctx.add_ingredient(
            &recipe,
            Ingredient::new(n as i32, n.to_string(), "c", format!("ingredient {}", n)),
        )
        .expect("add ingredient");
        ctx.add_direction(&recipe, Direction::new(n as i64, format!("step {}", n)))
            .expect("add direction");
    }
    recipe
}
