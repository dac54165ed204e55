//! Recipe Core - entity model, validation and shared facilities
//!
//! This crate provides the pieces of the recipe book that do not touch
//! the database:
//! - Recipe, Ingredient, Direction, Category and RecipeCategory records
//! - Field limits and validation rules
//! - Fixed-point `Decimal` for serving quantities
//! - The structured error facility (`ExError`)
//! - The logging facility (profiles, op macros, test capture)

pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod rules;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, RecipeError, Result};
pub use model::{Category, Decimal, Direction, Ingredient, Recipe, RecipeCategory};
