//! Field validation rules
//!
//! Run by the context before any SQL is issued for an entity.

pub mod validation;

pub use validation::{
    validate_category, validate_direction, validate_ingredient, validate_recipe,
};
