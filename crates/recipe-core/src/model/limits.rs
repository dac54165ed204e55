//! Column limits
//!
//! Lengths are counted in characters, matching `nvarchar(n)` semantics.

pub const RECIPE_TITLE_MAX: usize = 1024;
pub const RECIPE_SERVING_MEASURE_MAX: usize = 50;

pub const INGREDIENT_UNITS_MAX: usize = 50;
pub const INGREDIENT_UNIT_TYPE_MAX: usize = 50;
pub const INGREDIENT_DESCRIPTION_MAX: usize = 50;

pub const CATEGORY_DESCRIPTION_MAX: usize = 50;

/// Total significant digits of a serving quantity
pub const DECIMAL_PRECISION: u32 = 18;
/// Digits after the decimal point of a serving quantity
pub const DECIMAL_SCALE: u32 = 2;
