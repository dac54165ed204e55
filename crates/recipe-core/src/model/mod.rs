//! Entity records
//!
//! Plain data, one struct per table. Relationships are expressed through
//! key fields only; related rows are fetched explicitly through the
//! context rather than through navigation properties.

pub mod category;
pub mod decimal;
pub mod direction;
pub mod ingredient;
pub mod limits;
pub mod recipe;
pub mod recipe_category;

pub use category::Category;
pub use decimal::Decimal;
pub use direction::Direction;
pub use ingredient::Ingredient;
pub use recipe::Recipe;
pub use recipe_category::RecipeCategory;

/// Key value of an entity that has never been handed to a context
pub const UNSAVED_ID: i64 = 0;

/// Whether a key was assigned by the store
///
/// Keys are positive once persisted; the context uses negative values as
/// temporary keys for entities added but not yet saved.
pub fn is_store_generated(id: i64) -> bool {
    id > 0
}
