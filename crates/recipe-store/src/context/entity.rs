//! Mapping between entity records and table rows

use std::fmt::Debug;
use std::hash::Hash;

use recipe_core::errors::{ExError, RecipeError};
use recipe_core::model::{Category, Decimal, Direction, Ingredient, Recipe, RecipeCategory};
use recipe_core::rules;
use rusqlite::types::{Type, Value};
use rusqlite::Row;

use super::tracker::{EntitySet, KeyMap, Tracker};
use crate::schema::{self, category, direction, ingredient, recipe, recipe_category, TableDef};

/// A record stored in one declared table
pub trait Entity: Clone + PartialEq + Debug + 'static {
    type Key: Copy + Eq + Hash + Debug;

    fn table() -> &'static TableDef;

    fn key(&self) -> Self::Key;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn validate(&self) -> Result<(), ExError>;

    /// Key columns paired with the parts of `key`, for WHERE clauses
    fn key_columns(key: Self::Key) -> Vec<(&'static str, Value)>;

    fn key_values(&self) -> Vec<(&'static str, Value)> {
        Self::key_columns(self.key())
    }

    /// Every column written on insert
    fn column_values(&self) -> Vec<(&'static str, Value)>;

    /// Temporary key of an added entity whose key the store generates
    fn temporary_key(&self) -> Option<i64> {
        None
    }

    fn set_key(&mut self, _key: i64) {}

    /// Replace temporary keys, including foreign keys, with assigned ones
    fn remap_keys(&mut self, keys: &KeyMap);

    fn set(tracker: &Tracker) -> &EntitySet<Self>;

    fn set_mut(tracker: &mut Tracker) -> &mut EntitySet<Self>;

    fn name() -> &'static str {
        Self::table().name
    }

    /// `SELECT <columns> FROM <table>`
    fn select_sql() -> String {
        let table = Self::table();
        format!(
            "SELECT {} FROM {}",
            table.column_names().collect::<Vec<_>>().join(", "),
            table.name
        )
    }
}

fn text(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::Text)
}

fn integer(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

fn conversion_error(row: &Row<'_>, column: &str, err: RecipeError) -> rusqlite::Error {
    let index = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

/// Read a serving quantity whatever storage class it ended up in
fn read_decimal(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<Decimal>> {
    let parsed = match row.get::<_, Value>(column)? {
        Value::Null => return Ok(None),
        Value::Text(t) => t.parse(),
        Value::Integer(i) => i
            .checked_mul(100)
            .ok_or_else(|| RecipeError::InvalidDecimal {
                input: i.to_string(),
                reason: "value out of range".to_string(),
            })
            .and_then(Decimal::from_hundredths),
        Value::Real(r) => format!("{:.2}", r).parse(),
        Value::Blob(_) => Err(RecipeError::InvalidDecimal {
            input: "<blob>".to_string(),
            reason: "not a decimal number".to_string(),
        }),
    };
    parsed.map(Some).map_err(|e| conversion_error(row, column, e))
}

impl Entity for Recipe {
    type Key = i64;

    fn table() -> &'static TableDef {
        &schema::RECIPE
    }

    fn key(&self) -> i64 {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Recipe {
            id: row.get(recipe::ID)?,
            title: row.get(recipe::TITLE)?,
            serving_quantity: read_decimal(row, recipe::SERVING_QUANTITY)?,
            serving_measure: row.get(recipe::SERVING_MEASURE)?,
        })
    }

    fn validate(&self) -> Result<(), ExError> {
        rules::validate_recipe(self).map_err(|e| ExError::from(e).with_entity_id(self.id))
    }

    fn key_columns(key: i64) -> Vec<(&'static str, Value)> {
        vec![(recipe::ID, Value::Integer(key))]
    }

    fn column_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            (recipe::TITLE, Value::Text(self.title.clone())),
            (
                recipe::SERVING_QUANTITY,
                self.serving_quantity
                    .map_or(Value::Null, |q| Value::Text(q.to_string())),
            ),
            (recipe::SERVING_MEASURE, text(&self.serving_measure)),
        ]
    }

    fn temporary_key(&self) -> Option<i64> {
        Some(self.id).filter(|id| *id < 0)
    }

    fn set_key(&mut self, key: i64) {
        self.id = key;
    }

    fn remap_keys(&mut self, keys: &KeyMap) {
        self.id = keys.resolve(self.id);
    }

    fn set(tracker: &Tracker) -> &EntitySet<Self> {
        &tracker.recipes
    }

    fn set_mut(tracker: &mut Tracker) -> &mut EntitySet<Self> {
        &mut tracker.recipes
    }
}

impl Entity for Ingredient {
    type Key = i64;

    fn table() -> &'static TableDef {
        &schema::INGREDIENT
    }

    fn key(&self) -> i64 {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Ingredient {
            id: row.get(ingredient::ID)?,
            sort_order: row.get(ingredient::SORT_ORDER)?,
            units: row.get(ingredient::UNITS)?,
            unit_type: row.get(ingredient::UNIT_TYPE)?,
            description: row.get(ingredient::DESCRIPTION)?,
            recipe_id: row.get(ingredient::RECIPE_ID)?,
        })
    }

    fn validate(&self) -> Result<(), ExError> {
        rules::validate_ingredient(self).map_err(|e| ExError::from(e).with_entity_id(self.id))
    }

    fn key_columns(key: i64) -> Vec<(&'static str, Value)> {
        vec![(ingredient::ID, Value::Integer(key))]
    }

    fn column_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            (ingredient::SORT_ORDER, integer(self.sort_order.map(i64::from))),
            (ingredient::UNITS, text(&self.units)),
            (ingredient::UNIT_TYPE, text(&self.unit_type)),
            (ingredient::DESCRIPTION, text(&self.description)),
            (ingredient::RECIPE_ID, integer(self.recipe_id)),
        ]
    }

    fn temporary_key(&self) -> Option<i64> {
        Some(self.id).filter(|id| *id < 0)
    }

    fn set_key(&mut self, key: i64) {
        self.id = key;
    }

    fn remap_keys(&mut self, keys: &KeyMap) {
        self.id = keys.resolve(self.id);
        self.recipe_id = keys.resolve_opt(self.recipe_id);
    }

    fn set(tracker: &Tracker) -> &EntitySet<Self> {
        &tracker.ingredients
    }

    fn set_mut(tracker: &mut Tracker) -> &mut EntitySet<Self> {
        &mut tracker.ingredients
    }
}

impl Entity for Direction {
    type Key = i64;

    fn table() -> &'static TableDef {
        &schema::DIRECTION
    }

    fn key(&self) -> i64 {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Direction {
            id: row.get(direction::ID)?,
            line_number: row.get(direction::LINE_NUMBER)?,
            description: row.get(direction::DESCRIPTION)?,
            recipe_id: row.get(direction::RECIPE_ID)?,
        })
    }

    fn validate(&self) -> Result<(), ExError> {
        rules::validate_direction(self).map_err(|e| ExError::from(e).with_entity_id(self.id))
    }

    fn key_columns(key: i64) -> Vec<(&'static str, Value)> {
        vec![(direction::ID, Value::Integer(key))]
    }

    fn column_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            (direction::LINE_NUMBER, Value::Integer(self.line_number)),
            (direction::DESCRIPTION, text(&self.description)),
            (direction::RECIPE_ID, integer(self.recipe_id)),
        ]
    }

    fn temporary_key(&self) -> Option<i64> {
        Some(self.id).filter(|id| *id < 0)
    }

    fn set_key(&mut self, key: i64) {
        self.id = key;
    }

    fn remap_keys(&mut self, keys: &KeyMap) {
        self.id = keys.resolve(self.id);
        self.recipe_id = keys.resolve_opt(self.recipe_id);
    }

    fn set(tracker: &Tracker) -> &EntitySet<Self> {
        &tracker.directions
    }

    fn set_mut(tracker: &mut Tracker) -> &mut EntitySet<Self> {
        &mut tracker.directions
    }
}

impl Entity for Category {
    type Key = i64;

    fn table() -> &'static TableDef {
        &schema::CATEGORY
    }

    fn key(&self) -> i64 {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Category {
            id: row.get(category::ID)?,
            description: row.get(category::DESCRIPTION)?,
        })
    }

    fn validate(&self) -> Result<(), ExError> {
        rules::validate_category(self).map_err(|e| ExError::from(e).with_entity_id(self.id))
    }

    fn key_columns(key: i64) -> Vec<(&'static str, Value)> {
        vec![(category::ID, Value::Integer(key))]
    }

    fn column_values(&self) -> Vec<(&'static str, Value)> {
        vec![(category::DESCRIPTION, text(&self.description))]
    }

    fn temporary_key(&self) -> Option<i64> {
        Some(self.id).filter(|id| *id < 0)
    }

    fn set_key(&mut self, key: i64) {
        self.id = key;
    }

    fn remap_keys(&mut self, keys: &KeyMap) {
        self.id = keys.resolve(self.id);
    }

    fn set(tracker: &Tracker) -> &EntitySet<Self> {
        &tracker.categories
    }

    fn set_mut(tracker: &mut Tracker) -> &mut EntitySet<Self> {
        &mut tracker.categories
    }
}

impl Entity for RecipeCategory {
    type Key = (i64, i64);

    fn table() -> &'static TableDef {
        &schema::RECIPE_CATEGORY
    }

    fn key(&self) -> (i64, i64) {
        RecipeCategory::key(self)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RecipeCategory {
            recipe_id: row.get(recipe_category::RECIPE_ID)?,
            category_id: row.get(recipe_category::CATEGORY_ID)?,
        })
    }

    fn validate(&self) -> Result<(), ExError> {
        Ok(())
    }

    fn key_columns((recipe_id, category_id): (i64, i64)) -> Vec<(&'static str, Value)> {
        vec![
            (recipe_category::RECIPE_ID, Value::Integer(recipe_id)),
            (recipe_category::CATEGORY_ID, Value::Integer(category_id)),
        ]
    }

    fn column_values(&self) -> Vec<(&'static str, Value)> {
        self.key_values()
    }

    fn remap_keys(&mut self, keys: &KeyMap) {
        self.recipe_id = keys.resolve(self.recipe_id);
        self.category_id = keys.resolve(self.category_id);
    }

    fn set(tracker: &Tracker) -> &EntitySet<Self> {
        &tracker.recipe_categories
    }

    fn set_mut(tracker: &mut Tracker) -> &mut EntitySet<Self> {
        &mut tracker.recipe_categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_lists_declared_columns() {
        assert_eq!(
            Recipe::select_sql(),
            "SELECT Id, Title, ServingQuantity, ServingMeasure FROM Recipe"
        );
        assert_eq!(
            RecipeCategory::select_sql(),
            "SELECT RecipeId, CategoryId FROM RecipeCategory"
        );
    }

    #[test]
    fn test_remap_replaces_temporary_foreign_keys() {
        let mut keys = KeyMap::default();
        keys.insert(-1, 40);
        keys.insert(-2, 41);

        let mut line = Ingredient::new(1, "2", "cup", "flour");
        line.id = -2;
        line.recipe_id = Some(-1);
        line.remap_keys(&keys);
        assert_eq!((line.id, line.recipe_id), (41, Some(40)));

        let mut link = RecipeCategory::new(-1, 9);
        link.remap_keys(&keys);
        assert_eq!(link.key(), (40, 9));
    }

    #[test]
    fn test_quantity_written_as_canonical_text() {
        let recipe = Recipe::new("Stew").with_servings(Decimal::from_whole(4), "Bowls");
        let values = recipe.column_values();
        assert_eq!(values[1], (recipe::SERVING_QUANTITY, Value::Text("4.00".to_string())));
    }
}
