//! Declared schema
//!
//! One static description of every table, column limit, index and foreign
//! key. The migrations create the tables; `verify` checks after migrating
//! that what the store actually holds matches this declaration. Column
//! name constants are shared with the context so SQL and declaration
//! cannot drift apart.

use std::collections::HashSet;

use recipe_core::model::limits::{
    CATEGORY_DESCRIPTION_MAX, INGREDIENT_DESCRIPTION_MAX, INGREDIENT_UNITS_MAX,
    INGREDIENT_UNIT_TYPE_MAX, RECIPE_SERVING_MEASURE_MAX, RECIPE_TITLE_MAX,
};
use rusqlite::Connection;

use crate::errors::{from_rusqlite, schema_mismatch, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
}

impl ColumnType {
    fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    /// Character limit for text columns
    pub max_len: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct ForeignKeyDef {
    pub column: &'static str,
    pub references: &'static str,
    pub references_column: &'static str,
    pub cascade_delete: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub primary_key: &'static [&'static str],
    /// Named primary key constraint, when the key is composite
    pub primary_key_name: Option<&'static str>,
    pub columns: &'static [ColumnDef],
    pub indexes: &'static [IndexDef],
    pub foreign_keys: &'static [ForeignKeyDef],
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }
}

const fn int(name: &'static str, nullable: bool) -> ColumnDef {
    ColumnDef {
        name,
        ty: ColumnType::Integer,
        nullable,
        max_len: None,
    }
}

const fn text(name: &'static str, nullable: bool, max_len: Option<usize>) -> ColumnDef {
    ColumnDef {
        name,
        ty: ColumnType::Text,
        nullable,
        max_len,
    }
}

const fn cascade(column: &'static str, references: &'static str) -> ForeignKeyDef {
    ForeignKeyDef {
        column,
        references,
        references_column: "Id",
        cascade_delete: true,
    }
}

pub mod recipe {
    pub const TABLE: &str = "Recipe";
    pub const ID: &str = "Id";
    pub const TITLE: &str = "Title";
    pub const SERVING_QUANTITY: &str = "ServingQuantity";
    pub const SERVING_MEASURE: &str = "ServingMeasure";
}

pub mod ingredient {
    pub const TABLE: &str = "Ingredient";
    pub const ID: &str = "Id";
    pub const SORT_ORDER: &str = "SortOrder";
    pub const UNITS: &str = "Units";
    pub const UNIT_TYPE: &str = "UnitType";
    pub const DESCRIPTION: &str = "Description";
    pub const RECIPE_ID: &str = "RecipeId";
}

pub mod direction {
    pub const TABLE: &str = "Direction";
    pub const ID: &str = "Id";
    pub const LINE_NUMBER: &str = "LineNumber";
    pub const DESCRIPTION: &str = "Description";
    pub const RECIPE_ID: &str = "RecipeId";
}

pub mod category {
    pub const TABLE: &str = "Category";
    pub const ID: &str = "Id";
    pub const DESCRIPTION: &str = "Description";
}

pub mod recipe_category {
    pub const TABLE: &str = "RecipeCategory";
    pub const RECIPE_ID: &str = "RecipeId";
    pub const CATEGORY_ID: &str = "CategoryId";
}

pub static RECIPE: TableDef = TableDef {
    name: recipe::TABLE,
    primary_key: &[recipe::ID],
    primary_key_name: None,
    columns: &[
        int(recipe::ID, false),
        text(recipe::TITLE, false, Some(RECIPE_TITLE_MAX)),
        text(recipe::SERVING_QUANTITY, true, None),
        text(recipe::SERVING_MEASURE, true, Some(RECIPE_SERVING_MEASURE_MAX)),
    ],
    indexes: &[IndexDef {
        name: "IX_Recipes_Title",
        columns: &[recipe::TITLE],
    }],
    foreign_keys: &[],
};

pub static INGREDIENT: TableDef = TableDef {
    name: ingredient::TABLE,
    primary_key: &[ingredient::ID],
    primary_key_name: None,
    columns: &[
        int(ingredient::ID, false),
        int(ingredient::SORT_ORDER, true),
        text(ingredient::UNITS, true, Some(INGREDIENT_UNITS_MAX)),
        text(ingredient::UNIT_TYPE, true, Some(INGREDIENT_UNIT_TYPE_MAX)),
        text(ingredient::DESCRIPTION, true, Some(INGREDIENT_DESCRIPTION_MAX)),
        int(ingredient::RECIPE_ID, true),
    ],
    indexes: &[
        IndexDef {
            name: "IX_Ingredient_RecipeId",
            columns: &[ingredient::RECIPE_ID],
        },
        IndexDef {
            name: "_dta_index_Ingredients_5_661577395__K6_K1_2_3_4_5",
            columns: &[
                ingredient::SORT_ORDER,
                ingredient::UNITS,
                ingredient::UNIT_TYPE,
                ingredient::DESCRIPTION,
                ingredient::RECIPE_ID,
                ingredient::ID,
            ],
        },
    ],
    foreign_keys: &[cascade(ingredient::RECIPE_ID, recipe::TABLE)],
};

pub static DIRECTION: TableDef = TableDef {
    name: direction::TABLE,
    primary_key: &[direction::ID],
    primary_key_name: None,
    columns: &[
        int(direction::ID, false),
        int(direction::LINE_NUMBER, false),
        text(direction::DESCRIPTION, true, None),
        int(direction::RECIPE_ID, true),
    ],
    indexes: &[
        IndexDef {
            name: "IX_Direction_RecipeId",
            columns: &[direction::RECIPE_ID],
        },
        IndexDef {
            name: "IX_Directions_RecipeLineNumber",
            columns: &[direction::RECIPE_ID, direction::LINE_NUMBER],
        },
        IndexDef {
            name: "_dta_index_Directions_5_709577566__K4_K1_2_3",
            columns: &[
                direction::LINE_NUMBER,
                direction::DESCRIPTION,
                direction::RECIPE_ID,
                direction::ID,
            ],
        },
    ],
    foreign_keys: &[cascade(direction::RECIPE_ID, recipe::TABLE)],
};

pub static CATEGORY: TableDef = TableDef {
    name: category::TABLE,
    primary_key: &[category::ID],
    primary_key_name: None,
    columns: &[
        int(category::ID, false),
        text(category::DESCRIPTION, true, Some(CATEGORY_DESCRIPTION_MAX)),
    ],
    indexes: &[],
    foreign_keys: &[],
};

pub static RECIPE_CATEGORY: TableDef = TableDef {
    name: recipe_category::TABLE,
    primary_key: &[recipe_category::RECIPE_ID, recipe_category::CATEGORY_ID],
    primary_key_name: Some("PK_dbo.RecipeCategories"),
    columns: &[
        int(recipe_category::RECIPE_ID, false),
        int(recipe_category::CATEGORY_ID, false),
    ],
    indexes: &[
        IndexDef {
            name: "IX_Category_CategoryId",
            columns: &[recipe_category::CATEGORY_ID],
        },
        IndexDef {
            name: "IX_RecipeCategory_RecipeId",
            columns: &[recipe_category::RECIPE_ID],
        },
    ],
    foreign_keys: &[
        cascade(recipe_category::RECIPE_ID, recipe::TABLE),
        cascade(recipe_category::CATEGORY_ID, category::TABLE),
    ],
};

/// Every declared table, parents before children
pub static TABLES: &[&TableDef] = &[
    &RECIPE,
    &CATEGORY,
    &INGREDIENT,
    &DIRECTION,
    &RECIPE_CATEGORY,
];

/// Look up a declared table by name
pub fn table(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().copied().find(|t| t.name == name)
}

/// Check that the store holds every declared table, column, index and
/// foreign key
///
/// # Errors
/// `SchemaMismatch` naming the first table that differs.
pub fn verify(conn: &Connection) -> Result<()> {
    for table in TABLES {
        verify_columns(conn, table)?;
        verify_indexes(conn, table)?;
        verify_foreign_keys(conn, table)?;
    }
    tracing::debug!(tables = TABLES.len(), "schema verified");
    Ok(())
}

fn verify_columns(conn: &Connection, table: &TableDef) -> Result<()> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info(\"{}\")", table.name))
        .map_err(from_rusqlite)?;
    // (name, type, notnull, pk position)
    let actual: Vec<(String, String, bool, i64)> = stmt
        .query_map([], |row| {
            Ok((row.get(1)?, row.get(2)?, row.get(3)?, row.get(5)?))
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<_, _>>()
        .map_err(from_rusqlite)?;

    if actual.is_empty() {
        return Err(schema_mismatch(table.name, "table does not exist"));
    }

    for column in table.columns {
        let (_, ty, notnull, pk) = actual
            .iter()
            .find(|(name, ..)| name == column.name)
            .ok_or_else(|| schema_mismatch(table.name, format!("missing column {}", column.name)))?;

        if !ty.eq_ignore_ascii_case(column.ty.sql_name()) {
            return Err(schema_mismatch(
                table.name,
                format!("column {} is {}, declared {}", column.name, ty, column.ty.sql_name()),
            ));
        }
        // INTEGER PRIMARY KEY columns never report NOT NULL
        let effectively_not_null = *notnull || (*pk > 0 && table.primary_key.len() == 1);
        if effectively_not_null == column.nullable {
            return Err(schema_mismatch(
                table.name,
                format!("nullability of column {} differs", column.name),
            ));
        }
    }

    let mut key: Vec<(i64, &str)> = actual
        .iter()
        .filter(|(.., pk)| *pk > 0)
        .map(|(name, .., pk)| (*pk, name.as_str()))
        .collect();
    key.sort();
    let key: Vec<&str> = key.into_iter().map(|(_, name)| name).collect();
    if key != table.primary_key {
        return Err(schema_mismatch(
            table.name,
            format!("primary key is {:?}, declared {:?}", key, table.primary_key),
        ));
    }

    Ok(())
}

fn verify_indexes(conn: &Connection, table: &TableDef) -> Result<()> {
    for index in table.indexes {
        let mut stmt = conn
            .prepare(&format!("PRAGMA index_info(\"{}\")", index.name))
            .map_err(from_rusqlite)?;
        let mut columns: Vec<(i64, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(2)?)))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<_, _>>()
            .map_err(from_rusqlite)?;
        columns.sort();
        let columns: Vec<&str> = columns.iter().map(|(_, c)| c.as_str()).collect();

        if columns.is_empty() {
            return Err(schema_mismatch(table.name, format!("missing index {}", index.name)));
        }
        if columns != index.columns {
            return Err(schema_mismatch(
                table.name,
                format!("index {} covers {:?}, declared {:?}", index.name, columns, index.columns),
            ));
        }
    }
    Ok(())
}

fn verify_foreign_keys(conn: &Connection, table: &TableDef) -> Result<()> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA foreign_key_list(\"{}\")", table.name))
        .map_err(from_rusqlite)?;
    // (referenced table, from column, to column, on delete)
    let actual: HashSet<(String, String, String, String)> = stmt
        .query_map([], |row| Ok((row.get(2)?, row.get(3)?, row.get(4)?, row.get(6)?)))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<_, _>>()
        .map_err(from_rusqlite)?;

    for fk in table.foreign_keys {
        let on_delete = if fk.cascade_delete { "CASCADE" } else { "NO ACTION" };
        let found = actual.iter().any(|(to_table, from, to, action)| {
            to_table == fk.references
                && from == fk.column
                && to == fk.references_column
                && action.eq_ignore_ascii_case(on_delete)
        });
        if !found {
            return Err(schema_mismatch(
                table.name,
                format!(
                    "missing foreign key {} -> {}({}) ON DELETE {}",
                    fk.column, fk.references, fk.references_column, on_delete
                ),
            ));
        }
    }
    Ok(())
}
