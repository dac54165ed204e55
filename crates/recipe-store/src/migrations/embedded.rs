//! Embedded SQL migrations
//!
//! Compiled into the binary with include_str!, applied in id order.

/// One migration script
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All embedded migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_initial_schema",
            sql: include_str!("../../migrations/001_initial_schema.sql"),
        },
        Migration {
            id: "002_stored_procedures",
            sql: include_str!("../../migrations/002_stored_procedures.sql"),
        },
    ]
}
