//! Recipe Store - SQLite persistence and the tracking context
//!
//! Provides:
//! - Connection strings, store configuration and connection setup
//! - Embedded migrations with checksums and the declared schema model
//! - Stored procedures kept in the database and invoked by name
//! - `RecipeContext`: identity map, change tracking, eager and lazy
//!   loading, projections and batched saves with retry
//! - YAML seed import

pub mod config;
pub mod connection_string;
pub mod context;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod procedures;
pub mod retry;
pub mod schema;
pub mod seed;

mod command;

// Re-export key types
pub use config::StoreConfig;
pub use connection_string::ConnectionString;
pub use context::{
    EntityState, Navigation, RecipeContext, RecipeGraph, RecipeSummary, SaveReport, Tracked,
};
pub use errors::Result;
