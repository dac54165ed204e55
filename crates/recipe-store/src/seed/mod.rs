//! Seed import
//!
//! Provides:
//! - Seed format v0 (YAML)
//! - Parser with validation
//! - Importer that writes through the context in one save

pub mod format_v0;
pub mod importer;
pub mod parser;

pub use format_v0::SeedV0;
pub use importer::{import_seed, import_seed_file, SeedReport};
pub use parser::{parse_seed_file, parse_seed_str};
