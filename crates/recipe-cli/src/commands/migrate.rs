//! Migrate command
//!
//! Usage: recipebook migrate

use recipe_store::db;
use recipe_store::migrations::{applied_migrations, apply_migrations};

use super::{CommandResult, GlobalArgs};

pub fn execute(global: &GlobalArgs) -> CommandResult {
    let config = global.store_config()?;
    let mut conn = db::open(&config.connection_string)?;

    let applied = apply_migrations(&mut conn)?;
    println!("Applied {} migration(s)", applied);
    for migration in applied_migrations(&conn)? {
        let short = migration.checksum.get(..12).unwrap_or(&migration.checksum);
        println!("  {}  {}", migration.migration_id, short);
    }
    Ok(())
}
