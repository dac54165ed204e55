//! Seed import command
//!
//! Usage: recipebook seed import <PATH>

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use recipe_store::seed::import_seed_file;
use recipe_store::RecipeContext;

use super::{CommandResult, GlobalArgs};

#[derive(Debug, Args)]
pub struct SeedArgs {
    #[command(subcommand)]
    pub command: SeedCommand,
}

#[derive(Debug, Subcommand)]
pub enum SeedCommand {
    /// Import a seed file into the database
    Import(ImportArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Path to seed YAML file or directory
    pub path: PathBuf,
}

pub fn execute(global: &GlobalArgs, args: SeedArgs) -> CommandResult {
    match args.command {
        SeedCommand::Import(import_args) => execute_import(global, import_args),
    }
}

fn execute_import(global: &GlobalArgs, args: ImportArgs) -> CommandResult {
    let mut ctx = global.open_context()?;

    if args.path.is_dir() {
        // Sorted for determinism
        let mut seed_files: Vec<PathBuf> = std::fs::read_dir(&args.path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .collect();
        seed_files.sort();

        for seed_file in seed_files {
            import_one(&mut ctx, &seed_file)?;
        }
    } else {
        import_one(&mut ctx, &args.path)?;
    }
    Ok(())
}

fn import_one(ctx: &mut RecipeContext, path: &Path) -> CommandResult {
    println!("Importing {}...", path.display());
    let report = import_seed_file(ctx, path)?;
    println!(
        "Imported {} recipe(s), {} new and {} existing categories (digest: {})",
        report.recipes, report.categories_created, report.categories_reused, report.digest
    );
    Ok(())
}
