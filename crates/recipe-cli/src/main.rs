//! recipebook
//!
//! Command-line interface over the recipe store

use clap::{Parser, Subcommand};
use recipe_core::logging_facility::{init, Profile};

mod commands;

use commands::GlobalArgs;

#[derive(Debug, Parser)]
#[command(name = "recipebook")]
#[command(about = "Recipe database - browse, search and seed recipes", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// List and show recipes
    Recipes(commands::recipes::RecipesArgs),
    /// Search recipe titles through sRecipeSearch
    Search(commands::search::SearchArgs),
    /// Manage categories
    Categories(commands::categories::CategoriesArgs),
    /// Seed import operations
    Seed(commands::seed::SeedArgs),
}

fn main() {
    let cli = Cli::parse();

    init(if cli.global.verbose {
        Profile::Development
    } else {
        Profile::ErrorsOnly
    });
    tracing::debug!(command = ?cli.command, "dispatching");

    let result = match cli.command {
        Commands::Migrate => commands::migrate::execute(&cli.global),
        Commands::Recipes(args) => commands::recipes::execute(&cli.global, args),
        Commands::Search(args) => commands::search::execute(&cli.global, args),
        Commands::Categories(args) => commands::categories::execute(&cli.global, args),
        Commands::Seed(args) => commands::seed::execute(&cli.global, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
