//! Subcommands and the options they share

pub mod categories;
pub mod migrate;
pub mod recipes;
pub mod search;
pub mod seed;

use std::path::PathBuf;

use clap::Args;
use recipe_store::{ConnectionString, RecipeContext, StoreConfig};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Store configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file; overrides the configured connection string
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Log operations and SQL commands to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Configuration file (if any), then environment, then `--database`
    pub fn store_config(&self) -> Result<StoreConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => StoreConfig::load(path)?,
            None => StoreConfig::default().with_env_override()?,
        };
        if let Some(database) = &self.database {
            config.connection_string =
                ConnectionString::file(database.to_string_lossy().into_owned());
        }
        Ok(config)
    }

    pub fn open_context(&self) -> Result<RecipeContext, Box<dyn std::error::Error>> {
        Ok(RecipeContext::open(self.store_config()?)?)
    }
}
