//! Category commands
//!
//! Usage: recipebook categories <list|add|remove>

use clap::{Args, Subcommand};
use recipe_core::model::Category;
use recipe_store::schema::category;

use super::{CommandResult, GlobalArgs};

#[derive(Debug, Args)]
pub struct CategoriesArgs {
    #[command(subcommand)]
    pub command: CategoriesCommand,
}

#[derive(Debug, Subcommand)]
pub enum CategoriesCommand {
    /// List categories by description
    List,
    /// Add a category
    Add {
        /// Category description
        description: String,
    },
    /// Remove a category and its recipe links
    Remove {
        /// Category id
        id: i64,
    },
}

pub fn execute(global: &GlobalArgs, args: CategoriesArgs) -> CommandResult {
    let mut ctx = global.open_context()?;

    match args.command {
        CategoriesCommand::List => {
            let categories = ctx
                .categories()
                .no_tracking()
                .order_by(category::DESCRIPTION)
                .to_list()?;
            for c in &categories {
                let c = c.borrow();
                println!("{:>6}  {}", c.id, c.description.as_deref().unwrap_or(""));
            }
        }
        CategoriesCommand::Add { description } => {
            let created = ctx.add_category(Category::new(description));
            ctx.save_changes()?;
            let created = created.borrow();
            println!(
                "Added category {} ({})",
                created.id,
                created.description.as_deref().unwrap_or("")
            );
        }
        CategoriesCommand::Remove { id } => {
            let Some(found) = ctx.find_category(id)? else {
                return Err(format!("category {} not found", id).into());
            };
            ctx.remove_category(&found)?;
            ctx.save_changes()?;
            println!("Removed category {}", id);
        }
    }
    Ok(())
}
