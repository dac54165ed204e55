//! Recipe commands
//!
//! Usage: recipebook recipes <list|show>

use clap::{Args, Subcommand};
use recipe_store::schema::recipe;
use recipe_store::RecipeSummary;

use super::{CommandResult, GlobalArgs};

#[derive(Debug, Args)]
pub struct RecipesArgs {
    #[command(subcommand)]
    pub command: RecipesCommand,
}

#[derive(Debug, Subcommand)]
pub enum RecipesCommand {
    /// List recipes by title
    List(ListArgs),
    /// Show one recipe with its ingredients, directions and categories
    Show(ShowArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Maximum number of recipes to list
    #[arg(long)]
    pub take: Option<usize>,

    /// Print ingredients and directions under each title
    #[arg(long)]
    pub details: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Recipe id
    pub id: i64,

    /// Print the recipe as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(global: &GlobalArgs, args: RecipesArgs) -> CommandResult {
    match args.command {
        RecipesCommand::List(list_args) => execute_list(global, list_args),
        RecipesCommand::Show(show_args) => execute_show(global, show_args),
    }
}

fn execute_list(global: &GlobalArgs, args: ListArgs) -> CommandResult {
    let mut ctx = global.open_context()?;
    let mut query = ctx.recipes().no_tracking().order_by(recipe::TITLE);
    if let Some(take) = args.take {
        query = query.take(take);
    }

    if args.details {
        for summary in query.project_summaries()? {
            print_summary(&summary);
            println!();
        }
        return Ok(());
    }

    for r in query.to_list()? {
        let r = r.borrow();
        println!("{:>6}  {}", r.id, r.title);
    }
    Ok(())
}

fn execute_show(global: &GlobalArgs, args: ShowArgs) -> CommandResult {
    let mut ctx = global.open_context()?;
    let summary = RecipeSummary::from(ctx.load_recipe_with_children(args.id)?);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &RecipeSummary) {
    println!("{} (#{})", summary.title, summary.id);
    if let Some(serves) = &summary.serves {
        println!("Serves: {}", serves);
    }
    if !summary.categories.is_empty() {
        println!("Categories: {}", summary.categories.join(", "));
    }
    if !summary.ingredients.is_empty() {
        println!("Ingredients:");
        for line in &summary.ingredients {
            println!("  - {}", line);
        }
    }
    if !summary.directions.is_empty() {
        println!("Directions:");
        for (n, line) in summary.directions.iter().enumerate() {
            println!("  {}. {}", n + 1, line);
        }
    }
}
