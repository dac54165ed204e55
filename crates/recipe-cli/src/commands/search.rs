//! Search command
//!
//! Usage: recipebook search <TEXT> [--ordered]

use clap::Args;

use super::{CommandResult, GlobalArgs};

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Text matched against recipe titles
    pub text: String,

    /// Sort matches by title
    #[arg(long)]
    pub ordered: bool,
}

pub fn execute(global: &GlobalArgs, args: SearchArgs) -> CommandResult {
    let mut ctx = global.open_context()?;
    let found = if args.ordered {
        ctx.search_recipes_ordered(&args.text)?
    } else {
        ctx.search_recipes(&args.text)?
    };

    if found.is_empty() {
        println!("No recipes match '{}'", args.text);
        return Ok(());
    }
    for recipe in &found {
        let recipe = recipe.borrow();
        println!("{:>6}  {}", recipe.id, recipe.title);
    }
    Ok(())
}
