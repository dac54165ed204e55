//! Read-only projections

use recipe_core::model::Recipe;
use serde::Serialize;

use super::loading::RecipeGraph;
use super::query::Query;
use crate::errors::Result;

/// Flattened, untracked view of a recipe for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    /// Serving quantity and measure, e.g. "4.00 Servings"
    pub serves: Option<String>,
    pub categories: Vec<String>,
    /// Display lines in sort order
    pub ingredients: Vec<String>,
    /// Descriptions in line-number order
    pub directions: Vec<String>,
}

impl From<RecipeGraph> for RecipeSummary {
    fn from(graph: RecipeGraph) -> Self {
        let recipe = graph.recipe.borrow();
        let serves = match (&recipe.serving_quantity, &recipe.serving_measure) {
            (Some(q), Some(m)) => Some(format!("{} {}", q, m)),
            (Some(q), None) => Some(q.to_string()),
            (None, Some(m)) => Some(m.clone()),
            (None, None) => None,
        };
        RecipeSummary {
            id: recipe.id,
            title: recipe.title.clone(),
            serves,
            categories: graph
                .categories
                .iter()
                .filter_map(|c| c.borrow().description.clone())
                .collect(),
            ingredients: graph
                .ingredients
                .iter()
                .map(|i| i.borrow().display_line())
                .collect(),
            directions: graph
                .directions
                .iter()
                .map(|d| d.borrow().description.clone().unwrap_or_default())
                .collect(),
        }
    }
}

impl Query<'_, Recipe> {
    /// Project the matching recipes into summaries
    ///
    /// Runs without tracking: one query for the recipes and one for each
    /// of ingredients, directions and categories per 500 recipes.
    ///
    /// # Errors
    /// As `to_list`.
    pub fn project_summaries(self) -> Result<Vec<RecipeSummary>> {
        let graphs = self
            .no_tracking()
            .include_ingredients()
            .include_directions()
            .include_categories()
            .load_graphs()?;
        Ok(graphs.into_iter().map(RecipeSummary::from).collect())
    }
}
