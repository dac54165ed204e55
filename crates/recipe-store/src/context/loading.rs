//! Loading related rows
//!
//! Eager loading (`IncludeQuery::load_graphs`) fetches the recipes and then
//! one query per included navigation for every `ID_LIST_CHUNK` recipes.
//! Lazy loading (`ingredients_of` and friends) fetches a navigation the
//! first time it is asked for and serves it from the session afterwards.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use recipe_core::errors::RecipeError;
use recipe_core::model::{
    is_store_generated, Category, Direction, Ingredient, Recipe, RecipeCategory,
};
use rusqlite::types::Value;
use rusqlite::Row;

use super::entity::Entity;
use super::query::{Filter, IncludeQuery};
use super::tracker::{Navigation, Tracked};
use super::RecipeContext;
use crate::command::SqlCommand;
use crate::errors::Result;
use crate::schema::{category, direction, ingredient, recipe, recipe_category};

/// A recipe together with its loaded navigations
///
/// Navigations that were not requested are left empty.
#[derive(Debug, Clone)]
pub struct RecipeGraph {
    pub recipe: Tracked<Recipe>,
    /// Ordered by sort order
    pub ingredients: Vec<Tracked<Ingredient>>,
    /// Ordered by line number
    pub directions: Vec<Tracked<Direction>>,
    /// Ordered by description
    pub categories: Vec<Tracked<Category>>,
}

/// Rows fetched for a set of recipes
#[derive(Default)]
struct Related {
    ingredients: Vec<Ingredient>,
    directions: Vec<Direction>,
    categories: Vec<(Category, RecipeCategory)>,
}

/// Recipe ids bound per `IN (...)` list, far below SQLite's
/// 32766-parameter limit
const ID_LIST_CHUNK: usize = 500;

fn id_list(ids: &[i64]) -> (String, Vec<Value>) {
    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
    (
        placeholders.join(", "),
        ids.iter().copied().map(Value::Integer).collect(),
    )
}

fn children_command<T: Entity>(ids: &[i64], foreign_key: &str, order: &str) -> SqlCommand {
    let (list, params) = id_list(ids);
    SqlCommand::new(
        format!(
            "{}\nWHERE {} IN ({})\nORDER BY {}",
            T::select_sql(),
            foreign_key,
            list,
            order
        ),
        params,
    )
}

fn categories_command(ids: &[i64]) -> SqlCommand {
    let (list, params) = id_list(ids);
    SqlCommand::new(
        format!(
            "SELECT c.{id}, c.{description}, rc.{recipe_id}\n\
             FROM {link} AS rc\n\
             INNER JOIN {category} AS c ON c.{id} = rc.{category_id}\n\
             WHERE rc.{recipe_id} IN ({list})\n\
             ORDER BY rc.{recipe_id}, c.{description}, c.{id}",
            id = category::ID,
            description = category::DESCRIPTION,
            recipe_id = recipe_category::RECIPE_ID,
            category_id = recipe_category::CATEGORY_ID,
            link = recipe_category::TABLE,
            category = category::TABLE,
            list = list,
        ),
        params,
    )
}

fn category_link_from_row(row: &Row<'_>) -> rusqlite::Result<(Category, RecipeCategory)> {
    let category = <Category as Entity>::from_row(row)?;
    let link = RecipeCategory::new(row.get(recipe_category::RECIPE_ID)?, category.id);
    Ok((category, link))
}

fn sort_ingredients(items: &mut [Tracked<Ingredient>]) {
    items.sort_by_key(|i| {
        let i = i.borrow();
        (i.sort_order, i.id)
    });
}

fn sort_directions(items: &mut [Tracked<Direction>]) {
    items.sort_by_key(|d| {
        let d = d.borrow();
        (d.line_number, d.id)
    });
}

fn sort_categories(items: &mut [Tracked<Category>]) {
    items.sort_by(|a, b| {
        let (a, b) = (a.borrow(), b.borrow());
        a.description.cmp(&b.description).then(a.id.cmp(&b.id))
    });
}

fn detached<T>(value: T) -> Tracked<T> {
    Rc::new(RefCell::new(value))
}

impl Related {
    /// Group untracked rows by recipe; every row becomes a fresh instance
    fn into_graphs(self, recipes: Vec<Tracked<Recipe>>) -> Vec<RecipeGraph> {
        let mut ingredients: HashMap<i64, Vec<Tracked<Ingredient>>> = HashMap::new();
        for row in self.ingredients {
            if let Some(id) = row.recipe_id {
                ingredients.entry(id).or_default().push(detached(row));
            }
        }
        let mut directions: HashMap<i64, Vec<Tracked<Direction>>> = HashMap::new();
        for row in self.directions {
            if let Some(id) = row.recipe_id {
                directions.entry(id).or_default().push(detached(row));
            }
        }
        let mut categories: HashMap<i64, Vec<Tracked<Category>>> = HashMap::new();
        for (row, link) in self.categories {
            categories
                .entry(link.recipe_id)
                .or_default()
                .push(detached(row));
        }

        recipes
            .into_iter()
            .map(|recipe| {
                let id = recipe.borrow().id;
                RecipeGraph {
                    ingredients: ingredients.remove(&id).unwrap_or_default(),
                    directions: directions.remove(&id).unwrap_or_default(),
                    categories: categories.remove(&id).unwrap_or_default(),
                    recipe,
                }
            })
            .collect()
    }
}

impl RecipeContext {
    /// One query per navigation for each chunk of `ids`
    fn fetch_related(
        &self,
        navigations: &[Navigation],
        ids: &[i64],
        tags: &[String],
    ) -> Result<Related> {
        let mut related = Related::default();
        for chunk in ids.chunks(ID_LIST_CHUNK) {
            for navigation in navigations {
                self.fetch_navigation(*navigation, chunk, tags, &mut related)?;
            }
        }
        Ok(related)
    }

    fn fetch_navigation(
        &self,
        navigation: Navigation,
        ids: &[i64],
        tags: &[String],
        related: &mut Related,
    ) -> Result<()> {
        match navigation {
            Navigation::Ingredients => {
                let order = format!(
                    "{}, {}, {}",
                    ingredient::RECIPE_ID,
                    ingredient::SORT_ORDER,
                    ingredient::ID
                );
                let command = children_command::<Ingredient>(ids, ingredient::RECIPE_ID, &order)
                    .tagged(tags);
                related.ingredients.extend(self.runner.query(
                    &self.conn,
                    &command,
                    <Ingredient as Entity>::from_row,
                )?);
            }
            Navigation::Directions => {
                let order = format!(
                    "{}, {}, {}",
                    direction::RECIPE_ID,
                    direction::LINE_NUMBER,
                    direction::ID
                );
                let command =
                    children_command::<Direction>(ids, direction::RECIPE_ID, &order).tagged(tags);
                related.directions.extend(self.runner.query(
                    &self.conn,
                    &command,
                    <Direction as Entity>::from_row,
                )?);
            }
            Navigation::Categories => {
                let command = categories_command(ids).tagged(tags);
                related.categories.extend(self.runner.query(
                    &self.conn,
                    &command,
                    category_link_from_row,
                )?);
            }
        }
        Ok(())
    }

    /// Attach fetched rows and remember which navigations are now complete
    fn track_related(&mut self, navigations: &[Navigation], ids: &[i64], related: Related) {
        for row in related.ingredients {
            self.tracker.ingredients.attach(row);
        }
        for row in related.directions {
            self.tracker.directions.attach(row);
        }
        for (row, link) in related.categories {
            self.tracker.categories.attach(row);
            self.tracker.recipe_categories.attach(link);
        }
        for navigation in navigations {
            for id in ids {
                self.tracker.mark_loaded(*navigation, *id);
            }
        }
    }

    fn tracked_ingredients(&self, recipe_id: i64) -> Vec<Tracked<Ingredient>> {
        let mut items = self
            .tracker
            .ingredients
            .live_where(|i| i.recipe_id == Some(recipe_id));
        sort_ingredients(&mut items);
        items
    }

    fn tracked_directions(&self, recipe_id: i64) -> Vec<Tracked<Direction>> {
        let mut items = self
            .tracker
            .directions
            .live_where(|d| d.recipe_id == Some(recipe_id));
        sort_directions(&mut items);
        items
    }

    fn tracked_categories(&self, recipe_id: i64) -> Vec<Tracked<Category>> {
        let links = self
            .tracker
            .recipe_categories
            .live_where(|rc| rc.recipe_id == recipe_id);
        let mut items: Vec<Tracked<Category>> = links
            .iter()
            .filter_map(|link| {
                let category_id = link.borrow().category_id;
                self.tracker
                    .categories
                    .get(&category_id)
                    .filter(|entry| entry.is_live())
                    .map(|entry| Rc::clone(&entry.entity))
            })
            .collect();
        sort_categories(&mut items);
        items
    }

    /// Fetch a navigation for one recipe unless the session already has it
    ///
    /// Recipes with a temporary key have nothing in the store yet.
    fn ensure_loaded(&mut self, navigation: Navigation, recipe_id: i64) -> Result<()> {
        if !is_store_generated(recipe_id) || self.tracker.is_loaded(navigation, recipe_id) {
            return Ok(());
        }
        let related = self.fetch_related(&[navigation], &[recipe_id], &[])?;
        self.track_related(&[navigation], &[recipe_id], related);
        Ok(())
    }

    /// Ingredients of a tracked recipe, loaded on first access
    ///
    /// # Errors
    /// `NotTracked`/`InvalidState` for a recipe not live in this session,
    /// or the store error.
    pub fn ingredients_of(&mut self, recipe: &Tracked<Recipe>) -> Result<Vec<Tracked<Ingredient>>> {
        let id = self.live_recipe_id(recipe)?;
        self.ensure_loaded(Navigation::Ingredients, id)?;
        Ok(self.tracked_ingredients(id))
    }

    /// Directions of a tracked recipe, loaded on first access
    ///
    /// # Errors
    /// As `ingredients_of`.
    pub fn directions_of(&mut self, recipe: &Tracked<Recipe>) -> Result<Vec<Tracked<Direction>>> {
        let id = self.live_recipe_id(recipe)?;
        self.ensure_loaded(Navigation::Directions, id)?;
        Ok(self.tracked_directions(id))
    }

    /// Categories of a tracked recipe, loaded on first access
    ///
    /// # Errors
    /// As `ingredients_of`.
    pub fn categories_of(&mut self, recipe: &Tracked<Recipe>) -> Result<Vec<Tracked<Category>>> {
        let id = self.live_recipe_id(recipe)?;
        self.ensure_loaded(Navigation::Categories, id)?;
        Ok(self.tracked_categories(id))
    }

    /// Every navigation of a tracked recipe, loading what is missing
    ///
    /// # Errors
    /// As `ingredients_of`.
    pub fn graph_of(&mut self, recipe: &Tracked<Recipe>) -> Result<RecipeGraph> {
        Ok(RecipeGraph {
            ingredients: self.ingredients_of(recipe)?,
            directions: self.directions_of(recipe)?,
            categories: self.categories_of(recipe)?,
            recipe: Rc::clone(recipe),
        })
    }

    /// The recipe with its ingredients, directions and categories
    ///
    /// # Errors
    /// `NotFound` when no recipe has the id, or the store error.
    pub fn load_recipe_with_children(&mut self, id: i64) -> Result<RecipeGraph> {
        let mut graphs = self
            .recipes()
            .filter(Filter::eq(recipe::ID, id))
            .include(Navigation::Ingredients)
            .include_directions()
            .include_categories()
            .load_graphs()?;
        graphs.pop().ok_or_else(|| {
            RecipeError::NotFound {
                entity: "Recipe",
                id: id.to_string(),
            }
            .into()
        })
    }
}

impl IncludeQuery<'_> {
    /// Run the recipe query and one query per included navigation
    ///
    /// With tracking, every row goes through the identity map and the
    /// loaded navigations are not fetched again lazily. Without tracking
    /// the graphs are built from fresh instances the session never sees.
    ///
    /// # Errors
    /// As `Query::to_list`.
    pub fn load_graphs(self) -> Result<Vec<RecipeGraph>> {
        let IncludeQuery { query, includes } = self;
        let tracking = query.tracking;
        let tags = query.tags().to_vec();
        let rows = query.fetch()?;
        let ctx = query.ctx;

        let recipes = ctx.materialize(rows, tracking);
        let ids: Vec<i64> = recipes.iter().map(|r| r.borrow().id).collect();
        let related = ctx.fetch_related(&includes, &ids, &tags)?;

        if !tracking {
            return Ok(related.into_graphs(recipes));
        }

        ctx.track_related(&includes, &ids, related);
        let graphs = recipes
            .into_iter()
            .map(|recipe| {
                let id = recipe.borrow().id;
                let wanted = |navigation| includes.contains(&navigation);
                RecipeGraph {
                    ingredients: if wanted(Navigation::Ingredients) {
                        ctx.tracked_ingredients(id)
                    } else {
                        Vec::new()
                    },
                    directions: if wanted(Navigation::Directions) {
                        ctx.tracked_directions(id)
                    } else {
                        Vec::new()
                    },
                    categories: if wanted(Navigation::Categories) {
                        ctx.tracked_categories(id)
                    } else {
                        Vec::new()
                    },
                    recipe,
                }
            })
            .collect();
        Ok(graphs)
    }
}
