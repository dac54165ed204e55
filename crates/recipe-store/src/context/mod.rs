//! The recipe context
//!
//! A `RecipeContext` is one unit of work against the store. It owns a
//! connection, tracks every entity it reads or is given, and writes the
//! accumulated changes back in `save_changes`.
//!
//! ```no_run
//! use recipe_core::model::{Category, Recipe};
//! use recipe_store::RecipeContext;
//!
//! # fn main() -> recipe_store::Result<()> {
//! let mut ctx = RecipeContext::in_memory()?;
//! let recipe = ctx.add_recipe(Recipe::new("Grilled Salmon"));
//! let seafood = ctx.add_category(Category::new("Seafood"));
//! ctx.link_category(&recipe, &seafood)?;
//! ctx.save_changes()?;
//! assert!(recipe.borrow().id > 0);
//! # Ok(())
//! # }
//! ```

mod entity;
mod loading;
mod projection;
mod query;
mod save;
mod tracker;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use recipe_core::errors::RecipeError;
use recipe_core::model::{Category, Direction, Ingredient, Recipe, RecipeCategory};
use recipe_core::{log_op_end, log_op_error, log_op_start};
use recipe_core_types::SessionId;
use rusqlite::types::Value;
use rusqlite::Connection;

use crate::command::{CommandRunner, SqlCommand};
use crate::config::StoreConfig;
use crate::connection_string::ConnectionString;
use crate::db;
use crate::errors::Result;
use crate::migrations::apply_migrations;
use crate::procedures::{StoredProcedure, RECIPE_SEARCH, SEARCH_TEXT_PARAM};
use crate::retry::ExecutionStrategy;
use crate::schema;

pub use entity::Entity;
pub use loading::RecipeGraph;
pub use projection::RecipeSummary;
pub use query::{Filter, IncludeQuery, Query, RecipeQuery, SortDirection};
pub use save::SaveReport;
pub use tracker::{EntityState, Navigation, Tracked};

use tracker::Tracker;

pub struct RecipeContext {
    conn: Connection,
    config: StoreConfig,
    strategy: ExecutionStrategy,
    runner: CommandRunner,
    tracker: Tracker,
    procedures: HashMap<String, StoredProcedure>,
}

impl RecipeContext {
    /// Open the store named by the configuration
    ///
    /// Migrations are applied (unless the store is opened read-only) and
    /// the declared schema is verified before the context is returned.
    ///
    /// # Errors
    /// `Configuration` for invalid settings, `Migration`, `ChecksumMismatch`
    /// or `SchemaMismatch` when the store cannot be brought up to date.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let start = std::time::Instant::now();
        let session_id = SessionId::new();
        log_op_start!("open_context", session_id = session_id.as_str());

        let result = Self::open_inner(config, session_id.clone());
        match &result {
            Ok(_) => {
                log_op_end!(
                    "open_context",
                    duration_ms = start.elapsed().as_millis() as u64,
                    session_id = session_id.as_str()
                );
            }
            Err(err) => {
                log_op_error!(
                    "open_context",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    session_id = session_id.as_str()
                );
            }
        }
        result
    }

    fn open_inner(config: StoreConfig, session_id: SessionId) -> Result<Self> {
        config.validate()?;
        let mut conn = db::open(&config.connection_string)?;
        if !config.connection_string.is_read_only() {
            apply_migrations(&mut conn)?;
        }
        schema::verify(&conn)?;

        Ok(Self {
            conn,
            strategy: ExecutionStrategy::from_config(&config),
            runner: CommandRunner::new(
                session_id,
                config.log_commands,
                config.sensitive_data_logging,
            ),
            config,
            tracker: Tracker::default(),
            procedures: HashMap::new(),
        })
    }

    /// Private in-memory store, discarded with the context
    ///
    /// # Errors
    /// As `open`.
    pub fn in_memory() -> Result<Self> {
        Self::open(StoreConfig::in_memory())
    }

    /// Named in-memory store shared by every open context using the name
    ///
    /// # Errors
    /// As `open`.
    pub fn in_memory_named(name: &str) -> Result<Self> {
        Self::open(StoreConfig::new(ConnectionString::shared_memory(name)))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Identifier stamped on every command this context logs
    pub fn session_id(&self) -> &SessionId {
        self.runner.session_id()
    }

    /// SELECT statements issued by this context so far
    pub fn query_count(&self) -> usize {
        self.runner.query_count()
    }

    /// Whether a save would write anything
    pub fn has_changes(&self) -> bool {
        self.tracker.has_changes()
    }

    /// State of a handle within this session
    pub fn entry_state<T: Entity>(&self, handle: &Tracked<T>) -> EntityState {
        T::set(&self.tracker).state_of(handle)
    }

    /// Forget every tracked entity
    ///
    /// Handles held by the caller stay valid but are no longer tracked;
    /// pending changes are discarded.
    pub fn detach_all(&mut self) {
        self.tracker.clear();
    }

    // ---- collections ----

    pub fn recipes(&mut self) -> RecipeQuery<'_> {
        Query::new(self)
    }

    pub fn ingredients(&mut self) -> Query<'_, Ingredient> {
        Query::new(self)
    }

    pub fn directions(&mut self) -> Query<'_, Direction> {
        Query::new(self)
    }

    pub fn categories(&mut self) -> Query<'_, Category> {
        Query::new(self)
    }

    pub fn recipe_categories(&mut self) -> Query<'_, RecipeCategory> {
        Query::new(self)
    }

    // ---- add ----

    fn add<T: Entity>(&mut self, mut entity: T) -> Tracked<T> {
        let key = self.tracker.next_temporary_key();
        entity.set_key(key);
        T::set_mut(&mut self.tracker).add(entity)
    }

    /// Track a new recipe; it gets a temporary negative id until saved
    pub fn add_recipe(&mut self, recipe: Recipe) -> Tracked<Recipe> {
        self.add(recipe)
    }

    pub fn add_category(&mut self, category: Category) -> Tracked<Category> {
        self.add(category)
    }

    fn live_recipe_id(&self, recipe: &Tracked<Recipe>) -> Result<i64> {
        self.require_live(recipe)?;
        let id = recipe.borrow().id;
        Ok(id)
    }

    fn require_live<T: Entity>(&self, handle: &Tracked<T>) -> Result<()> {
        match T::set(&self.tracker).state_of(handle) {
            EntityState::Detached => Err(RecipeError::NotTracked { entity: T::name() }.into()),
            EntityState::Deleted => Err(RecipeError::InvalidState {
                entity: T::name(),
                id: format!("{:?}", handle.borrow().key()),
                state: EntityState::Deleted.to_string(),
                reason: "entity is marked for deletion".to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }

    /// Add an ingredient owned by `recipe`, which may itself be unsaved
    ///
    /// # Errors
    /// `NotTracked` or `InvalidState` when the recipe is not live in this
    /// session.
    pub fn add_ingredient(
        &mut self,
        recipe: &Tracked<Recipe>,
        mut ingredient: Ingredient,
    ) -> Result<Tracked<Ingredient>> {
        ingredient.recipe_id = Some(self.live_recipe_id(recipe)?);
        Ok(self.add(ingredient))
    }

    /// Add a direction owned by `recipe`
    ///
    /// # Errors
    /// As `add_ingredient`.
    pub fn add_direction(
        &mut self,
        recipe: &Tracked<Recipe>,
        mut direction: Direction,
    ) -> Result<Tracked<Direction>> {
        direction.recipe_id = Some(self.live_recipe_id(recipe)?);
        Ok(self.add(direction))
    }

    /// Add the join row between a recipe and a category
    ///
    /// # Errors
    /// `NotTracked`/`InvalidState` for handles not live in this session,
    /// `InvalidState` when the pair is already linked. A link removed
    /// earlier in the session is restored instead.
    pub fn link_category(
        &mut self,
        recipe: &Tracked<Recipe>,
        category: &Tracked<Category>,
    ) -> Result<Tracked<RecipeCategory>> {
        let recipe_id = self.live_recipe_id(recipe)?;
        self.require_live(category)?;
        let link = RecipeCategory::new(recipe_id, category.borrow().id);

        // Re-linking a pair unlinked in this session keeps the stored row
        if let Some(restored) = self.tracker.recipe_categories.restore(&link.key()) {
            return Ok(restored);
        }
        if self.tracker.recipe_categories.get(&link.key()).is_some() {
            return Err(RecipeError::InvalidState {
                entity: RecipeCategory::name(),
                id: format!("{:?}", link.key()),
                state: "tracked".to_string(),
                reason: "recipe is already linked to this category".to_string(),
            }
            .into());
        }
        Ok(self.tracker.recipe_categories.add(link))
    }

    // ---- remove ----

    fn position_of<T: Entity>(&self, handle: &Tracked<T>) -> Result<usize> {
        T::set(&self.tracker)
            .position(handle)
            .ok_or_else(|| RecipeError::NotTracked { entity: T::name() }.into())
    }

    /// Mark a recipe for deletion together with its tracked ingredients,
    /// directions and category links
    ///
    /// Rows of the recipe that were never loaded are removed by the
    /// store's cascading foreign keys.
    ///
    /// # Errors
    /// `NotTracked` when the handle is not tracked by this context.
    pub fn remove_recipe(&mut self, recipe: &Tracked<Recipe>) -> Result<()> {
        let position = self.position_of(recipe)?;
        let id = recipe.borrow().id;
        self.tracker
            .ingredients
            .remove_where(|i| i.recipe_id == Some(id));
        self.tracker
            .directions
            .remove_where(|d| d.recipe_id == Some(id));
        self.tracker
            .recipe_categories
            .remove_where(|rc| rc.recipe_id == id);
        self.tracker.recipes.remove_at(position);
        Ok(())
    }

    /// # Errors
    /// `NotTracked` when the handle is not tracked by this context.
    pub fn remove_ingredient(&mut self, ingredient: &Tracked<Ingredient>) -> Result<()> {
        let position = self.position_of(ingredient)?;
        self.tracker.ingredients.remove_at(position);
        Ok(())
    }

    /// # Errors
    /// `NotTracked` when the handle is not tracked by this context.
    pub fn remove_direction(&mut self, direction: &Tracked<Direction>) -> Result<()> {
        let position = self.position_of(direction)?;
        self.tracker.directions.remove_at(position);
        Ok(())
    }

    /// Mark a category for deletion together with its tracked links
    ///
    /// # Errors
    /// `NotTracked` when the handle is not tracked by this context.
    pub fn remove_category(&mut self, category: &Tracked<Category>) -> Result<()> {
        let position = self.position_of(category)?;
        let id = category.borrow().id;
        self.tracker
            .recipe_categories
            .remove_where(|rc| rc.category_id == id);
        self.tracker.categories.remove_at(position);
        Ok(())
    }

    /// Remove the link between a recipe and a category
    ///
    /// # Errors
    /// `NotFound` when the link is not tracked.
    pub fn unlink_category(
        &mut self,
        recipe: &Tracked<Recipe>,
        category: &Tracked<Category>,
    ) -> Result<()> {
        let key = (recipe.borrow().id, category.borrow().id);
        let removed = self
            .tracker
            .recipe_categories
            .remove_where(|rc| rc.key() == key);
        if removed == 0 {
            return Err(RecipeError::NotFound {
                entity: RecipeCategory::name(),
                id: format!("{:?}", key),
            }
            .into());
        }
        Ok(())
    }

    // ---- find ----

    /// Identity map first, then a keyed query
    fn find<T: Entity>(&mut self, key: T::Key) -> Result<Option<Tracked<T>>> {
        if let Some(entry) = T::set(&self.tracker).get(&key) {
            if entry.is_live() {
                return Ok(Some(Rc::clone(&entry.entity)));
            }
            return Ok(None);
        }

        let key_values = T::key_columns(key);
        let predicates: Vec<String> = key_values
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect();
        let command = SqlCommand::new(
            format!("{}\nWHERE {}", T::select_sql(), predicates.join(" AND ")),
            key_values.into_iter().map(|(_, v)| v).collect(),
        );
        let rows = self.runner.query(&self.conn, &command, T::from_row)?;
        Ok(self.materialize(rows, true).into_iter().next())
    }

    /// # Errors
    /// Store errors only; a missing row is `Ok(None)`.
    pub fn find_recipe(&mut self, id: i64) -> Result<Option<Tracked<Recipe>>> {
        self.find(id)
    }

    /// # Errors
    /// Store errors only; a missing row is `Ok(None)`.
    pub fn find_category(&mut self, id: i64) -> Result<Option<Tracked<Category>>> {
        self.find(id)
    }

    /// # Errors
    /// Store errors only; a missing row is `Ok(None)`.
    pub fn find_ingredient(&mut self, id: i64) -> Result<Option<Tracked<Ingredient>>> {
        self.find(id)
    }

    /// # Errors
    /// Store errors only; a missing row is `Ok(None)`.
    pub fn find_direction(&mut self, id: i64) -> Result<Option<Tracked<Direction>>> {
        self.find(id)
    }

    // ---- raw SQL and procedures ----

    /// Run caller-supplied SQL returning Recipe-shaped rows
    ///
    /// The rows must carry the Recipe columns by name. Results are tracked
    /// like any query.
    ///
    /// # Errors
    /// Store errors, including a missing column.
    pub fn from_sql(&mut self, sql: &str, params: Vec<Value>) -> Result<Vec<Tracked<Recipe>>> {
        let command = SqlCommand::new(sql, params);
        let rows = self
            .runner
            .query(&self.conn, &command, <Recipe as Entity>::from_row)?;
        Ok(self.materialize(rows, true))
    }

    /// Invoke a stored procedure whose rows have the shape of `T`
    ///
    /// # Errors
    /// `ProcedureNotFound`, `InvalidParameters`, or the store error.
    pub fn exec_procedure<T: Entity>(
        &mut self,
        name: &str,
        args: &[(&str, Value)],
    ) -> Result<Vec<Tracked<T>>> {
        if !self.procedures.contains_key(name) {
            let procedure = StoredProcedure::load(&self.conn, name)?;
            self.procedures.insert(name.to_string(), procedure);
        }
        let procedure = match self.procedures.get(name) {
            Some(p) => p,
            None => return Err(crate::errors::procedure_not_found(name)),
        };

        let bound = procedure.bind(args)?;
        let command = SqlCommand::named(procedure.body.clone(), bound)
            .tagged(&[procedure.invocation()]);
        let rows = self.runner.query(&self.conn, &command, T::from_row)?;
        Ok(self.materialize(rows, true))
    }

    /// Recipes whose title contains `text`, via `sRecipeSearch`
    ///
    /// # Errors
    /// As `exec_procedure`.
    pub fn search_recipes(&mut self, text: &str) -> Result<Vec<Tracked<Recipe>>> {
        self.exec_procedure(RECIPE_SEARCH, &[(SEARCH_TEXT_PARAM, Value::Text(text.to_string()))])
    }

    /// `search_recipes`, then ordered by title on the client
    ///
    /// # Errors
    /// As `exec_procedure`.
    pub fn search_recipes_ordered(&mut self, text: &str) -> Result<Vec<Tracked<Recipe>>> {
        let mut recipes = self.search_recipes(text)?;
        recipes.sort_by(|a, b| {
            let (a, b) = (a.borrow(), b.borrow());
            a.title.cmp(&b.title).then(a.id.cmp(&b.id))
        });
        Ok(recipes)
    }

    // ---- materialization ----

    /// Turn rows into handles, resolving through the identity map when
    /// tracking
    fn materialize<T: Entity>(&mut self, rows: Vec<T>, tracking: bool) -> Vec<Tracked<T>> {
        if !tracking {
            return rows
                .into_iter()
                .map(|row| Rc::new(RefCell::new(row)))
                .collect();
        }
        let set = T::set_mut(&mut self.tracker);
        rows.into_iter().map(|row| set.attach(row)).collect()
    }
}
