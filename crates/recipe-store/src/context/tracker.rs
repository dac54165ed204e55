//! Change tracker
//!
//! One `EntitySet` per table holds the session's identity map: at most one
//! shared instance per key. Each entry keeps the snapshot taken when the
//! row was read (or last saved) so modifications are found by comparison
//! at save time.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use recipe_core::model::{Category, Direction, Ingredient, Recipe, RecipeCategory};

use super::entity::Entity;

/// Shared handle to a tracked entity
///
/// Every lookup of the same key within one session returns a clone of the
/// same `Rc`, so `Rc::ptr_eq` tells whether two handles are the same row.
pub type Tracked<T> = Rc<RefCell<T>>;

/// Tracking state of an entity within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// Not tracked by this session
    Detached,
    /// Read from the store and not changed since
    Unchanged,
    /// Tracked and not yet inserted
    Added,
    /// Differs from its snapshot
    Modified,
    /// Will be deleted on the next save
    Deleted,
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Temporary key to store key assignments made during one save
#[derive(Debug, Default, Clone)]
pub struct KeyMap(HashMap<i64, i64>);

impl KeyMap {
    pub fn insert(&mut self, temporary: i64, assigned: i64) {
        self.0.insert(temporary, assigned);
    }

    /// The store key for `key`, or `key` itself when it was never temporary
    pub fn resolve(&self, key: i64) -> i64 {
        self.0.get(&key).copied().unwrap_or(key)
    }

    pub fn resolve_opt(&self, key: Option<i64>) -> Option<i64> {
        key.map(|k| self.resolve(k))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

pub struct Entry<T> {
    pub entity: Tracked<T>,
    added: bool,
    deleted: bool,
    /// Values as last read or saved; absent for added entities
    original: Option<T>,
}

impl<T: Entity> Entry<T> {
    pub fn state(&self) -> EntityState {
        if self.added {
            EntityState::Added
        } else if self.deleted {
            EntityState::Deleted
        } else if self.original.as_ref() != Some(&*self.entity.borrow()) {
            EntityState::Modified
        } else {
            EntityState::Unchanged
        }
    }

    pub fn original(&self) -> Option<&T> {
        self.original.as_ref()
    }

    pub fn is_live(&self) -> bool {
        !self.deleted
    }
}

/// Identity map and change tracking for one table
pub struct EntitySet<T: Entity> {
    entries: Vec<Entry<T>>,
    index: HashMap<T::Key, usize>,
}

impl<T: Entity> Default for EntitySet<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Entity> EntitySet<T> {
    pub fn get(&self, key: &T::Key) -> Option<&Entry<T>> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry<T>> {
        self.entries.iter()
    }

    /// Live (not deleted) entities matching a predicate
    pub fn live_where<F>(&self, predicate: F) -> Vec<Tracked<T>>
    where
        F: Fn(&T) -> bool,
    {
        self.entries
            .iter()
            .filter(|e| e.is_live() && predicate(&e.entity.borrow()))
            .map(|e| Rc::clone(&e.entity))
            .collect()
    }

    /// Track a row read from the store
    ///
    /// If the key is already tracked the existing instance wins and the
    /// stored values are discarded.
    pub fn attach(&mut self, entity: T) -> Tracked<T> {
        let key = entity.key();
        if let Some(&i) = self.index.get(&key) {
            return Rc::clone(&self.entries[i].entity);
        }
        let original = Some(entity.clone());
        self.push(key, entity, false, original)
    }

    /// Track a new entity, to be inserted on the next save
    pub fn add(&mut self, entity: T) -> Tracked<T> {
        let key = entity.key();
        self.push(key, entity, true, None)
    }

    fn push(&mut self, key: T::Key, entity: T, added: bool, original: Option<T>) -> Tracked<T> {
        let handle = Rc::new(RefCell::new(entity));
        self.index.insert(key, self.entries.len());
        self.entries.push(Entry {
            entity: Rc::clone(&handle),
            added,
            deleted: false,
            original,
        });
        handle
    }

    /// Undo a pending deletion, returning the entity to its prior state
    ///
    /// `None` when the key is not tracked or its entry is not deleted.
    pub fn restore(&mut self, key: &T::Key) -> Option<Tracked<T>> {
        let &i = self.index.get(key)?;
        let entry = &mut self.entries[i];
        if !entry.deleted {
            return None;
        }
        entry.deleted = false;
        Some(Rc::clone(&entry.entity))
    }

    pub fn position(&self, handle: &Tracked<T>) -> Option<usize> {
        self.entries.iter().position(|e| Rc::ptr_eq(&e.entity, handle))
    }

    pub fn state_of(&self, handle: &Tracked<T>) -> EntityState {
        self.position(handle)
            .map_or(EntityState::Detached, |i| self.entries[i].state())
    }

    /// Mark for deletion; an added entity is simply forgotten
    pub fn remove_at(&mut self, position: usize) {
        if self.entries[position].added {
            self.entries.remove(position);
            self.reindex();
        } else {
            self.entries[position].deleted = true;
        }
    }

    /// Remove every live entity matching a predicate, returning how many
    pub fn remove_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&T) -> bool,
    {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.added && predicate(&e.entity.borrow())));
        let mut removed = before - self.entries.len();
        for entry in self.entries.iter_mut() {
            if !entry.deleted && predicate(&entry.entity.borrow()) {
                entry.deleted = true;
                removed += 1;
            }
        }
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    pub fn has_changes(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.state() != EntityState::Unchanged)
    }

    /// Make the saved state the new baseline
    ///
    /// Deleted entries are dropped, temporary keys are replaced by the keys
    /// the store assigned, and every remaining entry becomes unchanged.
    pub fn accept_changes(&mut self, keys: &KeyMap) {
        self.entries.retain(|e| !e.deleted);
        for entry in self.entries.iter_mut() {
            let mut entity = entry.entity.borrow_mut();
            entity.remap_keys(keys);
            entry.original = Some(entity.clone());
            entry.added = false;
        }
        self.reindex();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.entity.borrow().key(), i))
            .collect();
    }
}

/// Navigations a recipe can load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Navigation {
    Ingredients,
    Directions,
    Categories,
}

impl Navigation {
    pub const ALL: [Navigation; 3] = [
        Navigation::Ingredients,
        Navigation::Directions,
        Navigation::Categories,
    ];
}

/// Everything a session tracks
#[derive(Default)]
pub struct Tracker {
    pub recipes: EntitySet<Recipe>,
    pub ingredients: EntitySet<Ingredient>,
    pub directions: EntitySet<Direction>,
    pub categories: EntitySet<Category>,
    pub recipe_categories: EntitySet<RecipeCategory>,
    /// (navigation, recipe id) pairs already fetched from the store
    loaded: HashSet<(Navigation, i64)>,
    last_temporary_key: i64,
}

impl Tracker {
    /// Next temporary key; negative and unique across every table
    pub fn next_temporary_key(&mut self) -> i64 {
        self.last_temporary_key -= 1;
        self.last_temporary_key
    }

    pub fn is_loaded(&self, navigation: Navigation, recipe_id: i64) -> bool {
        self.loaded.contains(&(navigation, recipe_id))
    }

    pub fn mark_loaded(&mut self, navigation: Navigation, recipe_id: i64) {
        self.loaded.insert((navigation, recipe_id));
    }

    pub fn has_changes(&self) -> bool {
        self.recipes.has_changes()
            || self.ingredients.has_changes()
            || self.directions.has_changes()
            || self.categories.has_changes()
            || self.recipe_categories.has_changes()
    }

    /// Number of tracked entries across all tables
    pub fn len(&self) -> usize {
        self.recipes.len()
            + self.ingredients.len()
            + self.directions.len()
            + self.categories.len()
            + self.recipe_categories.len()
    }

    pub fn accept_changes(&mut self, keys: &KeyMap) {
        // Recipes inserted by this save have nothing else in the store
        let inserted: Vec<i64> = self
            .recipes
            .entries()
            .filter(|e| e.state() == EntityState::Added)
            .map(|e| keys.resolve(e.entity.borrow().id))
            .collect();

        self.recipes.accept_changes(keys);
        self.ingredients.accept_changes(keys);
        self.directions.accept_changes(keys);
        self.categories.accept_changes(keys);
        self.recipe_categories.accept_changes(keys);

        for id in inserted {
            for navigation in Navigation::ALL {
                self.mark_loaded(navigation, id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.recipes.clear();
        self.ingredients.clear();
        self.directions.clear();
        self.categories.clear();
        self.recipe_categories.clear();
        self.loaded.clear();
    }
}
