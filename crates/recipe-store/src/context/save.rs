//! Saving tracked changes
//!
//! `save_changes` turns the tracker's state into an ordered list of
//! writes, validates each of them, then sends them in batches of at most
//! `max_batch_size` statements inside one transaction. The whole
//! transaction is repeated by the execution strategy when it fails with a
//! transient error. The tracker is only updated once the transaction has
//! committed, so a failed save leaves every pending change in place.

use std::time::Instant;

use recipe_core::errors::RecipeError;
use recipe_core::{log_op_end, log_op_error, log_op_start};
use recipe_core_types::schema::EVENT_BATCH;
use recipe_core_types::{SaveId, SessionId};
use rusqlite::types::Value;
use rusqlite::Connection;

use super::entity::Entity;
use super::tracker::{EntitySet, EntityState, KeyMap, Tracker};
use super::RecipeContext;
use crate::command::{CommandRunner, SqlCommand, COMMAND_TARGET};
use crate::errors::{concurrency_error, from_rusqlite, Result};

/// What one call to `save_changes` wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub save_id: SaveId,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Batches sent by the successful attempt
    pub batches: usize,
    /// Attempts made, 1 unless a transient failure was retried
    pub attempts: u32,
}

impl SaveReport {
    fn empty(save_id: SaveId) -> Self {
        Self {
            save_id,
            inserted: 0,
            updated: 0,
            deleted: 0,
            batches: 0,
            attempts: 0,
        }
    }

    /// Rows written in total
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Insert,
    Update,
    Delete,
}

/// One statement of a save, rendered once store keys are known
trait PendingWrite {
    fn entity_name(&self) -> &'static str;
    fn kind(&self) -> WriteKind;
    fn command(&self, keys: &KeyMap) -> SqlCommand;
    /// Temporary key to map to the row id the insert produced
    fn temporary_key(&self) -> Option<i64>;
    fn describe_key(&self) -> String;
}

struct Write<T: Entity> {
    kind: WriteKind,
    current: T,
    /// Snapshot the WHERE clause of an update or delete is built from
    original: Option<T>,
}

fn placeholders(count: usize, start: usize) -> Vec<String> {
    (start..start + count).map(|i| format!("?{}", i)).collect()
}

fn where_clause(keys: &[(&'static str, Value)], start: usize) -> String {
    keys.iter()
        .zip(placeholders(keys.len(), start))
        .map(|((column, _), p)| format!("{} = {}", column, p))
        .collect::<Vec<_>>()
        .join(" AND ")
}

impl<T: Entity> Write<T> {
    fn insert(&self, current: &T) -> SqlCommand {
        let values = current.column_values();
        let columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
        let sql = format!(
            "INSERT INTO {} ({})\nVALUES ({})",
            T::name(),
            columns.join(", "),
            placeholders(values.len(), 1).join(", ")
        );
        SqlCommand::new(sql, values.into_iter().map(|(_, v)| v).collect())
    }

    /// Only the columns that differ from the snapshot are set
    fn update(&self, current: &T, original: &T) -> SqlCommand {
        let before = original.column_values();
        let changed: Vec<(&'static str, Value)> = current
            .column_values()
            .into_iter()
            .zip(before)
            .filter(|(now, then)| now.1 != then.1)
            .map(|(now, _)| now)
            .collect();
        let keys = original.key_values();

        let assignments: Vec<String> = changed
            .iter()
            .zip(placeholders(changed.len(), 1))
            .map(|((column, _), p)| format!("{} = {}", column, p))
            .collect();
        let sql = format!(
            "UPDATE {} SET {}\nWHERE {}",
            T::name(),
            assignments.join(", "),
            where_clause(&keys, changed.len() + 1)
        );
        let params = changed
            .into_iter()
            .chain(keys)
            .map(|(_, v)| v)
            .collect();
        SqlCommand::new(sql, params)
    }

    fn delete(&self, original: &T) -> SqlCommand {
        let keys = original.key_values();
        let sql = format!("DELETE FROM {}\nWHERE {}", T::name(), where_clause(&keys, 1));
        SqlCommand::new(sql, keys.into_iter().map(|(_, v)| v).collect())
    }
}

impl<T: Entity> PendingWrite for Write<T> {
    fn entity_name(&self) -> &'static str {
        T::name()
    }

    fn kind(&self) -> WriteKind {
        self.kind
    }

    fn command(&self, keys: &KeyMap) -> SqlCommand {
        // Foreign keys may still point at rows inserted earlier in this save
        let mut current = self.current.clone();
        current.remap_keys(keys);
        match (self.kind, &self.original) {
            (WriteKind::Update, Some(original)) => self.update(&current, original),
            (WriteKind::Delete, Some(original)) => self.delete(original),
            _ => self.insert(&current),
        }
    }

    fn temporary_key(&self) -> Option<i64> {
        match self.kind {
            WriteKind::Insert => self.current.temporary_key(),
            _ => None,
        }
    }

    fn describe_key(&self) -> String {
        let key = self.original.as_ref().unwrap_or(&self.current).key();
        format!("{:?}", key)
    }
}

type Plan = Vec<Box<dyn PendingWrite>>;

fn plan_writes<T: Entity>(set: &EntitySet<T>, kind: WriteKind, plan: &mut Plan) -> Result<()> {
    for entry in set.entries() {
        let current = entry.entity.borrow();
        let write = match (entry.state(), kind) {
            (EntityState::Added, WriteKind::Insert) => {
                current.validate()?;
                Write {
                    kind,
                    current: current.clone(),
                    original: None,
                }
            }
            (EntityState::Modified, WriteKind::Update) => {
                let original = match entry.original() {
                    Some(original) => original.clone(),
                    None => continue,
                };
                if original.key() != current.key() {
                    return Err(RecipeError::InvalidState {
                        entity: T::name(),
                        id: format!("{:?}", original.key()),
                        state: EntityState::Modified.to_string(),
                        reason: "the key of a stored entity cannot change".to_string(),
                    }
                    .into());
                }
                current.validate()?;
                Write {
                    kind,
                    current: current.clone(),
                    original: Some(original),
                }
            }
            (EntityState::Deleted, WriteKind::Delete) => {
                let original = entry.original().cloned().unwrap_or_else(|| current.clone());
                Write {
                    kind,
                    current: current.clone(),
                    original: Some(original),
                }
            }
            _ => continue,
        };
        plan.push(Box::new(write));
    }
    Ok(())
}

/// Every write in dependency order
///
/// Parents are inserted before the rows that reference them, and
/// referencing rows are deleted before their parents.
fn build_plan(tracker: &Tracker) -> Result<Plan> {
    let mut plan: Plan = Vec::new();

    plan_writes(&tracker.categories, WriteKind::Insert, &mut plan)?;
    plan_writes(&tracker.recipes, WriteKind::Insert, &mut plan)?;
    plan_writes(&tracker.ingredients, WriteKind::Insert, &mut plan)?;
    plan_writes(&tracker.directions, WriteKind::Insert, &mut plan)?;
    plan_writes(&tracker.recipe_categories, WriteKind::Insert, &mut plan)?;

    plan_writes(&tracker.categories, WriteKind::Update, &mut plan)?;
    plan_writes(&tracker.recipes, WriteKind::Update, &mut plan)?;
    plan_writes(&tracker.ingredients, WriteKind::Update, &mut plan)?;
    plan_writes(&tracker.directions, WriteKind::Update, &mut plan)?;
    plan_writes(&tracker.recipe_categories, WriteKind::Update, &mut plan)?;

    plan_writes(&tracker.recipe_categories, WriteKind::Delete, &mut plan)?;
    plan_writes(&tracker.ingredients, WriteKind::Delete, &mut plan)?;
    plan_writes(&tracker.directions, WriteKind::Delete, &mut plan)?;
    plan_writes(&tracker.recipes, WriteKind::Delete, &mut plan)?;
    plan_writes(&tracker.categories, WriteKind::Delete, &mut plan)?;

    Ok(plan)
}

struct Attempt<'a> {
    runner: &'a CommandRunner,
    session_id: &'a SessionId,
    save_id: &'a SaveId,
    batch_size: usize,
    number: u32,
}

impl Attempt<'_> {
    /// Send the whole plan in one transaction, returning the keys assigned
    fn run(&self, conn: &mut Connection, plan: &[Box<dyn PendingWrite>]) -> Result<KeyMap> {
        let tx = conn.transaction().map_err(from_rusqlite)?;
        let mut keys = KeyMap::default();

        for (index, batch) in plan.chunks(self.batch_size).enumerate() {
            tracing::info!(
                target: COMMAND_TARGET,
                session_id = self.session_id.as_str(),
                save_id = self.save_id.as_str(),
                event = EVENT_BATCH,
                batch = index + 1,
                batch_size = batch.len(),
                attempt = self.number,
                "Executing batch {} of {} statements",
                index + 1,
                batch.len()
            );
            for write in batch {
                let command = write.command(&keys);
                let affected = self.runner.execute(&tx, &command)?;
                match write.kind() {
                    WriteKind::Insert => {
                        if let Some(temporary) = write.temporary_key() {
                            keys.insert(temporary, tx.last_insert_rowid());
                        }
                    }
                    WriteKind::Update | WriteKind::Delete if affected != 1 => {
                        return Err(concurrency_error(
                            write.entity_name(),
                            write.describe_key(),
                            affected,
                        ));
                    }
                    WriteKind::Update | WriteKind::Delete => {}
                }
            }
        }

        tx.commit().map_err(from_rusqlite)?;
        Ok(keys)
    }
}

impl RecipeContext {
    /// Write every pending change to the store
    ///
    /// Inserted entities receive their store keys, including the foreign
    /// keys of rows that referenced them, and every tracked entity becomes
    /// unchanged. A save with nothing to write issues no SQL.
    ///
    /// # Errors
    /// `InvalidInput` when an entity fails validation (before any SQL is
    /// sent), `ConstraintViolation`, `Concurrency` when an update or delete
    /// matched no row, `RetryLimitExceeded` when transient failures outlast
    /// the retry budget. On error nothing is committed and the tracked
    /// state is left as it was.
    pub fn save_changes(&mut self) -> Result<SaveReport> {
        let start = Instant::now();
        let save_id = SaveId::new();
        let session_id = self.session_id().clone();
        log_op_start!(
            "save_changes",
            session_id = session_id.as_str(),
            save_id = save_id.as_str()
        );

        let result = self.save_inner(&session_id, save_id.clone());
        match &result {
            Ok(report) => {
                log_op_end!(
                    "save_changes",
                    duration_ms = start.elapsed().as_millis() as u64,
                    session_id = session_id.as_str(),
                    save_id = save_id.as_str(),
                    inserted = report.inserted,
                    updated = report.updated,
                    deleted = report.deleted,
                    attempts = report.attempts
                );
            }
            Err(err) => {
                log_op_error!(
                    "save_changes",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    session_id = session_id.as_str(),
                    save_id = save_id.as_str()
                );
            }
        }
        result
    }

    fn save_inner(&mut self, session_id: &SessionId, save_id: SaveId) -> Result<SaveReport> {
        let plan = build_plan(&self.tracker)?;
        let mut report = SaveReport::empty(save_id);
        if plan.is_empty() {
            return Ok(report);
        }

        for write in &plan {
            match write.kind() {
                WriteKind::Insert => report.inserted += 1,
                WriteKind::Update => report.updated += 1,
                WriteKind::Delete => report.deleted += 1,
            }
        }
        let batch_size = self.config.max_batch_size.max(1);
        report.batches = plan.len().div_ceil(batch_size);

        let strategy = self.strategy;
        let conn = &mut self.conn;
        let runner = &self.runner;
        let save_id = report.save_id.clone();
        let mut attempts = 0;
        let keys = strategy.execute("save_changes", |number| {
            attempts = number;
            Attempt {
                runner,
                session_id,
                save_id: &save_id,
                batch_size,
                number,
            }
            .run(conn, &plan)
        })?;
        report.attempts = attempts;

        self.tracker.accept_changes(&keys);
        Ok(report)
    }
}
