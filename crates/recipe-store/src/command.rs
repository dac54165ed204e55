//! SQL commands and their execution
//!
//! Every statement the context sends goes through `CommandRunner`, which
//! logs it as one line on the `recipe_store::command` target and counts
//! the queries the session has issued.

use std::cell::Cell;
use std::time::{Duration, Instant};

use recipe_core_types::schema::{EVENT_COMMAND, REDACTED_PARAMS};
use recipe_core_types::SessionId;
use rusqlite::types::{ToSql, Value};
use rusqlite::{params_from_iter, Connection, Row};

use crate::errors::{from_rusqlite, Result};

pub(crate) const COMMAND_TARGET: &str = "recipe_store::command";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CommandParams {
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SqlCommand {
    pub sql: String,
    pub params: CommandParams,
}

impl SqlCommand {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params: CommandParams::Positional(params),
        }
    }

    pub fn named(sql: impl Into<String>, params: Vec<(String, Value)>) -> Self {
        Self {
            sql: sql.into(),
            params: CommandParams::Named(params),
        }
    }

    /// Prefix the statement with one `-- tag` comment line per tag
    pub fn tagged(mut self, tags: &[String]) -> Self {
        if tags.is_empty() {
            return self;
        }
        let mut sql = String::new();
        for tag in tags {
            for line in tag.lines() {
                sql.push_str("-- ");
                sql.push_str(line);
                sql.push('\n');
            }
        }
        sql.push_str(&self.sql);
        self.sql = sql;
        self
    }

    /// The statement folded onto one line
    pub fn single_line(&self) -> String {
        self.sql.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn render_params(&self, sensitive: bool) -> String {
        fn render(value: &Value) -> String {
            match value {
                Value::Null => "NULL".to_string(),
                Value::Integer(i) => i.to_string(),
                Value::Real(r) => r.to_string(),
                Value::Text(t) => format!("'{}'", t),
                Value::Blob(b) => format!("<{} bytes>", b.len()),
            }
        }

        let rendered: Vec<String> = match &self.params {
            CommandParams::Positional(values) if sensitive => values.iter().map(render).collect(),
            CommandParams::Named(values) if sensitive => values
                .iter()
                .map(|(name, v)| format!("{}={}", name, render(v)))
                .collect(),
            CommandParams::Positional(values) => vec![REDACTED_PARAMS.to_string(); values.len()],
            CommandParams::Named(values) => values
                .iter()
                .map(|(name, _)| format!("{}={}", name, REDACTED_PARAMS))
                .collect(),
        };
        rendered.join(", ")
    }
}

/// Executes commands for one session
#[derive(Debug)]
pub(crate) struct CommandRunner {
    session_id: SessionId,
    log_commands: bool,
    sensitive_data_logging: bool,
    queries: Cell<usize>,
}

impl CommandRunner {
    pub fn new(session_id: SessionId, log_commands: bool, sensitive_data_logging: bool) -> Self {
        Self {
            session_id,
            log_commands,
            sensitive_data_logging,
            queries: Cell::new(0),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// SELECT statements issued so far
    pub fn query_count(&self) -> usize {
        self.queries.get()
    }

    /// Run a query, mapping every row
    pub fn query<T, F>(&self, conn: &Connection, command: &SqlCommand, mut map: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.queries.set(self.queries.get() + 1);
        let start = Instant::now();

        let mut stmt = conn.prepare_cached(&command.sql).map_err(from_rusqlite)?;
        let rows = match &command.params {
            CommandParams::Positional(values) => stmt
                .query_map(params_from_iter(values.iter()), |row| map(row))
                .map_err(from_rusqlite)?
                .collect::<rusqlite::Result<Vec<T>>>(),
            CommandParams::Named(values) => {
                let named: Vec<(&str, &dyn ToSql)> = values
                    .iter()
                    .map(|(name, v)| (name.as_str(), v as &dyn ToSql))
                    .collect();
                stmt.query_map(named.as_slice(), |row| map(row))
                    .map_err(from_rusqlite)?
                    .collect::<rusqlite::Result<Vec<T>>>()
            }
        }
        .map_err(from_rusqlite)?;

        self.log(command, start.elapsed(), rows.len());
        Ok(rows)
    }

    /// Run a single-value query such as `SELECT COUNT(*)`
    pub fn query_scalar(&self, conn: &Connection, command: &SqlCommand) -> Result<i64> {
        let values = self.query(conn, command, |row| row.get::<_, i64>(0))?;
        Ok(values.into_iter().next().unwrap_or(0))
    }

    /// Run a statement, returning the number of rows it changed
    pub fn execute(&self, conn: &Connection, command: &SqlCommand) -> Result<usize> {
        let start = Instant::now();
        let mut stmt = conn.prepare_cached(&command.sql).map_err(from_rusqlite)?;
        let affected = match &command.params {
            CommandParams::Positional(values) => stmt.execute(params_from_iter(values.iter())),
            CommandParams::Named(values) => {
                let named: Vec<(&str, &dyn ToSql)> = values
                    .iter()
                    .map(|(name, v)| (name.as_str(), v as &dyn ToSql))
                    .collect();
                stmt.execute(named.as_slice())
            }
        }
        .map_err(from_rusqlite)?;

        self.log(command, start.elapsed(), affected);
        Ok(affected)
    }

    fn log(&self, command: &SqlCommand, elapsed: Duration, rows: usize) {
        if !self.log_commands {
            return;
        }
        let sql = command.single_line();
        let params = command.render_params(self.sensitive_data_logging);
        tracing::info!(
            target: COMMAND_TARGET,
            session_id = self.session_id.as_str(),
            event = EVENT_COMMAND,
            sql = sql.as_str(),
            params = params.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            rows = rows,
            "Executed DbCommand ({}ms) [Parameters=[{}]] {}",
            elapsed.as_millis(),
            params,
            sql
        );
    }
}
