//! Stored procedures
//!
//! SQLite has no stored procedures, so each one is a row of the
//! `__StoredProcedure` table: a name, the named parameters it takes and a
//! single SELECT body using those parameters. The context loads a
//! procedure by name, binds the caller's arguments against the declared
//! parameter list and runs the body like any other query.

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};

use crate::errors::{from_rusqlite, invalid_parameters, procedure_not_found, Result};

/// Name of the recipe title search procedure
pub const RECIPE_SEARCH: &str = "sRecipeSearch";
/// Its only parameter
pub const SEARCH_TEXT_PARAM: &str = "@searchText";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProcedure {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: String,
}

fn normalize(name: &str) -> String {
    let name = name.trim();
    if name.starts_with('@') || name.starts_with(':') || name.starts_with('$') {
        format!("@{}", &name[1..])
    } else {
        format!("@{}", name)
    }
}

impl StoredProcedure {
    /// Load a procedure definition
    ///
    /// # Errors
    /// `ProcedureNotFound` when no procedure has that name.
    pub fn load(conn: &Connection, name: &str) -> Result<Self> {
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT Name, Parameters, Body FROM __StoredProcedure WHERE Name = ?1",
                [name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;

        let (name, parameters, body) = row.ok_or_else(|| procedure_not_found(name))?;
        Ok(Self {
            name,
            parameters: parameters
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(normalize)
                .collect(),
            body,
        })
    }

    /// Match caller arguments to the declared parameters
    ///
    /// Argument names may be given with or without the leading `@`. The
    /// result is in declaration order, ready to bind to `body`.
    ///
    /// # Errors
    /// `InvalidParameters` when a declared parameter has no argument or an
    /// argument names no declared parameter.
    pub fn bind(&self, args: &[(&str, Value)]) -> Result<Vec<(String, Value)>> {
        let named: Vec<(String, &Value)> = args.iter().map(|(n, v)| (normalize(n), v)).collect();

        if let Some((extra, _)) = named.iter().find(|(n, _)| !self.parameters.contains(n)) {
            return Err(invalid_parameters(
                &self.name,
                format!("{} does not take parameter {}", self.name, extra),
            ));
        }

        self.parameters
            .iter()
            .map(|param| {
                named
                    .iter()
                    .find(|(n, _)| n == param)
                    .map(|(n, v)| (n.clone(), (*v).clone()))
                    .ok_or_else(|| {
                        invalid_parameters(
                            &self.name,
                            format!(
                                "{} expects parameter {}, which was not supplied",
                                self.name, param
                            ),
                        )
                    })
            })
            .collect()
    }

    /// Invocation text as it appears in command logs
    pub fn invocation(&self) -> String {
        format!("EXEC {} {}", self.name, self.parameters.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::apply_migrations;
    use recipe_core::ExErrorKind;

    fn migrated() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        conn
    }

    #[test]
    fn test_recipe_search_is_installed() {
        let procedure = StoredProcedure::load(&migrated(), RECIPE_SEARCH).unwrap();
        assert_eq!(procedure.parameters, vec![SEARCH_TEXT_PARAM.to_string()]);
        assert!(procedure.body.contains("@searchText"));
    }

    #[test]
    fn test_unknown_procedure() {
        let err = StoredProcedure::load(&migrated(), "sNope").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ProcedureNotFound);
    }

    #[test]
    fn test_bind_accepts_bare_names() {
        let procedure = StoredProcedure::load(&migrated(), RECIPE_SEARCH).unwrap();
        let bound = procedure
            .bind(&[("searchText", Value::from("salmon".to_string()))])
            .unwrap();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].0, "@searchText");
    }

    #[test]
    fn test_bind_rejects_missing_and_extra() {
        let procedure = StoredProcedure::load(&migrated(), RECIPE_SEARCH).unwrap();
        let missing = procedure.bind(&[]).unwrap_err();
        assert_eq!(missing.kind(), ExErrorKind::InvalidParameters);

        let extra = procedure
            .bind(&[
                ("@searchText", Value::from("salmon".to_string())),
                ("@limit", Value::Integer(5)),
            ])
            .unwrap_err();
        assert_eq!(extra.kind(), ExErrorKind::InvalidParameters);
        assert!(extra.message().contains("@limit"));
    }
}
