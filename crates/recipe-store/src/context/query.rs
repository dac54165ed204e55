//! Query builder
//!
//! `ctx.recipes().filter(..).order_by(..).take(..).to_list()` compiles to
//! a single parameterized SELECT over the declared columns of the table.
//! Column names are checked against the schema declaration before any SQL
//! is issued.

use std::marker::PhantomData;

use recipe_core::model::Recipe;
use rusqlite::types::Value;

use super::entity::Entity;
use super::tracker::{Navigation, Tracked};
use super::RecipeContext;
use crate::command::SqlCommand;
use crate::errors::{invalid_query, Result};

/// Escape `%`, `_` and `\` so user text matches literally in LIKE
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// One WHERE predicate; predicates of a query are joined with AND
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(&'static str, Value),
    /// Raw LIKE pattern, wildcards included
    Like(&'static str, String),
    Contains(&'static str, String),
    StartsWith(&'static str, String),
    In(&'static str, Vec<Value>),
    IsNull(&'static str),
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Filter::Eq(column, value.into())
    }

    pub fn like(column: &'static str, pattern: impl Into<String>) -> Self {
        Filter::Like(column, pattern.into())
    }

    pub fn contains(column: &'static str, text: impl Into<String>) -> Self {
        Filter::Contains(column, text.into())
    }

    pub fn starts_with(column: &'static str, text: impl Into<String>) -> Self {
        Filter::StartsWith(column, text.into())
    }

    pub fn is_in<V, I>(column: &'static str, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Filter::In(column, values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(column: &'static str) -> Self {
        Filter::IsNull(column)
    }

    pub fn column(&self) -> &'static str {
        match self {
            Filter::Eq(c, _)
            | Filter::Like(c, _)
            | Filter::Contains(c, _)
            | Filter::StartsWith(c, _)
            | Filter::In(c, _)
            | Filter::IsNull(c) => c,
        }
    }

    /// Render the predicate, appending its parameters
    fn render(&self, params: &mut Vec<Value>) -> String {
        let mut placeholder = |value: Value| {
            params.push(value);
            format!("?{}", params.len())
        };
        match self {
            Filter::Eq(c, Value::Null) => format!("{} IS NULL", c),
            Filter::Eq(c, v) => format!("{} = {}", c, placeholder(v.clone())),
            Filter::Like(c, pattern) => {
                format!("{} LIKE {}", c, placeholder(Value::Text(pattern.clone())))
            }
            Filter::Contains(c, text) => format!(
                "{} LIKE {} ESCAPE '\\'",
                c,
                placeholder(Value::Text(format!("%{}%", escape_like(text))))
            ),
            Filter::StartsWith(c, text) => format!(
                "{} LIKE {} ESCAPE '\\'",
                c,
                placeholder(Value::Text(format!("{}%", escape_like(text))))
            ),
            // IN () is valid SQLite and matches nothing
            Filter::In(c, values) => {
                let list: Vec<String> = values.iter().map(|v| placeholder(v.clone())).collect();
                format!("{} IN ({})", c, list.join(", "))
            }
            Filter::IsNull(c) => format!("{} IS NULL", c),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Query over one entity table
///
/// Results are tracked by the context unless `no_tracking` is called, in
/// which case every row becomes a fresh instance the context never sees.
pub struct Query<'a, T: Entity> {
    pub(super) ctx: &'a mut RecipeContext,
    filters: Vec<Filter>,
    order: Vec<(&'static str, SortDirection)>,
    take: Option<usize>,
    skip: Option<usize>,
    tags: Vec<String>,
    pub(super) tracking: bool,
    marker: PhantomData<T>,
}

pub type RecipeQuery<'a> = Query<'a, Recipe>;

impl<'a, T: Entity> Query<'a, T> {
    pub(super) fn new(ctx: &'a mut RecipeContext) -> Self {
        Self {
            ctx,
            filters: Vec::new(),
            order: Vec::new(),
            take: None,
            skip: None,
            tags: Vec::new(),
            tracking: true,
            marker: PhantomData,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: &'static str) -> Self {
        self.order.push((column, SortDirection::Ascending));
        self
    }

    pub fn order_by_descending(mut self, column: &'static str) -> Self {
        self.order.push((column, SortDirection::Descending));
        self
    }

    pub fn take(mut self, count: usize) -> Self {
        self.take = Some(count);
        self
    }

    pub fn skip(mut self, count: usize) -> Self {
        self.skip = Some(count);
        self
    }

    /// Attach a comment to the generated SQL, visible in command logs
    pub fn tag_with(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn no_tracking(mut self) -> Self {
        self.tracking = false;
        self
    }

    fn check_column(column: &str) -> Result<()> {
        let table = T::table();
        if table.column(column).is_none() {
            return Err(invalid_query(
                table.name,
                format!("{} has no column {}", table.name, column),
            ));
        }
        Ok(())
    }

    /// SELECT without tags, with its parameters
    pub(super) fn select(&self) -> Result<(String, Vec<Value>)> {
        let mut sql = T::select_sql();
        let mut params = Vec::new();

        if !self.filters.is_empty() {
            let mut predicates = Vec::with_capacity(self.filters.len());
            for filter in &self.filters {
                Self::check_column(filter.column())?;
                predicates.push(filter.render(&mut params));
            }
            sql.push_str("\nWHERE ");
            sql.push_str(&predicates.join(" AND "));
        }

        if !self.order.is_empty() {
            let mut terms = Vec::with_capacity(self.order.len());
            for (column, direction) in &self.order {
                Self::check_column(column)?;
                terms.push(match direction {
                    SortDirection::Ascending => format!("{} ASC", column),
                    SortDirection::Descending => format!("{} DESC", column),
                });
            }
            sql.push_str("\nORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        if self.take.is_some() || self.skip.is_some() {
            let limit = match self.take {
                Some(n) => i64::try_from(n).unwrap_or(i64::MAX),
                None => -1,
            };
            let offset = i64::try_from(self.skip.unwrap_or(0)).unwrap_or(i64::MAX);
            params.push(Value::Integer(limit));
            let limit_at = params.len();
            params.push(Value::Integer(offset));
            sql.push_str(&format!("\nLIMIT ?{} OFFSET ?{}", limit_at, limit_at + 1));
        }

        Ok((sql, params))
    }

    pub(super) fn tags(&self) -> &[String] {
        &self.tags
    }

    pub(super) fn command(&self, sql: String, params: Vec<Value>) -> SqlCommand {
        SqlCommand::new(sql, params).tagged(&self.tags)
    }

    /// Rows as plain values, without touching the tracker
    pub(super) fn fetch(&self) -> Result<Vec<T>> {
        let (sql, params) = self.select()?;
        let command = self.command(sql, params);
        self.ctx
            .runner
            .query(&self.ctx.conn, &command, T::from_row)
    }

    /// Run the query
    ///
    /// # Errors
    /// `InvalidInput` for an unknown column, or the store error.
    pub fn to_list(self) -> Result<Vec<Tracked<T>>> {
        let rows = self.fetch()?;
        Ok(self.ctx.materialize(rows, self.tracking))
    }

    /// First row, if any
    ///
    /// # Errors
    /// As `to_list`.
    pub fn first(self) -> Result<Option<Tracked<T>>> {
        Ok(self.take(1).to_list()?.into_iter().next())
    }

    /// Number of matching rows, honouring take and skip
    ///
    /// # Errors
    /// As `to_list`.
    pub fn count(self) -> Result<i64> {
        let (sql, params) = self.select()?;
        let command = self.command(format!("SELECT COUNT(*) FROM (\n{}\n)", sql), params);
        self.ctx.runner.query_scalar(&self.ctx.conn, &command)
    }

    /// # Errors
    /// As `to_list`.
    pub fn any(self) -> Result<bool> {
        let (sql, params) = self.select()?;
        let command = self.command(format!("SELECT EXISTS (\n{}\n)", sql), params);
        Ok(self.ctx.runner.query_scalar(&self.ctx.conn, &command)? != 0)
    }
}

impl<'a> Query<'a, Recipe> {
    /// Eagerly load one navigation of the recipes
    pub fn include(self, navigation: Navigation) -> IncludeQuery<'a> {
        IncludeQuery::new(self).include(navigation)
    }

    /// Eagerly load the recipes' ingredients
    pub fn include_ingredients(self) -> IncludeQuery<'a> {
        IncludeQuery::new(self).include_ingredients()
    }

    /// Eagerly load the recipes' directions
    pub fn include_directions(self) -> IncludeQuery<'a> {
        IncludeQuery::new(self).include_directions()
    }

    /// Eagerly load the recipes' categories
    pub fn include_categories(self) -> IncludeQuery<'a> {
        IncludeQuery::new(self).include_categories()
    }
}

/// Recipe query with related rows to load alongside
///
/// `load_graphs` issues one query for the recipes and one per included
/// navigation, however many recipes match.
pub struct IncludeQuery<'a> {
    pub(super) query: RecipeQuery<'a>,
    pub(super) includes: Vec<Navigation>,
}

impl<'a> IncludeQuery<'a> {
    fn new(query: RecipeQuery<'a>) -> Self {
        Self {
            query,
            includes: Vec::new(),
        }
    }

    pub fn include(mut self, navigation: Navigation) -> Self {
        if !self.includes.contains(&navigation) {
            self.includes.push(navigation);
        }
        self
    }

    pub fn include_ingredients(self) -> Self {
        self.include(Navigation::Ingredients)
    }

    pub fn include_directions(self) -> Self {
        self.include(Navigation::Directions)
    }

    pub fn include_categories(self) -> Self {
        self.include(Navigation::Categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("salmon"), "salmon");
    }

    #[test]
    fn test_render_numbers_placeholders_in_order() {
        let mut params = Vec::new();
        let a = Filter::contains("Title", "sal").render(&mut params);
        let b = Filter::is_in("Id", [1_i64, 2]).render(&mut params);
        assert_eq!(a, "Title LIKE ?1 ESCAPE '\\'");
        assert_eq!(b, "Id IN (?2, ?3)");
        assert_eq!(params[0], Value::Text("%sal%".to_string()));
    }

    #[test]
    fn test_eq_null_becomes_is_null() {
        let mut params = Vec::new();
        let sql = Filter::eq("RecipeId", Value::Null).render(&mut params);
        assert_eq!(sql, "RecipeId IS NULL");
        assert!(params.is_empty());
    }
}
