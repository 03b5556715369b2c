//! Dialect-specific SQL generation, introspection and apply strategy.
//!
//! Each supported database implements [`Dialect`]: the pure policy
//! (type mapping, identifier quoting, clause building), the metadata
//! introspection against its own catalog, and the statement-level
//! apply strategy (online-DDL hints, concurrent index builds, table
//! rebuilds). The dialect is selected once per sync run and threaded
//! explicitly through the orchestrator.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use std::collections::BTreeMap;

use serde_json::Value;
use sqlx::{Database, Pool};

use crate::compare::FieldChange;
use crate::error::SyncError;
use crate::field::{self, FieldDefinition, TableDefinition, PRIMARY_KEY_COLUMN};
use crate::introspect::{ColumnInfo, IndexInfo};
use crate::naming;
use crate::plan::{IndexAction, TablePlan};
use crate::sync::SyncOptions;

/// Database-specific behavior for one SQL engine.
#[allow(async_fn_in_trait)]
pub trait Dialect: Send + Sync {
    /// The sqlx driver this dialect runs against.
    type Db: Database;

    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Quotes an identifier.
    fn quote_identifier(&self, name: &str) -> String {
        let q = self.quote_char();
        format!("{q}{name}{q}")
    }

    /// Whether the dialect enforces and reports character lengths.
    fn supports_length(&self) -> bool {
        true
    }

    /// Whether the dialect stores column comments.
    fn supports_comments(&self) -> bool {
        true
    }

    /// Maps a declared field to the dialect's SQL column type.
    fn column_type(&self, field: &FieldDefinition) -> String;

    /// Renders the field's resolved default as SQL, or `None` when the
    /// dialect cannot express a default for this column type.
    fn default_sql(&self, field: &FieldDefinition) -> Option<String> {
        render_default_literal(field)
    }

    /// Builds a full column definition:
    /// `<col> <type> [UNIQUE] [NOT NULL|NULL] [DEFAULT <v>]`.
    fn column_definition(&self, column: &str, field: &FieldDefinition) -> String {
        base_column_definition(self, column, field)
    }

    /// Builds an `ADD COLUMN` clause.
    fn add_column_clause(&self, column: &str, field: &FieldDefinition) -> String {
        format!("ADD COLUMN {}", self.column_definition(column, field))
    }

    /// The primary-key column definition used in CREATE TABLE.
    fn primary_key_definition(&self) -> String;

    /// An `ADD COLUMN` clause for a missing primary key on an existing
    /// table, or `None` when the dialect cannot add one in place.
    fn add_primary_key_clause(&self) -> Option<String> {
        Some(format!("ADD COLUMN {}", self.primary_key_definition()))
    }

    /// Builds the structural modification clauses for a column with
    /// the given detected changes.
    fn modify_clauses(
        &self,
        column: &str,
        field: &FieldDefinition,
        changes: &[FieldChange],
    ) -> Vec<String>;

    /// Builds a default-only change clause
    /// (`ALTER COLUMN <col> SET DEFAULT <v>`), or `None` when the
    /// dialect cannot express the default.
    fn default_clause(&self, column: &str, field: &FieldDefinition) -> Option<String>;

    /// Builds the standalone statement for an index action.
    fn index_statement(&self, table: &str, action: &IndexAction) -> String;

    /// Builds a comment-sync statement where comments are applied
    /// outside of the column clause (PostgreSQL), `None` elsewhere.
    fn comment_statement(&self, _table: &str, _column: &str, _label: &str) -> Option<String> {
        None
    }

    /// Builds the CREATE TABLE statement for a full declaration.
    fn create_table_sql(&self, def: &TableDefinition) -> String {
        build_create_table(self, def)
    }

    /// Checks whether the table exists.
    async fn table_exists(&self, pool: &Pool<Self::Db>, table: &str) -> Result<bool, sqlx::Error>;

    /// Reads the table's live column metadata, keyed by column name.
    async fn introspect_columns(
        &self,
        pool: &Pool<Self::Db>,
        table: &str,
    ) -> Result<BTreeMap<String, ColumnInfo>, sqlx::Error>;

    /// Reads the table's plain secondary indexes, keyed by index name.
    async fn introspect_indexes(
        &self,
        pool: &Pool<Self::Db>,
        table: &str,
    ) -> Result<IndexInfo, sqlx::Error>;

    /// Executes a single DDL statement.
    async fn execute(&self, pool: &Pool<Self::Db>, sql: &str) -> Result<(), sqlx::Error>;

    /// Applies a computed plan with this dialect's execution strategy.
    async fn apply_plan(
        &self,
        pool: &Pool<Self::Db>,
        def: &TableDefinition,
        plan: &TablePlan,
        options: &SyncOptions,
    ) -> Result<(), SyncError>;
}

/// Quotes a string literal, doubling embedded single quotes.
pub(crate) fn quote_string_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Renders a field's resolved default value as a SQL literal.
pub(crate) fn render_default_literal(field: &FieldDefinition) -> Option<String> {
    let value = field.resolved_default()?;
    Some(match value {
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => if b { "1" } else { "0" }.to_string(),
        Value::String(s) => quote_string_literal(&s),
        other => quote_string_literal(&other.to_string()),
    })
}

/// Shared column definition builder used by the trait default.
pub(crate) fn base_column_definition<D: Dialect + ?Sized>(
    dialect: &D,
    column: &str,
    field: &FieldDefinition,
) -> String {
    let mut sql = format!(
        "{} {}",
        dialect.quote_identifier(column),
        dialect.column_type(field)
    );
    if field.unique {
        sql.push_str(" UNIQUE");
    }
    sql.push_str(if field.nullable { " NULL" } else { " NOT NULL" });
    if let Some(default) = dialect.default_sql(field) {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default);
    }
    sql
}

/// Shared CREATE TABLE builder: primary key first, declared fields in
/// key order, then the system columns the declaration does not cover.
pub(crate) fn build_create_table<D: Dialect + ?Sized>(
    dialect: &D,
    def: &TableDefinition,
) -> String {
    let mut seen = vec![PRIMARY_KEY_COLUMN.to_string()];
    let mut columns = vec![dialect.primary_key_definition()];
    for (key, field) in &def.fields {
        let column = naming::column_name(key);
        if seen.contains(&column) {
            continue;
        }
        seen.push(column.clone());
        columns.push(dialect.column_definition(&column, field));
    }
    for (name, field) in field::system_fields() {
        if seen.iter().any(|c| c == name) {
            continue;
        }
        columns.push(dialect.column_definition(name, &field));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        dialect.quote_identifier(&def.name),
        columns.join(",\n    ")
    )
}
