//! SQLite dialect.
//!
//! SQLite's ALTER TABLE cannot modify or redefine existing columns,
//! so any modify or default change triggers a full rebuild: create the
//! target table under a temporary name, copy the shared columns, drop
//! the old table and rename the new one into place. Plain ADD COLUMN
//! clauses apply directly.

use std::collections::BTreeMap;

use sqlx::{Pool, Row, Sqlite};
use tracing::{info, warn};

use super::Dialect;
use crate::apply;
use crate::compare::FieldChange;
use crate::error::SyncError;
use crate::field::{FieldDefinition, FieldType, TableDefinition};
use crate::introspect::{normalize_type, parse_type_length, ColumnInfo, IndexInfo};
use crate::naming;
use crate::plan::{IndexAction, IndexOp, TablePlan};
use crate::sync::SyncOptions;

/// SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Rebuilds the table to its declared shape, copying the columns
    /// both shapes share.
    async fn rebuild_table(
        &self,
        pool: &Pool<Sqlite>,
        def: &TableDefinition,
        options: &SyncOptions,
    ) -> Result<(), SyncError> {
        let table = def.name.as_str();
        let staging = format!("{table}__sync_new");
        info!(table = %table, staging = %staging, "Rebuilding table to apply column changes");

        let old_columns =
            self.introspect_columns(pool, table)
                .await
                .map_err(|source| SyncError::Introspection {
                    table: table.to_string(),
                    source,
                })?;

        // A crashed earlier rebuild may have left the staging table
        // behind; its schema could be stale, so start clean.
        let cleanup = format!("DROP TABLE IF EXISTS {}", self.quote_identifier(&staging));
        apply::run_statement(self, pool, &cleanup, options).await?;

        let mut staging_def = def.clone();
        staging_def.name.clone_from(&staging);
        apply::run_statement(self, pool, &self.create_table_sql(&staging_def), options).await?;

        let shared: Vec<String> = def
            .physical_columns()
            .into_iter()
            .filter(|column| old_columns.contains_key(column))
            .map(|column| self.quote_identifier(&column))
            .collect();
        if !shared.is_empty() {
            let columns = shared.join(", ");
            let copy = format!(
                "INSERT INTO {} ({columns}) SELECT {columns} FROM {}",
                self.quote_identifier(&staging),
                self.quote_identifier(table)
            );
            apply::run_statement(self, pool, &copy, options).await?;
        }

        let drop = format!("DROP TABLE {}", self.quote_identifier(table));
        apply::run_statement(self, pool, &drop, options).await?;
        let rename = format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_identifier(&staging),
            self.quote_identifier(table)
        );
        apply::run_statement(self, pool, &rename, options).await?;

        // The old table's indexes went down with it; put the declared
        // ones back.
        for (key, field) in &def.fields {
            if !field.indexed {
                continue;
            }
            let column = naming::column_name(key);
            let action = IndexAction::create(naming::index_name(&column), key.clone());
            apply::apply_index_actions(self, pool, table, &[action], options).await?;
        }
        Ok(())
    }
}

impl Dialect for SqliteDialect {
    type Db = Sqlite;

    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn supports_length(&self) -> bool {
        // SQLite neither enforces nor reliably reports lengths.
        false
    }

    fn supports_comments(&self) -> bool {
        false
    }

    fn column_type(&self, field: &FieldDefinition) -> String {
        match field.field_type {
            FieldType::Number => "INTEGER".to_string(),
            _ => "TEXT".to_string(),
        }
    }

    fn primary_key_definition(&self) -> String {
        "\"id\" INTEGER PRIMARY KEY AUTOINCREMENT".to_string()
    }

    fn add_primary_key_clause(&self) -> Option<String> {
        // ADD COLUMN cannot introduce a PRIMARY KEY on SQLite.
        None
    }

    fn modify_clauses(
        &self,
        column: &str,
        _field: &FieldDefinition,
        _changes: &[FieldChange],
    ) -> Vec<String> {
        vec![format!(
            "-- column {} requires a table rebuild",
            self.quote_identifier(column)
        )]
    }

    fn default_clause(&self, column: &str, _field: &FieldDefinition) -> Option<String> {
        // No ALTER COLUMN SET DEFAULT either; the marker routes the
        // change into the rebuild path.
        Some(format!(
            "-- column {} default requires a table rebuild",
            self.quote_identifier(column)
        ))
    }

    fn index_statement(&self, table: &str, action: &IndexAction) -> String {
        let index = self.quote_identifier(&action.index_name);
        match action.action {
            IndexOp::Create => {
                let column = self.quote_identifier(&naming::column_name(&action.field_name));
                format!(
                    "CREATE INDEX IF NOT EXISTS {index} ON {} ({column})",
                    self.quote_identifier(table)
                )
            }
            IndexOp::Drop => format!("DROP INDEX IF EXISTS {index}"),
        }
    }

    async fn table_exists(&self, pool: &Pool<Sqlite>, table: &str) -> Result<bool, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    async fn introspect_columns(
        &self,
        pool: &Pool<Sqlite>,
        table: &str,
    ) -> Result<BTreeMap<String, ColumnInfo>, sqlx::Error> {
        // PRAGMA arguments cannot be bound.
        let pragma = format!("PRAGMA table_info({})", self.quote_identifier(table));
        let rows = sqlx::query(&pragma).fetch_all(pool).await?;

        let mut columns = BTreeMap::new();
        for row in rows {
            let name: String = row.try_get("name")?;
            let declared_type: String = row.try_get("type")?;
            let notnull: i64 = row.try_get("notnull")?;
            let default_value: Option<String> = row.try_get("dflt_value")?;

            columns.insert(
                name,
                ColumnInfo {
                    sql_type: normalize_type(&declared_type),
                    max: parse_type_length(&declared_type),
                    full_column_type: declared_type,
                    nullable: notnull == 0,
                    default_value,
                    comment: None,
                },
            );
        }
        Ok(columns)
    }

    async fn introspect_indexes(
        &self,
        pool: &Pool<Sqlite>,
        table: &str,
    ) -> Result<IndexInfo, sqlx::Error> {
        let pragma = format!("PRAGMA index_list({})", self.quote_identifier(table));
        let rows = sqlx::query(&pragma).fetch_all(pool).await?;

        let mut indexes: IndexInfo = BTreeMap::new();
        for row in rows {
            let name: String = row.try_get("name")?;
            let unique: i64 = row.try_get("unique")?;
            let origin: String = row.try_get("origin")?;
            // Keep plain CREATE INDEX indexes only; "u"/"pk" origins
            // back constraints and must not be drop candidates.
            if unique != 0 || origin != "c" || name.starts_with("sqlite_autoindex") {
                continue;
            }

            let info = format!("PRAGMA index_info({})", self.quote_identifier(&name));
            let info_rows = sqlx::query(&info).fetch_all(pool).await?;
            let mut columns = Vec::with_capacity(info_rows.len());
            for info_row in info_rows {
                // Expression index members have no column name.
                let column: Option<String> = info_row.try_get("name")?;
                if let Some(column) = column {
                    columns.push(column);
                }
            }
            indexes.insert(name, columns);
        }
        Ok(indexes)
    }

    async fn execute(&self, pool: &Pool<Sqlite>, sql: &str) -> Result<(), sqlx::Error> {
        sqlx::query(sql).execute(pool).await.map(|_| ())
    }

    async fn apply_plan(
        &self,
        pool: &Pool<Sqlite>,
        def: &TableDefinition,
        plan: &TablePlan,
        options: &SyncOptions,
    ) -> Result<(), SyncError> {
        let table = def.name.as_str();
        if plan.create_table {
            apply::run_statement(self, pool, &self.create_table_sql(def), options).await?;
        } else if !plan.modify_clauses.is_empty() || !plan.default_clauses.is_empty() {
            // The rebuild realizes the full declared shape, including
            // any pending ADD COLUMNs.
            for clause in plan.modify_clauses.iter().chain(&plan.default_clauses) {
                warn!(table = %table, clause = %clause, "In-place ALTER unsupported on SQLite");
            }
            self.rebuild_table(pool, def, options).await?;
        } else {
            for clause in &plan.add_clauses {
                let sql = format!("ALTER TABLE {} {clause}", self.quote_identifier(table));
                apply::run_statement(self, pool, &sql, options).await?;
            }
        }
        apply::apply_index_actions(self, pool, table, &plan.index_actions, options).await
    }
}
