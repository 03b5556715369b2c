//! PostgreSQL dialect.
//!
//! Column changes are expressed as per-aspect `ALTER COLUMN` actions.
//! Index builds and drops always run `CONCURRENTLY` as standalone
//! statements, so they must never be wrapped in an explicit
//! transaction. Column comments are applied through separate
//! `COMMENT ON COLUMN` statements after the structural changes.

use std::collections::BTreeMap;

use sqlx::{Pool, Postgres, Row};

use super::{quote_string_literal, Dialect};
use crate::apply;
use crate::compare::{ChangeKind, FieldChange};
use crate::error::SyncError;
use crate::field::{FieldDefinition, FieldType, TableDefinition};
use crate::introspect::{normalize_type, ColumnInfo, IndexInfo};
use crate::naming;
use crate::plan::{IndexAction, IndexOp, TablePlan};
use crate::sync::SyncOptions;

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    type Db = Postgres;

    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn column_type(&self, field: &FieldDefinition) -> String {
        match field.field_type {
            FieldType::String | FieldType::ArrayString | FieldType::ArrayNumberString => {
                format!("VARCHAR({})", field.effective_max())
            }
            // PostgreSQL has no unsigned integers; the declaration's
            // unsigned flag is a MySQL concern.
            FieldType::Number => "BIGINT".to_string(),
            FieldType::Text | FieldType::ArrayText | FieldType::ArrayNumberText => {
                "TEXT".to_string()
            }
        }
    }

    fn primary_key_definition(&self) -> String {
        "\"id\" BIGSERIAL PRIMARY KEY".to_string()
    }

    fn modify_clauses(
        &self,
        column: &str,
        field: &FieldDefinition,
        changes: &[FieldChange],
    ) -> Vec<String> {
        let quoted = self.quote_identifier(column);
        let mut clauses = Vec::new();
        if changes
            .iter()
            .any(|c| matches!(c.kind, ChangeKind::Length | ChangeKind::Datatype))
        {
            clauses.push(format!(
                "ALTER COLUMN {quoted} TYPE {}",
                self.column_type(field)
            ));
        }
        if changes.iter().any(|c| c.kind == ChangeKind::Nullable) {
            clauses.push(if field.nullable {
                format!("ALTER COLUMN {quoted} DROP NOT NULL")
            } else {
                format!("ALTER COLUMN {quoted} SET NOT NULL")
            });
        }
        // A default drift riding along with structural changes still
        // needs its own action; TYPE/NOT NULL do not touch defaults.
        if changes.iter().any(|c| c.kind == ChangeKind::Default) {
            if let Some(clause) = self.default_clause(column, field) {
                clauses.push(clause);
            }
        }
        clauses
    }

    fn default_clause(&self, column: &str, field: &FieldDefinition) -> Option<String> {
        let quoted = self.quote_identifier(column);
        if let Some(default) = self.default_sql(field) {
            return Some(format!("ALTER COLUMN {quoted} SET DEFAULT {default}"));
        }
        if field.resolved_default().is_none() {
            return Some(format!("ALTER COLUMN {quoted} DROP DEFAULT"));
        }
        None
    }

    fn index_statement(&self, table: &str, action: &IndexAction) -> String {
        let index = self.quote_identifier(&action.index_name);
        match action.action {
            IndexOp::Create => {
                let column = self.quote_identifier(&naming::column_name(&action.field_name));
                format!(
                    "CREATE INDEX CONCURRENTLY IF NOT EXISTS {index} ON {} ({column})",
                    self.quote_identifier(table)
                )
            }
            IndexOp::Drop => format!("DROP INDEX CONCURRENTLY IF EXISTS {index}"),
        }
    }

    fn comment_statement(&self, table: &str, column: &str, label: &str) -> Option<String> {
        Some(format!(
            "COMMENT ON COLUMN {}.{} IS {}",
            self.quote_identifier(table),
            self.quote_identifier(column),
            quote_string_literal(label)
        ))
    }

    async fn table_exists(&self, pool: &Pool<Postgres>, table: &str) -> Result<bool, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_name = $1",
        )
        .bind(table)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    async fn introspect_columns(
        &self,
        pool: &Pool<Postgres>,
        table: &str,
    ) -> Result<BTreeMap<String, ColumnInfo>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT c.column_name, c.udt_name, c.data_type, c.character_maximum_length, \
                    c.is_nullable, c.column_default, \
                    col_description(pc.oid, c.ordinal_position) AS column_comment \
             FROM information_schema.columns c \
             JOIN pg_catalog.pg_class pc \
               ON pc.relname = c.table_name \
              AND pc.relnamespace = (SELECT oid FROM pg_catalog.pg_namespace WHERE nspname = 'public') \
             WHERE c.table_schema = 'public' AND c.table_name = $1 \
             ORDER BY c.ordinal_position",
        )
        .bind(table)
        .fetch_all(pool)
        .await?;

        let mut columns = BTreeMap::new();
        for row in rows {
            let name: String = row.try_get("column_name")?;
            let udt_name: String = row.try_get("udt_name")?;
            let data_type: String = row.try_get("data_type")?;
            let max: Option<i32> = row.try_get("character_maximum_length")?;
            let is_nullable: String = row.try_get("is_nullable")?;
            let default_value: Option<String> = row.try_get("column_default")?;
            let comment: Option<String> = row.try_get("column_comment")?;

            let full_column_type = max.map_or_else(
                || data_type.clone(),
                |m| format!("{data_type}({m})"),
            );
            columns.insert(
                name,
                ColumnInfo {
                    sql_type: normalize_type(&udt_name),
                    full_column_type,
                    max: max.map(i64::from),
                    nullable: is_nullable.eq_ignore_ascii_case("YES"),
                    default_value,
                    comment,
                },
            );
        }
        Ok(columns)
    }

    async fn introspect_indexes(
        &self,
        pool: &Pool<Postgres>,
        table: &str,
    ) -> Result<IndexInfo, sqlx::Error> {
        // indisprimary/indisunique leave out the primary key and the
        // indexes backing UNIQUE constraints.
        let rows = sqlx::query(
            "SELECT i.relname AS index_name, a.attname AS column_name \
             FROM pg_catalog.pg_index ix \
             JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid \
             JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid \
             JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
             WHERE t.relname = $1 AND NOT ix.indisprimary AND NOT ix.indisunique \
             ORDER BY i.relname, a.attnum",
        )
        .bind(table)
        .fetch_all(pool)
        .await?;

        let mut indexes: IndexInfo = BTreeMap::new();
        for row in rows {
            let index_name: String = row.try_get("index_name")?;
            let column_name: String = row.try_get("column_name")?;
            indexes.entry(index_name).or_default().push(column_name);
        }
        Ok(indexes)
    }

    async fn execute(&self, pool: &Pool<Postgres>, sql: &str) -> Result<(), sqlx::Error> {
        sqlx::query(sql).execute(pool).await.map(|_| ())
    }

    async fn apply_plan(
        &self,
        pool: &Pool<Postgres>,
        def: &TableDefinition,
        plan: &TablePlan,
        options: &SyncOptions,
    ) -> Result<(), SyncError> {
        let table = def.name.as_str();
        if plan.create_table {
            apply::run_statement(self, pool, &self.create_table_sql(def), options).await?;
        } else {
            let structural: Vec<String> = plan
                .add_clauses
                .iter()
                .chain(&plan.modify_clauses)
                .cloned()
                .collect();
            if !structural.is_empty() {
                let sql = format!(
                    "ALTER TABLE {} {}",
                    self.quote_identifier(table),
                    structural.join(", ")
                );
                apply::run_statement(self, pool, &sql, options).await?;
            }
            if !plan.default_clauses.is_empty() {
                let sql = format!(
                    "ALTER TABLE {} {}",
                    self.quote_identifier(table),
                    plan.default_clauses.join(", ")
                );
                apply::run_statement(self, pool, &sql, options).await?;
            }
        }
        apply::apply_index_actions(self, pool, table, &plan.index_actions, options).await?;
        for statement in &plan.comment_actions {
            apply::run_statement(self, pool, statement, options).await?;
        }
        Ok(())
    }
}
