//! MySQL dialect.
//!
//! Column comments live inside the column definition, so a MODIFY
//! COLUMN always restates the full definition. ALTERs are attempted
//! through a three-tier online-DDL degrade chain:
//! `ALGORITHM=INSTANT`, then `ALGORITHM=INPLACE, LOCK=NONE`, then the
//! bare statement (which may take a table lock).

use std::collections::BTreeMap;

use sqlx::{MySql, Pool, Row};
use tracing::warn;

use super::{base_column_definition, quote_string_literal, Dialect};
use crate::apply;
use crate::compare::FieldChange;
use crate::error::SyncError;
use crate::field::{FieldDefinition, FieldType, TableDefinition};
use crate::introspect::{normalize_type, ColumnInfo, IndexInfo};
use crate::naming;
use crate::plan::{IndexAction, IndexOp, TablePlan};
use crate::sync::SyncOptions;

/// MySQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    async fn execute_tiered(
        &self,
        pool: &Pool<MySql>,
        base: &str,
        options: &SyncOptions,
    ) -> Result<(), sqlx::Error> {
        let [instant, inplace, bare] = tiered_statements(base);
        match apply::run_statement(self, pool, &instant, options).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(error = %e, "ALGORITHM=INSTANT rejected, retrying with ALGORITHM=INPLACE");
            }
        }
        match apply::run_statement(self, pool, &inplace, options).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(error = %e, "ALGORITHM=INPLACE rejected, falling back to a plain ALTER");
            }
        }
        apply::run_statement(self, pool, &bare, options).await
    }
}

/// The three-tier online-DDL degrade chain for one ALTER statement.
#[must_use]
pub fn tiered_statements(base: &str) -> [String; 3] {
    [
        format!("{base}, ALGORITHM=INSTANT"),
        format!("{base}, ALGORITHM=INPLACE, LOCK=NONE"),
        base.to_string(),
    ]
}

impl Dialect for MySqlDialect {
    type Db = MySql;

    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn column_type(&self, field: &FieldDefinition) -> String {
        match field.field_type {
            FieldType::String | FieldType::ArrayString | FieldType::ArrayNumberString => {
                format!("VARCHAR({})", field.effective_max())
            }
            FieldType::Number => {
                if field.unsigned {
                    "BIGINT UNSIGNED".to_string()
                } else {
                    "BIGINT".to_string()
                }
            }
            FieldType::Text | FieldType::ArrayText | FieldType::ArrayNumberText => {
                "TEXT".to_string()
            }
        }
    }

    fn default_sql(&self, field: &FieldDefinition) -> Option<String> {
        // TEXT/BLOB columns cannot carry a DEFAULT on MySQL.
        if field.field_type.is_text_family() {
            return None;
        }
        super::render_default_literal(field)
    }

    fn column_definition(&self, column: &str, field: &FieldDefinition) -> String {
        let mut sql = base_column_definition(self, column, field);
        sql.push_str(" COMMENT ");
        sql.push_str(&quote_string_literal(&field.label));
        sql
    }

    fn primary_key_definition(&self) -> String {
        "`id` BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY".to_string()
    }

    fn modify_clauses(
        &self,
        column: &str,
        field: &FieldDefinition,
        _changes: &[FieldChange],
    ) -> Vec<String> {
        // MySQL restates the whole definition whatever actually
        // changed; the comment rides along in the same clause.
        vec![format!(
            "MODIFY COLUMN {}",
            self.column_definition(column, field)
        )]
    }

    fn default_clause(&self, column: &str, field: &FieldDefinition) -> Option<String> {
        let quoted = self.quote_identifier(column);
        if let Some(default) = self.default_sql(field) {
            return Some(format!("ALTER COLUMN {quoted} SET DEFAULT {default}"));
        }
        // Resolved to no default at all: clear the stored one. A
        // default the dialect cannot express (TEXT/BLOB) stays a
        // silent skip.
        if field.resolved_default().is_none() {
            return Some(format!("ALTER COLUMN {quoted} DROP DEFAULT"));
        }
        None
    }

    fn index_statement(&self, table: &str, action: &IndexAction) -> String {
        let table = self.quote_identifier(table);
        let index = self.quote_identifier(&action.index_name);
        match action.action {
            IndexOp::Create => {
                let column = self.quote_identifier(&naming::column_name(&action.field_name));
                format!(
                    "ALTER TABLE {table} ADD INDEX {index} ({column}), \
                     ALGORITHM=INPLACE, LOCK=NONE"
                )
            }
            IndexOp::Drop => {
                format!("ALTER TABLE {table} DROP INDEX {index}, ALGORITHM=INPLACE, LOCK=NONE")
            }
        }
    }

    async fn table_exists(&self, pool: &Pool<MySql>, table: &str) -> Result<bool, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
        )
        .bind(table)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    async fn introspect_columns(
        &self,
        pool: &Pool<MySql>,
        table: &str,
    ) -> Result<BTreeMap<String, ColumnInfo>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT COLUMN_NAME, DATA_TYPE, COLUMN_TYPE, CHARACTER_MAXIMUM_LENGTH, \
                    IS_NULLABLE, COLUMN_DEFAULT, COLUMN_COMMENT \
             FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
             ORDER BY ORDINAL_POSITION",
        )
        .bind(table)
        .fetch_all(pool)
        .await?;

        let mut columns = BTreeMap::new();
        for row in rows {
            let name: String = row.try_get("COLUMN_NAME")?;
            let data_type: String = row.try_get("DATA_TYPE")?;
            let full_column_type: String = row.try_get("COLUMN_TYPE")?;
            let max: Option<u64> = row.try_get("CHARACTER_MAXIMUM_LENGTH")?;
            let is_nullable: String = row.try_get("IS_NULLABLE")?;
            let default_value: Option<String> = row.try_get("COLUMN_DEFAULT")?;
            let comment: String = row.try_get("COLUMN_COMMENT")?;

            columns.insert(
                name,
                ColumnInfo {
                    sql_type: normalize_type(&data_type),
                    full_column_type,
                    max: max.and_then(|m| i64::try_from(m).ok()),
                    nullable: is_nullable.eq_ignore_ascii_case("YES"),
                    default_value,
                    comment: (!comment.is_empty()).then_some(comment),
                },
            );
        }
        Ok(columns)
    }

    async fn introspect_indexes(
        &self,
        pool: &Pool<MySql>,
        table: &str,
    ) -> Result<IndexInfo, sqlx::Error> {
        // NON_UNIQUE = 1 leaves out the primary key and the indexes
        // backing UNIQUE constraints.
        let rows = sqlx::query(
            "SELECT INDEX_NAME, COLUMN_NAME \
             FROM information_schema.STATISTICS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND NON_UNIQUE = 1 \
             ORDER BY INDEX_NAME, SEQ_IN_INDEX",
        )
        .bind(table)
        .fetch_all(pool)
        .await?;

        let mut indexes: IndexInfo = BTreeMap::new();
        for row in rows {
            let index_name: String = row.try_get("INDEX_NAME")?;
            let column_name: String = row.try_get("COLUMN_NAME")?;
            indexes.entry(index_name).or_default().push(column_name);
        }
        Ok(indexes)
    }

    async fn execute(&self, pool: &Pool<MySql>, sql: &str) -> Result<(), sqlx::Error> {
        sqlx::query(sql).execute(pool).await.map(|_| ())
    }

    async fn apply_plan(
        &self,
        pool: &Pool<MySql>,
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
                let base = format!(
                    "ALTER TABLE {} {}",
                    self.quote_identifier(table),
                    structural.join(", ")
                );
                self.execute_tiered(pool, &base, options).await?;
            }
            if !plan.default_clauses.is_empty() {
                // SET DEFAULT is a metadata-only change; no online-DDL
                // hints needed.
                let sql = format!(
                    "ALTER TABLE {} {}",
                    self.quote_identifier(table),
                    plan.default_clauses.join(", ")
                );
                apply::run_statement(self, pool, &sql, options).await?;
            }
        }
        apply::apply_index_actions(self, pool, table, &plan.index_actions, options).await
    }
}
