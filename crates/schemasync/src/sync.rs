//! Table orchestrator.
//!
//! For one table the syncer introspects columns and indexes once,
//! walks the declared fields through comparator, safety policy and
//! DDL builder to accumulate a [`TablePlan`], then hands the plan to
//! the dialect's apply strategy. Tables are processed strictly one at
//! a time; introspection, comparison and apply happen in one unbroken
//! sequence so the plan never drifts from the schema it was read from.

use std::collections::BTreeMap;

use sqlx::Pool;
use tracing::{debug, error, info, warn};

use crate::compare::{compare_column, ChangeKind};
use crate::dialect::Dialect;
use crate::error::{Result, SyncError};
use crate::field::{self, TableDefinition, PRIMARY_KEY_COLUMN};
use crate::naming;
use crate::plan::{IndexAction, TablePlan};
use crate::policy::{self, ShrinkDecision};

/// Options threaded through the whole plan/apply chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Log intended SQL instead of executing it.
    pub dry_run: bool,
    /// Apply destructive length shrinks instead of skipping them.
    pub force: bool,
}

impl SyncOptions {
    /// Creates default options: execute, no destructive overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables dry-run mode (SQL is logged but not executed).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Allows destructive length shrinks.
    #[must_use]
    pub const fn force(mut self, enabled: bool) -> Self {
        self.force = enabled;
        self
    }
}

/// Synchronizes declared table definitions against a live database.
pub struct TableSyncer<D: Dialect> {
    pool: Pool<D::Db>,
    dialect: D,
    options: SyncOptions,
}

impl<D: Dialect> TableSyncer<D> {
    /// Creates a new syncer for the given pool and dialect.
    pub fn new(pool: Pool<D::Db>, dialect: D) -> Self {
        Self {
            pool,
            dialect,
            options: SyncOptions::default(),
        }
    }

    /// Sets the sync options.
    #[must_use]
    pub fn options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the dialect.
    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Computes the change plan for one table without applying it.
    pub async fn plan(&self, def: &TableDefinition) -> Result<TablePlan> {
        let table = def.name.as_str();

        // The key -> column mapping must be collision-free before any
        // DDL is considered.
        let mut claimed: BTreeMap<String, String> = BTreeMap::new();
        for key in def.fields.keys() {
            let column = naming::column_name(key);
            if let Some(first_key) = claimed.get(&column) {
                return Err(SyncError::ColumnCollision {
                    table: table.to_string(),
                    column,
                    first_key: first_key.clone(),
                    second_key: key.clone(),
                });
            }
            claimed.insert(column, key.clone());
        }

        let exists = self
            .dialect
            .table_exists(&self.pool, table)
            .await
            .map_err(|source| SyncError::Introspection {
                table: table.to_string(),
                source,
            })?;

        let mut plan = TablePlan::new();
        if !exists {
            info!(table = %table, "Table does not exist, planning creation");
            plan.create_table = true;
            for (key, definition) in &def.fields {
                let column = naming::column_name(key);
                if definition.indexed {
                    plan.index_actions
                        .push(IndexAction::create(naming::index_name(&column), key.clone()));
                }
                if let Some(statement) =
                    self.dialect
                        .comment_statement(table, &column, &definition.label)
                {
                    plan.comment_actions.push(statement);
                }
            }
            return Ok(plan);
        }

        let columns = self
            .dialect
            .introspect_columns(&self.pool, table)
            .await
            .map_err(|source| SyncError::Introspection {
                table: table.to_string(),
                source,
            })?;
        let indexes = self
            .dialect
            .introspect_indexes(&self.pool, table)
            .await
            .map_err(|source| SyncError::Introspection {
                table: table.to_string(),
                source,
            })?;

        for (key, definition) in &def.fields {
            let column = naming::column_name(key);
            let Some(live) = columns.get(&column) else {
                plan.add_clauses
                    .push(self.dialect.add_column_clause(&column, definition));
                if let Some(statement) =
                    self.dialect
                        .comment_statement(table, &column, &definition.label)
                {
                    plan.comment_actions.push(statement);
                }
                continue;
            };

            let mut changes = compare_column(&self.dialect, definition, live);
            if changes.is_empty() {
                continue;
            }

            // Fail-closed gate: any non-widening datatype change
            // aborts the whole run for this table.
            if let Some(change) = changes.iter().find(|c| c.kind == ChangeKind::Datatype) {
                policy::check_type_change(
                    table,
                    &column,
                    change.current.as_deref().unwrap_or_default(),
                    change.expected.as_deref().unwrap_or_default(),
                )?;
            }

            // Shrink gate: without force the length change is dropped
            // and the live length is pinned so a combined MODIFY does
            // not shrink the column as a side effect.
            let mut effective = definition.clone();
            if let Some(position) = changes.iter().position(|c| c.kind == ChangeKind::Length) {
                let current = live.max.unwrap_or_else(|| definition.effective_max());
                let decision = policy::check_shrink(
                    table,
                    &column,
                    current,
                    definition.effective_max(),
                    self.options.force,
                );
                if decision == ShrinkDecision::Skip {
                    changes.remove(position);
                    effective.max = Some(current);
                }
            }

            // Comment drift goes through COMMENT ON where the dialect
            // applies comments outside the column clause.
            if let Some(position) = changes.iter().position(|c| c.kind == ChangeKind::Comment) {
                if let Some(statement) =
                    self.dialect
                        .comment_statement(table, &column, &definition.label)
                {
                    plan.comment_actions.push(statement);
                    changes.remove(position);
                }
            }

            if changes.is_empty() {
                continue;
            }
            let structural = changes.iter().any(|c| c.kind != ChangeKind::Default);
            if structural {
                plan.modify_clauses.extend(self.dialect.modify_clauses(
                    &column,
                    &effective,
                    &changes,
                ));
            } else if let Some(clause) = self.dialect.default_clause(&column, &effective) {
                plan.default_clauses.push(clause);
            }
        }

        // System columns are ensured by existence only; their shape is
        // never modified once present.
        if !columns.contains_key(PRIMARY_KEY_COLUMN) {
            match self.dialect.add_primary_key_clause() {
                Some(clause) => plan.add_clauses.push(clause),
                None => {
                    warn!(table = %table, "Primary key column missing and cannot be added in place");
                }
            }
        }
        for (name, definition) in field::system_fields() {
            if columns.contains_key(name) || claimed.contains_key(name) {
                continue;
            }
            plan.add_clauses
                .push(self.dialect.add_column_clause(name, &definition));
        }

        // Index symmetry: create what is declared and missing, drop
        // single-column leftovers; multi-column indexes are reported
        // but never touched.
        for (key, definition) in &def.fields {
            if !definition.indexed {
                continue;
            }
            let column = naming::column_name(key);
            let present = indexes
                .values()
                .any(|cols| cols.len() == 1 && cols[0] == column);
            if !present {
                plan.index_actions
                    .push(IndexAction::create(naming::index_name(&column), key.clone()));
            }
        }
        for (index_name, index_columns) in &indexes {
            if index_columns.len() != 1 {
                debug!(table = %table, index = %index_name, "Multi-column index left untouched");
                continue;
            }
            let column = &index_columns[0];
            let declared_indexed = claimed
                .get(column)
                .is_some_and(|key| def.fields[key].indexed);
            if !declared_indexed {
                let field_name = claimed.get(column).cloned().unwrap_or_else(|| column.clone());
                plan.index_actions
                    .push(IndexAction::drop(index_name.clone(), field_name));
            }
        }

        Ok(plan)
    }

    /// Plans and applies the changes for one table.
    pub async fn sync(&self, def: &TableDefinition) -> Result<TablePlan> {
        let plan = self.plan(def).await?;
        if !plan.changed() {
            info!(table = %def.name, "Table already in sync");
            return Ok(plan);
        }
        self.dialect
            .apply_plan(&self.pool, def, &plan, &self.options)
            .await?;
        info!(
            table = %def.name,
            dry_run = self.options.dry_run,
            "Table synchronized"
        );
        Ok(plan)
    }

    /// Synchronizes tables strictly one at a time. A fatal error stops
    /// the failing table only; remaining tables are still processed
    /// and the caller inspects each outcome.
    pub async fn sync_all(&self, defs: &[TableDefinition]) -> Vec<(String, Result<TablePlan>)> {
        let mut outcomes = Vec::with_capacity(defs.len());
        for def in defs {
            let result = self.sync(def).await;
            if let Err(e) = &result {
                error!(
                    table = %def.name,
                    error = %e,
                    "Table sync failed, continuing with remaining tables"
                );
            }
            outcomes.push((def.name.clone(), result));
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqliteDialect;
    use crate::field::{FieldDefinition, FieldType};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_pool() -> Pool<sqlx::Sqlite> {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory SQLite pool")
    }

    #[tokio::test]
    async fn test_plan_creates_missing_table() {
        let pool = create_test_pool().await;
        let syncer = TableSyncer::new(pool, SqliteDialect::new());
        let def = TableDefinition::new("user").field(
            "userName",
            FieldDefinition::new("User name", FieldType::String).indexed(),
        );

        let plan = syncer.plan(&def).await.unwrap();
        assert!(plan.create_table);
        assert!(plan.changed());
        assert_eq!(plan.index_actions.len(), 1);
        assert_eq!(plan.index_actions[0].index_name, "idx_user_name");
    }

    #[tokio::test]
    async fn test_colliding_field_keys_are_rejected() {
        let pool = create_test_pool().await;
        let syncer = TableSyncer::new(pool, SqliteDialect::new());
        let def = TableDefinition::new("user")
            .field("userName", FieldDefinition::new("A", FieldType::String))
            .field("user_name", FieldDefinition::new("B", FieldType::String));

        let err = syncer.plan(&def).await.unwrap_err();
        assert!(matches!(err, SyncError::ColumnCollision { .. }));
    }
}
