//! Shared statement-level apply helpers.
//!
//! Dialects own the execution strategy; these helpers thread the
//! dry-run switch through every statement and wrap index failures
//! with their table/index/field context.

use sqlx::Pool;
use tracing::{debug, error, info, warn};

use crate::dialect::Dialect;
use crate::error::SyncError;
use crate::plan::IndexAction;
use crate::sync::SyncOptions;

/// Runs one DDL statement, honoring dry-run mode.
///
/// Comment-only clauses (a dialect's way of flagging an operation it
/// cannot express in place) are logged and skipped.
pub(crate) async fn run_statement<D: Dialect>(
    dialect: &D,
    pool: &Pool<D::Db>,
    sql: &str,
    options: &SyncOptions,
) -> Result<(), sqlx::Error> {
    if sql.trim_start().starts_with("--") {
        warn!(sql = %sql, "Skipping comment-only clause");
        return Ok(());
    }
    if options.dry_run {
        info!(sql = %sql, "Dry run, statement not executed");
        return Ok(());
    }
    debug!(sql = %sql, "Executing DDL");
    dialect.execute(pool, sql).await
}

/// Applies index actions one statement at a time. A failure is fatal
/// for the table: it is logged with its index/field context and
/// re-thrown.
pub(crate) async fn apply_index_actions<D: Dialect>(
    dialect: &D,
    pool: &Pool<D::Db>,
    table: &str,
    actions: &[IndexAction],
    options: &SyncOptions,
) -> Result<(), SyncError> {
    for action in actions {
        let sql = dialect.index_statement(table, action);
        if let Err(source) = run_statement(dialect, pool, &sql, options).await {
            error!(
                table = %table,
                index = %action.index_name,
                field = %action.field_name,
                error = %source,
                "Index operation failed"
            );
            return Err(SyncError::IndexOperation {
                table: table.to_string(),
                index: action.index_name.clone(),
                field: action.field_name.clone(),
                source,
            });
        }
    }
    Ok(())
}
