//! Error types for the schema synchronization engine.

/// Errors that can occur while synchronizing a table.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A metadata query against the live database failed.
    #[error("Failed to introspect table '{table}': {source}")]
    Introspection {
        /// The table whose metadata could not be read.
        table: String,
        /// The underlying driver error.
        source: sqlx::Error,
    },

    /// A declared datatype change is not a recognized widening transition.
    ///
    /// This aborts the whole sync run for the table; narrowing or
    /// cross-family changes risk silent data loss and must be migrated
    /// by hand.
    #[error(
        "Unsupported type change on {table}.{column}: {current} -> {target}\n\
         Only widening type changes are applied automatically.\n\
         Allowed transitions from '{current}': {allowed}\n\
         Migrate the column data manually, then re-run the sync."
    )]
    UnsupportedTypeChange {
        /// Table containing the column.
        table: String,
        /// Physical column name.
        column: String,
        /// Base type currently stored in the database.
        current: String,
        /// Base type the declaration maps to.
        target: String,
        /// Human-readable list of permitted transitions.
        allowed: String,
    },

    /// An index create/drop statement failed.
    #[error("Index operation '{index}' on {table}.{field} failed: {source}")]
    IndexOperation {
        /// Table the index belongs to.
        table: String,
        /// Index name.
        index: String,
        /// Declared field the index serves.
        field: String,
        /// The underlying driver error.
        source: sqlx::Error,
    },

    /// Two distinct declared field keys map to the same physical column.
    #[error(
        "Field keys '{first_key}' and '{second_key}' in table '{table}' \
         both map to column '{column}'"
    )]
    ColumnCollision {
        /// Table containing the collision.
        table: String,
        /// The shared physical column name.
        column: String,
        /// The field key that claimed the column first.
        first_key: String,
        /// The field key that collided with it.
        second_key: String,
    },

    /// Database error outside of introspection and index handling.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
