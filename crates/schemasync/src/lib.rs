//! Declarative table schema synchronization for Rust.
//!
//! `schemasync` keeps a live relational database's physical schema in
//! step with table declarations maintained as data. It introspects the
//! live schema, computes a minimal change plan, and applies it with
//! dialect-specific DDL strategies that avoid destructive surprises
//! and long table locks (MySQL INSTANT/INPLACE, PostgreSQL
//! CONCURRENTLY, SQLite copy-and-rename rebuilds).
//!
//! # Architecture
//!
//! - **Field model** - declared table shape: field keys, abstract
//!   types, constraints, defaults
//! - **Introspection** - live column and index metadata, normalized
//!   per dialect
//! - **Comparator** - typed per-column change detection
//! - **Safety policy** - widening-only type changes, gated length
//!   shrinks
//! - **Dialect** - SQL generation, catalog queries and apply strategy
//!   for MySQL, PostgreSQL and SQLite
//! - **Syncer** - the per-table orchestrator tying it all together
//!
//! # Example
//!
//! ```rust,ignore
//! use schemasync::prelude::*;
//!
//! let def = TableDefinition::new("user")
//!     .field(
//!         "userName",
//!         FieldDefinition::new("User name", FieldType::String)
//!             .max(100)
//!             .not_null()
//!             .indexed(),
//!     )
//!     .field("bio", FieldDefinition::new("Bio", FieldType::Text));
//!
//! let pool = sqlx::SqlitePool::connect("sqlite:app.db").await?;
//! let syncer = TableSyncer::new(pool, SqliteDialect::new())
//!     .options(SyncOptions::new().dry_run(false));
//!
//! let plan = syncer.sync(&def).await?;
//! if plan.changed() {
//!     println!("schema updated");
//! }
//! ```
//!
//! Re-running a sync against an already-synchronized table always
//! yields a plan with `changed() == false` and executes nothing.

mod apply;
pub mod compare;
pub mod dialect;
pub mod error;
pub mod field;
pub mod introspect;
pub mod naming;
pub mod plan;
pub mod policy;
pub mod sync;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::compare::{ChangeKind, FieldChange};
    pub use crate::dialect::{Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
    pub use crate::error::{Result, SyncError};
    pub use crate::field::{FieldDefinition, FieldType, TableDefinition};
    pub use crate::introspect::{ColumnInfo, IndexInfo};
    pub use crate::plan::{IndexAction, IndexOp, TablePlan};
    pub use crate::sync::{SyncOptions, TableSyncer};
}
