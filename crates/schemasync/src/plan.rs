//! The aggregated change plan for one table.
//!
//! A [`TablePlan`] is constructed per table per sync run, consumed
//! immediately by the applier, and then discarded.

/// Whether an index action creates or drops an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOp {
    /// Create the index.
    Create,
    /// Drop the index.
    Drop,
}

/// A single index create/drop decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexAction {
    /// Create or drop.
    pub action: IndexOp,
    /// Index name.
    pub index_name: String,
    /// Declared field key (or column name for indexes on columns the
    /// declaration does not know).
    pub field_name: String,
}

impl IndexAction {
    /// Creates a create action.
    #[must_use]
    pub fn create(index_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            action: IndexOp::Create,
            index_name: index_name.into(),
            field_name: field_name.into(),
        }
    }

    /// Creates a drop action.
    #[must_use]
    pub fn drop(index_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            action: IndexOp::Drop,
            index_name: index_name.into(),
            field_name: field_name.into(),
        }
    }
}

/// Ready-to-apply DDL clauses for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TablePlan {
    /// The table does not exist and must be created from the full
    /// declaration.
    pub create_table: bool,
    /// `ADD COLUMN` clauses.
    pub add_clauses: Vec<String>,
    /// Structural column modifications.
    pub modify_clauses: Vec<String>,
    /// Default-only column changes, kept apart from structural ones
    /// because not every dialect can express them in the same ALTER.
    pub default_clauses: Vec<String>,
    /// Index create/drop decisions.
    pub index_actions: Vec<IndexAction>,
    /// Comment-sync statements (PostgreSQL).
    pub comment_actions: Vec<String>,
}

impl TablePlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the plan changes anything. Derived strictly from the
    /// clause lists; log-only skips never count as a change.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.create_table
            || !self.add_clauses.is_empty()
            || !self.modify_clauses.is_empty()
            || !self.default_clauses.is_empty()
            || !self.index_actions.is_empty()
            || !self.comment_actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_plan_is_unchanged() {
        assert!(!TablePlan::new().changed());
    }

    #[test]
    fn test_any_clause_marks_plan_changed() {
        let mut plan = TablePlan::new();
        plan.default_clauses.push("ALTER COLUMN x SET DEFAULT 0".to_string());
        assert!(plan.changed());

        let mut plan = TablePlan::new();
        plan.index_actions.push(IndexAction::create("idx_x", "x"));
        assert!(plan.changed());

        let mut plan = TablePlan::new();
        plan.create_table = true;
        assert!(plan.changed());
    }
}
