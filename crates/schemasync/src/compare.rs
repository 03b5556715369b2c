//! Comparator: declared field vs. introspected column.
//!
//! Produces the list of typed changes between what the declaration
//! expects and what the live column looks like. An empty list means
//! the field is in sync and is skipped entirely by the plan builder.

use crate::dialect::Dialect;
use crate::field::FieldDefinition;
use crate::introspect::{normalize_default, normalize_type, ColumnInfo};

/// The aspect of a column a change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Character length differs.
    Length,
    /// Stored comment differs from the declared label.
    Comment,
    /// Normalized base type differs.
    Datatype,
    /// NULL-ability differs.
    Nullable,
    /// Resolved default differs from the stored default.
    Default,
}

/// A single detected difference. Value object, discarded once the
/// table plan has been built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    /// What differs.
    pub kind: ChangeKind,
    /// Current live value, if any.
    pub current: Option<String>,
    /// Value the declaration expects, if any.
    pub expected: Option<String>,
}

impl FieldChange {
    fn new(kind: ChangeKind, current: Option<String>, expected: Option<String>) -> Self {
        Self {
            kind,
            current,
            expected,
        }
    }
}

/// Compares a declared field against its live column.
#[must_use]
pub fn compare_column<D: Dialect>(
    dialect: &D,
    field: &FieldDefinition,
    column: &ColumnInfo,
) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    // Length: only for length-bearing types, only where the dialect
    // enforces and reports character lengths.
    if dialect.supports_length() && field.field_type.has_length() {
        let expected = field.effective_max();
        if column.max.is_some_and(|current| current != expected) {
            changes.push(FieldChange::new(
                ChangeKind::Length,
                column.max.map(|m| m.to_string()),
                Some(expected.to_string()),
            ));
        }
    }

    // Comment: compare against the declared label.
    if dialect.supports_comments() {
        let current = column.comment.as_deref().unwrap_or_default();
        if current != field.label {
            changes.push(FieldChange::new(
                ChangeKind::Comment,
                column.comment.clone(),
                Some(field.label.clone()),
            ));
        }
    }

    // Datatype: normalized base types, case-insensitive, modifiers
    // stripped.
    let expected_type = normalize_type(&dialect.column_type(field));
    let current_type = normalize_type(&column.sql_type);
    if current_type != expected_type {
        changes.push(FieldChange::new(
            ChangeKind::Datatype,
            Some(current_type),
            Some(expected_type),
        ));
    }

    if column.nullable != field.nullable {
        changes.push(FieldChange::new(
            ChangeKind::Nullable,
            Some(column.nullable.to_string()),
            Some(field.nullable.to_string()),
        ));
    }

    // Default: string-normalized comparison of the resolved declared
    // default against the stored one. Where the dialect cannot express
    // a default for this field at all (MySQL TEXT/BLOB), the
    // comparison is skipped rather than reported as a change.
    let expected_default = field.comparable_default();
    if expected_default.is_none() || dialect.default_sql(field).is_some() {
        let current_default = normalize_default(column.default_value.as_deref());
        if current_default != expected_default {
            changes.push(FieldChange::new(
                ChangeKind::Default,
                current_default,
                expected_default,
            ));
        }
    }

    changes
}
