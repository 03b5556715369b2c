//! Safety policy for destructive schema changes.
//!
//! Datatype changes are permitted only along recognized widening
//! transitions; anything else aborts the table's sync run. Length
//! shrinks are skipped with a warning unless explicitly forced.

use tracing::warn;

use crate::error::SyncError;

/// Widening transitions: a change from the left type to any type on
/// the right is guaranteed not to lose data.
const WIDENING: &[(&str, &[&str])] = &[
    ("tinyint", &["smallint", "mediumint", "int", "bigint"]),
    ("smallint", &["mediumint", "int", "bigint"]),
    ("mediumint", &["int", "bigint"]),
    ("int", &["bigint"]),
    ("char", &["varchar", "text", "mediumtext", "longtext"]),
    ("varchar", &["text", "mediumtext", "longtext"]),
    ("text", &["mediumtext", "longtext"]),
    ("mediumtext", &["longtext"]),
];

/// Returns `true` if changing from `current` to `target` is a
/// recognized widening transition.
#[must_use]
pub fn is_widening(current: &str, target: &str) -> bool {
    WIDENING
        .iter()
        .any(|(from, to)| *from == current && to.contains(&target))
}

/// Human-readable list of the transitions permitted from `current`.
#[must_use]
pub fn allowed_transitions(current: &str) -> String {
    WIDENING
        .iter()
        .find(|(from, _)| *from == current)
        .map_or_else(
            || "none".to_string(),
            |(_, to)| to.join(", "),
        )
}

/// Gates a datatype change. Widening transitions pass; everything
/// else is a hard stop for the whole table.
pub fn check_type_change(
    table: &str,
    column: &str,
    current: &str,
    target: &str,
) -> Result<(), SyncError> {
    if is_widening(current, target) {
        return Ok(());
    }
    Err(SyncError::UnsupportedTypeChange {
        table: table.to_string(),
        column: column.to_string(),
        current: current.to_string(),
        target: target.to_string(),
        allowed: allowed_transitions(current),
    })
}

/// Outcome of the shrink gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShrinkDecision {
    /// Apply the length change.
    Proceed,
    /// Skip the length change; the declaration shrinks the column and
    /// no override was supplied.
    Skip,
}

/// Gates a length change. Growing is always fine; shrinking is
/// skipped with a warning unless `force` is set.
#[must_use]
pub fn check_shrink(
    table: &str,
    column: &str,
    current: i64,
    expected: i64,
    force: bool,
) -> ShrinkDecision {
    if expected >= current || force {
        return ShrinkDecision::Proceed;
    }
    warn!(
        table = %table,
        column = %column,
        current = current,
        expected = expected,
        "Skipping length shrink; pass force to apply it"
    );
    ShrinkDecision::Skip
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_ladder_is_widening() {
        assert!(is_widening("tinyint", "int"));
        assert!(is_widening("int", "bigint"));
        assert!(is_widening("smallint", "bigint"));
    }

    #[test]
    fn test_character_ladder_is_widening() {
        assert!(is_widening("char", "varchar"));
        assert!(is_widening("varchar", "text"));
        assert!(is_widening("text", "longtext"));
    }

    #[test]
    fn test_narrowing_is_rejected() {
        assert!(!is_widening("bigint", "int"));
        assert!(!is_widening("text", "varchar"));
    }

    #[test]
    fn test_cross_family_is_rejected() {
        assert!(!is_widening("varchar", "int"));
        assert!(!is_widening("int", "text"));
    }

    #[test]
    fn test_check_type_change_error_is_descriptive() {
        let err = check_type_change("user", "age", "bigint", "int").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("user.age"));
        assert!(message.contains("bigint -> int"));
        assert!(message.contains("widening"));
    }

    #[test]
    fn test_shrink_gate() {
        assert_eq!(
            check_shrink("user", "user_name", 100, 50, false),
            ShrinkDecision::Skip
        );
        assert_eq!(
            check_shrink("user", "user_name", 100, 50, true),
            ShrinkDecision::Proceed
        );
        assert_eq!(
            check_shrink("user", "user_name", 50, 100, false),
            ShrinkDecision::Proceed
        );
    }
}
