//! Naming conventions.
//!
//! Declared field keys are camelCase; physical columns are snake_case.
//! The mapping is a pure function: applying it twice yields the same
//! name, so snake_case keys pass through unchanged.

/// Maps a declared field key to its physical column name.
#[must_use]
pub fn column_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Returns the conventional index name for a column.
#[must_use]
pub fn index_name(column: &str) -> String {
    format!("idx_{column}")
}
