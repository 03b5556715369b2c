//! Normalized live-schema metadata.
//!
//! Dialects introspect their own catalogs (`information_schema`,
//! `pg_catalog`, SQLite pragmas) and normalize the results into the
//! dialect-agnostic structures in this module. The structures are
//! ephemeral: they are rebuilt on every sync run and discarded once the
//! plan for the table has been computed.

use std::collections::BTreeMap;

/// Metadata for one live column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Normalized base type (lowercase, modifiers stripped).
    pub sql_type: String,
    /// Raw column type as reported by the catalog, e.g. `varchar(50)`.
    pub full_column_type: String,
    /// Character length limit, where the dialect reports one.
    pub max: Option<i64>,
    /// Whether the column allows NULL.
    pub nullable: bool,
    /// Stored default, raw as reported by the catalog.
    pub default_value: Option<String>,
    /// Stored column comment, where the dialect supports comments.
    pub comment: Option<String>,
}

/// Live index metadata: index name to ordered column list.
///
/// Only plain secondary indexes are included; primary-key and
/// unique-constraint backing indexes are filtered out at introspection
/// time so they never participate in drop decisions.
pub type IndexInfo = BTreeMap<String, Vec<String>>;

/// Normalizes a raw SQL type to a lowercase base type.
///
/// Length parameters and modifiers are stripped and PostgreSQL
/// `udt_name` aliases are folded onto their common names, so
/// `VARCHAR(50)`, `character varying` and `varchar` all compare equal.
#[must_use]
pub fn normalize_type(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    let base = lower.split('(').next().unwrap_or_default();
    let tokens: Vec<&str> = base
        .split_whitespace()
        .filter(|t| !matches!(*t, "unsigned" | "signed" | "zerofill"))
        .collect();
    match tokens.join(" ").as_str() {
        "character varying" | "varchar" => "varchar".to_string(),
        "character" | "char" | "bpchar" => "char".to_string(),
        "int" | "integer" | "int4" => "int".to_string(),
        "bigint" | "int8" | "bigserial" => "bigint".to_string(),
        "smallint" | "int2" | "smallserial" => "smallint".to_string(),
        "real" | "float4" | "float" => "float".to_string(),
        "double precision" | "float8" | "double" => "double".to_string(),
        other => other.to_string(),
    }
}

/// Normalizes a stored default for string comparison.
///
/// Strips PostgreSQL `::type` casts and outer single quotes, and maps
/// a literal `NULL` to no default. An empty string stays an empty
/// string: it is a real default for character columns.
#[must_use]
pub fn normalize_default(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.eq_ignore_ascii_case("null") {
        return None;
    }
    let stripped = raw.split("::").next().unwrap_or_default().trim();
    let unquoted = stripped
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .map_or(stripped.to_string(), |s| s.replace("''", "'"));
    Some(unquoted)
}

/// Extracts the length parameter from a raw type, e.g. 50 from
/// `VARCHAR(50)`.
#[must_use]
pub fn parse_type_length(raw: &str) -> Option<i64> {
    let open = raw.find('(')?;
    let close = raw[open..].find(')')? + open;
    raw[open + 1..close].split(',').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_type_strips_length_and_modifiers() {
        assert_eq!(normalize_type("VARCHAR(50)"), "varchar");
        assert_eq!(normalize_type("int(11) unsigned"), "int");
        assert_eq!(normalize_type("BIGINT UNSIGNED"), "bigint");
        assert_eq!(normalize_type("TEXT"), "text");
    }

    #[test]
    fn test_normalize_type_folds_postgres_aliases() {
        assert_eq!(normalize_type("character varying"), "varchar");
        assert_eq!(normalize_type("int4"), "int");
        assert_eq!(normalize_type("int8"), "bigint");
        assert_eq!(normalize_type("bpchar"), "char");
        assert_eq!(normalize_type("double precision"), "double");
    }

    #[test]
    fn test_normalize_default() {
        assert_eq!(normalize_default(None), None);
        assert_eq!(normalize_default(Some("NULL")), None);
        assert_eq!(normalize_default(Some("0")), Some("0".to_string()));
        assert_eq!(
            normalize_default(Some("'[]'::character varying")),
            Some("[]".to_string())
        );
        assert_eq!(normalize_default(Some("''")), Some(String::new()));
        assert_eq!(
            normalize_default(Some("'it''s'")),
            Some("it's".to_string())
        );
    }

    #[test]
    fn test_parse_type_length() {
        assert_eq!(parse_type_length("VARCHAR(50)"), Some(50));
        assert_eq!(parse_type_length("decimal(10,2)"), Some(10));
        assert_eq!(parse_type_length("TEXT"), None);
    }
}
