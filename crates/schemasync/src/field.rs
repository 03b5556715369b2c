//! Declared schema model.
//!
//! These types describe what the code expects a table to look like.
//! They are the immutable input to the synchronization engine, usually
//! deserialized from declarative table-definition files maintained
//! outside of this crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::naming;

/// Abstract field types supported by table declarations.
///
/// `Array*` types store a JSON array in a character column; the
/// `Number`/`Text` suffix picks the physical column family used to
/// hold the serialized array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Variable-length character string.
    String,
    /// Integer number.
    Number,
    /// Unbounded text.
    Text,
    /// JSON array of strings, stored in a VARCHAR column.
    ArrayString,
    /// JSON array of strings, stored in a TEXT column.
    ArrayText,
    /// JSON array of numbers, stored in a VARCHAR column.
    ArrayNumberString,
    /// JSON array of numbers, stored in a TEXT column.
    ArrayNumberText,
}

impl FieldType {
    /// Returns `true` for types serialized as a JSON array.
    #[must_use]
    pub const fn is_array(self) -> bool {
        matches!(
            self,
            Self::ArrayString | Self::ArrayText | Self::ArrayNumberString | Self::ArrayNumberText
        )
    }

    /// Returns `true` for types with an enforceable character length.
    #[must_use]
    pub const fn has_length(self) -> bool {
        matches!(self, Self::String | Self::ArrayString | Self::ArrayNumberString)
    }

    /// Returns `true` for types mapped to the TEXT column family.
    #[must_use]
    pub const fn is_text_family(self) -> bool {
        matches!(self, Self::Text | Self::ArrayText | Self::ArrayNumberText)
    }
}

fn default_nullable() -> bool {
    true
}

/// Declaration of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Human-readable label, synced into the column comment where the
    /// dialect supports comments.
    pub label: String,
    /// Abstract field type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Minimum value/length constraint (enforced by the request
    /// validator, not by DDL).
    #[serde(default)]
    pub min: Option<i64>,
    /// Maximum character length for length-bearing types.
    #[serde(default)]
    pub max: Option<i64>,
    /// Declared default value.
    #[serde(default)]
    pub default: Option<Value>,
    /// Whether a secondary index is declared for this field.
    #[serde(default)]
    pub indexed: bool,
    /// Whether the column carries a UNIQUE constraint.
    #[serde(default)]
    pub unique: bool,
    /// Whether the column allows NULL.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Whether a numeric column is unsigned (MySQL only).
    #[serde(default)]
    pub unsigned: bool,
    /// Value pattern constraint (enforced by the request validator,
    /// not by DDL).
    #[serde(default)]
    pub regexp: Option<String>,
}

/// Fallback length for length-bearing types declared without `max`.
pub const DEFAULT_MAX_LENGTH: i64 = 255;

impl FieldDefinition {
    /// Creates a new field definition with the given label and type.
    #[must_use]
    pub fn new(label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            label: label.into(),
            field_type,
            min: None,
            max: None,
            default: None,
            indexed: false,
            unique: false,
            nullable: true,
            unsigned: false,
            regexp: None,
        }
    }

    /// Sets the minimum constraint.
    #[must_use]
    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    /// Sets the declared default value.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Declares a secondary index on this field.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Declares a UNIQUE constraint on this field.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks a numeric column unsigned.
    #[must_use]
    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    /// Sets the value pattern constraint.
    #[must_use]
    pub fn regexp(mut self, pattern: impl Into<String>) -> Self {
        self.regexp = Some(pattern.into());
        self
    }

    /// Effective maximum length for length-bearing types.
    #[must_use]
    pub fn effective_max(&self) -> i64 {
        self.max.unwrap_or(DEFAULT_MAX_LENGTH)
    }

    /// Resolves the default value for this field.
    ///
    /// An explicit declaration always wins. Otherwise non-nullable
    /// fields fall back to the type's natural zero value: `0` for
    /// numbers, `""` for strings and text, `"[]"` for arrays. Nullable
    /// fields without an explicit default have no default.
    #[must_use]
    pub fn resolved_default(&self) -> Option<Value> {
        if let Some(value) = &self.default {
            if value.is_null() {
                return None;
            }
            return Some(value.clone());
        }
        if self.nullable {
            return None;
        }
        Some(match self.field_type {
            FieldType::Number => Value::from(0),
            FieldType::String | FieldType::Text => Value::from(""),
            _ => Value::from("[]"),
        })
    }

    /// Renders the resolved default as a bare string for comparison
    /// against the (string-normalized) default stored in the database.
    #[must_use]
    pub fn comparable_default(&self) -> Option<String> {
        self.resolved_default().map(|value| match value {
            Value::String(s) => s,
            Value::Bool(b) => if b { "1" } else { "0" }.to_string(),
            Value::Number(n) => n.to_string(),
            other => other.to_string(),
        })
    }
}

/// Declaration of a whole table: a name plus an ordered mapping from
/// camelCase field key to [`FieldDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Physical table name.
    pub name: String,
    /// Declared fields, keyed by camelCase field key.
    pub fields: BTreeMap<String, FieldDefinition>,
}

impl TableDefinition {
    /// Creates an empty table definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field declaration.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, definition: FieldDefinition) -> Self {
        self.fields.insert(key.into(), definition);
        self
    }

    /// Returns the full physical column list for this table: the
    /// primary key, the declared fields in key order, and any system
    /// columns the declaration does not override.
    #[must_use]
    pub fn physical_columns(&self) -> Vec<String> {
        let mut columns = vec![PRIMARY_KEY_COLUMN.to_string()];
        for key in self.fields.keys() {
            let column = naming::column_name(key);
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        for (name, _) in system_fields() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
        columns
    }
}

/// The implicit primary key column every table carries.
pub const PRIMARY_KEY_COLUMN: &str = "id";

/// Non-key system columns every table carries: integer timestamps for
/// row lifecycle plus a state flag.
#[must_use]
pub fn system_fields() -> Vec<(&'static str, FieldDefinition)> {
    let timestamp = |label: &str| {
        FieldDefinition::new(label, FieldType::Number)
            .not_null()
            .unsigned()
            .default_value(Value::from(0))
    };
    vec![
        ("created_at", timestamp("Created at")),
        ("updated_at", timestamp("Updated at")),
        ("deleted_at", timestamp("Deleted at")),
        (
            "state",
            FieldDefinition::new("State", FieldType::Number)
                .not_null()
                .unsigned()
                .default_value(Value::from(1)),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_definition_builder() {
        let field = FieldDefinition::new("User name", FieldType::String)
            .max(100)
            .indexed()
            .not_null();

        assert_eq!(field.label, "User name");
        assert_eq!(field.effective_max(), 100);
        assert!(field.indexed);
        assert!(!field.nullable);
    }

    #[test]
    fn test_effective_max_falls_back() {
        let field = FieldDefinition::new("Tag", FieldType::String);
        assert_eq!(field.effective_max(), DEFAULT_MAX_LENGTH);
    }

    #[test]
    fn test_default_resolution_zero_values() {
        let number = FieldDefinition::new("Count", FieldType::Number).not_null();
        assert_eq!(number.comparable_default(), Some("0".to_string()));

        let string = FieldDefinition::new("Name", FieldType::String).not_null();
        assert_eq!(string.comparable_default(), Some(String::new()));

        let array = FieldDefinition::new("Tags", FieldType::ArrayString).not_null();
        assert_eq!(array.comparable_default(), Some("[]".to_string()));
    }

    #[test]
    fn test_nullable_field_has_no_implicit_default() {
        let field = FieldDefinition::new("Nick", FieldType::String);
        assert_eq!(field.resolved_default(), None);
    }

    #[test]
    fn test_explicit_default_wins() {
        let field = FieldDefinition::new("State", FieldType::Number)
            .not_null()
            .default_value(json!(7));
        assert_eq!(field.comparable_default(), Some("7".to_string()));
    }

    #[test]
    fn test_field_type_from_definition_file() {
        let field: FieldDefinition = serde_json::from_value(json!({
            "label": "Tags",
            "type": "array_string",
            "indexed": true,
        }))
        .unwrap();

        assert_eq!(field.field_type, FieldType::ArrayString);
        assert!(field.indexed);
        assert!(field.nullable);
    }

    #[test]
    fn test_physical_columns_cover_system_fields() {
        let def = TableDefinition::new("user")
            .field("userName", FieldDefinition::new("User name", FieldType::String));

        let columns = def.physical_columns();
        assert_eq!(columns[0], "id");
        assert!(columns.contains(&"user_name".to_string()));
        for name in ["created_at", "updated_at", "deleted_at", "state"] {
            assert!(columns.contains(&name.to_string()));
        }
    }
}
