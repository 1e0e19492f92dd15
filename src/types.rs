//! Core data model types.
//!
//! Table readers produce a [`Table`] of typed [`Value`] cells. A [`Mapping`] routes source
//! columns to dotted target paths, and an optional [`Schema`] declares a [`FieldType`] per target
//! path plus the root key the output array is wrapped under.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Declared type of a target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point number.
    Float,
    /// Boolean.
    Boolean,
    /// Calendar date, emitted as an ISO-8601 `YYYY-MM-DD` string.
    Date,
}

impl FieldType {
    /// Normalize a type tag (`"int"`, `"np.float64"`, `"datetime64[ns]"`, ...) into a field type.
    ///
    /// Matching is case-insensitive and ignores common module prefixes.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().trim_matches(|c| c == '"' || c == '\'').to_ascii_lowercase();
        let bare = ["builtins.", "numpy.", "np.", "pandas.", "pd."]
            .iter()
            .find_map(|prefix| tag.strip_prefix(*prefix))
            .unwrap_or(tag.as_str());

        match bare {
            "str" | "string" | "object" | "text" => Some(Self::String),
            "int" | "integer" | "long" | "int8" | "int16" | "int32" | "int64" | "uint8" | "uint16"
            | "uint32" | "uint64" => Some(Self::Integer),
            "float" | "float32" | "float64" | "double" | "decimal" | "number" => Some(Self::Float),
            "bool" | "boolean" => Some(Self::Boolean),
            "date" | "datetime" | "datetime64" | "datetime64[ns]" | "timestamp" => Some(Self::Date),
            _ => None,
        }
    }

    /// Canonical tag name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared target field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Dotted target path, e.g. `company.address`.
    pub path: String,
    /// Declared type.
    pub field_type: FieldType,
}

impl Field {
    /// Create a new field.
    pub fn new(path: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            path: path.into(),
            field_type,
        }
    }
}

/// Declared output shape: root wrapper key plus per-path types.
///
/// Types constrain values, not presence: a mapped path without a declared type is passed through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// Human readable label (UI only).
    pub display_name: Option<String>,
    /// Key the output array is wrapped under.
    pub root: Option<String>,
    /// Ordered list of declared fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a schema from fields, without root or display name.
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    /// Set the root key.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Declared type for a full target path, if any.
    pub fn field_type(&self, path: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.field_type)
    }

    /// Iterate declared target paths in order.
    pub fn field_paths(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.path.as_str())
    }

    /// Root key, if set and non-empty.
    pub fn root_key(&self) -> Option<&str> {
        self.root.as_deref().filter(|r| !r.trim().is_empty())
    }
}

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// True for `Null` and for text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Utf8(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Natural text representation, used for error reporting and string coercion.
    ///
    /// Integer-valued floats drop their fractional part (`5.0` -> `"5"`); other floats use the
    /// shortest representation that round-trips.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int64(i) => i.to_string(),
            Value::Float64(f) => format_float(*f),
            Value::Bool(b) => b.to_string(),
            Value::Utf8(s) => s.clone(),
        }
    }
}

// Beyond 2^53 not every integer is representable, so the float's own rendering is kept.
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

pub(crate) fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT_INT {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Int64(i) => serializer.serialize_i64(*i),
            Value::Float64(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float64(_) => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Utf8(s) => serializer.serialize_str(s),
        }
    }
}

/// One source-column -> target-path association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    /// Source column name (table header).
    pub source: String,
    /// Dotted target path.
    pub target: String,
}

/// Ordered mapping from source column to dotted target path.
///
/// Source columns are unique; insertion order is preserved and drives the key order of the
/// assembled documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    entries: Vec<MappingEntry>,
}

impl Mapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `source` to `target`.
    ///
    /// Re-inserting an existing source column replaces its target in place.
    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>) {
        let source = source.into();
        let target = target.into();
        match self.entries.iter_mut().find(|e| e.source == source) {
            Some(entry) => entry.target = target,
            None => self.entries.push(MappingEntry { source, target }),
        }
    }

    /// Target path for a source column.
    pub fn target_of(&self, source: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.source == source)
            .map(|e| e.target.as_str())
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, MappingEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>, T: Into<String>> FromIterator<(S, T)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (source, target) in iter {
            mapping.insert(source, target);
        }
        mapping
    }
}

impl<'a> IntoIterator for &'a Mapping {
    type Item = &'a MappingEntry;
    type IntoIter = std::slice::Iter<'a, MappingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.source, &entry.target)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = OrderedPairs::deserialize(deserializer)?;
        Ok(pairs.0.into_iter().collect())
    }
}

/// String-to-string map that keeps document order (serde_json's `Map` sorts keys by default).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct OrderedPairs(pub(crate) Vec<(String, String)>);

impl<'de> Deserialize<'de> for OrderedPairs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PairsVisitor;

        impl<'de> Visitor<'de> for PairsVisitor {
            type Value = OrderedPairs;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of strings to strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    pairs.push((key, value));
                }
                Ok(OrderedPairs(pairs))
            }
        }

        deserializer.deserialize_map(PairsVisitor)
    }
}

/// In-memory table: a header plus row-major typed cells.
///
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column names in header order.
    pub columns: Vec<String>,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table from header and rows.
    ///
    /// Short rows are padded with [`Value::Null`]; long rows are truncated to the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Borrowed view of a single row.
    pub fn row(&self, idx: usize) -> Option<Row<'_>> {
        self.rows.get(idx).map(|values| Row {
            columns: &self.columns,
            values,
        })
    }
}

/// Borrowed view of one table row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    /// Cell for `column`; `None` if the column does not exist.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_tags_normalize_across_spellings() {
        assert_eq!(FieldType::from_tag("str"), Some(FieldType::String));
        assert_eq!(FieldType::from_tag("Int64"), Some(FieldType::Integer));
        assert_eq!(FieldType::from_tag("np.float64"), Some(FieldType::Float));
        assert_eq!(FieldType::from_tag("'bool'"), Some(FieldType::Boolean));
        assert_eq!(FieldType::from_tag("datetime64[ns]"), Some(FieldType::Date));
        assert_eq!(FieldType::from_tag("complex"), None);
    }

    #[test]
    fn mapping_keeps_insertion_order_and_replaces_duplicates() {
        let mut m = Mapping::new();
        m.insert("B", "b");
        m.insert("A", "a");
        m.insert("B", "x.b");

        let pairs: Vec<_> = m.iter().map(|e| (e.source.as_str(), e.target.as_str())).collect();
        assert_eq!(pairs, vec![("B", "x.b"), ("A", "a")]);
        assert_eq!(m.target_of("A"), Some("a"));
    }

    #[test]
    fn mapping_deserializes_in_document_order() {
        let m: Mapping = serde_json::from_str(r#"{"z":"last.z","a":"first.a"}"#).unwrap();
        let sources: Vec<_> = m.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec!["z", "a"]);
    }

    #[test]
    fn table_pads_short_rows_and_row_lookup_by_name() {
        let table = Table::new(
            vec!["id".to_string(), "name".to_string()],
            vec![vec![Value::Int64(1)]],
        );
        let row = table.row(0).unwrap();
        assert_eq!(row.get("id"), Some(&Value::Int64(1)));
        assert_eq!(row.get("name"), Some(&Value::Null));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn text_rendering_drops_integer_float_artifacts_only() {
        assert_eq!(Value::Float64(5.0).to_text(), "5");
        assert_eq!(Value::Float64(5.25).to_text(), "5.25");
        assert_eq!(Value::Float64(0.1).to_text(), "0.1");
        assert!(Value::Utf8("  ".to_string()).is_blank());
        assert!(!Value::Int64(0).is_blank());
    }
}
