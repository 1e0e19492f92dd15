//! Schema (`.dt`) files.
//!
//! Two layouts are understood:
//!
//! - YAML: `{displayName, root, fields: {path: tag}}`, or a bare `{path: tag}` map. Nested maps
//!   under `fields` are flattened into dotted paths.
//! - Legacy dictionary text such as `{"id": int, 'price': np.float64}`, read with a regex when the
//!   YAML reading yields no fields.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping as YamlMapping, Value as YamlValue};

use crate::error::{ConvertError, ConvertResult};
use crate::types::{Field, FieldType, Schema};

/// `'key' : tag` or `"key": "tag"` pairs of a legacy dictionary.
static LEGACY_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["']([^"']+)["']\s*:\s*(?:"([^"]*)"|'([^']*)'|([A-Za-z_][\w.\[\]]*))"#)
        .expect("legacy schema pattern is valid")
});

/// Top-level metadata keys, never read as fields.
const METADATA_KEYS: [&str; 2] = ["displayName", "root"];

/// Default schema file for a root key: `<root>.dt`.
pub fn default_schema_path(root: &str) -> PathBuf {
    PathBuf::from(format!("{root}.dt"))
}

/// Read and parse a schema file.
pub fn load_schema(path: impl AsRef<Path>) -> ConvertResult<Schema> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| schema_err(path, e.to_string()))?;
    parse_schema(&text).map_err(|e| match e {
        ConvertError::SchemaLoad { message, .. } => schema_err(path, message),
        other => other,
    })
}

/// Parse schema text (YAML or legacy dictionary form).
///
/// Errors carry an empty `path`; [`load_schema`] fills it in.
pub fn parse_schema(text: &str) -> ConvertResult<Schema> {
    let yaml_result = serde_yaml::from_str::<YamlValue>(text);
    if let Ok(YamlValue::Mapping(map)) = &yaml_result {
        let schema = schema_from_yaml(map)?;
        if !schema.fields.is_empty() {
            return Ok(schema);
        }
    }

    let legacy = parse_legacy(text)?;
    if !legacy.fields.is_empty() {
        return Ok(legacy);
    }

    let message = match yaml_result {
        Err(e) => format!("not a valid schema: {e}"),
        Ok(_) => "schema declares no fields".to_string(),
    };
    Err(schema_err(Path::new(""), message))
}

fn schema_from_yaml(map: &YamlMapping) -> ConvertResult<Schema> {
    let mut schema = Schema::default();
    match map.get("fields") {
        Some(YamlValue::Mapping(fields)) => {
            schema.display_name = yaml_string(map.get("displayName"));
            schema.root = yaml_string(map.get("root"));
            collect_fields(fields, "", &mut schema.fields)?;
        }
        Some(other) => {
            return Err(schema_err(
                Path::new(""),
                format!("'fields' must be a mapping, found {}", yaml_kind(other)),
            ));
        }
        None => {
            schema.display_name = yaml_string(map.get("displayName"));
            schema.root = yaml_string(map.get("root"));
            let fields: YamlMapping = map
                .iter()
                .filter(|(key, _)| !key.as_str().is_some_and(|k| METADATA_KEYS.contains(&k)))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            collect_fields(&fields, "", &mut schema.fields)?;
        }
    }
    Ok(schema)
}

fn collect_fields(map: &YamlMapping, prefix: &str, out: &mut Vec<Field>) -> ConvertResult<()> {
    for (key, value) in map {
        let key = yaml_string(Some(key))
            .ok_or_else(|| schema_err(Path::new(""), format!("field name must be a string, found {}", yaml_kind(key))))?;
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };

        match value {
            YamlValue::Mapping(nested) => collect_fields(nested, &path, out)?,
            YamlValue::String(tag) => out.push(Field::new(&path, field_type(&path, tag)?)),
            other => {
                return Err(schema_err(
                    Path::new(""),
                    format!("type of field '{path}' must be a string, found {}", yaml_kind(other)),
                ));
            }
        }
    }
    Ok(())
}

fn parse_legacy(text: &str) -> ConvertResult<Schema> {
    let mut fields = Vec::new();
    for caps in LEGACY_PAIR.captures_iter(text) {
        let path = caps[1].trim();
        let tag = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        fields.push(Field::new(path, field_type(path, tag)?));
    }
    Ok(Schema::new(fields))
}

fn field_type(path: &str, tag: &str) -> ConvertResult<FieldType> {
    FieldType::from_tag(tag)
        .ok_or_else(|| schema_err(Path::new(""), format!("unknown type '{tag}' for field '{path}'")))
}

fn yaml_string(value: Option<&YamlValue>) -> Option<String> {
    match value? {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_kind(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "a boolean",
        YamlValue::Number(_) => "a number",
        YamlValue::String(_) => "a string",
        YamlValue::Sequence(_) => "a sequence",
        YamlValue::Mapping(_) => "a mapping",
        YamlValue::Tagged(_) => "a tagged value",
    }
}

fn schema_err(path: &Path, message: String) -> ConvertError {
    ConvertError::SchemaLoad {
        path: path.display().to_string(),
        message,
    }
}
