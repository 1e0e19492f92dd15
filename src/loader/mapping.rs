//! Mapping files.
//!
//! A mapping file is either a plain ordered object `{source_column: target_path}` or the wrapped
//! form saved by the desktop tool:
//!
//! ```json
//! {
//!     "version": "1.0",
//!     "type": "csv2json_mapping",
//!     "mapping": { "company.name": "Name" }
//! }
//! ```
//!
//! The wrapped form is keyed by target path and is inverted on load.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{ConvertError, ConvertResult};
use crate::types::{Mapping, OrderedPairs};

const MAPPING_FILE_TYPE: &str = "csv2json_mapping";
const MAPPING_FILE_VERSION: &str = "1.0";

#[derive(Deserialize)]
#[serde(untagged)]
enum MappingFile {
    Wrapped {
        #[serde(rename = "type", default)]
        kind: Option<String>,
        mapping: OrderedPairs,
    },
    Plain(OrderedPairs),
}

/// Read a mapping file (JSON, or YAML for any other extension).
pub fn load_mapping(path: impl AsRef<Path>) -> ConvertResult<Mapping> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| mapping_err(path, e.to_string()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let file: MappingFile = if is_json {
        serde_json::from_str(&text).map_err(|e| mapping_err(path, e.to_string()))?
    } else {
        serde_yaml::from_str(&text).map_err(|e| mapping_err(path, e.to_string()))?
    };

    match file {
        MappingFile::Wrapped { kind, mapping } => {
            if let Some(kind) = kind.filter(|k| k != MAPPING_FILE_TYPE) {
                return Err(mapping_err(path, format!("unsupported mapping file type '{kind}'")));
            }
            unique_sources(path, mapping.0.into_iter().map(|(target, source)| (source, target)))
        }
        MappingFile::Plain(pairs) => unique_sources(path, pairs.0.into_iter()),
    }
}

/// Build a [`Mapping`] from `(source, target)` pairs, rejecting a source fed to two targets.
fn unique_sources(path: &Path, pairs: impl Iterator<Item = (String, String)>) -> ConvertResult<Mapping> {
    let mut mapping = Mapping::new();
    for (source, target) in pairs {
        if let Some(existing) = mapping.target_of(&source) {
            return Err(mapping_err(
                path,
                format!("source '{source}' mapped to both '{existing}' and '{target}'"),
            ));
        }
        mapping.insert(source, target);
    }
    Ok(mapping)
}

/// Write `mapping` in the wrapped, target-keyed form (pretty JSON, 4-space indent).
pub fn save_mapping(mapping: &Mapping, path: impl AsRef<Path>) -> ConvertResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = WrappedOut {
        version: MAPPING_FILE_VERSION,
        kind: MAPPING_FILE_TYPE,
        mapping: TargetKeyed(mapping),
    };
    let mut writer = BufWriter::new(File::create(path)?);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
    file.serialize(&mut ser)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct WrappedOut<'a> {
    version: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    mapping: TargetKeyed<'a>,
}

struct TargetKeyed<'a>(&'a Mapping);

impl Serialize for TargetKeyed<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in self.0 {
            map.serialize_entry(&entry.target, &entry.source)?;
        }
        map.end()
    }
}

fn mapping_err(path: &Path, message: String) -> ConvertError {
    ConvertError::MappingLoad {
        path: path.display().to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(mapping: &Mapping) -> Vec<(&str, &str)> {
        mapping
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect()
    }

    #[test]
    fn plain_json_keeps_document_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        fs::write(&path, r#"{"Zip": "address.zip", "Name": "name", "City": "address.city"}"#).unwrap();

        let mapping = load_mapping(&path).unwrap();
        assert_eq!(
            pairs(&mapping),
            vec![("Zip", "address.zip"), ("Name", "name"), ("City", "address.city")]
        );
    }

    #[test]
    fn wrapped_form_is_inverted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        fs::write(
            &path,
            r#"{"version": "1.0", "type": "csv2json_mapping", "mapping": {"company.name": "Name", "id": "ID"}}"#,
        )
        .unwrap();

        let mapping = load_mapping(&path).unwrap();
        assert_eq!(pairs(&mapping), vec![("Name", "company.name"), ("ID", "id")]);
    }

    #[test]
    fn yaml_mapping_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.yaml");
        fs::write(&path, "Name: person.name\nAge: person.age\n").unwrap();

        let mapping = load_mapping(&path).unwrap();
        assert_eq!(pairs(&mapping), vec![("Name", "person.name"), ("Age", "person.age")]);
    }

    #[test]
    fn save_then_load_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("saved.json");
        let mapping: Mapping = [("ID", "id"), ("Name", "company.name")].into_iter().collect();

        save_mapping(&mapping, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(r#""type": "csv2json_mapping""#), "{text}");
        assert!(text.contains(r#""company.name": "Name""#), "{text}");

        assert_eq!(load_mapping(&path).unwrap(), mapping);
    }

    #[test]
    fn one_source_feeding_two_targets_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        fs::write(
            &path,
            r#"{"type": "csv2json_mapping", "mapping": {"id": "ID", "product.sku": "ID", "name": "Name"}}"#,
        )
        .unwrap();

        let err = load_mapping(&path).unwrap_err();
        assert!(matches!(err, ConvertError::MappingLoad { .. }), "{err}");
        assert!(
            err.to_string().contains("source 'ID' mapped to both 'id' and 'product.sku'"),
            "{err}"
        );

        let path = dir.path().join("plain.yaml");
        fs::write(&path, "ID: id\nID: product.sku\n").unwrap();
        assert!(matches!(load_mapping(&path), Err(ConvertError::MappingLoad { .. })));
    }

    #[test]
    fn bad_files_report_mapping_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"["not", "a", "map"]"#).unwrap();
        assert!(matches!(load_mapping(&path), Err(ConvertError::MappingLoad { .. })));

        let path = dir.path().join("other.json");
        fs::write(&path, r#"{"type": "something_else", "mapping": {"a": "b"}}"#).unwrap();
        let err = load_mapping(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported mapping file type"), "{err}");

        assert!(matches!(
            load_mapping(dir.path().join("missing.json")),
            Err(ConvertError::MappingLoad { .. })
        ));
    }
}
