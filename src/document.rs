//! Assembled output documents.
//!
//! A [`Document`] is an explicit tree: an ordered list of keys, each holding either a scalar
//! [`Node::Leaf`] or a nested [`Node::Object`]. Key order is insertion order, which is mapping
//! order, and is preserved when serializing.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::ConvertResult;
use crate::types::Value;

/// A value slot in a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Scalar value (possibly `Null`).
    Leaf(Value),
    /// Nested object.
    Object(Document),
}

/// One nested object, usually the assembly of a single table row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, Node)>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Direct child by key.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, n)| n)
    }

    /// Node at a dotted path, e.g. `company.name`.
    pub fn get_path(&self, path: &str) -> Option<&Node> {
        let mut segments = path.split('.');
        let mut node = self.get(segments.next()?)?;
        for segment in segments {
            match node {
                Node::Object(doc) => node = doc.get(segment)?,
                Node::Leaf(_) => return None,
            }
        }
        Some(node)
    }

    /// Leaf value at a dotted path.
    pub fn leaf(&self, path: &str) -> Option<&Value> {
        match self.get_path(path)? {
            Node::Leaf(v) => Some(v),
            Node::Object(_) => None,
        }
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate `(key, node)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, n)| (k.as_str(), n))
    }

    /// Set `value` at the location named by `segments`, creating intermediate objects.
    ///
    /// Returns `false` (leaving the document untouched at the clash point) if a segment would
    /// have to be both a leaf and an object.
    pub(crate) fn insert_path<S: AsRef<str>>(&mut self, segments: &[S], value: Value) -> bool {
        let Some((last, parents)) = segments.split_last() else {
            return false;
        };

        let mut current = self;
        for segment in parents {
            let segment = segment.as_ref();
            let idx = match current.entries.iter().position(|(k, _)| k == segment) {
                Some(idx) => idx,
                None => {
                    current
                        .entries
                        .push((segment.to_string(), Node::Object(Document::new())));
                    current.entries.len() - 1
                }
            };
            match &mut current.entries[idx].1 {
                Node::Object(child) => current = child,
                Node::Leaf(_) => return false,
            }
        }

        let last = last.as_ref();
        match current.entries.iter_mut().find(|(k, _)| k == last) {
            Some((_, Node::Leaf(slot))) => {
                *slot = value;
                true
            }
            Some((_, Node::Object(_))) => false,
            None => {
                current.entries.push((last.to_string(), Node::Leaf(value)));
                true
            }
        }
    }

    /// Recursively drop `Null` leaves, then objects left empty by that.
    ///
    /// The document itself is kept even if it ends up empty.
    pub fn strip_nulls(&mut self) {
        self.entries.retain_mut(|(_, node)| match node {
            Node::Leaf(Value::Null) => false,
            Node::Leaf(_) => true,
            Node::Object(child) => {
                child.strip_nulls();
                !child.is_empty()
            }
        });
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Leaf(v) => v.serialize(serializer),
            Node::Object(doc) => doc.serialize(serializer),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, node) in self.iter() {
            map.serialize_entry(key, node)?;
        }
        map.end()
    }
}

/// The converted document array, optionally wrapped under a root key.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputPayload {
    /// `{ root_key: [doc, ...] }`
    Wrapped {
        root_key: String,
        documents: Vec<Document>,
    },
    /// `[doc, ...]`
    Bare(Vec<Document>),
}

impl OutputPayload {
    /// Wrap `documents` under `root_key`, or leave them bare if the key is absent or empty.
    pub fn new(root_key: Option<&str>, documents: Vec<Document>) -> Self {
        match root_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Self::Wrapped {
                root_key: key.to_string(),
                documents,
            },
            None => Self::Bare(documents),
        }
    }

    pub fn root_key(&self) -> Option<&str> {
        match self {
            Self::Wrapped { root_key, .. } => Some(root_key),
            Self::Bare(_) => None,
        }
    }

    pub fn documents(&self) -> &[Document] {
        match self {
            Self::Wrapped { documents, .. } | Self::Bare(documents) => documents,
        }
    }

    /// Pretty JSON with 4-space indentation.
    pub fn to_json_pretty(&self) -> ConvertResult<String> {
        let mut buf = Vec::new();
        self.write_json(&mut buf)?;
        // serde_json only emits UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write pretty JSON (4-space indentation) to `writer`.
    pub fn write_json<W: Write>(&self, writer: W) -> ConvertResult<()> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
        self.serialize(&mut ser)?;
        Ok(())
    }

    /// Create (or truncate) `path` and write pretty JSON to it.
    pub fn write_json_to_path(&self, path: impl AsRef<Path>) -> ConvertResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl Serialize for OutputPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Wrapped {
                root_key,
                documents,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(root_key, documents)?;
                map.end()
            }
            Self::Bare(documents) => documents.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(paths: &[(&str, Value)]) -> Document {
        let mut doc = Document::new();
        for (path, value) in paths {
            let segments: Vec<&str> = path.split('.').collect();
            assert!(doc.insert_path(&segments, value.clone()));
        }
        doc
    }

    #[test]
    fn insert_path_merges_shared_prefixes_in_order() {
        let doc = doc_with(&[
            ("id", Value::Int64(1)),
            ("company.name", Value::Utf8("Test".into())),
            ("company.address", Value::Utf8("Berlin".into())),
        ]);

        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["id", "company"]);
        let company = doc.iter().find_map(|(k, n)| match n {
            Node::Object(child) if k == "company" => Some(child),
            _ => None,
        });
        assert_eq!(company.map(|c| c.keys().collect::<Vec<_>>()), Some(vec!["name", "address"]));
        assert_eq!(doc.leaf("company.address"), Some(&Value::Utf8("Berlin".into())));
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"id":1,"company":{"name":"Test","address":"Berlin"}}"#);
    }

    #[test]
    fn insert_path_refuses_leaf_object_clash() {
        let mut doc = doc_with(&[("x", Value::Int64(1))]);
        assert!(!doc.insert_path(&["x", "y"], Value::Int64(2)));

        let mut doc = doc_with(&[("x.y", Value::Int64(1))]);
        assert!(!doc.insert_path(&["x"], Value::Int64(2)));
        assert_eq!(doc.leaf("x.y"), Some(&Value::Int64(1)));
    }

    #[test]
    fn strip_nulls_removes_empty_ancestors_but_keeps_root() {
        let mut doc = doc_with(&[
            ("a.b.c", Value::Null),
            ("a.d", Value::Int64(0)),
            ("e.f", Value::Null),
        ]);
        doc.strip_nulls();
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"a":{"d":0}}"#);

        let mut all_null = doc_with(&[("x", Value::Null)]);
        all_null.strip_nulls();
        assert!(all_null.is_empty());
    }

    #[test]
    fn payload_wraps_only_with_non_empty_root() {
        let docs = vec![doc_with(&[("id", Value::Int64(1))])];
        let wrapped = OutputPayload::new(Some("products"), docs.clone());
        assert_eq!(serde_json::to_string(&wrapped).unwrap(), r#"{"products":[{"id":1}]}"#);

        let bare = OutputPayload::new(Some("  "), docs);
        assert_eq!(bare.root_key(), None);
        assert_eq!(serde_json::to_string(&bare).unwrap(), r#"[{"id":1}]"#);
    }

    #[test]
    fn pretty_output_uses_four_space_indent() {
        let payload = OutputPayload::new(Some("r"), vec![doc_with(&[("a", Value::Bool(true))])]);
        let text = payload.to_json_pretty().unwrap();
        assert_eq!(text, "{\n    \"r\": [\n        {\n            \"a\": true\n        }\n    ]\n}");
    }

    #[test]
    fn non_finite_floats_serialize_as_null() {
        let doc = doc_with(&[("x", Value::Float64(f64::NAN))]);
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"x":null}"#);
    }
}
