//! Row -> nested document assembly.
//!
//! A [`PathAssembler`] is built once per mapping. Construction validates every target path and
//! rejects conflicting paths (a path used both as a leaf and as an object, or mapped twice), so
//! assembling individual rows can never hit a structural conflict.

use std::collections::HashMap;

use crate::document::Document;
use crate::error::{CoercionError, ConvertError, ConvertResult};
use crate::types::{FieldType, Mapping, Row, Schema, Value};

use super::coerce::coerce;

static BLANK: Value = Value::Null;

#[derive(Debug, Clone)]
struct PlannedField {
    source: String,
    target: String,
    segments: Vec<String>,
    declared: Option<FieldType>,
}

/// Validated, pre-split mapping ready to assemble rows.
#[derive(Debug, Clone)]
pub struct PathAssembler {
    fields: Vec<PlannedField>,
}

impl PathAssembler {
    /// Validate `mapping` (and resolve declared types from `schema`).
    ///
    /// Fails with [`ConvertError::InvalidTargetPath`] for malformed paths and
    /// [`ConvertError::MappingConflict`] for conflicting ones.
    pub fn new(mapping: &Mapping, schema: Option<&Schema>) -> ConvertResult<Self> {
        validate_mapping(mapping)?;

        let fields = mapping
            .iter()
            .map(|entry| {
                Ok(PlannedField {
                    source: entry.source.clone(),
                    target: entry.target.clone(),
                    segments: split_target_path(&entry.target)?,
                    declared: schema.and_then(|s| s.field_type(&entry.target)),
                })
            })
            .collect::<ConvertResult<Vec<_>>>()?;

        Ok(Self { fields })
    }

    /// Source columns in mapping order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.source.as_str())
    }

    /// Resolve each mapped source column to its position in `columns`.
    pub fn bind(&self, columns: &[String]) -> Vec<Option<usize>> {
        self.fields
            .iter()
            .map(|f| columns.iter().position(|c| *c == f.source))
            .collect()
    }

    /// Assemble one row addressed by column name.
    ///
    /// Missing columns are treated as blank. Cells that fail coercion become `null` and are
    /// reported through `errors`.
    pub fn assemble(&self, row_index: usize, row: Row<'_>, errors: &mut Vec<CoercionError>) -> Document {
        self.assemble_with(row_index, |field| row.get(&field.source), errors)
    }

    /// Assemble one row of raw values using a binding from [`Self::bind`].
    pub fn assemble_bound(
        &self,
        row_index: usize,
        values: &[Value],
        binding: &[Option<usize>],
        errors: &mut Vec<CoercionError>,
    ) -> Document {
        let mut positions = binding.iter();
        self.assemble_with(
            row_index,
            |_| positions.next().copied().flatten().and_then(|idx| values.get(idx)),
            errors,
        )
    }

    fn assemble_with<'v>(
        &self,
        row_index: usize,
        mut cell: impl FnMut(&PlannedField) -> Option<&'v Value>,
        errors: &mut Vec<CoercionError>,
    ) -> Document {
        let mut doc = Document::new();
        for field in &self.fields {
            let raw = cell(field).unwrap_or(&BLANK);
            let value = match coerce(raw, field.declared) {
                Ok(v) => v,
                Err(kind) => {
                    errors.push(CoercionError {
                        kind,
                        row_index,
                        source_column: field.source.clone(),
                        target_path: field.target.clone(),
                        raw_value: raw.to_text(),
                    });
                    Value::Null
                }
            };
            let inserted = doc.insert_path(&field.segments, value);
            debug_assert!(inserted, "validated mapping produced a path clash at '{}'", field.target);
        }
        doc
    }
}

/// Assemble a single row against `mapping` (validating the mapping first).
///
/// Returns the document plus any per-cell coercion failures.
pub fn assemble(
    row: Row<'_>,
    mapping: &Mapping,
    schema: Option<&Schema>,
) -> ConvertResult<(Document, Vec<CoercionError>)> {
    let assembler = PathAssembler::new(mapping, schema)?;
    let mut errors = Vec::new();
    let doc = assembler.assemble(0, row, &mut errors);
    Ok((doc, errors))
}

/// Split a dotted target path into its segments.
///
/// Every segment must be non-empty and not only whitespace.
pub fn split_target_path(path: &str) -> ConvertResult<Vec<String>> {
    if path.trim().is_empty() {
        return Err(ConvertError::InvalidTargetPath {
            path: path.to_string(),
            message: "path is empty".to_string(),
        });
    }

    path.split('.')
        .map(|segment| {
            if segment.trim().is_empty() {
                Err(ConvertError::InvalidTargetPath {
                    path: path.to_string(),
                    message: "path contains an empty segment".to_string(),
                })
            } else {
                Ok(segment.to_string())
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Leaf,
    Object,
}

/// Check that all target paths in `mapping` can coexist in one document.
///
/// Entries are checked in mapping order; the reported `path_a` is the earlier of the two
/// conflicting targets. Exact duplicate targets are conflicts too.
pub fn validate_mapping(mapping: &Mapping) -> ConvertResult<()> {
    // Every prefix seen so far -> what it is, and the first target path that introduced it.
    let mut seen: HashMap<String, (Slot, &str)> = HashMap::new();

    for entry in mapping {
        let segments = split_target_path(&entry.target)?;
        let mut prefix = String::with_capacity(entry.target.len());

        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                prefix.push('.');
            }
            prefix.push_str(segment);

            let slot = if i + 1 == segments.len() {
                Slot::Leaf
            } else {
                Slot::Object
            };
            match seen.get(prefix.as_str()) {
                Some(&(Slot::Object, _)) if slot == Slot::Object => {}
                Some(&(_, earlier)) => {
                    return Err(ConvertError::MappingConflict {
                        path_a: earlier.to_string(),
                        path_b: entry.target.clone(),
                    });
                }
                None => {
                    seen.insert(prefix.clone(), (slot, entry.target.as_str()));
                }
            }
        }
    }
    Ok(())
}
