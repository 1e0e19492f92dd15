//! Table -> output payload orchestration.

use std::fmt;

use rayon::prelude::*;

use crate::document::{Document, OutputPayload};
use crate::error::{CoercionError, ConvertError, ConvertResult};
use crate::types::{Mapping, Schema, Table};

use super::assemble::PathAssembler;

/// Options controlling [`build`].
///
/// Use [`Default`] for common cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Recursively drop `null` leaves and objects left empty by that.
    pub remove_nulls: bool,
    /// Root key used when the schema does not define one.
    pub root_key: Option<String>,
    /// Abort on the first coercion failure instead of recording a warning.
    pub strict: bool,
    /// Fail if a mapped source column is absent from the table header.
    pub require_source_columns: bool,
    /// Assemble rows on the rayon thread pool. Output is identical to the sequential path.
    pub parallel: bool,
}

/// A non-fatal issue found while building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A cell could not be coerced; its leaf was set to `null`.
    Coercion(CoercionError),
    /// A mapped source column is not in the table; its leaves are `null` in every row.
    MissingSourceColumn { column: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Coercion(e) => e.fmt(f),
            Warning::MissingSourceColumn { column } => {
                write!(f, "source column '{column}' not found in table header")
            }
        }
    }
}

/// Result of a successful build: the payload plus side-channel warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub payload: OutputPayload,
    /// Missing columns first (mapping order), then coercion failures ordered by row index and
    /// source column.
    pub warnings: Vec<Warning>,
}

/// Reusable builder for one mapping/schema pairing.
///
/// The mapping is validated once, in [`DocumentBuilder::new`], before any row is seen.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    assembler: PathAssembler,
    root_key: Option<String>,
    options: BuildOptions,
}

impl DocumentBuilder {
    pub fn new(mapping: &Mapping, schema: Option<&Schema>, options: BuildOptions) -> ConvertResult<Self> {
        let assembler = PathAssembler::new(mapping, schema)?;
        let root_key = schema
            .and_then(Schema::root_key)
            .map(str::to_string)
            .or_else(|| options.root_key.clone());

        Ok(Self {
            assembler,
            root_key,
            options,
        })
    }

    /// Root key the payload will be wrapped under, if any.
    pub fn root_key(&self) -> Option<&str> {
        self.root_key.as_deref()
    }

    /// Assemble every row of `table`, in table order.
    pub fn build(&self, table: &Table) -> ConvertResult<BuildOutput> {
        let mut warnings = Vec::new();
        for source in self.assembler.sources() {
            if table.index_of(source).is_none() {
                if self.options.require_source_columns {
                    return Err(ConvertError::MissingSourceColumn {
                        column: source.to_string(),
                    });
                }
                warnings.push(Warning::MissingSourceColumn {
                    column: source.to_string(),
                });
            }
        }

        let binding = self.assembler.bind(&table.columns);
        let (mut documents, mut errors) = if self.options.parallel {
            self.assemble_parallel(table, &binding)
        } else {
            self.assemble_sequential(table, &binding)
        };

        errors.sort_by(|a, b| {
            (a.row_index, &a.source_column).cmp(&(b.row_index, &b.source_column))
        });
        if self.options.strict {
            if let Some(first) = errors.into_iter().next() {
                return Err(ConvertError::Coercion(first));
            }
        } else {
            warnings.extend(errors.into_iter().map(Warning::Coercion));
        }

        if self.options.remove_nulls {
            documents.iter_mut().for_each(Document::strip_nulls);
        }

        Ok(BuildOutput {
            payload: OutputPayload::new(self.root_key(), documents),
            warnings,
        })
    }

    fn assemble_sequential(
        &self,
        table: &Table,
        binding: &[Option<usize>],
    ) -> (Vec<Document>, Vec<CoercionError>) {
        let mut documents = Vec::with_capacity(table.row_count());
        let mut errors = Vec::new();
        for (row_index, values) in table.rows.iter().enumerate() {
            documents.push(self.assembler.assemble_bound(row_index, values, binding, &mut errors));
            // Strict mode only needs the failing row; the caller picks its first column.
            if self.options.strict && !errors.is_empty() {
                break;
            }
        }
        (documents, errors)
    }

    fn assemble_parallel(&self, table: &Table, binding: &[Option<usize>]) -> (Vec<Document>, Vec<CoercionError>) {
        let per_row: Vec<(Document, Vec<CoercionError>)> = table
            .rows
            .par_iter()
            .enumerate()
            .map(|(row_index, values)| {
                let mut errors = Vec::new();
                let doc = self.assembler.assemble_bound(row_index, values, binding, &mut errors);
                (doc, errors)
            })
            .collect();

        let mut documents = Vec::with_capacity(per_row.len());
        let mut errors = Vec::new();
        for (doc, mut row_errors) in per_row {
            documents.push(doc);
            errors.append(&mut row_errors);
        }
        (documents, errors)
    }
}

/// Convert `table` into an [`OutputPayload`] in one call.
///
/// # Examples
///
/// ```rust
/// use csv2json::processing::{build, BuildOptions};
/// use csv2json::types::{Field, FieldType, Mapping, Schema, Table, Value};
///
/// let table = Table::new(
///     vec!["ID".into(), "Name".into(), "Address".into()],
///     vec![vec![
///         Value::Utf8("1".into()),
///         Value::Utf8("Test".into()),
///         Value::Utf8("Berlin".into()),
///     ]],
/// );
/// let mapping: Mapping = [("ID", "id"), ("Name", "company.name"), ("Address", "company.address")]
///     .into_iter()
///     .collect();
/// let schema = Schema::new(vec![Field::new("id", FieldType::Integer)]).with_root("products");
///
/// let out = build(&table, &mapping, Some(&schema), &BuildOptions::default()).unwrap();
/// assert_eq!(
///     serde_json::to_string(&out.payload).unwrap(),
///     r#"{"products":[{"id":1,"company":{"name":"Test","address":"Berlin"}}]}"#
/// );
/// ```
pub fn build(
    table: &Table,
    mapping: &Mapping,
    schema: Option<&Schema>,
    options: &BuildOptions,
) -> ConvertResult<BuildOutput> {
    DocumentBuilder::new(mapping, schema, options.clone())?.build(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, FieldType, Value};

    fn text(s: &str) -> Value {
        Value::Utf8(s.to_string())
    }

    fn people() -> Table {
        Table::new(
            vec!["id".into(), "name".into(), "city".into()],
            vec![
                vec![text("1"), text("Ada"), text("London")],
                vec![text("x"), text("Grace"), Value::Null],
                vec![text("3"), text("Linus"), text("Helsinki")],
            ],
        )
    }

    fn people_mapping() -> Mapping {
        [("id", "id"), ("name", "person.name"), ("city", "person.address.city")]
            .into_iter()
            .collect()
    }

    fn int_schema() -> Schema {
        Schema::new(vec![Field::new("id", FieldType::Integer)])
    }

    #[test]
    fn conflicts_are_raised_before_rows_even_for_empty_tables() {
        let mapping: Mapping = [("A", "x"), ("B", "x.y")].into_iter().collect();
        let empty = Table::new(vec!["A".into(), "B".into()], vec![]);
        let err = build(&empty, &mapping, None, &BuildOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::MappingConflict { .. }));
    }

    #[test]
    fn non_strict_records_warning_and_nulls_the_leaf() {
        let out = build(&people(), &people_mapping(), Some(&int_schema()), &BuildOptions::default()).unwrap();

        let docs = out.payload.documents();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].leaf("id"), Some(&Value::Int64(1)));
        assert_eq!(docs[1].leaf("id"), Some(&Value::Null));
        assert_eq!(docs[2].leaf("id"), Some(&Value::Int64(3)));

        assert_eq!(out.warnings.len(), 1);
        match &out.warnings[0] {
            Warning::Coercion(e) => {
                assert_eq!(e.row_index, 1);
                assert_eq!(e.source_column, "id");
                assert_eq!(e.raw_value, "x");
            }
            other => panic!("unexpected warning {other:?}"),
        }
    }

    #[test]
    fn strict_aborts_on_first_coercion_error() {
        let opts = BuildOptions {
            strict: true,
            ..Default::default()
        };
        let err = build(&people(), &people_mapping(), Some(&int_schema()), &opts).unwrap_err();
        match err {
            ConvertError::Coercion(e) => assert_eq!((e.row_index, e.source_column.as_str()), (1, "id")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn remove_nulls_drops_null_leaves_and_empty_parents() {
        let table = Table::new(
            vec!["a".into(), "b".into()],
            vec![vec![Value::Null, Value::Int64(1)], vec![Value::Null, Value::Null]],
        );
        let mapping: Mapping = [("a", "x.y"), ("b", "z")].into_iter().collect();
        let opts = BuildOptions {
            remove_nulls: true,
            ..Default::default()
        };
        let out = build(&table, &mapping, None, &opts).unwrap();
        assert_eq!(serde_json::to_string(&out.payload).unwrap(), r#"[{"z":1},{}]"#);
    }

    #[test]
    fn schema_root_wins_over_configured_root() {
        let opts = BuildOptions {
            root_key: Some("configured".into()),
            ..Default::default()
        };
        let schema = int_schema().with_root("products");
        let builder = DocumentBuilder::new(&people_mapping(), Some(&schema), opts.clone()).unwrap();
        assert_eq!(builder.root_key(), Some("products"));

        let builder = DocumentBuilder::new(&people_mapping(), Some(&int_schema()), opts).unwrap();
        assert_eq!(builder.root_key(), Some("configured"));

        let builder = DocumentBuilder::new(&people_mapping(), None, BuildOptions::default()).unwrap();
        assert_eq!(builder.root_key(), None);
    }

    #[test]
    fn missing_source_columns_warn_or_fail() {
        let mapping: Mapping = [("name", "name"), ("age", "age")].into_iter().collect();
        let out = build(&people(), &mapping, None, &BuildOptions::default()).unwrap();
        assert_eq!(
            out.warnings,
            vec![Warning::MissingSourceColumn {
                column: "age".into()
            }]
        );
        assert_eq!(out.payload.documents()[0].leaf("age"), Some(&Value::Null));

        let opts = BuildOptions {
            require_source_columns: true,
            ..Default::default()
        };
        let err = build(&people(), &mapping, None, &opts).unwrap_err();
        assert!(matches!(err, ConvertError::MissingSourceColumn { column } if column == "age"));
    }

    #[test]
    fn parallel_build_matches_sequential_build() {
        let rows = (0..500)
            .map(|i| {
                let id = if i % 7 == 0 { text("bad") } else { text(&i.to_string()) };
                vec![id, text(&format!("n{i}")), Value::Null]
            })
            .collect();
        let table = Table::new(vec!["id".into(), "name".into(), "city".into()], rows);

        let seq = build(&table, &people_mapping(), Some(&int_schema()), &BuildOptions::default()).unwrap();
        let par_opts = BuildOptions {
            parallel: true,
            ..Default::default()
        };
        let par = build(&table, &people_mapping(), Some(&int_schema()), &par_opts).unwrap();

        assert_eq!(seq, par);
        assert_eq!(
            seq.payload.to_json_pretty().unwrap(),
            par.payload.to_json_pretty().unwrap()
        );
    }
}
