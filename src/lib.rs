//! `csv2json` turns CSV and Excel tables into nested JSON documents.
//!
//! Each table row becomes one JSON object. A [`types::Mapping`] routes source columns to dotted
//! target paths (`company.address.city`), an optional [`types::Schema`] declares a
//! [`types::FieldType`] per target path and the root key the output array is wrapped under.
//!
//! The primary entrypoints are:
//!
//! - [`processing::build`]: in-memory [`types::Table`] -> [`document::OutputPayload`]
//! - [`pipeline::convert_file`]: input file -> JSON file, with schema/mapping loading and
//!   optional observer reporting
//!
//! ## What you can read
//!
//! **File formats (auto-detected by extension):**
//!
//! - **CSV**: `.csv`, `.tsv`, `.txt` (delimiter `;`, `,` or tab, sniffed from the header line)
//! - **Excel/workbooks** (Cargo feature `excel`, on by default): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//!
//! **Declared types:**
//!
//! - [`types::FieldType::String`]: any value rendered as text
//! - [`types::FieldType::Integer`]: `"42"`, `42`, `42.0`, `"20,0"`
//! - [`types::FieldType::Float`]: `"10.5"`, `"10,5"`, integers
//! - [`types::FieldType::Boolean`]: `true`/`false`/`1`/`0`
//! - [`types::FieldType::Date`]: ISO, `YYYY/MM/DD`, `DD.MM.YYYY`, unambiguous slash dates -> `YYYY-MM-DD`
//!
//! Blank cells (empty or whitespace-only) are `null` whatever the declared type.
//!
//! ## Quick example: build documents in memory
//!
//! ```rust
//! use csv2json::processing::{build, BuildOptions};
//! use csv2json::types::{Field, FieldType, Mapping, Schema, Table, Value};
//!
//! let table = Table::new(
//!     vec!["ID".into(), "Name".into(), "Founded".into()],
//!     vec![vec![
//!         Value::Utf8("7".into()),
//!         Value::Utf8("Acme".into()),
//!         Value::Utf8("31.12.1999".into()),
//!     ]],
//! );
//! let mapping: Mapping = [("ID", "id"), ("Name", "company.name"), ("Founded", "company.founded")]
//!     .into_iter()
//!     .collect();
//! let schema = Schema::new(vec![
//!     Field::new("id", FieldType::Integer),
//!     Field::new("company.founded", FieldType::Date),
//! ])
//! .with_root("companies");
//!
//! let out = build(&table, &mapping, Some(&schema), &BuildOptions::default()).unwrap();
//! assert!(out.warnings.is_empty());
//! assert_eq!(
//!     serde_json::to_string(&out.payload).unwrap(),
//!     r#"{"companies":[{"id":7,"company":{"name":"Acme","founded":"1999-12-31"}}]}"#
//! );
//! ```
//!
//! ## Quick example: convert a file
//!
//! ```no_run
//! use csv2json::pipeline::{convert_file, ConversionOptions, ConversionRequest};
//!
//! # fn main() -> Result<(), csv2json::ConvertError> {
//! let mut request = ConversionRequest::new("products.csv");
//! request.schema = Some("products.dt".into());
//! request.auto_map = true;
//!
//! let report = convert_file(&request, &ConversionOptions::default())?;
//! println!("rows={} warnings={}", report.rows, report.warnings.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: table readers (CSV, Excel)
//! - [`types`]: table, mapping, schema and value types
//! - [`processing`]: type coercion, path assembly and document building
//! - [`document`]: ordered JSON documents and the output payload
//! - [`loader`]: schema (`.dt`) and mapping files
//! - [`automap`]: heuristic mapping generation
//! - [`pipeline`]: file-to-file conversion
//! - [`observability`]: conversion observers
//! - [`error`]: error types used across the crate

pub mod automap;
pub mod document;
pub mod error;
pub mod ingestion;
pub mod loader;
pub mod observability;
pub mod pipeline;
pub mod processing;
pub mod types;

pub use error::{ConvertError, ConvertResult};
