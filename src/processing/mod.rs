//! The mapping-and-materialization engine.
//!
//! The processing layer turns a [`crate::types::Table`] into nested JSON documents. It is purely
//! in-memory and never logs; non-fatal issues are returned as [`Warning`]s next to the result.
//!
//! - [`coerce()`]: per-cell conversion to a declared [`crate::types::FieldType`]
//! - [`PathAssembler`]: per-row construction of a nested [`crate::document::Document`] from dotted
//!   target paths
//! - [`build()`] / [`DocumentBuilder`]: whole-table orchestration, null stripping and root wrapping
//!
//! ## Example: nested output with a declared type
//!
//! ```rust
//! use csv2json::processing::{build, BuildOptions};
//! use csv2json::types::{Field, FieldType, Mapping, Schema, Table, Value};
//!
//! let table = Table::new(
//!     vec!["A".into(), "B".into(), "C".into()],
//!     vec![vec![Value::Int64(1), Value::Int64(2), Value::Null]],
//! );
//! let mapping: Mapping = [("A", "x.y"), ("B", "x.z"), ("C", "w")].into_iter().collect();
//! let schema = Schema::new(vec![Field::new("x.z", FieldType::String)]);
//!
//! let opts = BuildOptions { remove_nulls: true, ..Default::default() };
//! let out = build(&table, &mapping, Some(&schema), &opts).unwrap();
//! assert_eq!(
//!     serde_json::to_string(&out.payload).unwrap(),
//!     r#"[{"x":{"y":1,"z":"2"}}]"#
//! );
//! ```

pub mod assemble;
pub mod build;
pub mod coerce;

pub use assemble::{PathAssembler, assemble, split_target_path, validate_mapping};
pub use build::{BuildOptions, BuildOutput, DocumentBuilder, Warning, build};
pub use coerce::coerce;
