//! Table readers.
//!
//! Most callers should use [`read_table_from_path`] (from [`unified`]) which:
//!
//! - auto-detects format by file extension (or you can override via [`ReadOptions`])
//! - skips banner rows and detects the header
//! - returns an in-memory [`crate::types::Table`]
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - `excel` (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod unified;

pub use unified::{ExcelSheetSelection, ReadOptions, TableFormat, read_table_from_path, resolve_format};
