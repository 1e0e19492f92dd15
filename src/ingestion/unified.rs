//! Unified table-reading entrypoint.
//!
//! Most callers should use [`read_table_from_path`], which reads a CSV or spreadsheet file into an
//! in-memory [`crate::types::Table`].
//!
//! - If [`ReadOptions::format`] is `None`, the format is inferred from the file extension.
//! - Spreadsheets need the `excel` cargo feature (on by default).

use std::path::Path;

use crate::error::{ConvertError, ConvertResult};
use crate::types::Table;

use super::csv;

/// Supported table formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Delimited text (`;`, `,` or tab).
    Csv,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl TableFormat {
    /// Parse a table format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }
}

/// How to choose sheet(s) when reading an Excel workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExcelSheetSelection {
    /// Read the first sheet (default).
    #[default]
    First,
    /// Read a single named sheet.
    Sheet(String),
    /// Read all sheets and concatenate rows.
    AllSheets,
    /// Read only the listed sheets (in order) and concatenate rows.
    Sheets(Vec<String>),
}

/// Options controlling how a table file is read.
///
/// Use [`Default`] for common cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<TableFormat>,
    /// CSV delimiter. If `None`, sniffed from the header line.
    pub delimiter: Option<u8>,
    /// Physical rows to discard before the header row.
    pub skip_rows: usize,
    /// Excel-specific options.
    pub excel_sheet_selection: ExcelSheetSelection,
    /// Type CSV cells (integers, decimals, booleans) when that is lossless.
    pub infer_types: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            format: None,
            delimiter: None,
            skip_rows: 0,
            excel_sheet_selection: ExcelSheetSelection::default(),
            infer_types: true,
        }
    }
}

/// Read a table from a path-based source.
///
/// - If `options.format` is `None`, format is inferred from the file extension.
/// - Use `options.excel_sheet_selection` for Excel multi-tab behavior.
///
/// # Examples
///
/// ## CSV (auto-detect by extension)
///
/// ```no_run
/// use csv2json::ingestion::{read_table_from_path, ReadOptions};
///
/// # fn main() -> Result<(), csv2json::ConvertError> {
/// let table = read_table_from_path("people.csv", &ReadOptions::default())?;
/// println!("rows={} columns={:?}", table.row_count(), table.columns);
/// # Ok(())
/// # }
/// ```
///
/// ## Force a format and skip a banner line
///
/// ```no_run
/// use csv2json::ingestion::{read_table_from_path, ReadOptions, TableFormat};
///
/// # fn main() -> Result<(), csv2json::ConvertError> {
/// let opts = ReadOptions {
///     format: Some(TableFormat::Csv),
///     delimiter: Some(b';'),
///     skip_rows: 1,
///     ..Default::default()
/// };
///
/// // Useful when a file has no extension or you want to override inference.
/// let table = read_table_from_path("export_without_extension", &opts)?;
/// println!("rows={}", table.row_count());
/// # Ok(())
/// # }
/// ```
///
/// ## Excel (feature-gated)
///
/// ```no_run
/// use csv2json::ingestion::{read_table_from_path, ExcelSheetSelection, ReadOptions};
///
/// # fn main() -> Result<(), csv2json::ConvertError> {
/// let opts = ReadOptions {
///     excel_sheet_selection: ExcelSheetSelection::Sheet("Products".to_string()),
///     ..Default::default()
/// };
///
/// let table = read_table_from_path("workbook.xlsx", &opts)?;
/// println!("rows={}", table.row_count());
/// # Ok(())
/// # }
/// ```
pub fn read_table_from_path(path: impl AsRef<Path>, options: &ReadOptions) -> ConvertResult<Table> {
    let path = path.as_ref();
    match resolve_format(path, options)? {
        TableFormat::Csv => csv::read_csv_from_path(path, options),
        TableFormat::Excel => read_excel_dispatch(path, options),
    }
}

/// The format `options` forces, or the one implied by `path`'s extension.
pub fn resolve_format(path: &Path, options: &ReadOptions) -> ConvertResult<TableFormat> {
    match options.format {
        Some(f) => Ok(f),
        None => infer_format_from_path(path),
    }
}

fn infer_format_from_path(path: &Path) -> ConvertResult<TableFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ConvertError::InvalidInput {
            message: format!("cannot infer format: path has no extension ({})", path.display()),
        })?;

    TableFormat::from_extension(ext).ok_or_else(|| ConvertError::InvalidInput {
        message: format!(
            "cannot infer format from extension '{ext}' for path ({})",
            path.display()
        ),
    })
}

fn read_excel_dispatch(path: &Path, options: &ReadOptions) -> ConvertResult<Table> {
    // Avoid unused warnings when the feature is off.
    let _ = (path, options);

    #[cfg(feature = "excel")]
    {
        use super::excel;

        match &options.excel_sheet_selection {
            ExcelSheetSelection::First => excel::read_excel_from_path(path, None, options),
            ExcelSheetSelection::Sheet(name) => excel::read_excel_from_path(path, Some(name.as_str()), options),
            ExcelSheetSelection::AllSheets => excel::read_excel_workbook_from_path(path, None, options),
            ExcelSheetSelection::Sheets(names) => {
                let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
                excel::read_excel_workbook_from_path(path, Some(refs.as_slice()), options)
            }
        }
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(ConvertError::InvalidInput {
            message: "excel input not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}
