#![cfg(feature = "excel")]

use std::path::Path;

use calamine::{Data, DataType, Reader, open_workbook_auto};

use crate::error::{ConvertError, ConvertResult};
use crate::types::{Table, Value};

use super::csv::header_names;
use super::unified::ReadOptions;

/// Read one sheet of an Excel document (`.xlsx`, `.xls`, `.ods`, etc.) into a [`Table`].
///
/// Behavior:
/// - Picks `sheet_name` if provided; otherwise uses the first sheet in the workbook
/// - Skips `options.skip_rows` physical rows, then takes the first non-empty row as the header
/// - Keeps native cell types (numbers stay numeric, text stays text)
/// - Converts date cells to ISO-8601 text and error cells to `Null`
pub fn read_excel_from_path(
    path: impl AsRef<Path>,
    sheet_name: Option<&str>,
    options: &ReadOptions,
) -> ConvertResult<Table> {
    let sheets: Option<Vec<&str>> = sheet_name.map(|s| vec![s]);
    read_excel_workbook_from_path(path, sheets.as_deref(), options)
}

/// Read multiple sheets from an Excel workbook and concatenate all rows into one [`Table`].
///
/// - If `sheet_names` is `None`, reads **all sheets** in workbook order.
/// - If `sheet_names` is `Some(&[...])`, reads only those sheets (in the provided order).
///
/// Every sheet must have the same header as the first one.
pub fn read_excel_workbook_from_path(
    path: impl AsRef<Path>,
    sheet_names: Option<&[&str]>,
    options: &ReadOptions,
) -> ConvertResult<Table> {
    let mut workbook = open_workbook_auto(path)?;

    let sheets: Vec<String> = match sheet_names {
        Some(names) => names.iter().map(|s| s.to_string()).collect(),
        None => workbook.sheet_names().to_vec(),
    };
    if sheets.is_empty() {
        return Err(ConvertError::InvalidInput {
            message: "workbook has no sheets".to_string(),
        });
    }

    let mut columns: Option<Vec<String>> = None;
    let mut all_rows: Vec<Vec<Value>> = Vec::new();
    for sheet in sheets {
        let range = workbook.worksheet_range(&sheet)?;
        let (sheet_columns, mut sheet_rows) =
            read_sheet_range(&range, options).map_err(|e| wrap_input_err_with_sheet(&sheet, e))?;

        match &columns {
            None => columns = Some(sheet_columns),
            Some(first) if *first == sheet_columns => {}
            Some(first) => {
                return Err(ConvertError::InvalidInput {
                    message: format!(
                        "sheet '{sheet}': header {sheet_columns:?} differs from first sheet header {first:?}"
                    ),
                });
            }
        }
        all_rows.append(&mut sheet_rows);
    }

    Ok(Table::new(columns.unwrap_or_default(), all_rows))
}

fn read_sheet_range(
    range: &calamine::Range<Data>,
    options: &ReadOptions,
) -> ConvertResult<(Vec<String>, Vec<Vec<Value>>)> {
    // The range starts at the first used row, not at physical row 0.
    let first_used_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    let to_skip = options.skip_rows.saturating_sub(first_used_row);

    let mut rows_iter = range
        .rows()
        .skip(to_skip)
        .skip_while(|row| row.iter().all(|c| matches!(c, Data::Empty)));

    let header = rows_iter.next().ok_or_else(|| ConvertError::InvalidInput {
        message: "sheet has no non-empty rows (no header row found)".to_string(),
    })?;
    let columns = header_names(header.iter().map(cell_to_header_string))?;

    let rows = rows_iter
        .map(|row| row.iter().map(cell_to_value).collect())
        .collect();

    Ok((columns, rows))
}

fn wrap_input_err_with_sheet(sheet: &str, err: ConvertError) -> ConvertError {
    match err {
        ConvertError::InvalidInput { message } => ConvertError::InvalidInput {
            message: format!("sheet '{sheet}': {message}"),
        },
        other => other,
    }
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(f) => f.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => "".to_string(),
    }
}

fn cell_to_value(c: &Data) -> Value {
    match c {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) if s.trim().is_empty() => Value::Null,
        Data::String(s) => Value::Utf8(s.trim().to_string()),
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => Value::Float64(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match c.as_datetime() {
            Some(ndt) if ndt.time() == chrono::NaiveTime::MIN => {
                Value::Utf8(ndt.format("%Y-%m-%d").to_string())
            }
            Some(ndt) => Value::Utf8(ndt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => Value::Float64(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Utf8(s.clone()),
    }
}
