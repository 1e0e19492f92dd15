//! CSV table reader.

use std::fs;
use std::path::Path;

use crate::error::{ConvertError, ConvertResult};
use crate::types::{Table, Value};

use super::unified::ReadOptions;

/// Delimiters considered when sniffing, in tie-break order.
const CANDIDATE_DELIMITERS: [u8; 3] = [b';', b',', b'\t'];

/// Read a CSV file into a [`Table`].
///
/// Rules:
///
/// - The first `options.skip_rows` physical lines are discarded, blank ones included; the next
///   record is the header.
/// - The delimiter comes from `options.delimiter`, or is sniffed from the header line.
/// - Cells are trimmed; empty cells become [`Value::Null`].
/// - With `options.infer_types`, numbers and booleans are typed when that loses nothing.
/// - Invalid UTF-8 is replaced rather than rejected.
pub fn read_csv_from_path(path: impl AsRef<Path>, options: &ReadOptions) -> ConvertResult<Table> {
    let bytes = fs::read(path)?;
    read_csv_from_str(&String::from_utf8_lossy(&bytes), options)
}

/// Read CSV text into a [`Table`] (see [`read_csv_from_path`]).
pub fn read_csv_from_str(input: &str, options: &ReadOptions) -> ConvertResult<Table> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let body = skip_lines(input, options.skip_rows);
    let delimiter = match options.delimiter {
        Some(d) => d,
        None => sniff_delimiter(body.lines().find(|line| !line.trim().is_empty()).unwrap_or("")),
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(body.as_bytes());
    read_records(&mut rdr, options.infer_types, options.skip_rows)
}

/// Read records from an existing CSV reader.
///
/// The reader must be built with `has_headers(false)` and positioned at the header row:
/// `options.skip_rows` and `options.delimiter` are not applied here.
pub fn read_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    options: &ReadOptions,
) -> ConvertResult<Table> {
    read_records(rdr, options.infer_types, 0)
}

/// The text following the first `n` physical lines.
fn skip_lines(input: &str, n: usize) -> &str {
    let skipped: usize = input.split_inclusive('\n').take(n).map(str::len).sum();
    &input[skipped..]
}

fn read_records<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    infer_types: bool,
    skipped: usize,
) -> ConvertResult<Table> {
    let mut records = rdr.byte_records();

    let header = match records.next() {
        Some(record) => record?,
        None => {
            return Err(ConvertError::InvalidInput {
                message: format!("csv has no header row after skipping {skipped} rows"),
            });
        }
    };
    let columns = header_names(header.iter().map(|cell| String::from_utf8_lossy(cell).into_owned()))?;

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for result in records {
        let record = result?;
        let row = record
            .iter()
            .map(|cell| read_cell(&String::from_utf8_lossy(cell), infer_types))
            .collect();
        rows.push(row);
    }

    Ok(Table::new(columns, rows))
}

/// Normalize header cells: trimmed, blanks named `column_<n>` (1-based), duplicates rejected.
pub(crate) fn header_names(cells: impl Iterator<Item = String>) -> ConvertResult<Vec<String>> {
    let mut columns: Vec<String> = Vec::new();
    for (idx, cell) in cells.enumerate() {
        let name = match cell.trim().trim_start_matches('\u{feff}') {
            "" => format!("column_{}", idx + 1),
            trimmed => trimmed.to_string(),
        };
        if columns.contains(&name) {
            return Err(ConvertError::InvalidInput {
                message: format!("duplicate column '{name}' in header. headers={columns:?}"),
            });
        }
        columns.push(name);
    }
    Ok(columns)
}

fn read_cell(raw: &str, infer_types: bool) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if infer_types {
        infer_value(trimmed)
    } else {
        Value::Utf8(trimmed.to_owned())
    }
}

/// Type a trimmed, non-empty cell without losing information.
///
/// A number is only produced when rendering it back yields the original text (modulo a decimal
/// comma), so `007`, `1.50` or `1e3` stay text.
fn infer_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    if let Ok(i) = s.parse::<i64>() {
        if i.to_string() == s {
            return Value::Int64(i);
        }
    }

    let normalized = if !s.contains('.') && s.matches(',').count() == 1 {
        s.replace(',', ".")
    } else {
        s.to_owned()
    };
    if let Ok(f) = normalized.parse::<f64>() {
        if f.is_finite() && f.fract() != 0.0 && f.to_string() == normalized {
            return Value::Float64(f);
        }
    }

    Value::Utf8(s.to_owned())
}

/// Pick the candidate delimiter occurring most often outside quotes (`;` wins ties).
pub fn sniff_delimiter(line: &str) -> u8 {
    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            if let Some(i) = CANDIDATE_DELIMITERS.iter().position(|&d| d == b) {
                counts[i] += 1;
            }
        }
    }

    let best = counts
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    CANDIDATE_DELIMITERS[best]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_semicolon_comma_and_tab() {
        assert_eq!(sniff_delimiter("a;b;c"), b';');
        assert_eq!(sniff_delimiter("a,b,c"), b',');
        assert_eq!(sniff_delimiter("a\tb\tc"), b'\t');
        assert_eq!(sniff_delimiter("\"x;y\",b,c"), b',');
        assert_eq!(sniff_delimiter("single"), b';');
    }

    #[test]
    fn infers_only_lossless_types() {
        assert_eq!(infer_value("42"), Value::Int64(42));
        assert_eq!(infer_value("-7"), Value::Int64(-7));
        assert_eq!(infer_value("10,5"), Value::Float64(10.5));
        assert_eq!(infer_value("2.25"), Value::Float64(2.25));
        assert_eq!(infer_value("TRUE"), Value::Bool(true));
        assert_eq!(infer_value("007"), Value::Utf8("007".into()));
        assert_eq!(infer_value("1.50"), Value::Utf8("1.50".into()));
        assert_eq!(infer_value("1.0"), Value::Utf8("1.0".into()));
        assert_eq!(infer_value("1e3"), Value::Utf8("1e3".into()));
        assert_eq!(infer_value("+5"), Value::Utf8("+5".into()));
        assert_eq!(infer_value("inf"), Value::Utf8("inf".into()));
    }

    #[test]
    fn header_names_fill_blanks_and_reject_duplicates() {
        let cols = header_names(["id", " ", "name"].iter().map(|s| s.to_string())).unwrap();
        assert_eq!(cols, vec!["id", "column_2", "name"]);

        let err = header_names(["id", "id"].iter().map(|s| s.to_string())).unwrap_err();
        assert!(err.to_string().contains("duplicate column 'id'"));
    }

    #[test]
    fn skip_rows_discards_banner_before_header() {
        let input = "Export 2024;;\n;;\nID;Name;Score\n1;Ada;98,5\n";
        let opts = ReadOptions {
            skip_rows: 2,
            ..Default::default()
        };
        let table = read_csv_from_str(input, &opts).unwrap();
        assert_eq!(table.columns, vec!["ID", "Name", "Score"]);
        assert_eq!(
            table.rows,
            vec![vec![
                Value::Int64(1),
                Value::Utf8("Ada".into()),
                Value::Float64(98.5)
            ]]
        );
    }

    #[test]
    fn skip_rows_counts_blank_banner_lines() {
        let opts = ReadOptions {
            skip_rows: 2,
            ..Default::default()
        };
        let table = read_csv_from_str("Export 2024\n\nID;Name\n1;Ada\n", &opts).unwrap();
        assert_eq!(table.columns, vec!["ID", "Name"]);
        assert_eq!(table.rows, vec![vec![Value::Int64(1), Value::Utf8("Ada".into())]]);

        // Blank lines between the banner and the header are passed over, not taken as the header.
        let opts = ReadOptions {
            skip_rows: 1,
            ..Default::default()
        };
        let table = read_csv_from_str("Export 2024\n\nID,Name\n1,Ada\n", &opts).unwrap();
        assert_eq!(table.columns, vec!["ID", "Name"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn ragged_rows_are_padded_and_empty_cells_are_null() {
        let input = "a,b,c\n1,,\n2\n";
        let table = read_csv_from_str(input, &ReadOptions::default()).unwrap();
        assert_eq!(table.rows[0], vec![Value::Int64(1), Value::Null, Value::Null]);
        assert_eq!(table.rows[1], vec![Value::Int64(2), Value::Null, Value::Null]);
    }
}
