//! Per-cell type coercion.
//!
//! [`coerce`] converts a raw table cell into the [`FieldType`] declared for its target path.
//! Blank cells always become [`Value::Null`]; cells without a declared type pass through with
//! their native type.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CoercionErrorKind;
use crate::types::{FieldType, Value};

/// Date prefix with a four-digit year, year-first or year-last. chrono's `%Y` takes any width.
static FOUR_DIGIT_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d{4}[-/]\d{1,2}[-/]\d{1,2}|\d{1,2}[./]\d{1,2}[./]\d{4})(?:[ T]|$)")
        .expect("date prefix pattern is valid")
});

/// Unambiguous date(-time) layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Coerce `raw` to `declared`.
///
/// - blank (`Null` or whitespace-only text) -> `Null`, whatever the declared type
/// - no declared type -> `raw` unchanged
/// - `String`: natural text; integer-valued floats lose their `.0`
/// - `Integer` / `Float`: native numbers or parseable text (decimal comma accepted)
/// - `Boolean`: native booleans, `true`/`false`/`1`/`0` (any case), numeric `1`/`0`
/// - `Date`: recognizable date or datetime text, normalized to `YYYY-MM-DD`
///
/// Coercing an already-coerced value to the same type returns it unchanged.
pub fn coerce(raw: &Value, declared: Option<FieldType>) -> Result<Value, CoercionErrorKind> {
    if raw.is_blank() {
        return Ok(Value::Null);
    }
    let Some(declared) = declared else {
        return Ok(raw.clone());
    };

    match declared {
        FieldType::String => Ok(Value::Utf8(raw.to_text())),
        FieldType::Integer => to_integer(raw).map(Value::Int64),
        FieldType::Float => to_float(raw).map(Value::Float64),
        FieldType::Boolean => to_bool(raw).map(Value::Bool),
        FieldType::Date => to_date(raw).map(|d| Value::Utf8(d.format("%Y-%m-%d").to_string())),
    }
}

fn to_integer(raw: &Value) -> Result<i64, CoercionErrorKind> {
    match raw {
        Value::Int64(i) => Ok(*i),
        Value::Float64(f) => float_to_i64(*f),
        Value::Utf8(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(i);
            }
            // Workbooks often store integer columns as "20.0"/"20,0" text.
            parse_decimal(s).and_then(float_to_i64)
        }
        Value::Bool(_) | Value::Null => Err(CoercionErrorKind::TypeMismatch),
    }
}

fn float_to_i64(f: f64) -> Result<i64, CoercionErrorKind> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(f as i64)
    } else {
        Err(CoercionErrorKind::TypeMismatch)
    }
}

fn to_float(raw: &Value) -> Result<f64, CoercionErrorKind> {
    match raw {
        Value::Float64(f) if f.is_finite() => Ok(*f),
        Value::Int64(i) => Ok(*i as f64),
        Value::Utf8(s) => parse_decimal(s.trim()),
        _ => Err(CoercionErrorKind::TypeMismatch),
    }
}

/// Parse a finite decimal number, accepting a single decimal comma in place of the dot.
pub(crate) fn parse_decimal(s: &str) -> Result<f64, CoercionErrorKind> {
    let normalized;
    let text = if !s.contains('.') && s.matches(',').count() == 1 {
        normalized = s.replace(',', ".");
        normalized.as_str()
    } else {
        s
    };

    // Rust accepts "inf"/"nan"; neither has a JSON representation.
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() && text.bytes().any(|b| b.is_ascii_digit()) => Ok(f),
        _ => Err(CoercionErrorKind::TypeMismatch),
    }
}

fn to_bool(raw: &Value) -> Result<bool, CoercionErrorKind> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::Int64(0) => Ok(false),
        Value::Int64(1) => Ok(true),
        Value::Float64(f) if *f == 0.0 => Ok(false),
        Value::Float64(f) if *f == 1.0 => Ok(true),
        Value::Utf8(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(CoercionErrorKind::TypeMismatch),
        },
        _ => Err(CoercionErrorKind::TypeMismatch),
    }
}

fn to_date(raw: &Value) -> Result<NaiveDate, CoercionErrorKind> {
    let Value::Utf8(s) = raw else {
        return Err(CoercionErrorKind::UnparseableDate);
    };
    parse_date(s.trim()).ok_or(CoercionErrorKind::UnparseableDate)
}

/// Parse a date or datetime in one of the recognized layouts.
///
/// Slash-separated day/month orders (`03/04/2024`) are only accepted when exactly one reading is
/// a valid calendar date; otherwise the input is ambiguous and rejected. Years must have four
/// digits.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    if !FOUR_DIGIT_YEAR.is_match(s) {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    let day_first = NaiveDate::parse_from_str(s, "%d/%m/%Y").ok();
    let month_first = NaiveDate::parse_from_str(s, "%m/%d/%Y").ok();
    match (day_first, month_first) {
        (Some(a), Some(b)) if a == b => Some(a),
        (Some(_), Some(_)) => None,
        (Some(d), None) | (None, Some(d)) => Some(d),
        (None, None) => None,
    }
}
