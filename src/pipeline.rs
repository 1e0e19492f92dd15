//! File-to-file conversion.
//!
//! [`convert_file`] ties the pieces together: read the table, load the schema and mapping, build
//! the documents and write the JSON output. Outcomes are reported to an optional
//! [`ConversionObserver`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::automap::{auto_map, identity_mapping};
use crate::error::{ConvertError, ConvertResult};
use crate::ingestion::{ReadOptions, read_table_from_path, resolve_format};
use crate::loader::{load_mapping, load_schema};
use crate::observability::{ConversionContext, ConversionObserver, ConversionSeverity, ConversionStats};
use crate::processing::{BuildOptions, DocumentBuilder, Warning};
use crate::types::{Mapping, Schema, Table};

/// One conversion job.
#[derive(Debug, Clone, Default)]
pub struct ConversionRequest {
    /// Input table (CSV or spreadsheet).
    pub input: PathBuf,
    /// Output JSON path. Defaults to `input` with a `.json` extension.
    pub output: Option<PathBuf>,
    /// Schema (`.dt`) file declaring field types and the root key.
    pub schema: Option<PathBuf>,
    /// Mapping file. Without one, the mapping is generated (see [`ConversionRequest::auto_map`]).
    pub mapping: Option<PathBuf>,
    /// Generate the mapping from the schema's field paths instead of mapping columns to themselves.
    pub auto_map: bool,
    pub read: ReadOptions,
    pub build: BuildOptions,
}

impl ConversionRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    /// Where the output will be written.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }

    /// Execute the request by calling [`convert_file`].
    pub fn run(&self, options: &ConversionOptions) -> ConvertResult<ConversionReport> {
        convert_file(self, options)
    }
}

/// Reporting options for [`convert_file`].
#[derive(Clone)]
pub struct ConversionOptions {
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn ConversionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: ConversionSeverity,
}

impl fmt::Debug for ConversionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionOptions")
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            observer: None,
            alert_at_or_above: ConversionSeverity::Critical,
        }
    }
}

/// What a successful conversion produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub output: PathBuf,
    /// Documents written, one per input row.
    pub rows: usize,
    pub warnings: Vec<Warning>,
}

/// `input` with its extension replaced by `.json`.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("json")
}

/// Convert one table file into a JSON file.
///
/// Mapping resolution: the mapping file if given, else an auto-generated mapping when
/// `request.auto_map` is set (a schema is required then), else every column mapped to itself.
///
/// When an observer is configured, this function reports:
///
/// - `on_warning` once per warning, then `on_success` with row/warning counts
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use csv2json::observability::TracingObserver;
/// use csv2json::pipeline::{convert_file, ConversionOptions, ConversionRequest};
///
/// # fn main() -> Result<(), csv2json::ConvertError> {
/// let mut request = ConversionRequest::new("products.csv");
/// request.schema = Some("products.dt".into());
/// request.mapping = Some("products_mapping.json".into());
/// request.build.remove_nulls = true;
///
/// let options = ConversionOptions {
///     observer: Some(Arc::new(TracingObserver)),
///     ..Default::default()
/// };
/// let report = convert_file(&request, &options)?;
/// println!("wrote {} rows to {}", report.rows, report.output.display());
/// # Ok(())
/// # }
/// ```
pub fn convert_file(request: &ConversionRequest, options: &ConversionOptions) -> ConvertResult<ConversionReport> {
    let ctx = ConversionContext {
        input: request.input.clone(),
        format: resolve_format(&request.input, &request.read).ok(),
    };

    let result = run_conversion(request);

    if let Some(obs) = options.observer.as_ref() {
        match &result {
            Ok(report) => {
                for warning in &report.warnings {
                    obs.on_warning(&ctx, warning);
                }
                obs.on_success(
                    &ctx,
                    ConversionStats {
                        rows: report.rows,
                        warnings: report.warnings.len(),
                    },
                );
            }
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(&ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(&ctx, sev, e);
                }
            }
        }
    }

    result
}

fn run_conversion(request: &ConversionRequest) -> ConvertResult<ConversionReport> {
    let table = read_table_from_path(&request.input, &request.read)?;
    let schema = request.schema.as_deref().map(load_schema).transpose()?;
    let mapping = resolve_mapping(request, &table, schema.as_ref())?;

    let builder = DocumentBuilder::new(&mapping, schema.as_ref(), request.build.clone())?;
    let output = builder.build(&table)?;

    let path = request.output_path();
    output.payload.write_json_to_path(&path)?;

    Ok(ConversionReport {
        output: path,
        rows: output.payload.documents().len(),
        warnings: output.warnings,
    })
}

fn resolve_mapping(request: &ConversionRequest, table: &Table, schema: Option<&Schema>) -> ConvertResult<Mapping> {
    if let Some(path) = request.mapping.as_deref() {
        return load_mapping(path);
    }
    if request.auto_map {
        let schema = schema.ok_or_else(|| ConvertError::InvalidInput {
            message: "auto-mapping needs a schema to take target paths from".to_string(),
        })?;
        let targets: Vec<&str> = schema.field_paths().collect();
        return Ok(auto_map(&targets, &table.columns));
    }
    Ok(identity_mapping(&table.columns))
}

fn severity_for_error(e: &ConvertError) -> ConversionSeverity {
    match e {
        ConvertError::Io(_) => ConversionSeverity::Critical,
        ConvertError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => ConversionSeverity::Critical,
            _ => ConversionSeverity::Error,
        },
        _ => ConversionSeverity::Error,
    }
}
