//! csv2json: convert a CSV or Excel table into a nested JSON file.
//!
//! Usage:
//!   # products.csv -> products.json, wrapped under "products", schema from products.dt if present
//!   csv2json products products.csv
//!
//!   # Explicit schema and mapping, drop nulls
//!   csv2json products export.xlsx -d products.dt -m mapping.json -n
//!
//!   # Generate the mapping from the schema's field paths
//!   csv2json products export.csv --auto-map -v

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use csv2json::ingestion::ExcelSheetSelection;
use csv2json::loader::default_schema_path;
use csv2json::observability::{CompositeObserver, ConversionObserver, FileObserver, TracingObserver};
use csv2json::pipeline::{ConversionOptions, ConversionRequest, convert_file};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "csv2json")]
#[command(about = "Convert CSV/Excel to nested JSON", long_about = None)]
struct Args {
    /// Root key the output array is wrapped under (also names the default `<ROOT>.dt` schema)
    #[arg(value_name = "ROOT")]
    root: String,

    /// Input CSV or Excel file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output JSON file (default: INPUT with a .json extension)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Schema file with declared field types (default: ROOT.dt if it exists)
    #[arg(long, short = 'd')]
    datatypes: Option<PathBuf>,

    /// Mapping file (JSON or YAML)
    #[arg(long, short = 'm')]
    mapping: Option<PathBuf>,

    /// Rows to skip before the header row
    #[arg(long, short = 's', default_value_t = 0)]
    skip_rows: usize,

    /// Remove null values from the output
    #[arg(long, short = 'n')]
    remove_nulls: bool,

    /// Verbose progress output (debug-level logging)
    #[arg(long, short = 'v')]
    debug: bool,

    /// Generate the mapping from the schema's field paths and the table header
    #[arg(long, conflicts_with = "mapping")]
    auto_map: bool,

    /// Fail on the first value that cannot be coerced to its declared type
    #[arg(long)]
    strict: bool,

    /// Excel sheet to read (default: first sheet)
    #[arg(long)]
    sheet: Option<String>,

    /// CSV delimiter (default: sniffed from the header line)
    #[arg(long)]
    delimiter: Option<char>,

    /// Also append conversion events to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<()> {
    let mut request = ConversionRequest::new(&args.input);
    request.output = args.output;
    request.mapping = args.mapping;
    request.auto_map = args.auto_map;

    request.schema = match args.datatypes {
        Some(path) => Some(path),
        None => {
            let default = default_schema_path(&args.root);
            default.exists().then(|| {
                tracing::debug!(schema = %default.display(), "using default schema");
                default
            })
        }
    };

    request.read.skip_rows = args.skip_rows;
    if let Some(sheet) = args.sheet {
        request.read.excel_sheet_selection = ExcelSheetSelection::Sheet(sheet);
    }
    if let Some(delimiter) = args.delimiter {
        if !delimiter.is_ascii() {
            bail!("delimiter must be a single ASCII character, got '{delimiter}'");
        }
        request.read.delimiter = Some(delimiter as u8);
    }

    request.build.root_key = Some(args.root.clone());
    request.build.remove_nulls = args.remove_nulls;
    request.build.strict = args.strict;

    let mut observers: Vec<Arc<dyn ConversionObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(log_file) = args.log_file {
        observers.push(Arc::new(FileObserver::new(log_file)));
    }
    let options = ConversionOptions {
        observer: Some(Arc::new(CompositeObserver::new(observers))),
        ..Default::default()
    };

    tracing::debug!(
        input = %request.input.display(),
        output = %request.output_path().display(),
        root = %args.root,
        remove_nulls = args.remove_nulls,
        "converting"
    );

    let report = convert_file(&request, &options)
        .with_context(|| format!("failed to convert {}", args.input.display()))?;

    tracing::debug!(output = %report.output.display(), rows = report.rows, "done");
    Ok(())
}
