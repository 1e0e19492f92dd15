use csv2json::ConvertError;
use csv2json::ingestion::csv::{read_csv_from_path, read_csv_from_reader, read_csv_from_str};
use csv2json::ingestion::{ReadOptions, TableFormat, read_table_from_path};
use csv2json::types::Value;

#[test]
fn read_csv_from_path_happy_path() {
    let table = read_csv_from_path("tests/fixtures/people.csv", &ReadOptions::default()).unwrap();

    assert_eq!(table.columns, vec!["ID", "Name", "Score", "Active", "Founded"]);
    assert_eq!(table.row_count(), 2);
    assert_eq!(
        table.rows[0],
        vec![
            Value::Int64(1),
            Value::Utf8("Ada".to_string()),
            Value::Float64(98.5),
            Value::Bool(true),
            Value::Utf8("31.12.1999".to_string()),
        ]
    );
}

#[test]
fn read_table_infers_csv_from_extension_and_skips_banner() {
    let opts = ReadOptions {
        skip_rows: 2,
        ..Default::default()
    };
    let table = read_table_from_path("tests/fixtures/products_banner.csv", &opts).unwrap();

    assert_eq!(table.columns, vec!["Artikelnummer", "Bezeichnung", "Firma", "Stadt"]);
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.rows[1][2], Value::Null);
    assert_eq!(table.rows[1][3], Value::Utf8("Hamburg".to_string()));
}

#[test]
fn read_csv_from_reader_uses_configured_delimiter() {
    let input = "name|id\nAda|1\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'|')
        .from_reader(input.as_bytes());

    let table = read_csv_from_reader(&mut rdr, &ReadOptions::default()).unwrap();
    assert_eq!(table.columns, vec!["name", "id"]);
    assert_eq!(table.rows[0], vec![Value::Utf8("Ada".to_string()), Value::Int64(1)]);
}

#[test]
fn infer_types_off_keeps_text() {
    let opts = ReadOptions {
        infer_types: false,
        ..Default::default()
    };
    let table = read_csv_from_str("id,flag\n1,true\n", &opts).unwrap();
    assert_eq!(
        table.rows[0],
        vec![Value::Utf8("1".to_string()), Value::Utf8("true".to_string())]
    );
}

#[test]
fn quoted_fields_keep_delimiters() {
    let table = read_csv_from_str("id;note\n1;\"a;b\"\n", &ReadOptions::default()).unwrap();
    assert_eq!(table.rows[0][1], Value::Utf8("a;b".to_string()));
}

#[test]
fn duplicate_headers_are_rejected() {
    let err = read_csv_from_str("id,name,id\n1,a,2\n", &ReadOptions::default()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("invalid input"), "{msg}");
    assert!(msg.contains("duplicate column 'id'"), "{msg}");
}

#[test]
fn empty_input_has_no_header() {
    let err = read_csv_from_str("", &ReadOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::InvalidInput { .. }));
}

#[test]
fn missing_file_is_io_error() {
    let err = read_table_from_path("tests/fixtures/does_not_exist.csv", &ReadOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::Io(_)));
}

#[test]
fn unknown_extension_needs_explicit_format() {
    let err = read_table_from_path("tests/fixtures/legacy.dt", &ReadOptions::default()).unwrap_err();
    assert!(err.to_string().contains("cannot infer format"), "{err}");

    let opts = ReadOptions {
        format: Some(TableFormat::Csv),
        delimiter: Some(b';'),
        ..Default::default()
    };
    let table = read_table_from_path("tests/fixtures/people.csv", &opts).unwrap();
    assert_eq!(table.row_count(), 2);
}
