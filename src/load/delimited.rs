use std::io::Read;

use csv::ReaderBuilder;

use super::{LoadOptions, normalize_headers};
use crate::error::LoadError;
use crate::table::Table;

/// Parse delimited text with a header row.
pub fn parse_delimited<R: Read>(
    reader: R,
    name: &str,
    delimiter: u8,
    options: &LoadOptions,
) -> Result<Table, LoadError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let raw_headers = reader
        .headers()
        .map_err(|e| LoadError::parse(name, format!("failed reading header: {}", e)))?
        .iter()
        .map(|s| s.trim_start_matches('\u{feff}').to_string())
        .collect::<Vec<_>>();
    if raw_headers.is_empty() {
        return Err(LoadError::parse(name, "missing header row"));
    }
    let headers = normalize_headers(name, raw_headers)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| LoadError::parse(name, e))?;
        if headers.len() > 1 && record.len() == 1 && record.get(0).is_some_and(|f| f.trim().is_empty())
        {
            continue;
        }
        if record.len() != headers.len() {
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();
            return Err(LoadError::parse(
                name,
                format!(
                    "line {} has {} fields, header has {}",
                    line,
                    record.len(),
                    headers.len()
                ),
            ));
        }
        rows.push(record.iter().map(|field| options.cell(field)).collect());
    }

    Table::from_rows(headers, rows).map_err(|e| LoadError::parse(name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn parse(text: &str) -> Result<Table, LoadError> {
        parse_delimited(text.as_bytes(), "test.csv", b',', &LoadOptions::default())
    }

    #[test]
    fn trims_headers_and_types_cells() {
        let table = parse(" id , score ,name\n1,2.5,ann\n2,,bob\n").unwrap();
        assert_eq!(table.headers(), vec!["id", "score", "name"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.column("score").unwrap(),
            &[Value::Float(2.5), Value::Null]
        );
        assert_eq!(table.cell(1, "name"), Some(&Value::Text("bob".into())));
    }

    #[test]
    fn strips_byte_order_mark() {
        let table = parse("\u{feff}id,x\n1,2\n").unwrap();
        assert!(table.has_column("id"));
    }

    #[test]
    fn ragged_rows_are_parse_errors() {
        let err = parse("id,x\n1,2\n3\n").unwrap_err();
        match err {
            LoadError::ParseError { reason, .. } => assert!(reason.contains("line 3")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_headers_are_parse_errors() {
        let err = parse("id,x,x\n1,2,3\n").unwrap_err();
        assert!(matches!(err, LoadError::ParseError { .. }));
    }

    #[test]
    fn empty_header_is_rejected() {
        assert!(parse("id,,x\n1,2,3\n").is_err());
    }

    #[test]
    fn quoted_fields_keep_delimiters() {
        let table = parse("id,note\n1,\"a, b\"\n").unwrap();
        assert_eq!(table.cell(0, "note"), Some(&Value::Text("a, b".into())));
    }

    #[test]
    fn empty_input_is_missing_its_header() {
        for text in ["", "\n\n"] {
            match parse(text).unwrap_err() {
                LoadError::ParseError { reason, .. } => assert_eq!(reason, "missing header row"),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn header_only_input_has_no_rows() {
        let table = parse("id,x\n").unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.width(), 2);
    }
}
