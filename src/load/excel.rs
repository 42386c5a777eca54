use std::io::Cursor;

use calamine::{Data, ExcelDateTime, Reader, open_workbook_auto_from_rs};
use chrono::NaiveTime;

use super::{LoadOptions, normalize_headers};
use crate::error::LoadError;
use crate::table::{Table, Value};

/// Parse the first worksheet of a workbook; its first row is the header.
pub fn parse_workbook(bytes: &[u8], name: &str, options: &LoadOptions) -> Result<Table, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| LoadError::parse(name, format!("failed to open workbook: {}", e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::parse(name, "workbook has no worksheets"))?
        .map_err(|e| LoadError::parse(name, format!("failed loading first sheet: {}", e)))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Err(LoadError::parse(name, "missing header row"));
    };
    let headers = normalize_headers(name, header_row.iter().map(header_text).collect())?;

    let body = rows
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| row.iter().map(|cell| cell_value(cell, options)).collect())
        .collect::<Vec<Vec<Value>>>();

    Table::from_rows(headers, body).map_err(|e| LoadError::parse(name, e))
}

/// Header cells are names, never values: text is kept as written.
fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(text) => text.clone(),
        Data::DateTime(dt) => render_datetime(dt),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// The workbook already typed each cell; string cells stay text.
fn cell_value(cell: &Data, options: &LoadOptions) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(int) => Value::Int(*int),
        Data::Float(float) => {
            if float.fract() == 0.0 && float.abs() < 9.0e15 {
                Value::Int(*float as i64)
            } else {
                Value::Float(*float)
            }
        }
        Data::Bool(flag) => Value::Bool(*flag),
        Data::String(text) if text.trim().is_empty() || options.is_na(text) => Value::Null,
        Data::String(text) => Value::Text(text.clone()),
        Data::DateTime(dt) => Value::Text(render_datetime(dt)),
        Data::DateTimeIso(text) | Data::DurationIso(text) => Value::Text(text.clone()),
        Data::Error(_) => Value::Null,
    }
}

fn render_datetime(dt: &ExcelDateTime) -> String {
    if dt.is_duration() {
        return dt.as_f64().to_string();
    }
    match dt.as_datetime() {
        Some(datetime) if datetime.time() == NaiveTime::MIN => datetime.date().to_string(),
        Some(datetime) => datetime.to_string(),
        None => dt.as_f64().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::drop_duplicate_ids;
    use rust_xlsxwriter::{Format, Workbook};

    #[test]
    fn integral_floats_read_as_ints() {
        let opts = LoadOptions::default();
        assert_eq!(cell_value(&Data::Float(3.0), &opts), Value::Int(3));
        assert_eq!(cell_value(&Data::Float(3.5), &opts), Value::Float(3.5));
    }

    #[test]
    fn string_cells_stay_text_unless_na() {
        let opts = LoadOptions {
            na_values: vec!["NA".to_string()],
            ..LoadOptions::default()
        };
        assert_eq!(cell_value(&Data::String("NA".into()), &opts), Value::Null);
        assert_eq!(
            cell_value(&Data::String("x".into()), &opts),
            Value::Text("x".into())
        );
        assert_eq!(
            cell_value(&Data::String("007".into()), &opts),
            Value::Text("007".into())
        );
        assert_eq!(
            cell_value(&Data::String("TRUE".into()), &opts),
            Value::Text("TRUE".into())
        );
        assert_eq!(cell_value(&Data::String("  ".into()), &opts), Value::Null);
        assert_eq!(cell_value(&Data::Empty, &opts), Value::Null);
    }

    fn survey_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let date = Format::new().set_num_format("yyyy-mm-dd");
        let visit = rust_xlsxwriter::ExcelDateTime::from_ymd(2024, 3, 1).unwrap();

        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, " pid ").unwrap();
        sheet.write_string(0, 1, "TRUE").unwrap();
        sheet.write_string(0, 2, "2020.10").unwrap();
        sheet.write_string(0, 3, "visit").unwrap();
        sheet.write_string(1, 0, "007").unwrap();
        sheet.write_number(1, 1, 3.0).unwrap();
        sheet.write_boolean(1, 2, true).unwrap();
        sheet.write_datetime_with_format(1, 3, &visit, &date).unwrap();
        sheet.write_string(3, 0, "7").unwrap();
        sheet.write_number(3, 1, 2.5).unwrap();
        sheet.write_string(3, 2, "NA").unwrap();
        sheet.write_string(3, 3, "later").unwrap();

        let other = workbook.add_worksheet();
        other.write_string(0, 0, "unused").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn reads_first_sheet_with_typed_cells() {
        let opts = LoadOptions {
            na_values: vec!["NA".to_string()],
            ..LoadOptions::default()
        };
        let table = parse_workbook(&survey_workbook(), "w1.xlsx", &opts).unwrap();
        assert_eq!(table.headers(), vec!["pid", "TRUE", "2020.10", "visit"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.column("pid").unwrap(),
            &[Value::Text("007".into()), Value::Text("7".into())]
        );
        assert_eq!(
            table.column("TRUE").unwrap(),
            &[Value::Int(3), Value::Float(2.5)]
        );
        assert_eq!(
            table.column("2020.10").unwrap(),
            &[Value::Bool(true), Value::Null]
        );
        assert_eq!(
            table.column("visit").unwrap(),
            &[Value::Text("2024-03-01".into()), Value::Text("later".into())]
        );
    }

    #[test]
    fn distinct_text_identifiers_survive_dedup() {
        let table = parse_workbook(&survey_workbook(), "w1.xlsx", &LoadOptions::default()).unwrap();
        let (deduped, dropped) = drop_duplicate_ids(table, "pid").unwrap();
        assert_eq!(dropped, 0);
        assert_eq!(deduped.row_count(), 2);
    }

    #[test]
    fn header_matching_an_na_token_is_kept() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "id").unwrap();
        sheet.write_string(0, 1, "NA").unwrap();
        sheet.write_number(1, 0, 1.0).unwrap();
        sheet.write_number(1, 1, 2.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();
        let opts = LoadOptions {
            na_values: vec!["NA".to_string()],
            ..LoadOptions::default()
        };
        let table = parse_workbook(&bytes, "w1.xlsx", &opts).unwrap();
        assert_eq!(table.headers(), vec!["id", "NA"]);
    }

    #[test]
    fn empty_sheet_is_missing_its_header() {
        let mut workbook = Workbook::new();
        workbook.add_worksheet();
        let bytes = workbook.save_to_buffer().unwrap();
        match parse_workbook(&bytes, "w1.xlsx", &LoadOptions::default()).unwrap_err() {
            LoadError::ParseError { reason, .. } => assert_eq!(reason, "missing header row"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
