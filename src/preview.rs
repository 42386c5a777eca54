use std::io::Write;

use anyhow::Result;

use crate::table::{Table, Value};

/// Render the first `limit` rows of `table` as an aligned, boxed grid.
pub fn render_preview<W: Write>(writer: &mut W, table: &Table, limit: usize) -> Result<()> {
    let header = table.headers();
    if header.is_empty() {
        return Ok(());
    }
    let shown = limit.min(table.row_count());
    let rows = (0..shown)
        .map(|row| {
            table
                .row(row)
                .into_iter()
                .map(display_cell)
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let widths = compute_widths(&header, &rows);
    print_separator(writer, &widths)?;
    print_row(writer, &header, &widths)?;
    print_separator(writer, &widths)?;
    for row in &rows {
        print_row(writer, row, &widths)?;
    }
    print_separator(writer, &widths)?;
    if shown < table.row_count() {
        writeln!(writer, "... {} more row(s)", table.row_count() - shown)?;
    }
    Ok(())
}

fn display_cell(value: &Value) -> String {
    match value {
        Value::Null => "NA".to_string(),
        other => other.to_string(),
    }
}

fn compute_widths(header: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths = header
        .iter()
        .map(|name| name.chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (idx, value) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(value.chars().count());
        }
    }
    widths
}

fn print_separator<W: Write>(writer: &mut W, widths: &[usize]) -> Result<()> {
    write!(writer, "+")?;
    for width in widths {
        let segment = "-".repeat(width + 2);
        write!(writer, "{}+", segment)?;
    }
    writeln!(writer)?;
    Ok(())
}

fn print_row<W: Write>(writer: &mut W, row: &[String], widths: &[usize]) -> Result<()> {
    write!(writer, "|")?;
    for (idx, width) in widths.iter().enumerate() {
        let value = row.get(idx).map(|s| s.as_str()).unwrap_or("");
        write!(writer, " {:<width$} |", value, width = width)?;
    }
    writeln!(writer)?;
    Ok(())
}
