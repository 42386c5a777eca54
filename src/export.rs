use std::io::Write;

use anyhow::{Context, Result};
use csv::WriterBuilder;

use crate::table::Table;

/// Write `table` as delimited UTF-8 text: a header row, then one line per row.
/// Null cells are written as empty fields.
pub fn write_delimited<W: Write>(table: &Table, writer: W, delimiter: u8) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(writer);

    writer
        .write_record(table.column_names())
        .context("failed writing header row")?;
    let mut record = Vec::with_capacity(table.width());
    for row in 0..table.row_count() {
        record.clear();
        record.extend(table.row(row).into_iter().map(|value| value.to_string()));
        writer
            .write_record(&record)
            .with_context(|| format!("failed writing row {}", row + 1))?;
    }
    writer.flush().context("failed flushing output")?;
    Ok(())
}
