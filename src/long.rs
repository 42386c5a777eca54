use std::collections::HashSet;

use indexmap::IndexSet;
use tracing::warn;

use crate::error::{Diagnostic, MergeError};
use crate::table::{Key, Table, Value};

pub const DEFAULT_WAVE_COLUMN: &str = "wave";

/// Output of [`merge_long`].
#[derive(Debug, Clone, PartialEq)]
pub struct LongMerge {
    pub table: Table,
    /// Identifier values present in every input table.
    pub common_ids: usize,
    pub expected_rows: usize,
    pub mismatch: Option<Diagnostic>,
}

/// Stack tables into one row per subject per wave.
///
/// Each table gains `wave_column` holding its label; the stacked table keeps
/// table order then row order, its columns are the union of all source
/// columns in first-seen order (absent cells null), and only identifier
/// values found in every table survive. The row count is checked against
/// `common ids x tables`; a difference is reported, never fatal.
pub fn merge_long(
    tables: Vec<Table>,
    key: &str,
    labels: &[String],
    wave_column: &str,
) -> Result<LongMerge, MergeError> {
    if tables.is_empty() {
        return Err(MergeError::NoTables);
    }
    if labels.len() != tables.len() {
        return Err(MergeError::InvalidWaveLabels(format!(
            "{} label(s) for {} table(s)",
            labels.len(),
            tables.len()
        )));
    }

    let mut columns: IndexSet<String> = IndexSet::new();
    for (idx, table) in tables.iter().enumerate() {
        if !table.has_column(key) {
            return Err(MergeError::MergeFailure(format!(
                "identifier column '{}' missing from table {}",
                key,
                idx + 1
            )));
        }
        if table.has_column(wave_column) {
            return Err(MergeError::MergeFailure(format!(
                "table {} already has a column named '{}'; choose another wave column name",
                idx + 1,
                wave_column
            )));
        }
        columns.extend(table.column_names().map(|name| name.to_string()));
        columns.insert(wave_column.to_string());
    }

    let common = common_ids(&tables, key);

    let total_rows = tables.iter().map(|t| t.row_count()).sum::<usize>();
    let mut stacked = Table::with_rows(total_rows);
    for name in &columns {
        let mut values = Vec::with_capacity(total_rows);
        for (table, label) in tables.iter().zip(labels) {
            if name == wave_column {
                values.extend(
                    std::iter::repeat_n(Value::Text(label.clone()), table.row_count()),
                );
            } else if let Some(column) = table.column(name) {
                values.extend(column.iter().cloned());
            } else {
                values.extend(std::iter::repeat_n(Value::Null, table.row_count()));
            }
        }
        stacked.push_column(name.clone(), values)?;
    }

    let keep = stacked
        .column(key)
        .unwrap_or_default()
        .iter()
        .enumerate()
        .filter_map(|(idx, value)| common.contains(&value.key()).then_some(idx))
        .collect::<Vec<_>>();
    let table = stacked.select_rows(&keep);

    let expected_rows = common.len() * tables.len();
    let mismatch = (table.row_count() != expected_rows).then(|| {
        warn!(
            expected = expected_rows,
            actual = table.row_count(),
            "long merge row count differs from common ids x tables"
        );
        Diagnostic::RowCountMismatch {
            expected: expected_rows,
            actual: table.row_count(),
        }
    });

    Ok(LongMerge {
        table,
        common_ids: common.len(),
        expected_rows,
        mismatch,
    })
}

/// Identifier values present in every table.
pub fn common_ids(tables: &[Table], key: &str) -> HashSet<Key> {
    let mut sets = tables.iter().map(|table| {
        table
            .column(key)
            .unwrap_or_default()
            .iter()
            .map(Value::key)
            .collect::<HashSet<_>>()
    });
    let Some(first) = sets.next() else {
        return HashSet::new();
    };
    sets.fold(first, |acc, set| acc.intersection(&set).cloned().collect())
}
