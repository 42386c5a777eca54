use tracing::debug;

use crate::error::MergeError;
use crate::join::{JoinMode, join_tables};
use crate::table::Table;

/// Append `_<label>` to every column except the identifier.
pub fn suffix_columns(table: Table, key: &str, label: &str) -> Result<Table, MergeError> {
    if !table.has_column(key) {
        return Err(MergeError::MergeFailure(format!(
            "identifier column '{}' not found before suffixing for wave '{}'",
            key, label
        )));
    }
    let renamed = table.rename_columns(|name| {
        if name == key {
            name.to_string()
        } else {
            format!("{}_{}", name, label)
        }
    })?;
    Ok(renamed)
}

/// Merge tables side by side, one row per surviving identifier value.
///
/// The result is a left-to-right reduction `((t1 ⋈ t2) ⋈ t3) ⋈ …` using
/// `mode`. For `Left` and `Right` the outcome depends on the order of
/// `tables`: `Left` keeps every identifier of the first table, `Right` keeps
/// every identifier of the last one. `labels[i]` suffixes the columns of
/// `tables[i]`.
pub fn merge_wide(
    tables: Vec<Table>,
    key: &str,
    labels: &[String],
    mode: JoinMode,
) -> Result<Table, MergeError> {
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

    let mut renamed = tables
        .into_iter()
        .zip(labels)
        .map(|(table, label)| suffix_columns(table, key, label))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter();

    let Some(first) = renamed.next() else {
        return Err(MergeError::NoTables);
    };
    renamed
        .enumerate()
        .try_fold(first, |acc, (idx, next)| -> Result<Table, MergeError> {
            let joined = join_tables(acc, next, key, mode)?;
            debug!(step = idx + 1, rows = joined.row_count(), %mode, "joined wave");
            Ok(joined)
        })
}
