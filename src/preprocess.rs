//! Optional hooks applied to every input table before validation and merging.

use anyhow::{Result, bail};
use tracing::debug;

use crate::table::{Table, Value};

/// Keep only rows where both flag columns are truthy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlagFilter {
    pub first: String,
    pub second: String,
}

impl FlagFilter {
    /// Parse `A,B` into a filter on columns `A` and `B`.
    pub fn parse(spec: &str) -> Result<Self> {
        let parts = spec
            .split(',')
            .map(|part| part.trim())
            .collect::<Vec<_>>();
        if parts.len() != 2 || parts.iter().any(|part| part.is_empty()) {
            bail!("flag filter expects exactly two column names, e.g. 'consent,complete'");
        }
        if parts[0] == parts[1] {
            bail!("flag filter columns must differ");
        }
        Ok(FlagFilter {
            first: parts[0].to_string(),
            second: parts[1].to_string(),
        })
    }

    /// Tables lacking either flag column pass through unchanged.
    pub fn apply(&self, table: Table) -> Table {
        let (Some(first), Some(second)) = (table.column(&self.first), table.column(&self.second))
        else {
            return table;
        };
        let keep = first
            .iter()
            .zip(second)
            .enumerate()
            .filter_map(|(idx, (a, b))| (a.is_truthy() && b.is_truthy()).then_some(idx))
            .collect::<Vec<_>>();
        if keep.len() == table.row_count() {
            return table;
        }
        debug!(
            kept = keep.len(),
            removed = table.row_count() - keep.len(),
            "flag filter applied"
        );
        table.select_rows(&keep)
    }
}

/// Replace every null cell with `fill`.
pub fn fill_nulls(table: Table, fill: &Value) -> Table {
    table.map_values(|value| if value.is_null() { fill.clone() } else { value })
}
