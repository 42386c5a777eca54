use std::collections::{HashMap, hash_map::Entry};
use std::fmt;

use clap::ValueEnum;

use crate::error::MergeError;
use crate::table::{Key, Table, Value, take_values};

/// Which identifier values survive a two-table join.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum JoinMode {
    /// Identifiers present on both sides
    #[default]
    Inner,
    /// Every row of the accumulated (left) side
    Left,
    /// Every row of the incoming (right) side
    Right,
    /// Union of both sides, missing cells null
    Outer,
}

impl JoinMode {
    pub fn label(self) -> &'static str {
        match self {
            JoinMode::Inner => "inner",
            JoinMode::Left => "left",
            JoinMode::Right => "right",
            JoinMode::Outer => "outer",
        }
    }
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Row positions of each identifier value.
struct KeyIndex {
    key_to_rows: HashMap<Key, Vec<usize>>,
}

impl KeyIndex {
    fn build(ids: &[Value]) -> Self {
        let mut key_to_rows: HashMap<Key, Vec<usize>> = HashMap::with_capacity(ids.len());
        for (idx, value) in ids.iter().enumerate() {
            match key_to_rows.entry(value.key()) {
                Entry::Vacant(v) => {
                    v.insert(vec![idx]);
                }
                Entry::Occupied(mut o) => {
                    o.get_mut().push(idx);
                }
            }
        }
        KeyIndex { key_to_rows }
    }

    fn rows(&self, value: &Value) -> Option<&[usize]> {
        self.key_to_rows.get(&value.key()).map(|rows| rows.as_slice())
    }
}

/// Join two tables on `key`.
///
/// Row order: inner and left follow the left table (a left row matching
/// several right rows repeats in right order); right follows the right table;
/// outer emits the left table's rows first, then unmatched right rows.
/// The identifier column keeps its position in `left`; its value comes from
/// whichever side holds the row. Every non-identifier column of `right` is
/// appended after the columns of `left` and must not already exist there.
pub fn join_tables(
    left: Table,
    right: Table,
    key: &str,
    mode: JoinMode,
) -> Result<Table, MergeError> {
    let left_ids = left.column(key).ok_or_else(|| missing_key(key, "left"))?;
    let right_ids = right.column(key).ok_or_else(|| missing_key(key, "right"))?;

    for name in right.column_names() {
        if name != key && left.has_column(name) {
            return Err(MergeError::MergeFailure(format!(
                "column '{}' exists on both sides of the join",
                name
            )));
        }
    }

    let (left_positions, right_positions) = match mode {
        JoinMode::Right => {
            let index = KeyIndex::build(left_ids);
            let mut left_positions = Vec::new();
            let mut right_positions = Vec::new();
            for (right_pos, value) in right_ids.iter().enumerate() {
                match index.rows(value) {
                    Some(matches) => {
                        for &left_pos in matches {
                            left_positions.push(Some(left_pos));
                            right_positions.push(Some(right_pos));
                        }
                    }
                    None => {
                        left_positions.push(None);
                        right_positions.push(Some(right_pos));
                    }
                }
            }
            (left_positions, right_positions)
        }
        JoinMode::Inner | JoinMode::Left | JoinMode::Outer => {
            let index = KeyIndex::build(right_ids);
            let mut matched = vec![false; right_ids.len()];
            let mut left_positions = Vec::new();
            let mut right_positions = Vec::new();
            for (left_pos, value) in left_ids.iter().enumerate() {
                match index.rows(value) {
                    Some(matches) => {
                        for &right_pos in matches {
                            matched[right_pos] = true;
                            left_positions.push(Some(left_pos));
                            right_positions.push(Some(right_pos));
                        }
                    }
                    None if mode != JoinMode::Inner => {
                        left_positions.push(Some(left_pos));
                        right_positions.push(None);
                    }
                    None => {}
                }
            }
            if mode == JoinMode::Outer {
                for (right_pos, was_matched) in matched.into_iter().enumerate() {
                    if !was_matched {
                        left_positions.push(None);
                        right_positions.push(Some(right_pos));
                    }
                }
            }
            (left_positions, right_positions)
        }
    };

    let mut joined = Table::with_rows(left_positions.len());
    for (name, values) in left.columns() {
        let column = if name == key {
            left_positions
                .iter()
                .zip(&right_positions)
                .map(|(left_pos, right_pos)| match (left_pos, right_pos) {
                    (Some(idx), _) => values[*idx].clone(),
                    (None, Some(idx)) => right_ids[*idx].clone(),
                    (None, None) => Value::Null,
                })
                .collect()
        } else {
            take_values(values, &left_positions)
        };
        joined.push_column(name.to_string(), column)?;
    }
    for (name, values) in right.columns() {
        if name == key {
            continue;
        }
        joined.push_column(name.to_string(), take_values(values, &right_positions))?;
    }

    Ok(joined)
}

fn missing_key(key: &str, side: &str) -> MergeError {
    MergeError::MergeFailure(format!(
        "identifier column '{}' missing from {} side of join",
        key, side
    ))
}
