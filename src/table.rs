use std::fmt;

use indexmap::IndexMap;

use crate::error::TableError;

/// A single typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    /// Infer a typed value from raw cell text: blank is null, then bool, int, float, text.
    pub fn infer(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        if let Ok(int) = trimmed.parse::<i64>() {
            return Value::Int(int);
        }
        match trimmed.parse::<f64>() {
            Ok(float) if float.is_finite() => Value::Float(float),
            _ => Value::Text(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Flag-like truthiness: `true`, non-zero numbers, or `true`/`yes`/`1` text.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(flag) => *flag,
            Value::Int(int) => *int != 0,
            Value::Float(float) => *float != 0.0,
            Value::Text(text) => {
                let trimmed = text.trim();
                trimmed.eq_ignore_ascii_case("true")
                    || trimmed.eq_ignore_ascii_case("yes")
                    || trimmed == "1"
            }
        }
    }

    /// Hashable join/dedup key. Integral floats collapse onto the matching integer.
    pub fn key(&self) -> Key {
        match self {
            Value::Null => Key::Null,
            Value::Bool(flag) => Key::Bool(*flag),
            Value::Int(int) => Key::Int(*int),
            Value::Float(float) => {
                if float.fract() == 0.0 && *float >= i64::MIN as f64 && *float < i64::MAX as f64 {
                    Key::Int(*float as i64)
                } else {
                    Key::Float(float.to_bits())
                }
            }
            Value::Text(text) => Key::Text(text.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(int) => write!(f, "{}", int),
            Value::Float(float) => write!(f, "{}", float),
            Value::Bool(flag) => write!(f, "{}", flag),
            Value::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
}

/// Inferred kind of a column, judged over its non-null cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Empty,
    Numeric,
    Text,
    Boolean,
    Mixed,
}

impl ColumnKind {
    pub fn of(values: &[Value]) -> ColumnKind {
        let mut kind = ColumnKind::Empty;
        for value in values {
            kind.observe(value);
            if kind == ColumnKind::Mixed {
                break;
            }
        }
        kind
    }

    fn observe(&mut self, value: &Value) {
        use ColumnKind::*;
        let cell = match value {
            Value::Null => return,
            Value::Int(_) | Value::Float(_) => Numeric,
            Value::Text(_) => Text,
            Value::Bool(_) => Boolean,
        };
        match *self {
            Empty => *self = cell,
            Mixed => {}
            current if current == cell => {}
            _ => *self = Mixed,
        }
    }

    /// Two kinds can share an identifier column; an all-null column fits anything.
    pub fn compatible_with(self, other: ColumnKind) -> bool {
        self == ColumnKind::Empty || other == ColumnKind::Empty || self == other
    }

    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::Empty => "empty",
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Mixed => "mixed",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Column-major table with ordered, uniquely named columns of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: IndexMap<String, Vec<Value>>,
    row_count: usize,
}

impl Table {
    pub fn new() -> Self {
        Table::default()
    }

    /// Build a table from a header and row-major cells.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        let width = headers.len();
        let mut columns: IndexMap<String, Vec<Value>> = IndexMap::with_capacity(width);
        for (idx, name) in headers.into_iter().enumerate() {
            if name.is_empty() {
                return Err(TableError::EmptyColumnName(idx + 1));
            }
            if columns.contains_key(&name) {
                return Err(TableError::DuplicateColumn(name));
            }
            columns.insert(name, Vec::with_capacity(rows.len()));
        }

        let row_count = rows.len();
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(TableError::RaggedRow {
                    row: row_idx + 1,
                    expected: width,
                    found: row.len(),
                });
            }
            for (values, cell) in columns.values_mut().zip(row) {
                values.push(cell);
            }
        }

        Ok(Table { columns, row_count })
    }

    /// An empty table with a fixed row count, ready for [`Table::push_column`].
    pub fn with_rows(row_count: usize) -> Self {
        Table {
            columns: IndexMap::new(),
            row_count,
        }
    }

    pub fn push_column(&mut self, name: String, values: Vec<Value>) -> Result<(), TableError> {
        if self.columns.is_empty() && self.row_count == 0 {
            self.row_count = values.len();
        }
        if values.len() != self.row_count {
            return Err(TableError::LengthMismatch {
                name,
                expected: self.row_count,
                found: values.len(),
            });
        }
        if self.columns.contains_key(&name) {
            return Err(TableError::DuplicateColumn(name));
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(|values| values.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|name| name.as_str())
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.columns
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        self.columns.get(column).and_then(|values| values.get(row))
    }

    /// Cells of one row in column order.
    pub fn row(&self, row: usize) -> Vec<&Value> {
        self.columns
            .values()
            .filter_map(|values| values.get(row))
            .collect()
    }

    /// Keep the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                let picked = rows.iter().map(|&idx| values[idx].clone()).collect();
                (name.clone(), picked)
            })
            .collect();
        Table {
            columns,
            row_count: rows.len(),
        }
    }

    /// Rename columns through `rename`; fails if two names end up equal.
    pub fn rename_columns<F>(self, mut rename: F) -> Result<Table, TableError>
    where
        F: FnMut(&str) -> String,
    {
        let mut columns = IndexMap::with_capacity(self.columns.len());
        for (name, values) in self.columns {
            let renamed = rename(&name);
            if columns.contains_key(&renamed) {
                return Err(TableError::DuplicateColumn(renamed));
            }
            columns.insert(renamed, values);
        }
        Ok(Table {
            columns,
            row_count: self.row_count,
        })
    }

    /// Apply `f` to every cell.
    pub fn map_values<F>(mut self, mut f: F) -> Table
    where
        F: FnMut(Value) -> Value,
    {
        for values in self.columns.values_mut() {
            for cell in values.iter_mut() {
                let current = std::mem::replace(cell, Value::Null);
                *cell = f(current);
            }
        }
        self
    }
}

/// Pick values by position; `None` yields a null cell.
pub fn take_values(values: &[Value], positions: &[Option<usize>]) -> Vec<Value> {
    positions
        .iter()
        .map(|pos| match pos {
            Some(idx) => values[*idx].clone(),
            None => Value::Null,
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn table(headers: &[&str], rows: Vec<Vec<Value>>) -> Table {
    Table::from_rows(headers.iter().map(|h| h.to_string()).collect(), rows).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_cell_types() {
        assert_eq!(Value::infer(""), Value::Null);
        assert_eq!(Value::infer("  "), Value::Null);
        assert_eq!(Value::infer("42"), Value::Int(42));
        assert_eq!(Value::infer("-1.5"), Value::Float(-1.5));
        assert_eq!(Value::infer("TRUE"), Value::Bool(true));
        assert_eq!(Value::infer("abc"), Value::Text("abc".to_string()));
        assert_eq!(Value::infer("NaN"), Value::Text("NaN".to_string()));
    }

    #[test]
    fn integral_floats_share_keys_with_ints() {
        assert_eq!(Value::Float(3.0).key(), Value::Int(3).key());
        assert_ne!(Value::Float(3.5).key(), Value::Int(3).key());
        assert_ne!(Value::Text("3".into()).key(), Value::Int(3).key());
    }

    #[test]
    fn column_kind_tracks_mixture() {
        let numeric = vec![Value::Int(1), Value::Null, Value::Float(2.5)];
        assert_eq!(ColumnKind::of(&numeric), ColumnKind::Numeric);
        let mixed = vec![Value::Int(1), Value::Text("a".into())];
        assert_eq!(ColumnKind::of(&mixed), ColumnKind::Mixed);
        assert_eq!(ColumnKind::of(&[Value::Null]), ColumnKind::Empty);
        assert!(ColumnKind::Empty.compatible_with(ColumnKind::Text));
        assert!(!ColumnKind::Numeric.compatible_with(ColumnKind::Text));
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        let err = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![Value::Int(1)]],
        )
        .unwrap_err();
        assert_eq!(
            err,
            TableError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn from_rows_rejects_duplicate_headers() {
        let err = Table::from_rows(vec!["a".into(), "a".into()], Vec::new()).unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("a".into()));
    }

    #[test]
    fn select_rows_preserves_requested_order() {
        let t = table(
            &["id", "x"],
            vec![
                vec![Value::Int(1), Value::Int(10)],
                vec![Value::Int(2), Value::Int(20)],
                vec![Value::Int(3), Value::Int(30)],
            ],
        );
        let picked = t.select_rows(&[2, 0]);
        assert_eq!(picked.row_count(), 2);
        assert_eq!(picked.column("x").unwrap(), &[Value::Int(30), Value::Int(10)]);
    }

    #[test]
    fn push_column_checks_length() {
        let mut t = Table::with_rows(2);
        t.push_column("a".into(), vec![Value::Null, Value::Null])
            .unwrap();
        let err = t.push_column("b".into(), vec![Value::Null]).unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { .. }));
    }

    #[test]
    fn displays_float_without_trailing_fraction() {
        assert_eq!(Value::Float(2.0).to_string(), "2");
        assert_eq!(Value::Float(2.25).to_string(), "2.25");
        assert_eq!(Value::Null.to_string(), "");
    }
}
