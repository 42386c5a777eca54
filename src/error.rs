//! Error and warning types shared by the loader, the engines, and the session.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::table::ColumnKind;

/// Structural problems when assembling a [`Table`](crate::table::Table).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("column {0} has an empty name")]
    EmptyColumnName(usize),

    #[error("row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("column '{name}' has {found} values, table has {expected} rows")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// Per-source load failures. A failing source never aborts the rest of a batch.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{name}: unsupported format '{format}'")]
    UnsupportedFormat { name: String, format: String },

    #[error("{name}: {reason}")]
    ParseError { name: String, reason: String },

    #[error("failed to read {name}")]
    Io {
        name: String,
        #[source]
        error: io::Error,
    },
}

impl LoadError {
    pub fn parse(name: &str, reason: impl fmt::Display) -> Self {
        LoadError::ParseError {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn source_name(&self) -> &str {
        match self {
            LoadError::UnsupportedFormat { name, .. }
            | LoadError::ParseError { name, .. }
            | LoadError::Io { name, .. } => name,
        }
    }
}

/// Failures that block a merge. Table indices are 1-based, matching input order.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("no tables loaded")]
    NoTables,

    #[error("identifier column '{key}' is missing from table(s) {}", join_indices(.tables))]
    MissingIdentifier { key: String, tables: Vec<usize> },

    #[error("identifier column '{key}' has inconsistent types across tables: {}", describe_kinds(.kinds))]
    InconsistentIdentifierType {
        key: String,
        kinds: Vec<(usize, ColumnKind)>,
    },

    #[error("wave label '{label}' is assigned to both table {first} and table {second}")]
    DuplicateWaveLabel {
        label: String,
        first: usize,
        second: usize,
    },

    #[error("invalid wave labels: {0}")]
    InvalidWaveLabels(String),

    #[error("merge failed: {0}")]
    MergeFailure(String),
}

impl From<TableError> for MergeError {
    fn from(err: TableError) -> Self {
        MergeError::MergeFailure(err.to_string())
    }
}

fn join_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|idx| idx.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_kinds(kinds: &[(usize, ColumnKind)]) -> String {
    kinds
        .iter()
        .map(|(idx, kind)| format!("table {}={}", idx, kind))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Non-fatal findings surfaced alongside a merge result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Rows sharing an identifier value were collapsed to their first occurrence.
    DuplicateIdentifier { table: usize, dropped: usize },
    /// Long merge produced a row count other than |common ids| x tables.
    RowCountMismatch { expected: usize, actual: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DuplicateIdentifier { table, dropped } => write!(
                f,
                "table {}: dropped {} row(s) with a repeated identifier (first occurrence kept)",
                table, dropped
            ),
            Diagnostic::RowCountMismatch { expected, actual } => write!(
                f,
                "long merge produced {} row(s), expected {}",
                actual, expected
            ),
        }
    }
}
