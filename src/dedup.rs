use std::collections::HashSet;

use tracing::warn;

use crate::error::{Diagnostic, MergeError};
use crate::table::{Table, Value};

/// Collapse rows that repeat an identifier value, keeping the first occurrence.
///
/// Returns the de-duplicated table and how many rows were dropped. Null
/// identifiers count as one shared value.
pub fn drop_duplicate_ids(table: Table, key: &str) -> Result<(Table, usize), MergeError> {
    let keep = first_occurrences(identifier(&table, key)?);
    let dropped = table.row_count() - keep.len();
    if dropped == 0 {
        return Ok((table, 0));
    }
    Ok((table.select_rows(&keep), dropped))
}

/// Count repeated identifier values per table without touching the tables.
pub fn count_duplicates<'a, I>(tables: I, key: &str) -> Result<Vec<Diagnostic>, MergeError>
where
    I: IntoIterator<Item = &'a Table>,
{
    let mut diagnostics = Vec::new();
    for (idx, table) in tables.into_iter().enumerate() {
        let dropped = table.row_count() - first_occurrences(identifier(table, key)?).len();
        if dropped > 0 {
            diagnostics.push(Diagnostic::DuplicateIdentifier {
                table: idx + 1,
                dropped,
            });
        }
    }
    Ok(diagnostics)
}

fn identifier<'t>(table: &'t Table, key: &str) -> Result<&'t [Value], MergeError> {
    table.column(key).ok_or_else(|| {
        MergeError::MergeFailure(format!("identifier column '{}' not found", key))
    })
}

fn first_occurrences(ids: &[Value]) -> Vec<usize> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .enumerate()
        .filter_map(|(idx, value)| seen.insert(value.key()).then_some(idx))
        .collect()
}

/// Run [`drop_duplicate_ids`] over every table independently.
pub fn resolve_duplicates(
    tables: Vec<Table>,
    key: &str,
) -> Result<(Vec<Table>, Vec<Diagnostic>), MergeError> {
    let mut resolved = Vec::with_capacity(tables.len());
    let mut diagnostics = Vec::new();
    for (idx, table) in tables.into_iter().enumerate() {
        let (table, dropped) = drop_duplicate_ids(table, key)?;
        if dropped > 0 {
            warn!(table = idx + 1, dropped, "dropped rows with a repeated identifier");
            diagnostics.push(Diagnostic::DuplicateIdentifier {
                table: idx + 1,
                dropped,
            });
        }
        resolved.push(table);
    }
    Ok((resolved, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::table;
    use proptest::prelude::*;

    #[test]
    fn keeps_first_occurrence() {
        let t = table(
            &["id", "x"],
            vec![
                vec![Value::Int(1), Value::Text("a".into())],
                vec![Value::Int(1), Value::Text("b".into())],
                vec![Value::Int(2), Value::Text("c".into())],
            ],
        );
        let (out, dropped) = drop_duplicate_ids(t, "id").unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(out.column("id").unwrap(), &[Value::Int(1), Value::Int(2)]);
        assert_eq!(
            out.column("x").unwrap(),
            &[Value::Text("a".into()), Value::Text("c".into())]
        );
    }

    #[test]
    fn single_column_table_drops_repeats() {
        let t = table(
            &["id"],
            vec![vec![Value::Int(1)], vec![Value::Int(1)], vec![Value::Int(2)]],
        );
        let (out, dropped) = drop_duplicate_ids(t, "id").unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(out.row_count(), 2);
    }

    #[test]
    fn reports_only_tables_with_repeats() {
        let tables = vec![
            table(&["id"], vec![vec![Value::Int(1)], vec![Value::Int(2)]]),
            table(
                &["id"],
                vec![vec![Value::Int(3)], vec![Value::Int(3)], vec![Value::Int(3)]],
            ),
        ];
        let (resolved, diagnostics) = resolve_duplicates(tables, "id").unwrap();
        assert_eq!(resolved[0].row_count(), 2);
        assert_eq!(resolved[1].row_count(), 1);
        assert_eq!(
            diagnostics,
            vec![Diagnostic::DuplicateIdentifier {
                table: 2,
                dropped: 2
            }]
        );
    }

    #[test]
    fn counting_matches_resolution_and_keeps_tables() {
        let tables = vec![
            table(&["id"], vec![vec![Value::Int(1)], vec![Value::Float(1.0)]]),
            table(&["id"], vec![vec![Value::Int(2)]]),
        ];
        let counted = count_duplicates(&tables, "id").unwrap();
        assert_eq!(
            counted,
            vec![Diagnostic::DuplicateIdentifier {
                table: 1,
                dropped: 1
            }]
        );
        assert_eq!(tables[0].row_count(), 2);
        let (_, resolved) = resolve_duplicates(tables, "id").unwrap();
        assert_eq!(counted, resolved);
    }

    #[test]
    fn null_identifiers_collapse_together() {
        let t = table(&["id"], vec![vec![Value::Null], vec![Value::Null]]);
        let (_, dropped) = drop_duplicate_ids(t, "id").unwrap();
        assert_eq!(dropped, 1);
    }

    #[test]
    fn missing_identifier_is_a_merge_failure() {
        let t = table(&["x"], vec![vec![Value::Int(1)]]);
        assert!(matches!(
            drop_duplicate_ids(t, "id"),
            Err(MergeError::MergeFailure(_))
        ));
    }

    proptest! {
        #[test]
        fn output_has_one_row_per_distinct_id(ids in prop::collection::vec(0i64..8, 0..40)) {
            let rows = ids.iter().map(|id| vec![Value::Int(*id)]).collect();
            let t = table(&["id"], rows);
            let (out, dropped) = drop_duplicate_ids(t, "id").unwrap();
            let distinct = ids.iter().collect::<HashSet<_>>().len();
            prop_assert_eq!(out.row_count(), distinct);
            prop_assert_eq!(dropped, ids.len() - distinct);
        }
    }
}
