use crate::error::MergeError;
use crate::table::{ColumnKind, Table};

/// Check that `key` exists in every table and carries one value kind throughout.
///
/// Pure check; must pass before duplicate resolution or merging.
pub fn validate_identifier<'a, I>(tables: I, key: &str) -> Result<(), MergeError>
where
    I: IntoIterator<Item = &'a Table>,
{
    let tables = tables.into_iter().collect::<Vec<_>>();
    if tables.is_empty() {
        return Err(MergeError::NoTables);
    }

    let missing = tables
        .iter()
        .enumerate()
        .filter_map(|(idx, table)| (!table.has_column(key)).then_some(idx + 1))
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(MergeError::MissingIdentifier {
            key: key.to_string(),
            tables: missing,
        });
    }

    let kinds = tables
        .iter()
        .enumerate()
        .map(|(idx, table)| (idx + 1, ColumnKind::of(table.column(key).unwrap_or_default())))
        .collect::<Vec<_>>();

    let mut reference: Option<ColumnKind> = None;
    for &(_, kind) in &kinds {
        if kind == ColumnKind::Empty {
            continue;
        }
        match reference {
            None => reference = Some(kind),
            Some(expected) if expected.compatible_with(kind) => {}
            Some(_) => {
                return Err(MergeError::InconsistentIdentifierType {
                    key: key.to_string(),
                    kinds,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Value, table};

    fn ids(values: Vec<Value>) -> Table {
        table(&["id"], values.into_iter().map(|v| vec![v]).collect())
    }

    #[test]
    fn accepts_consistent_numeric_identifiers() {
        let tables = vec![
            ids(vec![Value::Int(1), Value::Int(2)]),
            ids(vec![Value::Float(1.0), Value::Null]),
        ];
        assert!(validate_identifier(&tables, "id").is_ok());
    }

    #[test]
    fn reports_every_table_missing_the_identifier() {
        let tables = vec![
            ids(vec![Value::Int(1)]),
            table(&["other"], vec![vec![Value::Int(1)]]),
            ids(vec![Value::Int(1)]),
            table(&["x"], Vec::new()),
        ];
        let err = validate_identifier(&tables, "id").unwrap_err();
        assert_eq!(
            err,
            MergeError::MissingIdentifier {
                key: "id".into(),
                tables: vec![2, 4]
            }
        );
    }

    #[test]
    fn rejects_numeric_versus_text_identifiers() {
        let tables = vec![
            ids(vec![Value::Int(1)]),
            ids(vec![Value::Text("a".into())]),
        ];
        let err = validate_identifier(&tables, "id").unwrap_err();
        match err {
            MergeError::InconsistentIdentifierType { kinds, .. } => {
                assert_eq!(kinds, vec![(1, ColumnKind::Numeric), (2, ColumnKind::Text)]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn all_null_identifier_column_is_compatible() {
        let tables = vec![ids(vec![Value::Text("a".into())]), ids(vec![Value::Null])];
        assert!(validate_identifier(&tables, "id").is_ok());
    }

    #[test]
    fn mixed_differs_from_pure_kinds() {
        let tables = vec![
            ids(vec![Value::Int(1), Value::Text("a".into())]),
            ids(vec![Value::Int(2)]),
        ];
        assert!(matches!(
            validate_identifier(&tables, "id"),
            Err(MergeError::InconsistentIdentifierType { .. })
        ));
    }

    #[test]
    fn empty_table_list_is_rejected() {
        assert_eq!(validate_identifier(Vec::<&Table>::new(), "id"), Err(MergeError::NoTables));
    }
}
