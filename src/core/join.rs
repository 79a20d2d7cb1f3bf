//! Relational joins over in-memory tables: a hash join on one or more key
//! columns with inner/left/right/outer semantics, standard row
//! multiplication on duplicate keys, and missing-fill for the non-matching
//! side.

use crate::domain::model::{Column, DataType, JoinKind, Table, Value};
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;

/// Hashable form of one join key cell. Integer-valued floats normalize to
/// integers so numeric keys compare by value across column types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Int(i64),
    Float(u64),
    Bool(bool),
    Text(String),
}

/// Missing cells produce no key: a row with a missing key value never
/// matches the other side.
fn key_part(value: &Value) -> Option<KeyPart> {
    match value {
        Value::Integer(n) => Some(KeyPart::Int(*n)),
        Value::Float(f) if f.is_nan() => None,
        Value::Float(f)
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 =>
        {
            Some(KeyPart::Int(*f as i64))
        }
        Value::Float(f) => Some(KeyPart::Float(f.to_bits())),
        Value::Boolean(b) => Some(KeyPart::Bool(*b)),
        Value::Text(s) => Some(KeyPart::Text(s.clone())),
        Value::Missing => None,
    }
}

fn row_key(table: &Table, key_indices: &[usize], row: usize) -> Option<Vec<KeyPart>> {
    key_indices
        .iter()
        .map(|&i| key_part(&table.columns()[i].values[row]))
        .collect()
}

fn build_index(table: &Table, key_indices: &[usize]) -> HashMap<Vec<KeyPart>, Vec<usize>> {
    let mut index: HashMap<Vec<KeyPart>, Vec<usize>> = HashMap::new();
    for row in 0..table.num_rows() {
        if let Some(key) = row_key(table, key_indices, row) {
            index.entry(key).or_default().push(row);
        }
    }
    index
}

fn resolve_keys(table: &Table, on: &[String]) -> Result<Vec<usize>> {
    on.iter()
        .map(|name| {
            table
                .column_index(name)
                .ok_or_else(|| EtlError::ColumnNotFoundError {
                    column: name.clone(),
                })
        })
        .collect()
}

fn key_values(table: &Table, key_indices: &[usize], row: usize) -> Vec<Value> {
    key_indices
        .iter()
        .map(|&i| table.columns()[i].values[row].clone())
        .collect()
}

fn unify_dtype(a: DataType, b: DataType) -> DataType {
    match (a, b) {
        _ if a == b => a,
        (DataType::Integer, DataType::Float) | (DataType::Float, DataType::Integer) => {
            DataType::Float
        }
        _ => DataType::Text,
    }
}

pub fn join(left: &Table, right: &Table, on: &[String], how: JoinKind) -> Result<Table> {
    let left_keys = resolve_keys(left, on)?;
    let right_keys = resolve_keys(right, on)?;

    let left_extra: Vec<usize> = (0..left.num_columns())
        .filter(|i| !left_keys.contains(i))
        .collect();
    let right_extra: Vec<usize> = (0..right.num_columns())
        .filter(|i| !right_keys.contains(i))
        .collect();

    // Joined rows as (key cells, left row, right row); a missing side is
    // filled with Value::Missing when columns are materialized below.
    let mut rows: Vec<(Vec<Value>, Option<usize>, Option<usize>)> = Vec::new();

    match how {
        JoinKind::Inner | JoinKind::Left | JoinKind::Outer => {
            let right_index = build_index(right, &right_keys);
            let mut right_matched = vec![false; right.num_rows()];

            for l in 0..left.num_rows() {
                let matches = row_key(left, &left_keys, l)
                    .and_then(|key| right_index.get(&key));
                match matches {
                    Some(right_rows) => {
                        for &r in right_rows {
                            right_matched[r] = true;
                            rows.push((key_values(left, &left_keys, l), Some(l), Some(r)));
                        }
                    }
                    None if how != JoinKind::Inner => {
                        rows.push((key_values(left, &left_keys, l), Some(l), None));
                    }
                    None => {}
                }
            }

            if how == JoinKind::Outer {
                for r in 0..right.num_rows() {
                    if !right_matched[r] {
                        rows.push((key_values(right, &right_keys, r), None, Some(r)));
                    }
                }
            }
        }
        JoinKind::Right => {
            let left_index = build_index(left, &left_keys);

            for r in 0..right.num_rows() {
                let matches = row_key(right, &right_keys, r)
                    .and_then(|key| left_index.get(&key));
                match matches {
                    Some(left_rows) => {
                        for &l in left_rows {
                            rows.push((key_values(right, &right_keys, r), Some(l), Some(r)));
                        }
                    }
                    None => rows.push((key_values(right, &right_keys, r), None, Some(r))),
                }
            }
        }
    }

    let mut columns = Vec::with_capacity(1 + left_extra.len() + right_extra.len());

    for (i, name) in on.iter().enumerate() {
        let dtype = unify_dtype(
            left.columns()[left_keys[i]].dtype,
            right.columns()[right_keys[i]].dtype,
        );
        let values = rows.iter().map(|(key, _, _)| key[i].clone()).collect();
        columns.push(Column::new(name.clone(), dtype, values));
    }

    let collisions: Vec<&str> = left_extra
        .iter()
        .map(|&i| left.columns()[i].name.as_str())
        .filter(|name| {
            right_extra
                .iter()
                .any(|&j| right.columns()[j].name == *name)
        })
        .collect();

    for &i in &left_extra {
        let source = &left.columns()[i];
        let name = if collisions.contains(&source.name.as_str()) {
            format!("{}_x", source.name)
        } else {
            source.name.clone()
        };
        let values = rows
            .iter()
            .map(|(_, l, _)| match l {
                Some(l) => source.values[*l].clone(),
                None => Value::Missing,
            })
            .collect();
        columns.push(Column::new(name, source.dtype, values));
    }

    for &i in &right_extra {
        let source = &right.columns()[i];
        let name = if collisions.contains(&source.name.as_str()) {
            format!("{}_y", source.name)
        } else {
            source.name.clone()
        };
        let values = rows
            .iter()
            .map(|(_, _, r)| match r {
                Some(r) => source.values[*r].clone(),
                None => Value::Missing,
            })
            .collect();
        columns.push(Column::new(name, source.dtype, values));
    }

    Table::from_columns(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_a() -> Table {
        Table::from_columns(vec![
            Column::new(
                "id",
                DataType::Integer,
                vec![Value::Integer(1), Value::Integer(2)],
            ),
            Column::new(
                "v",
                DataType::Text,
                vec![Value::Text("a".to_string()), Value::Text("b".to_string())],
            ),
        ])
        .unwrap()
    }

    fn table_b() -> Table {
        Table::from_columns(vec![
            Column::new(
                "id",
                DataType::Integer,
                vec![Value::Integer(2), Value::Integer(3)],
            ),
            Column::new(
                "w",
                DataType::Text,
                vec![Value::Text("x".to_string()), Value::Text("y".to_string())],
            ),
        ])
        .unwrap()
    }

    fn on(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_inner_join() {
        let joined = join(&table_a(), &table_b(), &on(&["id"]), JoinKind::Inner).unwrap();

        assert_eq!(joined.column_names(), vec!["id", "v", "w"]);
        assert_eq!(joined.num_rows(), 1);
        assert_eq!(joined.column("id").unwrap().values, vec![Value::Integer(2)]);
        assert_eq!(
            joined.column("v").unwrap().values,
            vec![Value::Text("b".to_string())]
        );
        assert_eq!(
            joined.column("w").unwrap().values,
            vec![Value::Text("x".to_string())]
        );
    }

    #[test]
    fn test_left_join_fills_missing() {
        let joined = join(&table_a(), &table_b(), &on(&["id"]), JoinKind::Left).unwrap();

        assert_eq!(joined.num_rows(), 2);
        assert_eq!(
            joined.column("w").unwrap().values,
            vec![Value::Missing, Value::Text("x".to_string())]
        );
    }

    #[test]
    fn test_right_join_keeps_right_order() {
        let joined = join(&table_a(), &table_b(), &on(&["id"]), JoinKind::Right).unwrap();

        assert_eq!(joined.num_rows(), 2);
        assert_eq!(
            joined.column("id").unwrap().values,
            vec![Value::Integer(2), Value::Integer(3)]
        );
        assert_eq!(
            joined.column("v").unwrap().values,
            vec![Value::Text("b".to_string()), Value::Missing]
        );
    }

    #[test]
    fn test_outer_join() {
        let joined = join(&table_a(), &table_b(), &on(&["id"]), JoinKind::Outer).unwrap();

        assert_eq!(joined.num_rows(), 3);
        assert_eq!(
            joined.column("id").unwrap().values,
            vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
        );
        assert_eq!(
            joined.column("v").unwrap().values,
            vec![
                Value::Text("a".to_string()),
                Value::Text("b".to_string()),
                Value::Missing
            ]
        );
        assert_eq!(
            joined.column("w").unwrap().values,
            vec![
                Value::Missing,
                Value::Text("x".to_string()),
                Value::Text("y".to_string())
            ]
        );
    }

    #[test]
    fn test_inner_join_multiplies_duplicate_keys() {
        let left = Table::from_columns(vec![Column::new(
            "id",
            DataType::Integer,
            vec![Value::Integer(1), Value::Integer(1)],
        )])
        .unwrap();
        let right = Table::from_columns(vec![
            Column::new(
                "id",
                DataType::Integer,
                vec![Value::Integer(1), Value::Integer(1)],
            ),
            Column::new(
                "w",
                DataType::Text,
                vec![Value::Text("x".to_string()), Value::Text("y".to_string())],
            ),
        ])
        .unwrap();

        let joined = join(&left, &right, &on(&["id"]), JoinKind::Inner).unwrap();
        assert_eq!(joined.num_rows(), 4);
    }

    #[test]
    fn test_multi_key_join() {
        let left = Table::from_columns(vec![
            Column::new(
                "a",
                DataType::Integer,
                vec![Value::Integer(1), Value::Integer(1)],
            ),
            Column::new(
                "b",
                DataType::Text,
                vec![Value::Text("p".to_string()), Value::Text("q".to_string())],
            ),
            Column::new(
                "v",
                DataType::Integer,
                vec![Value::Integer(10), Value::Integer(20)],
            ),
        ])
        .unwrap();
        let right = Table::from_columns(vec![
            Column::new("a", DataType::Integer, vec![Value::Integer(1)]),
            Column::new("b", DataType::Text, vec![Value::Text("q".to_string())]),
            Column::new("w", DataType::Integer, vec![Value::Integer(99)]),
        ])
        .unwrap();

        let joined = join(&left, &right, &on(&["a", "b"]), JoinKind::Inner).unwrap();

        assert_eq!(joined.num_rows(), 1);
        assert_eq!(joined.column("v").unwrap().values, vec![Value::Integer(20)]);
        assert_eq!(joined.column("w").unwrap().values, vec![Value::Integer(99)]);
    }

    #[test]
    fn test_colliding_columns_get_suffixes() {
        let left = Table::from_columns(vec![
            Column::new("id", DataType::Integer, vec![Value::Integer(1)]),
            Column::new("v", DataType::Integer, vec![Value::Integer(10)]),
        ])
        .unwrap();
        let right = Table::from_columns(vec![
            Column::new("id", DataType::Integer, vec![Value::Integer(1)]),
            Column::new("v", DataType::Integer, vec![Value::Integer(20)]),
        ])
        .unwrap();

        let joined = join(&left, &right, &on(&["id"]), JoinKind::Inner).unwrap();

        assert_eq!(joined.column_names(), vec!["id", "v_x", "v_y"]);
        assert_eq!(joined.column("v_x").unwrap().values, vec![Value::Integer(10)]);
        assert_eq!(joined.column("v_y").unwrap().values, vec![Value::Integer(20)]);
    }

    #[test]
    fn test_missing_keys_never_match() {
        let left = Table::from_columns(vec![Column::new(
            "id",
            DataType::Integer,
            vec![Value::Missing, Value::Integer(2)],
        )])
        .unwrap();
        let right = Table::from_columns(vec![
            Column::new(
                "id",
                DataType::Integer,
                vec![Value::Missing, Value::Integer(2)],
            ),
            Column::new(
                "w",
                DataType::Text,
                vec![Value::Text("m".to_string()), Value::Text("x".to_string())],
            ),
        ])
        .unwrap();

        let inner = join(&left, &right, &on(&["id"]), JoinKind::Inner).unwrap();
        assert_eq!(inner.num_rows(), 1);
        assert_eq!(
            inner.column("w").unwrap().values,
            vec![Value::Text("x".to_string())]
        );

        let left_joined = join(&left, &right, &on(&["id"]), JoinKind::Left).unwrap();
        assert_eq!(left_joined.num_rows(), 2);
        assert_eq!(
            left_joined.column("w").unwrap().values,
            vec![Value::Missing, Value::Text("x".to_string())]
        );
    }

    #[test]
    fn test_numeric_keys_match_across_types() {
        let left = Table::from_columns(vec![Column::new(
            "id",
            DataType::Integer,
            vec![Value::Integer(2)],
        )])
        .unwrap();
        let right = Table::from_columns(vec![
            Column::new("id", DataType::Float, vec![Value::Float(2.0)]),
            Column::new("w", DataType::Text, vec![Value::Text("x".to_string())]),
        ])
        .unwrap();

        let joined = join(&left, &right, &on(&["id"]), JoinKind::Inner).unwrap();

        assert_eq!(joined.num_rows(), 1);
        assert_eq!(joined.column("id").unwrap().dtype, DataType::Float);
    }

    #[test]
    fn test_join_key_not_found() {
        let result = join(&table_a(), &table_b(), &on(&["customer"]), JoinKind::Inner);

        assert!(matches!(
            result,
            Err(EtlError::ColumnNotFoundError { column }) if column == "customer"
        ));
    }
}
