//! Transformation dispatch. Names resolve through a closed registry populated
//! at startup; a configuration can only reference pre-registered names, never
//! arbitrary expressions.

use crate::domain::model::{DataType, Table, Value};
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;

/// Parameters of one transformation step. Iteration follows the order the
/// keys appear in the configuration document.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

pub type TransformFn = Box<dyn Fn(Table, &Parameters) -> Result<Table> + Send + Sync>;

pub struct TransformationRegistry {
    transformations: HashMap<String, TransformFn>,
}

impl TransformationRegistry {
    pub fn new() -> Self {
        Self {
            transformations: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in transformations.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("rename", rename);
        registry.register("set_types", set_types);
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, transform: F)
    where
        F: Fn(Table, &Parameters) -> Result<Table> + Send + Sync + 'static,
    {
        self.transformations.insert(name.into(), Box::new(transform));
    }

    pub fn lookup(&self, name: &str) -> Result<&TransformFn> {
        self.transformations
            .get(name)
            .ok_or_else(|| EtlError::UnknownTransformationError {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transformations.contains_key(name)
    }
}

impl Default for TransformationRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Renames columns; parameters map old names to new names.
pub fn rename(mut table: Table, parameters: &Parameters) -> Result<Table> {
    for (old, new) in parameters {
        let new = new.as_str().ok_or_else(|| EtlError::InvalidConfigValueError {
            field: format!("rename.{}", old),
            value: new.to_string(),
            reason: "New column name must be a string".to_string(),
        })?;
        table.rename_column(old, new)?;
    }
    Ok(table)
}

/// Retypes columns; parameters map column names to a target type. The target
/// `"to_numeric"` coerces values to numbers, turns non-convertible values into
/// missing ones and drops their rows; any other target is a strict cast.
/// Columns are processed in parameter order, so a row drop from an earlier
/// column is visible to later ones.
pub fn set_types(mut table: Table, parameters: &Parameters) -> Result<Table> {
    for (column, target) in parameters {
        let target = target.as_str().ok_or_else(|| EtlError::InvalidConfigValueError {
            field: format!("set_types.{}", column),
            value: target.to_string(),
            reason: "Target type must be a string".to_string(),
        })?;

        if target == "to_numeric" {
            coerce_numeric(&mut table, column)?;
        } else {
            let dtype =
                DataType::parse(target).ok_or_else(|| EtlError::InvalidConfigValueError {
                    field: format!("set_types.{}", column),
                    value: target.to_string(),
                    reason: "Unsupported target type".to_string(),
                })?;
            cast_column(&mut table, column, dtype)?;
        }
    }
    Ok(table)
}

fn coerce_numeric(table: &mut Table, name: &str) -> Result<()> {
    let column = table
        .column_mut(name)
        .ok_or_else(|| EtlError::ColumnNotFoundError {
            column: name.to_string(),
        })?;

    let coerced: Vec<Value> = column
        .values
        .iter()
        .map(|value| match value {
            Value::Integer(n) => Value::Integer(*n),
            Value::Float(f) if f.is_nan() => Value::Missing,
            Value::Float(f) => Value::Float(*f),
            Value::Boolean(b) => Value::Integer(*b as i64),
            Value::Text(s) => {
                let trimmed = s.trim();
                if let Ok(n) = trimmed.parse::<i64>() {
                    Value::Integer(n)
                } else {
                    match trimmed.parse::<f64>() {
                        Ok(f) if !f.is_nan() => Value::Float(f),
                        _ => Value::Missing,
                    }
                }
            }
            Value::Missing => Value::Missing,
        })
        .collect();

    column.dtype = if coerced.iter().any(|v| matches!(v, Value::Float(_))) {
        DataType::Float
    } else {
        DataType::Integer
    };
    column.values = coerced;

    let keep: Vec<bool> = table
        .column(name)
        .expect("column checked above")
        .values
        .iter()
        .map(|v| !v.is_missing())
        .collect();
    if keep.iter().any(|k| !k) {
        table.retain_rows(&keep);
    }

    Ok(())
}

fn cast_column(table: &mut Table, name: &str, dtype: DataType) -> Result<()> {
    let column = table
        .column_mut(name)
        .ok_or_else(|| EtlError::ColumnNotFoundError {
            column: name.to_string(),
        })?;

    let mut values = Vec::with_capacity(column.values.len());
    for value in &column.values {
        let cast = cast_value(value, dtype).ok_or_else(|| EtlError::CastError {
            column: name.to_string(),
            value: value.to_string(),
            target: dtype.to_string(),
        })?;
        values.push(cast);
    }

    column.dtype = dtype;
    column.values = values;
    Ok(())
}

fn cast_value(value: &Value, target: DataType) -> Option<Value> {
    match (value, target) {
        // Missing survives casts to types that can represent it
        (Value::Missing, DataType::Float) | (Value::Missing, DataType::Text) => {
            Some(Value::Missing)
        }
        (Value::Missing, _) => None,
        (v, DataType::Text) => Some(Value::Text(v.to_string())),
        (Value::Integer(n), DataType::Integer) => Some(Value::Integer(*n)),
        (Value::Float(f), DataType::Integer) => Some(Value::Integer(*f as i64)),
        (Value::Boolean(b), DataType::Integer) => Some(Value::Integer(*b as i64)),
        (Value::Text(s), DataType::Integer) => s.trim().parse::<i64>().ok().map(Value::Integer),
        (Value::Integer(n), DataType::Float) => Some(Value::Float(*n as f64)),
        (Value::Float(f), DataType::Float) => Some(Value::Float(*f)),
        (Value::Boolean(b), DataType::Float) => {
            Some(Value::Float(if *b { 1.0 } else { 0.0 }))
        }
        (Value::Text(s), DataType::Float) => s.trim().parse::<f64>().ok().map(Value::Float),
        (Value::Boolean(b), DataType::Boolean) => Some(Value::Boolean(*b)),
        (Value::Integer(n), DataType::Boolean) => Some(Value::Boolean(*n != 0)),
        (Value::Float(_), DataType::Boolean) => None,
        (Value::Text(s), DataType::Boolean) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Boolean(true)),
            "false" => Some(Value::Boolean(false)),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Column;

    fn params(value: serde_json::Value) -> Parameters {
        value.as_object().unwrap().clone()
    }

    fn orders_table() -> Table {
        Table::from_columns(vec![
            Column::new(
                "order_id",
                DataType::Integer,
                vec![Value::Integer(1), Value::Integer(2)],
            ),
            Column::new(
                "cust_id",
                DataType::Integer,
                vec![Value::Integer(10), Value::Integer(20)],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_unknown_transformation() {
        let registry = TransformationRegistry::with_builtins();
        let result = registry.lookup("explode");

        assert!(matches!(
            result,
            Err(EtlError::UnknownTransformationError { name }) if name == "explode"
        ));
    }

    #[test]
    fn test_register_custom_transformation() {
        let mut registry = TransformationRegistry::with_builtins();
        registry.register("identity", |table, _params: &Parameters| Ok(table));

        assert!(registry.contains("identity"));
        let transform = registry.lookup("identity").unwrap();
        let table = transform(orders_table(), &Parameters::new()).unwrap();
        assert_eq!(table.num_rows(), 2);
    }

    #[test]
    fn test_rename_columns() {
        let table = orders_table();
        let renamed = rename(table, &params(serde_json::json!({"order_id": "id"}))).unwrap();

        assert_eq!(renamed.column_names(), vec!["id", "cust_id"]);
    }

    #[test]
    fn test_rename_round_trip() {
        let original = orders_table();
        let renamed = rename(
            original.clone(),
            &params(serde_json::json!({"order_id": "id", "cust_id": "customer"})),
        )
        .unwrap();
        let restored = rename(
            renamed,
            &params(serde_json::json!({"id": "order_id", "customer": "cust_id"})),
        )
        .unwrap();

        assert_eq!(restored, original);
    }

    #[test]
    fn test_rename_missing_column() {
        let result = rename(orders_table(), &params(serde_json::json!({"absent": "id"})));

        assert!(matches!(
            result,
            Err(EtlError::ColumnNotFoundError { column }) if column == "absent"
        ));
    }

    #[test]
    fn test_rename_rejects_non_string_target() {
        let result = rename(orders_table(), &params(serde_json::json!({"order_id": 7})));

        assert!(matches!(result, Err(EtlError::InvalidConfigValueError { .. })));
    }

    #[test]
    fn test_set_types_numeric_coercion_drops_unparsable_rows() {
        let table = Table::from_columns(vec![Column::new(
            "amount",
            DataType::Text,
            vec![
                Value::Text("12".to_string()),
                Value::Text("3.5".to_string()),
                Value::Text("n/a".to_string()),
                Value::Text("7".to_string()),
            ],
        )])
        .unwrap();

        let coerced =
            set_types(table, &params(serde_json::json!({"amount": "to_numeric"}))).unwrap();

        let column = coerced.column("amount").unwrap();
        assert_eq!(column.dtype, DataType::Float);
        assert_eq!(
            column.values,
            vec![Value::Integer(12), Value::Float(3.5), Value::Integer(7)]
        );
    }

    #[test]
    fn test_set_types_integer_only_coercion() {
        let table = Table::from_columns(vec![Column::new(
            "qty",
            DataType::Text,
            vec![Value::Text("1".to_string()), Value::Text("2".to_string())],
        )])
        .unwrap();

        let coerced = set_types(table, &params(serde_json::json!({"qty": "to_numeric"}))).unwrap();

        assert_eq!(coerced.column("qty").unwrap().dtype, DataType::Integer);
    }

    #[test]
    fn test_set_types_earlier_drop_visible_to_later_columns() {
        // The bad "amount" row is dropped first, taking its "qty" cell with
        // it, so the later "qty" coercion never sees the unparsable value.
        let table = Table::from_columns(vec![
            Column::new(
                "amount",
                DataType::Text,
                vec![Value::Text("bad".to_string()), Value::Text("10".to_string())],
            ),
            Column::new(
                "qty",
                DataType::Text,
                vec![Value::Text("oops".to_string()), Value::Text("3".to_string())],
            ),
        ])
        .unwrap();

        let coerced = set_types(
            table,
            &params(serde_json::json!({"amount": "to_numeric", "qty": "to_numeric"})),
        )
        .unwrap();

        assert_eq!(coerced.num_rows(), 1);
        assert_eq!(coerced.column("qty").unwrap().values, vec![Value::Integer(3)]);
    }

    #[test]
    fn test_set_types_cast_to_text() {
        let table = Table::from_columns(vec![Column::new(
            "id",
            DataType::Integer,
            vec![Value::Integer(1), Value::Integer(2)],
        )])
        .unwrap();

        let cast = set_types(table, &params(serde_json::json!({"id": "str"}))).unwrap();

        let column = cast.column("id").unwrap();
        assert_eq!(column.dtype, DataType::Text);
        assert_eq!(
            column.values,
            vec![Value::Text("1".to_string()), Value::Text("2".to_string())]
        );
    }

    #[test]
    fn test_set_types_strict_cast_failure() {
        let table = Table::from_columns(vec![Column::new(
            "id",
            DataType::Text,
            vec![Value::Text("seven".to_string())],
        )])
        .unwrap();

        let result = set_types(table, &params(serde_json::json!({"id": "int64"})));

        assert!(matches!(
            result,
            Err(EtlError::CastError { column, .. }) if column == "id"
        ));
    }

    #[test]
    fn test_set_types_unknown_target_type() {
        let result = set_types(
            orders_table(),
            &params(serde_json::json!({"order_id": "decimal128"})),
        );

        assert!(matches!(result, Err(EtlError::InvalidConfigValueError { .. })));
    }

    #[test]
    fn test_set_types_missing_column() {
        let result = set_types(
            orders_table(),
            &params(serde_json::json!({"absent": "to_numeric"})),
        );

        assert!(matches!(result, Err(EtlError::ColumnNotFoundError { .. })));
    }
}
