use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Declared type of a column. Individual cells may still be [`Value::Missing`]
/// regardless of the declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Integer,
    Float,
    Boolean,
    Text,
}

impl DataType {
    /// Resolves a configured type name, accepting the spellings commonly seen
    /// in pipeline configurations (`int64`, `float64`, `object`, ...).
    pub fn parse(name: &str) -> Option<DataType> {
        match name {
            "int" | "int64" | "integer" => Some(DataType::Integer),
            "float" | "float64" => Some(DataType::Float),
            "bool" | "boolean" => Some(DataType::Boolean),
            "str" | "string" | "object" | "text" => Some(DataType::Text),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "integer"),
            DataType::Float => write!(f, "float"),
            DataType::Boolean => write!(f, "boolean"),
            DataType::Text => write!(f, "text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    /// Missing values render as the empty string, matching their CSV form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
            Value::Missing => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: DataType,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: DataType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One in-memory table: ordered named columns sharing a row count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table, rejecting duplicate column names and ragged columns.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(EtlError::SchemaError {
                    message: format!("duplicate column name '{}'", column.name),
                });
            }
        }

        if let Some(first) = columns.first() {
            let rows = first.len();
            for column in &columns {
                if column.len() != rows {
                    return Err(EtlError::SchemaError {
                        message: format!(
                            "column '{}' has {} rows, expected {}",
                            column.name,
                            column.len(),
                            rows
                        ),
                    });
                }
            }
        }

        Ok(Self { columns })
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Mutable access to a column's type and values. Renames must go through
    /// [`Table::rename_column`] so name uniqueness stays enforced.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name).ok_or_else(|| EtlError::ColumnNotFoundError {
            column: name.to_string(),
        })
    }

    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<()> {
        if old == new {
            return self.require_column(old).map(|_| ());
        }

        if self.column(new).is_some() {
            return Err(EtlError::SchemaError {
                message: format!("rename '{}' -> '{}' collides with an existing column", old, new),
            });
        }

        let column = self
            .column_mut(old)
            .ok_or_else(|| EtlError::ColumnNotFoundError {
                column: old.to_string(),
            })?;
        column.name = new.to_string();
        Ok(())
    }

    /// Keeps only the rows whose flag is set; `keep` must cover every row.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.num_rows());
        for column in &mut self.columns {
            let mut flags = keep.iter();
            column.values.retain(|_| *flags.next().unwrap_or(&false));
        }
    }

    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }
}

/// The named tables available during one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    tables: HashMap<String, Table>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        self.tables.insert(name.into(), table);
    }

    pub fn get(&self, name: &str) -> Result<&Table> {
        self.tables.get(name).ok_or_else(|| EtlError::TableNotFoundError {
            table: name.to_string(),
        })
    }

    /// Removes and returns a table so a transformation chain can own it.
    pub fn take(&mut self, name: &str) -> Result<Table> {
        self.tables.remove(name).ok_or_else(|| EtlError::TableNotFoundError {
            table: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
}

/// Join key column(s); configurations may give a single name or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JoinKeys {
    Single(String),
    Multiple(Vec<String>),
}

impl JoinKeys {
    pub fn columns(&self) -> &[String] {
        match self {
            JoinKeys::Single(name) => std::slice::from_ref(name),
            JoinKeys::Multiple(names) => names,
        }
    }
}

/// One registered transformation applied with its configured parameters.
/// Parameter order is significant for transformations that process columns
/// sequentially, so the mapping preserves document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformStep {
    pub name: String,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableTransformSpec {
    pub table_name: String,
    #[serde(default)]
    pub transformations: Vec<TransformStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinSpec {
    pub source_1: String,
    pub source_2: String,
    pub on: JoinKeys,
    pub how: JoinKind,
}

/// The declarative transformation plan: per-table chains, then joins. Parsed
/// once at run start and read-only afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformPlan {
    #[serde(default)]
    pub tables: Vec<TableTransformSpec>,
    #[serde(default)]
    pub join: Vec<JoinSpec>,
}
