use crate::domain::model::{Table, Value};
use crate::domain::ports::Destination;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

pub struct DestinationFactory;

impl DestinationFactory {
    pub fn create(
        kind: &str,
        credentials: &HashMap<String, String>,
        destination_name: &str,
    ) -> Result<Box<dyn Destination>> {
        let path = credentials
            .get("path")
            .ok_or_else(|| EtlError::MissingConfigError {
                field: "destination.credentials.path".to_string(),
            })?;

        match kind {
            "csv" => Ok(Box::new(CsvFileDestination::new(path, destination_name))),
            "json" => Ok(Box::new(JsonFileDestination::new(path, destination_name))),
            other => Err(EtlError::UnknownDestinationTypeError {
                kind: other.to_string(),
            }),
        }
    }
}

/// Writes the table as `<path>/<name>.csv`, replacing any previous file.
pub struct CsvFileDestination {
    dir: PathBuf,
    name: String,
}

impl CsvFileDestination {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.join(format!("{}.csv", self.name))
    }
}

#[async_trait]
impl Destination for CsvFileDestination {
    async fn write_data(&self, data: &Table) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.output_path();

        // the writer is dropped on every exit path, releasing the file handle
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(data.column_names())?;
        for row in 0..data.num_rows() {
            let record: Vec<String> = data.row(row).iter().map(|v| v.to_string()).collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;

        tracing::debug!("Wrote {} rows to {}", data.num_rows(), path.display());
        Ok(())
    }
}

/// Writes the table as `<path>/<name>.json`: an array of row objects with
/// missing cells as `null`.
pub struct JsonFileDestination {
    dir: PathBuf,
    name: String,
}

impl JsonFileDestination {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.name))
    }
}

#[async_trait]
impl Destination for JsonFileDestination {
    async fn write_data(&self, data: &Table) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.output_path();

        let mut records = Vec::with_capacity(data.num_rows());
        for row in 0..data.num_rows() {
            let mut record = serde_json::Map::new();
            for column in data.columns() {
                record.insert(column.name.clone(), to_json(&column.values[row]));
            }
            records.push(serde_json::Value::Object(record));
        }

        let json = serde_json::to_string_pretty(&records)?;
        fs::write(&path, json)?;

        tracing::debug!("Wrote {} rows to {}", data.num_rows(), path.display());
        Ok(())
    }
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Integer(n) => serde_json::Value::from(*n),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Boolean(b) => serde_json::Value::from(*b),
        Value::Text(s) => serde_json::Value::from(s.as_str()),
        Value::Missing => serde_json::Value::Null,
    }
}
