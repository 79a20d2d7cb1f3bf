use crate::domain::model::{Column, DataType, Table, Value};
use crate::domain::ports::Source;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

pub struct SourceFactory;

impl SourceFactory {
    pub fn create(kind: &str, path: &str) -> Result<Box<dyn Source>> {
        match kind {
            "csv" => Ok(Box::new(CsvDirectorySource::new(path))),
            other => Err(EtlError::UnknownSourceTypeError {
                kind: other.to_string(),
            }),
        }
    }
}

/// Reads every `*.csv` file in a directory into one table. Files are
/// concatenated with column-union semantics (cells absent from a file are
/// missing) and duplicate rows are dropped, keeping the first occurrence.
pub struct CsvDirectorySource {
    path: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all_csv_files(&self) -> Result<Table> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|ext| ext == "csv").unwrap_or(false))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(EtlError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no CSV files in {}", self.path.display()),
            )));
        }

        let mut headers: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<Option<String>>> = Vec::new();

        for file in &files {
            let mut reader = csv::Reader::from_path(file)?;
            let file_headers: Vec<String> =
                reader.headers()?.iter().map(str::to_string).collect();

            // map each file column onto the union header list, extending the
            // union (and the rows read so far) when a new column appears
            let mapping: Vec<usize> = file_headers
                .iter()
                .map(|header| {
                    match headers.iter().position(|existing| existing == header) {
                        Some(index) => index,
                        None => {
                            headers.push(header.clone());
                            for row in &mut rows {
                                row.push(None);
                            }
                            headers.len() - 1
                        }
                    }
                })
                .collect();

            for record in reader.records() {
                let record = record?;
                let mut row = vec![None; headers.len()];
                for (i, field) in record.iter().enumerate() {
                    if let Some(&target) = mapping.get(i) {
                        if !field.is_empty() {
                            row[target] = Some(field.to_string());
                        }
                    }
                }
                rows.push(row);
            }
        }

        let mut seen = HashSet::new();
        rows.retain(|row| seen.insert(row.clone()));

        build_table(headers, rows)
    }
}

#[async_trait]
impl Source for CsvDirectorySource {
    async fn get_data(&self) -> Result<Table> {
        tracing::debug!("Reading CSV files from {}", self.path.display());
        self.read_all_csv_files()
    }
}

fn build_table(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Table> {
    let columns = headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let cells: Vec<Option<&str>> = rows.iter().map(|row| row[i].as_deref()).collect();
            infer_column(name, &cells)
        })
        .collect();
    Table::from_columns(columns)
}

/// Column typing over raw CSV text: all-integer, all-numeric and all-boolean
/// columns get typed values, anything else stays text. Empty fields are
/// missing and do not constrain the inferred type.
fn infer_column(name: &str, cells: &[Option<&str>]) -> Column {
    let present: Vec<&str> = cells.iter().filter_map(|c| *c).collect();

    let dtype = if present.is_empty() {
        DataType::Text
    } else if present.iter().all(|s| s.trim().parse::<i64>().is_ok()) {
        DataType::Integer
    } else if present.iter().all(|s| s.trim().parse::<f64>().is_ok()) {
        DataType::Float
    } else if present
        .iter()
        .all(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "false"))
    {
        DataType::Boolean
    } else {
        DataType::Text
    };

    let values = cells
        .iter()
        .map(|cell| match cell {
            None => Value::Missing,
            Some(raw) => match dtype {
                DataType::Integer => Value::Integer(raw.trim().parse().unwrap_or_default()),
                DataType::Float => Value::Float(raw.trim().parse().unwrap_or_default()),
                DataType::Boolean => {
                    Value::Boolean(raw.trim().eq_ignore_ascii_case("true"))
                }
                DataType::Text => Value::Text((*raw).to_string()),
            },
        })
        .collect();

    Column::new(name, dtype, values)
}
