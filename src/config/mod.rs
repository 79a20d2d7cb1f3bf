#[cfg(feature = "cli")]
pub mod cli;

use crate::domain::model::TransformPlan;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// The full pipeline configuration, parsed once at run start and read-only
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    pub transformations: TransformPlan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub r#type: String,
    /// Table name to adapter path, one source per named table.
    pub data: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub r#type: String,
    #[serde(default)]
    pub credentials: HashMap<String, String>,
    pub destination_name: String,
}

impl EtlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        serde_json::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "json_parsing".to_string(),
            message: format!("JSON parsing error: {}", e),
        })
    }

    /// Replaces `${VAR_NAME}` references with environment values; unset
    /// variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("source.type", &self.source.r#type)?;

        if self.source.data.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "source.data".to_string(),
            });
        }
        for (name, path) in &self.source.data {
            validation::validate_non_empty_string("source.data", name)?;
            validation::validate_path(&format!("source.data.{}", name), path)?;
        }

        validation::validate_non_empty_string("destination.type", &self.destination.r#type)?;
        validation::validate_non_empty_string(
            "destination.destination_name",
            &self.destination.destination_name,
        )?;

        for spec in &self.transformations.tables {
            validation::validate_non_empty_string(
                "transformations.tables.table_name",
                &spec.table_name,
            )?;
            for step in &spec.transformations {
                validation::validate_non_empty_string(
                    &format!("transformations.tables.{}.name", spec.table_name),
                    &step.name,
                )?;
            }
        }

        // an empty join list is left to the pipeline, which reports it as
        // NoJoinConfiguredError when there is no merged result to return
        for join in &self.transformations.join {
            validation::validate_non_empty_string("transformations.join.source_1", &join.source_1)?;
            validation::validate_non_empty_string("transformations.join.source_2", &join.source_2)?;
            for key in join.on.columns() {
                validation::validate_non_empty_string("transformations.join.on", key)?;
            }
        }

        Ok(())
    }
}

impl Validate for EtlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
