use crate::adapters::{DestinationFactory, SourceFactory};
use crate::config::EtlConfig;
use crate::core::pipeline::TransformationPipeline;
use crate::core::registry::TransformationRegistry;
use crate::domain::model::TableSet;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Orchestrates one end-to-end run: build the named table set from the
/// configured sources, execute the transformation pipeline, write the merged
/// result to the configured destination. Every failure aborts the run; there
/// are no retries and nothing is written before the pipeline completes.
pub struct EtlEngine {
    config: EtlConfig,
    registry: TransformationRegistry,
    monitor: SystemMonitor,
}

impl EtlEngine {
    pub fn new(config: EtlConfig) -> Self {
        Self::with_registry(config, TransformationRegistry::with_builtins())
    }

    pub fn with_registry(config: EtlConfig, registry: TransformationRegistry) -> Self {
        Self {
            config,
            registry,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(config: EtlConfig, monitor_enabled: bool) -> Self {
        Self {
            config,
            registry: TransformationRegistry::with_builtins(),
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting ETL process...");

        // Extract
        tracing::info!("Extracting {} source table(s)...", self.config.source.data.len());
        let mut tables = TableSet::new();
        let mut names: Vec<&String> = self.config.source.data.keys().collect();
        names.sort();
        for name in names {
            let path = &self.config.source.data[name];
            let source = SourceFactory::create(&self.config.source.r#type, path)?;
            let table = source.get_data().await?;
            tracing::info!(
                "Loaded table '{}': {} rows x {} columns",
                name,
                table.num_rows(),
                table.num_columns()
            );
            tables.insert(name.clone(), table);
        }
        self.monitor.log_stats("Extract");

        // Transform
        tracing::info!("Transforming data...");
        let pipeline = TransformationPipeline::new(&self.registry);
        let merged = pipeline.execute(&self.config.transformations, tables)?;
        tracing::info!(
            "Pipeline produced {} rows x {} columns",
            merged.num_rows(),
            merged.num_columns()
        );
        self.monitor.log_stats("Transform");

        // Load
        tracing::info!("Loading data...");
        let destination = DestinationFactory::create(
            &self.config.destination.r#type,
            &self.config.destination.credentials,
            &self.config.destination.destination_name,
        )?;
        destination.write_data(&merged).await?;
        tracing::info!(
            "Data written to destination '{}'",
            self.config.destination.destination_name
        );
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(self.config.destination.destination_name.clone())
    }
}
