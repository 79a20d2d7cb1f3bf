use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "tabular-etl")]
#[command(about = "A configuration-driven batch ETL pipeline for tabular data")]
pub struct CliConfig {
    /// Path to the pipeline configuration file (JSON)
    #[arg(long, default_value = "./config/etl.json")]
    pub config: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Enable system monitoring")]
    pub monitor: bool,
}
