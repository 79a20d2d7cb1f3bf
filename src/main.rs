use clap::Parser;
use tabular_etl::utils::{logger, validation::Validate};
use tabular_etl::{CliConfig, EtlConfig, EtlEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting tabular-etl CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match EtlConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load configuration '{}': {}", cli.config, e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let engine = EtlEngine::new_with_monitoring(config, cli.monitor);

    match engine.run().await {
        Ok(destination) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!("📁 Output written to destination '{}'", destination);
        }
        Err(e) => {
            tracing::error!("❌ ETL process failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
