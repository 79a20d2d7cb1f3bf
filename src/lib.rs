pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use config::EtlConfig;
pub use crate::core::{
    etl::EtlEngine, pipeline::TransformationPipeline, registry::TransformationRegistry,
};
pub use domain::model::{Column, DataType, JoinKind, Table, TableSet, Value};
pub use utils::error::{EtlError, Result};
