use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Unknown transformation: {name}")]
    UnknownTransformationError { name: String },

    #[error("Column not found: {column}")]
    ColumnNotFoundError { column: String },

    #[error("Table not found: {table}")]
    TableNotFoundError { table: String },

    #[error("Unknown source type: {kind}")]
    UnknownSourceTypeError { kind: String },

    #[error("Unknown destination type: {kind}")]
    UnknownDestinationTypeError { kind: String },

    #[error("No join configured: the pipeline has no merged result to write")]
    NoJoinConfiguredError,

    #[error("Cannot cast value '{value}' in column '{column}' to {target}")]
    CastError {
        column: String,
        value: String,
        target: String,
    },

    #[error("Transformation '{step}' failed on table '{table}': {source}")]
    TransformationFailed {
        table: String,
        step: String,
        #[source]
        source: Box<EtlError>,
    },

    #[error("Join of '{left}' and '{right}' failed: {source}")]
    JoinFailed {
        left: String,
        right: String,
        #[source]
        source: Box<EtlError>,
    },

    #[error("Schema error: {message}")]
    SchemaError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;
