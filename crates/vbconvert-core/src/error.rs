use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("config not found: {0}")]
    ConfigNotFound(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid entity name '{0}': must be a non-empty identifier")]
    InvalidEntity(String),

    #[error("unknown step {number} for {mode} mode")]
    UnknownStep { number: u32, mode: String },

    #[error("invalid step list '{0}': expected comma-separated step numbers or ranges within the step catalogue")]
    InvalidStepList(String),

    #[error("no conversion status for entity: {0}")]
    StatusNotFound(String),

    #[error("failed to read {path}: {source}")]
    Analysis {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("step executor failed: {0}")]
    Executor(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
