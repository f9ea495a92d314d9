//! Domain-level error taxonomy for the bias study.

use std::path::PathBuf;

/// Bias study domain errors.
#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    #[error("no responses_*.jsonl record log found in {}", dir.display())]
    NoRecordLog { dir: PathBuf },

    #[error("malformed record on line {line}: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("record on line {line} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        line: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("model query failed for {model}: {reason}")]
    QueryFailed { model: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bias study domain operations.
pub type Result<T> = std::result::Result<T, StudyError>;
