use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EtlError>;

/// Every way a pipeline run can fail. All of them are fatal to the run.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("empty input, nothing to load; check the transform stage")]
    EmptyInput,

    #[error("missing columns for load: {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("more than {} distinct customer ids", u32::MAX)]
    KeySpaceExhausted,

    #[error("sink error: {0}")]
    Sink(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for EtlError {
    fn from(e: reqwest::Error) -> Self {
        EtlError::Sink(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_lists_every_column() {
        let err = EtlError::SchemaMismatch {
            missing: vec!["email".into(), "website".into(), "city".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("email"));
        assert!(msg.contains("website"));
        assert!(msg.contains("city"));
    }
}
