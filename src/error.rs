use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading sources or building the integrated dataset
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("{source_name} data is required as the primary dataset (expected {file_name})")]
    MissingSource {
        source_name: &'static str,
        file_name: &'static str,
    },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error reading {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Query-level failures; reported back as structured results, never panics
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Field '{0}' not found")]
    UnknownDimension(String),
}

/// Failure of an external recommendation source; callers fall back to rules
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("recommendation source '{source_name}' failed: {message}")]
    SourceFailed {
        source_name: String,
        message: String,
    },
}
