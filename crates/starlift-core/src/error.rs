use thiserror::Error;

/// Errors raised while building [`crate::AppConfig`] from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Errors raised while reading rows out of a delimited import file.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("could not open import file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("could not read row {row} of {path}: {source}")]
    Read {
        path: String,
        row: usize,
        #[source]
        source: csv::Error,
    },
}

/// A pre-flight validation failure, fatal to the whole import.
///
/// `row` and `column` are 1-based, matching how operators count lines and
/// columns in a spreadsheet. `message` is the full human-readable sentence.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RowError {
    pub row: usize,
    pub column: usize,
    pub message: String,
}
