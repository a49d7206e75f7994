use inat_protocol::LookupError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HistoryError>;

/// Invalid link recognizer configuration.
#[derive(Error, Debug)]
pub enum LinkConfigError {
    #[error("Invalid {pattern} pattern: {source}")]
    InvalidPattern {
        pattern: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("The {pattern} pattern must define a named `{group}` group")]
    MissingGroup {
        pattern: &'static str,
        group: &'static str,
    },

    #[error("Failed to read link config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Link config is not valid JSON or TOML: {0}")]
    Parse(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
}
