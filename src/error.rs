//! Error types for the extract / transform / load operations.

use std::path::{Path, PathBuf};

use arrow::error::ArrowError;
use thiserror::Error;

/// Every way an extract, transform or load call can fail.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Input path does not exist or could not be read.
    #[error("source not found: {}", path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Extension is not one of the supported table formats.
    #[error("unsupported format for {}: expected one of {expected}", path.display())]
    UnsupportedFormat {
        path: PathBuf,
        expected: &'static str,
    },

    /// File content could not be parsed, or a value could not be interpreted.
    #[error("malformed input in {context}: {message}")]
    MalformedInput {
        context: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Required columns absent from a table handed to the transformer.
    /// `actual` is every column the table did have, for diagnosis.
    #[error(
        "schema mismatch: missing column(s) {}; table has {}",
        missing.join(", "),
        actual.join(", ")
    )]
    SchemaMismatch {
        missing: Vec<String>,
        actual: Vec<String>,
    },

    /// A table the target format cannot represent.
    #[error("invalid input for {}: {message}", path.display())]
    InvalidInput {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Output directory missing or not writable.
    #[error("destination unwritable: {}", path.display())]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EtlError {
    pub fn source_not_found(path: &Path, source: std::io::Error) -> Self {
        Self::SourceNotFound {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn unsupported(path: &Path, expected: &'static str) -> Self {
        Self::UnsupportedFormat {
            path: path.to_path_buf(),
            expected,
        }
    }

    /// Parse failure while reading `path`.
    pub fn malformed_file<E>(path: &Path, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::MalformedInput {
            context: path.display().to_string(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Bad value with no underlying error, e.g. a period that is not `YYYYMM`.
    pub fn malformed_value(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            context: context.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_input<E>(path: &Path, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::InvalidInput {
            path: path.to_path_buf(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn unwritable(path: &Path, source: std::io::Error) -> Self {
        Self::DestinationUnwritable {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Arrow failures while reshaping an in-memory table have no path to report.
impl From<ArrowError> for EtlError {
    fn from(err: ArrowError) -> Self {
        Self::MalformedInput {
            context: "table".into(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Result type for extract / transform / load operations.
pub type Result<T> = std::result::Result<T, EtlError>;
