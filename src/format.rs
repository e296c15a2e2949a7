use std::{fmt, path::Path};

use crate::error::{EtlError, Result};

/// Table formats the extractor and loader can dispatch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableFormat {
    /// Comma-separated text with a header row.
    Csv,
    /// Apache Parquet.
    Parquet,
}

impl TableFormat {
    pub const ALL: [TableFormat; 2] = [TableFormat::Csv, TableFormat::Parquet];

    const EXPECTED: &'static str = ".csv, .parquet";

    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Parquet => "parquet",
        }
    }

    /// Resolve the format from the final extension of `path`, ignoring case.
    /// Only looks at the name, never touches the file system.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| EtlError::unsupported(path, Self::EXPECTED))?;

        Self::ALL
            .into_iter()
            .find(|f| ext.eq_ignore_ascii_case(f.extension()))
            .ok_or_else(|| EtlError::unsupported(path, Self::EXPECTED))
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Document formats the nested extractor accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Json,
}

impl DocumentFormat {
    const EXPECTED: &'static str = ".json";

    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Json => "json",
        }
    }

    /// Same rules as [`TableFormat::from_path`].
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|s| s.to_str());
        match ext {
            Some(ext) if ext.eq_ignore_ascii_case(DocumentFormat::Json.extension()) => {
                Ok(DocumentFormat::Json)
            }
            _ => Err(EtlError::unsupported(path, Self::EXPECTED)),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
