//! Batch ETL for electricity sales and generating-capability data.
//!
//! Four operations make up the job, each callable on its own:
//! [`extract_tabular`] reads CSV or Parquet, [`extract_nested`] reads and
//! flattens a JSON document, [`transform_sales`] filters and reshapes the
//! sales table, and [`load`] writes a table as CSV or Parquet. All file
//! access goes through a [`Storage`] passed in by the caller.

pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod load;
pub mod pipeline;
pub mod sample;
pub mod storage;
pub mod transform;

pub use config::PipelineConfig;
pub use error::{EtlError, Result};
pub use extract::{extract_nested, extract_tabular};
pub use format::{DocumentFormat, TableFormat};
pub use load::load;
pub use pipeline::{run, RunSummary};
pub use storage::{LocalStorage, MemoryStorage, Storage};
pub use transform::transform_sales;
