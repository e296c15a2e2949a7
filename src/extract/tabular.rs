use arrow::{
    compute::concat_batches,
    csv::{reader::Format, ReaderBuilder},
    datatypes::SchemaRef,
    error::ArrowError,
    record_batch::RecordBatch,
};
use bytes::Bytes;
use once_cell::sync::Lazy;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use regex::Regex;
use std::{io::Cursor, path::Path, sync::Arc};
use tracing::debug;

use crate::{
    error::{EtlError, Result},
    format::TableFormat,
    storage::Storage,
};

/// Rows per arrow batch while decoding; batches are concatenated afterwards.
const BATCH_SIZE: usize = 64 * 1024;

/// CSV cells read as null, in every column: blank plus the usual NA spellings.
static CSV_NULLS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(|NA|N/A|n/a|NaN|nan|-NaN|-nan|NULL|null|None|#N/A|<NA>)$").unwrap()
});

/// Read a `.csv` (header row required) or `.parquet` file into one table.
///
/// The extension is checked before the file is opened. Column names and
/// types come from the file: CSV types are inferred over every row,
/// Parquet types are taken as stored.
#[tracing::instrument(level = "info", skip(storage, path), fields(path = %path.as_ref().display()))]
pub fn extract_tabular<P: AsRef<Path>>(storage: &dyn Storage, path: P) -> Result<RecordBatch> {
    let path = path.as_ref();
    let format = TableFormat::from_path(path)?;

    let data = storage
        .read(path)
        .map_err(|e| EtlError::source_not_found(path, e))?;

    let batch = match format {
        TableFormat::Csv => read_csv(&data),
        TableFormat::Parquet => read_parquet(data),
    }
    .map_err(|e| EtlError::malformed_file(path, e))?;

    debug!(
        %format,
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "extracted table"
    );
    Ok(batch)
}

fn read_csv(data: &[u8]) -> std::result::Result<RecordBatch, ArrowError> {
    let format = Format::default()
        .with_header(true)
        .with_null_regex(CSV_NULLS.clone());
    let (schema, _) = format.infer_schema(Cursor::new(data), None)?;
    let schema: SchemaRef = Arc::new(schema);

    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .with_batch_size(BATCH_SIZE)
        .build(Cursor::new(data))?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    concat_batches(&schema, &batches)
}

fn read_parquet(data: Bytes) -> std::result::Result<RecordBatch, ArrowError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data)?;
    let schema = builder.schema().clone();
    let reader = builder.with_batch_size(BATCH_SIZE).build()?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    concat_batches(&schema, &batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LocalStorage, MemoryStorage};
    use arrow::{
        array::{Array, Float64Array, Int64Array, StringArray},
        datatypes::DataType,
    };
    use tempfile::tempdir;

    const SALES: &str = "\
period,stateid,stateDescription,sectorid,sectorName,price,price-units
202301,CA,California,RES,residential,15.5,cents per kWh
202302,NY,New York,RES,residential,,cents per kWh
";

    #[test]
    fn csv_types_are_inferred_and_blanks_become_null() {
        let store = MemoryStorage::new();
        store.insert("sales.csv", SALES);

        let batch = extract_tabular(&store, "sales.csv").unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 7);

        let schema = batch.schema();
        assert_eq!(schema.field(0).name(), "period");
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(5).data_type(), &DataType::Float64);

        let period = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(period.value(0), 202301);

        let price = batch
            .column(5)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(price.value(0), 15.5);
        assert!(price.is_null(1));

        let units = batch
            .column(6)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(units.value(1), "cents per kWh");
    }

    #[test]
    fn unknown_extension_fails_before_reading() {
        // nothing stored at that path: an attempted read would be SourceNotFound
        let store = MemoryStorage::new();
        let err = extract_tabular(&store, "sales.xlsx").unwrap_err();
        assert!(matches!(err, EtlError::UnsupportedFormat { .. }), "{err:?}");
    }

    #[test]
    fn missing_file_is_source_not_found_with_path() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("absent.csv");
        let err = extract_tabular(&LocalStorage, &path).unwrap_err();
        match err {
            EtlError::SourceNotFound { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn garbage_parquet_is_malformed() {
        let store = MemoryStorage::new();
        store.insert("cap.parquet", "definitely not parquet");
        let err = extract_tabular(&store, "cap.parquet").unwrap_err();
        assert!(matches!(err, EtlError::MalformedInput { .. }), "{err:?}");
    }

    #[test]
    fn na_spellings_are_null_and_keep_the_column_numeric() {
        let store = MemoryStorage::new();
        store.insert(
            "sales.csv",
            "\
period,stateid,sectorName,price,price-units
202301,CA,residential,15.5,c
202302,NY,residential,NA,c
202303,TX,transportation,NaN,c
202304,WA,residential,null,c
202305,OR,transportation,N/A,c
",
        );

        let batch = extract_tabular(&store, "sales.csv").unwrap();
        let price = batch
            .column_by_name("price")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(price.null_count(), 4);
        assert_eq!(price.value(0), 15.5);

        let out = crate::transform::transform_sales(&batch).unwrap();
        assert_eq!(out.num_rows(), 1);
    }
}
