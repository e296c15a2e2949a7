use arrow::{csv::WriterBuilder, record_batch::RecordBatch};
use parquet::{
    arrow::ArrowWriter,
    basic::Compression,
    file::properties::WriterProperties,
};
use std::path::Path;
use tracing::info;

use crate::{
    error::{EtlError, Result},
    format::TableFormat,
    storage::Storage,
};

/// Write `batch` to `path` as CSV or Parquet, chosen by extension.
///
/// The whole file is encoded in memory first; the destination is only
/// touched once encoding succeeded. An existing file is replaced.
#[tracing::instrument(level = "info", skip(storage, batch, path), fields(path = %path.as_ref().display(), rows = batch.num_rows()))]
pub fn load<P: AsRef<Path>>(storage: &dyn Storage, batch: &RecordBatch, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = TableFormat::from_path(path)?;

    let bytes = encode(batch, format, path)?;
    storage
        .write(path, &bytes)
        .map_err(|e| EtlError::unwritable(path, e))?;

    info!(%format, bytes = bytes.len(), "loaded table");
    Ok(())
}

/// Encode a table without writing it anywhere.
pub fn encode(batch: &RecordBatch, format: TableFormat, path: &Path) -> Result<Vec<u8>> {
    match format {
        TableFormat::Csv => encode_csv(batch).map_err(|e| EtlError::invalid_input(path, e)),
        TableFormat::Parquet => {
            encode_parquet(batch).map_err(|e| EtlError::invalid_input(path, e))
        }
    }
}

/// Header row, no index column, fields quoted only when they need it.
fn encode_csv(batch: &RecordBatch) -> std::result::Result<Vec<u8>, arrow::error::ArrowError> {
    let mut writer = WriterBuilder::new().with_header(true).build(Vec::new());
    writer.write(batch)?;
    Ok(writer.into_inner())
}

fn encode_parquet(batch: &RecordBatch) -> std::result::Result<Vec<u8>, parquet::errors::ParquetError> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_dictionary_enabled(true)
        .build();

    let mut writer = ArrowWriter::try_new(Vec::new(), batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        extract::{extract_nested, extract_tabular},
        storage::{LocalStorage, MemoryStorage},
    };
    use arrow::{
        array::{Array, ArrayRef, Float64Array, ListBuilder, StringArray, StringBuilder},
        datatypes::{DataType, Field, Schema},
    };
    use std::sync::Arc;
    use tempfile::tempdir;

    fn small_table() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("stateid", DataType::Utf8, true),
            Field::new("note", DataType::Utf8, true),
            Field::new("price", DataType::Float64, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["CA", "NY"])) as ArrayRef,
                Arc::new(StringArray::from(vec![Some("cents, per kWh"), None])),
                Arc::new(Float64Array::from(vec![Some(15.5), None])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn csv_has_header_and_quotes_embedded_separators() {
        let store = MemoryStorage::new();
        load(&store, &small_table(), "out.csv").unwrap();

        let text = String::from_utf8(store.get(Path::new("out.csv")).unwrap().to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "stateid,note,price");
        assert_eq!(lines[1], "CA,\"cents, per kWh\",15.5");
        assert_eq!(lines[2], "NY,,");
    }

    #[test]
    fn csv_round_trip_is_identical() {
        let store = MemoryStorage::new();
        store.insert(
            "sales.csv",
            "period,stateid,sectorName,price,price-units\n\
             202301,CA,residential,15.5,cents per kWh\n\
             202302,NY,residential,,cents per kWh\n\
             202303,TX,transportation,13.8,\"cents, per kWh\"\n",
        );

        let first = extract_tabular(&store, "sales.csv").unwrap();
        load(&store, &first, "again.csv").unwrap();
        let second = extract_tabular(&store, "again.csv").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn parquet_round_trip_preserves_types() {
        let store = MemoryStorage::new();
        let table = small_table();
        load(&store, &table, "t.parquet").unwrap();
        let back = extract_tabular(&store, "t.parquet").unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn nested_table_with_lists_goes_to_parquet() {
        let store = MemoryStorage::new();
        store.insert(
            "cap.json",
            r#"[{"plant_id":"P001","location":{"state":"CA"},"fuels":["gas","oil"]}]"#,
        );
        let flat = extract_nested(&store, "cap.json").unwrap();
        load(&store, &flat, "cap.parquet").unwrap();

        let back = extract_tabular(&store, "cap.parquet").unwrap();
        assert_eq!(back.num_rows(), 1);
        assert_eq!(back.schema().field(2).name(), "fuels");
    }

    #[test]
    fn list_column_cannot_be_csv() {
        let mut fuels = ListBuilder::new(StringBuilder::new());
        fuels.values().append_value("gas");
        fuels.append(true);
        let fuels = fuels.finish();
        let schema = Schema::new(vec![Field::new("fuels", fuels.data_type().clone(), true)]);
        let table = RecordBatch::try_new(Arc::new(schema), vec![Arc::new(fuels)]).unwrap();

        let store = MemoryStorage::new();
        let err = load(&store, &table, "cap.csv").unwrap_err();
        assert!(matches!(err, EtlError::InvalidInput { .. }), "{err:?}");
        assert!(!store.contains(Path::new("cap.csv")));
    }

    #[test]
    fn unknown_extension_writes_nothing() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("out.xlsx");
        let err = load(&LocalStorage, &small_table(), &path).unwrap_err();
        assert!(matches!(err, EtlError::UnsupportedFormat { .. }), "{err:?}");
        assert!(!path.exists());
    }

    #[test]
    fn missing_directory_is_unwritable() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nope").join("out.csv");
        let err = load(&LocalStorage, &small_table(), &path).unwrap_err();
        assert!(
            matches!(err, EtlError::DestinationUnwritable { .. }),
            "{err:?}"
        );
    }

    #[test]
    fn overwrites_existing_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        std::fs::write(&path, "old,content\n1,2\n3,4\n5,6\n").unwrap();

        load(&LocalStorage, &small_table(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("stateid,note,price\n"));
        assert_eq!(text.lines().count(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn new_outputs_get_the_usual_file_mode() {
        use std::{fs, os::unix::fs::PermissionsExt};

        let tmp = tempdir().unwrap();
        let plain = tmp.path().join("plain.txt");
        fs::write(&plain, b"x").unwrap();
        let expected = fs::metadata(&plain).unwrap().permissions().mode() & 0o777;

        for name in ["sales.csv", "sales.parquet"] {
            let out = tmp.path().join(name);
            load(&LocalStorage, &small_table(), &out).unwrap();
            let mode = fs::metadata(&out).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, expected, "{name}");
        }
    }
}
