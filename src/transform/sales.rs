//! Reshape the raw electricity sales table into the published layout.

use arrow::{
    array::{Array, ArrayRef, AsArray, BooleanArray, StringArray, StringBuilder},
    compute::{cast, filter_record_batch, is_not_null},
    datatypes::{DataType, Field, Float32Type, Float64Type, Schema},
    record_batch::RecordBatch,
};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, info};

use super::period::Period;
use crate::error::{EtlError, Result};

/// Columns the raw table must carry; anything else is ignored.
pub const REQUIRED_COLUMNS: [&str; 5] = ["period", "stateid", "sectorName", "price", "price-units"];

/// Sector names that survive, compared exactly.
pub const KEPT_SECTORS: [&str; 2] = ["residential", "transportation"];

/// Output column order.
pub const OUTPUT_COLUMNS: [&str; 5] = ["year", "month", "stateid", "price", "price-units"];

/// Header spellings found in older exports, as (found, required).
/// Renamed before the required-column check, unless the required name is
/// already present.
pub const COLUMN_ALIASES: [(&str, &str); 11] = [
    ("Period", "period"),
    ("Date", "period"),
    ("StateID", "stateid"),
    ("StateId", "stateid"),
    ("SectorName", "sectorName"),
    ("sectorname", "sectorName"),
    ("Price", "price"),
    ("UnitPrice", "price"),
    ("Price-Units", "price-units"),
    ("price_units", "price-units"),
    ("unit_price", "price-units"),
];

/// Filter and reshape a raw sales table.
///
/// Headers listed in [`COLUMN_ALIASES`] are renamed first.
///
/// 1. drop rows with a null or NaN `price`
/// 2. keep `sectorName` of exactly `residential` or `transportation`
/// 3. `month` = first four characters of `period`, `year` = last two
/// 4. project to `year, month, stateid, price, price-units`
///
/// Row order is preserved. Every surviving `period` must be `YYYYMM`;
/// a null or malformed one fails the whole call with `MalformedInput`.
#[tracing::instrument(level = "info", skip(raw), fields(rows = raw.num_rows()))]
pub fn transform_sales(raw: &RecordBatch) -> Result<RecordBatch> {
    let raw = &normalize_headers(raw)?;
    let schema = raw.schema();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| schema.index_of(name).is_err())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(EtlError::SchemaMismatch {
            missing,
            actual: column_names(raw),
        });
    }

    // 1) prices
    let priced = filter_record_batch(raw, &has_price(column(raw, "price")?)?)?;

    // 2) sectors
    let sectors = text_column(&priced, "sectorName")?;
    let keep: BooleanArray = sectors
        .iter()
        .map(|s| Some(s.is_some_and(|s| KEPT_SECTORS.iter().any(|k| *k == s))))
        .collect();
    let kept = filter_record_batch(&priced, &keep)?;

    debug!(
        null_price = raw.num_rows() - priced.num_rows(),
        other_sector = priced.num_rows() - kept.num_rows(),
        "dropped rows"
    );

    // 3) period split
    let periods = text_column(&kept, "period")?;
    let mut year = StringBuilder::with_capacity(kept.num_rows(), kept.num_rows() * 2);
    let mut month = StringBuilder::with_capacity(kept.num_rows(), kept.num_rows() * 4);
    for (row, raw_period) in periods.iter().enumerate() {
        let text = raw_period.ok_or_else(|| {
            EtlError::malformed_value("period", format!("row {row} of the filtered table is null"))
        })?;
        let period = Period::parse(text).ok_or_else(|| {
            EtlError::malformed_value(
                "period",
                format!("row {row} of the filtered table: {text:?} is not YYYYMM"),
            )
        })?;
        month.append_value(period.leading());
        year.append_value(period.trailing());
    }

    // 4) projection
    let kept_schema = kept.schema();
    let mut fields = vec![
        Field::new("year", DataType::Utf8, false),
        Field::new("month", DataType::Utf8, false),
    ];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(year.finish()), Arc::new(month.finish())];
    for name in &OUTPUT_COLUMNS[2..] {
        let idx = kept_schema.index_of(name)?;
        fields.push(kept_schema.field(idx).clone());
        columns.push(kept.column(idx).clone());
    }

    let out = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    info!(
        rows_in = raw.num_rows(),
        rows_out = out.num_rows(),
        "transformed sales"
    );
    Ok(out)
}

/// Rename aliased headers; columns and their order are untouched.
fn normalize_headers(raw: &RecordBatch) -> Result<RecordBatch> {
    let schema = raw.schema();
    let mut taken: HashSet<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
    let mut renamed = Vec::new();

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| {
            let target = COLUMN_ALIASES
                .iter()
                .find(|(alias, _)| *alias == f.name().as_str())
                .map(|(_, required)| *required);
            match target {
                Some(required) if taken.insert(required.to_string()) => {
                    renamed.push(format!("{} -> {required}", f.name()));
                    f.as_ref().clone().with_name(required)
                }
                _ => f.as_ref().clone(),
            }
        })
        .collect();

    if renamed.is_empty() {
        return Ok(raw.clone());
    }
    debug!(?renamed, "renamed aliased headers");
    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    Ok(RecordBatch::try_new(Arc::new(schema), raw.columns().to_vec())?)
}

/// True where the price is present: not null and, for float columns, not NaN.
fn has_price(price: &ArrayRef) -> Result<BooleanArray> {
    let mask: BooleanArray = match price.data_type() {
        DataType::Float64 => price
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| Some(v.is_some_and(|v| !v.is_nan())))
            .collect(),
        DataType::Float32 => price
            .as_primitive::<Float32Type>()
            .iter()
            .map(|v| Some(v.is_some_and(|v| !v.is_nan())))
            .collect(),
        _ => is_not_null(price)?,
    };
    Ok(mask)
}

fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect()
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| EtlError::SchemaMismatch {
            missing: vec![name.to_string()],
            actual: column_names(batch),
        })
}

/// Read any column as text; integer periods from CSV inference become `"202301"`.
fn text_column(batch: &RecordBatch, name: &str) -> Result<StringArray> {
    let as_text = cast(column(batch, name)?, &DataType::Utf8)?;
    as_text
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| EtlError::malformed_value(name, "column could not be read as text"))
}
