//! Small, fixed input files for trying the pipeline end to end.

use arrow::{
    array::{ArrayRef, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use serde_json::{json, Value};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::info;

use crate::{
    error::{EtlError, Result},
    load::load,
    storage::Storage,
};

pub const SALES_FILE: &str = "electricity_sales.csv";
pub const CAPABILITY_FILE: &str = "electricity_capability_nested.json";

/// Five monthly sales rows: one commercial, one with no price.
pub fn sales_table() -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("period", DataType::Utf8, true),
        Field::new("stateid", DataType::Utf8, true),
        Field::new("stateDescription", DataType::Utf8, true),
        Field::new("sectorid", DataType::Utf8, true),
        Field::new("sectorName", DataType::Utf8, true),
        Field::new("price", DataType::Float64, true),
        Field::new("price-units", DataType::Utf8, true),
    ]);

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec![
            "202301", "202301", "202302", "202302", "202303",
        ])),
        Arc::new(StringArray::from(vec!["CA", "NY", "CA", "NY", "TX"])),
        Arc::new(StringArray::from(vec![
            "California",
            "New York",
            "California",
            "New York",
            "Texas",
        ])),
        Arc::new(StringArray::from(vec!["RES", "TRA", "COM", "RES", "TRA"])),
        Arc::new(StringArray::from(vec![
            "residential",
            "transportation",
            "commercial",
            "residential",
            "transportation",
        ])),
        Arc::new(Float64Array::from(vec![
            Some(15.5),
            Some(14.2),
            Some(16.0),
            None,
            Some(13.8),
        ])),
        Arc::new(StringArray::from(vec!["cents per kWh"; 5])),
    ];

    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

/// Generating plants with a nested location and a per-unit breakdown.
pub fn capability_document() -> Value {
    json!([
        {
            "plant_id": "P001",
            "location": {"state": "CA", "city": "Los Angeles"},
            "capacity_mw": 100.5,
            "fuel_type": "natural gas",
            "units": [
                {"unit_id": "U1", "capacity_mw": 60.0},
                {"unit_id": "U2", "capacity_mw": 40.5}
            ]
        },
        {
            "plant_id": "P002",
            "location": {"state": "NY", "city": "Albany"},
            "capacity_mw": 250.0,
            "fuel_type": "hydro",
            "units": [{"unit_id": "U1", "capacity_mw": 250.0}]
        },
        {
            "plant_id": "P003",
            "location": {"state": "TX", "city": "Austin", "county": "Travis"},
            "capacity_mw": 75.25,
            "fuel_type": "wind",
            "tags": ["renewable", "onshore"]
        }
    ])
}

/// Write both sample inputs into `dir`, returning (sales, capability) paths.
pub fn write_samples(storage: &dyn Storage, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let sales_path = dir.join(SALES_FILE);
    load(storage, &sales_table()?, &sales_path)?;

    let cap_path = dir.join(CAPABILITY_FILE);
    let body = serde_json::to_vec_pretty(&capability_document())
        .map_err(|e| EtlError::invalid_input(&cap_path, e))?;
    storage
        .write(&cap_path, &body)
        .map_err(|e| EtlError::unwritable(&cap_path, e))?;

    info!(
        sales = %sales_path.display(),
        capability = %cap_path.display(),
        "wrote sample inputs"
    );
    Ok((sales_path, cap_path))
}
