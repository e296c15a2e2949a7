//! Flatten a JSON document (an array of nested objects) into one table.
//!
//! One row per top-level object, one column per distinct path from the
//! root to a leaf. Paths and column types are discovered in a single pass
//! over the parsed tree; rows are materialized into arrow arrays afterwards.

use arrow::{
    array::{
        Array, ArrayBuilder, ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, ListBuilder,
        StringBuilder,
    },
    datatypes::{Field, Schema},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use serde_json::{Map, Value};
use std::{collections::HashMap, path::Path, sync::Arc};
use tracing::debug;

use crate::{
    error::{EtlError, Result},
    format::DocumentFormat,
    storage::Storage,
};

/// Joins the keys of nested objects, e.g. `location.state`.
pub const SEPARATOR: &str = ".";

/// Read a `.json` file and flatten it with [`flatten`].
///
/// Any other extension is `UnsupportedFormat` before the file is opened.
/// Fails with `SourceNotFound` when the file cannot be read and with
/// `MalformedInput` when it is not JSON or not an array of objects.
#[tracing::instrument(level = "info", skip(storage, path), fields(path = %path.as_ref().display()))]
pub fn extract_nested<P: AsRef<Path>>(storage: &dyn Storage, path: P) -> Result<RecordBatch> {
    let path = path.as_ref();
    DocumentFormat::from_path(path)?;

    let data = storage
        .read(path)
        .map_err(|e| EtlError::source_not_found(path, e))?;

    let doc: Value = serde_json::from_slice(&data).map_err(|e| EtlError::malformed_file(path, e))?;
    let batch = flatten_document(&doc, &path.display().to_string())?;

    debug!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "flattened document"
    );
    Ok(batch)
}

/// Flatten an already parsed document.
///
/// A top-level object is treated as a one-row document.
pub fn flatten(doc: &Value) -> Result<RecordBatch> {
    flatten_document(doc, "document")
}

fn flatten_document(doc: &Value, context: &str) -> Result<RecordBatch> {
    let records: Vec<&Map<String, Value>> = match doc {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_object().ok_or_else(|| {
                    EtlError::malformed_value(
                        context,
                        format!("element {i} is {}, expected an object", kind_name(item)),
                    )
                })
            })
            .collect::<Result<_>>()?,
        Value::Object(obj) => vec![obj],
        other => {
            return Err(EtlError::malformed_value(
                context,
                format!(
                    "top-level value is {}, expected an array of objects",
                    kind_name(other)
                ),
            ))
        }
    };

    let mut schema = FlatSchema::default();
    let rows: Vec<HashMap<usize, &Value>> = records
        .into_iter()
        .enumerate()
        .map(|(i, obj)| -> Result<HashMap<usize, &Value>> {
            let mut row = HashMap::new();
            schema.walk("", obj, &mut row).map_err(|path| {
                EtlError::malformed_value(
                    context,
                    format!("record {i}: two keys both flatten to {path:?}"),
                )
            })?;
            Ok(row)
        })
        .collect::<Result<_>>()?;

    schema.materialize(&rows)
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Type of a single leaf value, widened as more values are seen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScalarKind {
    Null,
    Bool,
    Int,
    Float,
    Text,
}

impl ScalarKind {
    fn of(v: &Value) -> Self {
        match v {
            Value::Null => ScalarKind::Null,
            Value::Bool(_) => ScalarKind::Bool,
            Value::Number(n) if n.is_i64() => ScalarKind::Int,
            Value::Number(_) => ScalarKind::Float,
            // nested containers inside a sequence are kept as JSON text
            Value::String(_) | Value::Array(_) | Value::Object(_) => ScalarKind::Text,
        }
    }

    fn unify(self, other: Self) -> Self {
        use ScalarKind::*;
        match (self, other) {
            (Null, k) | (k, Null) => k,
            (a, b) if a == b => a,
            (Int, Float) | (Float, Int) => Float,
            _ => Text,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColumnKind {
    Scalar(ScalarKind),
    List(ScalarKind),
    /// Scalars in some rows, sequences in others: rendered as JSON text.
    Mixed,
}

impl ColumnKind {
    fn of(v: &Value) -> Self {
        match v {
            Value::Array(items) => ColumnKind::List(
                items
                    .iter()
                    .map(ScalarKind::of)
                    .fold(ScalarKind::Null, ScalarKind::unify),
            ),
            other => ColumnKind::Scalar(ScalarKind::of(other)),
        }
    }

    fn unify(self, other: Self) -> Self {
        use ColumnKind::*;
        match (self, other) {
            (Scalar(ScalarKind::Null), k) | (k, Scalar(ScalarKind::Null)) => k,
            (Scalar(a), Scalar(b)) => Scalar(a.unify(b)),
            (List(a), List(b)) => List(a.unify(b)),
            _ => Mixed,
        }
    }
}

/// Flattened column paths in order of first appearance, with their kinds.
#[derive(Debug, Default)]
struct FlatSchema {
    names: Vec<String>,
    kinds: Vec<ColumnKind>,
    index: HashMap<String, usize>,
}

impl FlatSchema {
    fn observe(&mut self, path: String, value: &Value) -> usize {
        let kind = ColumnKind::of(value);
        match self.index.get(&path) {
            Some(&col) => {
                self.kinds[col] = self.kinds[col].unify(kind);
                col
            }
            None => {
                let col = self.names.len();
                self.index.insert(path.clone(), col);
                self.names.push(path);
                self.kinds.push(kind);
                col
            }
        }
    }

    /// Depth-first walk of one object, registering every leaf path.
    ///
    /// A key that already contains the separator can land on the same path
    /// as a nested key (`{"a.b": 1, "a": {"b": 2}}`); that path is returned
    /// as the error instead of keeping either value.
    fn walk<'a>(
        &mut self,
        prefix: &str,
        obj: &'a Map<String, Value>,
        row: &mut HashMap<usize, &'a Value>,
    ) -> std::result::Result<(), String> {
        for (key, value) in obj {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}{SEPARATOR}{key}")
            };

            match value {
                Value::Object(inner) => self.walk(&path, inner, row)?,
                Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
                    for (i, item) in items.iter().enumerate() {
                        if let Value::Object(inner) = item {
                            self.walk(&format!("{path}{SEPARATOR}{i}"), inner, row)?;
                        }
                    }
                }
                leaf => {
                    let col = self.observe(path, leaf);
                    if row.insert(col, leaf).is_some() {
                        return Err(self.names[col].clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn materialize(&self, rows: &[HashMap<usize, &Value>]) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.names.len());
        let mut columns = Vec::with_capacity(self.names.len());

        for (col, (name, kind)) in self.names.iter().zip(&self.kinds).enumerate() {
            let cells = rows.iter().map(|row| row.get(&col).copied());
            let array = build_column(*kind, cells);
            fields.push(Field::new(name, array.data_type().clone(), true));
            columns.push(array);
        }

        let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
        Ok(RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            columns,
            &options,
        )?)
    }
}

fn build_column<'a>(kind: ColumnKind, cells: impl Iterator<Item = Option<&'a Value>>) -> ArrayRef {
    match kind {
        ColumnKind::Scalar(ScalarKind::Bool) => scalar_array(BooleanBuilder::new(), cells, push_bool),
        ColumnKind::Scalar(ScalarKind::Int) => scalar_array(Int64Builder::new(), cells, push_int),
        ColumnKind::Scalar(ScalarKind::Float) => {
            scalar_array(Float64Builder::new(), cells, push_float)
        }
        ColumnKind::Scalar(ScalarKind::Null | ScalarKind::Text) | ColumnKind::Mixed => {
            scalar_array(StringBuilder::new(), cells, push_text)
        }
        ColumnKind::List(ScalarKind::Bool) => list_array(BooleanBuilder::new(), cells, push_bool),
        ColumnKind::List(ScalarKind::Int) => list_array(Int64Builder::new(), cells, push_int),
        ColumnKind::List(ScalarKind::Float) => list_array(Float64Builder::new(), cells, push_float),
        ColumnKind::List(ScalarKind::Null | ScalarKind::Text) => {
            list_array(StringBuilder::new(), cells, push_text)
        }
    }
}

fn scalar_array<'a, B, F>(
    mut builder: B,
    cells: impl Iterator<Item = Option<&'a Value>>,
    push: F,
) -> ArrayRef
where
    B: ArrayBuilder,
    F: Fn(&mut B, Option<&Value>),
{
    for cell in cells {
        push(&mut builder, cell);
    }
    builder.finish()
}

fn list_array<'a, B, F>(
    values: B,
    cells: impl Iterator<Item = Option<&'a Value>>,
    push: F,
) -> ArrayRef
where
    B: ArrayBuilder,
    F: Fn(&mut B, Option<&Value>),
{
    let mut builder = ListBuilder::new(values);
    for cell in cells {
        match cell {
            Some(Value::Array(items)) => {
                for item in items {
                    push(builder.values(), Some(item));
                }
                builder.append(true);
            }
            _ => builder.append(false),
        }
    }
    Arc::new(builder.finish())
}

fn push_bool(b: &mut BooleanBuilder, v: Option<&Value>) {
    b.append_option(v.and_then(Value::as_bool));
}

fn push_int(b: &mut Int64Builder, v: Option<&Value>) {
    b.append_option(v.and_then(Value::as_i64));
}

fn push_float(b: &mut Float64Builder, v: Option<&Value>) {
    b.append_option(v.and_then(Value::as_f64));
}

fn push_text(b: &mut StringBuilder, v: Option<&Value>) {
    match v {
        None | Some(Value::Null) => b.append_null(),
        Some(Value::String(s)) => b.append_value(s),
        Some(other) => b.append_value(other.to_string()),
    }
}
