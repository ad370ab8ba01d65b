use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, LargeListArray, ListArray};
use arrow::datatypes::DataType;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rayon::prelude::*;
use serde_json::Value as JsonValue;

use super::model::{Dataset, FEATURES_COLUMN, Record};
use super::parser::parse_line;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a `features` dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` / `.pq` – a `features` List<Float64|Float32> column
/// * `.json`            – `[{ "features": [...] }, ...]`
/// * anything else      – text, one vector of space-separated numbers per line
pub fn load_file(session: &Session, path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        _ => load_text(session, path)?,
    };
    info!("Loaded {} rows from {}", dataset.len(), path.display());
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Text loader
// ---------------------------------------------------------------------------

fn load_text(session: &Session, path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading text file {}", path.display()))?;
    parse_text(session, &text)
}

/// Parse every line of `text` on the session's workers.
///
/// Output order follows input order; a malformed line aborts the whole
/// load and is reported with its 1-based line number.
pub fn parse_text(session: &Session, text: &str) -> Result<Dataset> {
    let lines: Vec<&str> = text.lines().collect();
    debug!(
        "Parsing {} lines on {} worker(s)",
        lines.len(),
        session.parallelism()
    );

    let records: Vec<Record> = session.install(|| {
        lines
            .par_iter()
            .enumerate()
            .map(|(i, line)| parse_line(line).with_context(|| format!("line {}", i + 1)))
            .collect::<Result<Vec<Record>>>()
    })?;

    Dataset::from_records(records).context("building features dataset")
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON layout (records-oriented):
///
/// ```json
/// [
///   { "features": [1.0, 0.0, 3.0] },
///   { "features": [0.0, 2.0, 1.0] }
/// ]
/// ```
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let records = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let obj = row
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;
            json_array_to_f64(obj.get(FEATURES_COLUMN), i).map(Record::from)
        })
        .collect::<Result<Vec<_>>>()?;

    Dataset::from_records(records).context("building features dataset")
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{FEATURES_COLUMN}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("Row {row}, {FEATURES_COLUMN}[{j}]: not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with a `features` List or LargeList column of
/// Float64 or Float32 values. Other columns are ignored.
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let idx = batch
            .schema()
            .index_of(FEATURES_COLUMN)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{FEATURES_COLUMN}' column"))?;
        let col = batch.column(idx);

        for row in 0..batch.num_rows() {
            let values = extract_f64_list(col, row)
                .with_context(|| format!("Row {}: failed to read '{FEATURES_COLUMN}'", records.len()))?;
            records.push(Record::from(values));
        }
    }

    Dataset::from_records(records).context("building features dataset")
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}
