use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use parquet::arrow::ArrowWriter;

use super::model::Dataset;
use super::parser::SEPARATOR;

/// Write one line per row, values separated by single spaces.
pub fn write_text(dataset: &Dataset, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for row in dataset.rows() {
        let line = row
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string());
        writeln!(out, "{line}")?;
    }
    out.flush().context("flushing text output")?;
    Ok(())
}

/// Write the dataset's Arrow batch as a Parquet file.
pub fn write_parquet(dataset: &Dataset, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer =
        ArrowWriter::try_new(file, dataset.schema(), None).context("creating parquet writer")?;
    writer
        .write(dataset.record_batch())
        .context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
