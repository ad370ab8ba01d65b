use std::io::Write;

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use serde::Serialize;

use crate::lda::TopicTerms;

/// Everything printed after training.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingSummary {
    pub k: usize,
    pub vocab_size: usize,
    pub documents: usize,
    pub log_likelihood: f64,
    pub log_perplexity: f64,
    pub topics: Vec<TopicTerms>,
}

/// Log-likelihood and log-perplexity on their own lines, then the topics
/// table.
pub fn write_text<W: Write>(out: &mut W, summary: &TrainingSummary, topics: &RecordBatch) -> Result<()> {
    writeln!(out, "{}", summary.log_likelihood)?;
    writeln!(out, "{}", summary.log_perplexity)?;
    write_table(out, topics)
}

/// Render a batch the way a dataframe `show()` does, without truncation.
pub fn write_table<W: Write>(out: &mut W, batch: &RecordBatch) -> Result<()> {
    let table = pretty_format_batches(std::slice::from_ref(batch)).context("formatting table")?;
    writeln!(out, "{table}")?;
    Ok(())
}

pub fn write_json<W: Write>(out: &mut W, summary: &TrainingSummary) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, summary).context("serializing summary")?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::Int32Array;
    use arrow::datatypes::{DataType, Field, Schema};

    fn summary() -> TrainingSummary {
        TrainingSummary {
            k: 2,
            vocab_size: 3,
            documents: 4,
            log_likelihood: -120.5,
            log_perplexity: 2.25,
            topics: vec![TopicTerms {
                topic: 0,
                term_indices: vec![2, 0],
                term_weights: vec![0.75, 0.25],
            }],
        }
    }

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("topic", DataType::Int32, false)]));
        RecordBatch::try_new(schema, vec![Arc::new(Int32Array::from(vec![0, 1]))]).unwrap()
    }

    #[test]
    fn text_starts_with_the_two_statistics() {
        let mut out = Vec::new();
        write_text(&mut out, &summary(), &batch()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("-120.5"));
        assert_eq!(lines.next(), Some("2.25"));
        assert!(text.contains("| topic |"));
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let mut out = Vec::new();
        write_json(&mut out, &summary()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["logLikelihood"], -120.5);
        assert_eq!(value["vocabSize"], 3);
        assert_eq!(value["topics"][0]["termIndices"][0], 2);
        assert_eq!(value["topics"][0]["termWeights"][1], 0.25);
    }
}
