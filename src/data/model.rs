use std::ops::Deref;
use std::sync::Arc;

use arrow::array::{Array, AsArray, Float64Builder, ListArray, ListBuilder};
use arrow::datatypes::{DataType, Field, Float64Type, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

/// Name of the single column every [`Dataset`] carries.
pub const FEATURES_COLUMN: &str = "features";

// ---------------------------------------------------------------------------
// FeatureVector – one parsed line
// ---------------------------------------------------------------------------

/// An ordered, immutable sequence of `f64` values (one sample).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Box<[f64]>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        FeatureVector(values.into_boxed_slice())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Deref for FeatureVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        FeatureVector::new(values)
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the dataset
// ---------------------------------------------------------------------------

/// A single-field row: one vector under the `features` column.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub features: FeatureVector,
}

impl Record {
    pub fn new(features: FeatureVector) -> Self {
        Record { features }
    }
}

impl From<Vec<f64>> for Record {
    fn from(values: Vec<f64>) -> Self {
        Record::new(FeatureVector::new(values))
    }
}

// ---------------------------------------------------------------------------
// Dataset – Arrow-backed collection of records
// ---------------------------------------------------------------------------

/// Arrow type of the `features` column: `List<Float64>`.
pub fn features_type() -> DataType {
    DataType::List(Arc::new(Field::new("item", DataType::Float64, true)))
}

/// The fixed one-column schema: `features`, `List<Float64>`, non-nullable.
pub fn features_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![Field::new(
        FEATURES_COLUMN,
        features_type(),
        false,
    )]))
}

/// An ordered collection of [`Record`]s sharing the `features` schema.
///
/// Rows are not required to have equal lengths; consumers that need a
/// fixed width (the LDA trainer) check it themselves.
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
}

impl Dataset {
    /// Build a dataset from records, preserving their order.
    pub fn from_records<I>(records: I) -> Result<Self, ArrowError>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut builder = ListBuilder::new(Float64Builder::new());
        for record in records {
            builder.values().append_slice(&record.features);
            builder.append(true);
        }
        let features = builder.finish();

        let batch = RecordBatch::try_new(features_schema(), vec![Arc::new(features)])?;
        Ok(Dataset { batch })
    }

    /// Convenience constructor from plain rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ArrowError> {
        Self::from_records(rows.into_iter().map(Record::from))
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// The underlying Arrow batch.
    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    fn features_array(&self) -> &ListArray {
        // The schema is fixed at construction, column 0 is always List<Float64>.
        self.batch.column(0).as_list::<i32>()
    }

    /// Borrow the vector stored at `row`.
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.len() {
            return None;
        }
        let list = self.features_array();
        let offsets = list.value_offsets();
        let values = list.values().as_primitive::<Float64Type>().values();
        Some(&values[offsets[row] as usize..offsets[row + 1] as usize])
    }

    /// Iterate over all vectors in row order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        let list = self.features_array();
        let offsets = list.value_offsets();
        let values = list.values().as_primitive::<Float64Type>().values();
        (0..list.len()).map(move |i| &values[offsets[i] as usize..offsets[i + 1] as usize])
    }

    /// Copy the rows back out as records.
    pub fn to_records(&self) -> Vec<Record> {
        self.rows().map(|r| Record::from(r.to_vec())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_single_non_nullable_features_column() {
        let ds = Dataset::from_rows(vec![vec![1.0]]).unwrap();
        let schema = ds.schema();
        assert_eq!(schema.fields().len(), 1);
        let field = schema.field(0);
        assert_eq!(field.name(), FEATURES_COLUMN);
        assert_eq!(field.data_type(), &features_type());
        assert!(!field.is_nullable());
    }

    #[test]
    fn empty_records_give_empty_dataset() {
        let ds = Dataset::from_records(Vec::new()).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.len(), 0);
        assert_eq!(ds.rows().count(), 0);
        assert!(ds.row(0).is_none());
    }

    #[test]
    fn rows_keep_order_and_values() {
        let ds = Dataset::from_rows(vec![vec![1.0, 2.5, 3.0], vec![4.0], vec![]]).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.row(0), Some(&[1.0, 2.5, 3.0][..]));
        assert_eq!(ds.row(1), Some(&[4.0][..]));
        assert_eq!(ds.row(2), Some(&[][..]));
        let collected: Vec<Vec<f64>> = ds.rows().map(|r| r.to_vec()).collect();
        assert_eq!(collected, vec![vec![1.0, 2.5, 3.0], vec![4.0], vec![]]);
    }

    #[test]
    fn heterogeneous_lengths_are_accepted() {
        let ds = Dataset::from_rows(vec![vec![1.0, 2.0], vec![1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(ds.row(1).map(|r| r.len()), Some(3));
    }

    #[test]
    fn records_round_trip_through_batch() {
        let records = vec![Record::from(vec![0.5, 1.5]), Record::from(vec![2.0])];
        let ds = Dataset::from_records(records.clone()).unwrap();
        assert_eq!(ds.to_records(), records);
    }
}
