use crate::data::model::Dataset;

use super::error::LdaError;

/// One document as sparse term counts (only non-zero entries).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Document {
    pub ids: Vec<usize>,
    pub counts: Vec<f64>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn token_count(&self) -> f64 {
        self.counts.iter().sum()
    }
}

/// Term-count view of a dataset, validated against a vocabulary size.
#[derive(Debug, Clone)]
pub(crate) struct Corpus {
    pub docs: Vec<Document>,
    pub vocab_size: usize,
}

impl Corpus {
    /// Convert every row into a document. The vocabulary size is taken
    /// from the first row unless `vocab_size` is given.
    pub fn from_dataset(dataset: &Dataset, vocab_size: Option<usize>) -> Result<Self, LdaError> {
        let vocab_size = match vocab_size {
            Some(v) => v,
            None => {
                let first = dataset.row(0).ok_or(LdaError::EmptyCorpus)?;
                if first.is_empty() {
                    return Err(LdaError::EmptyVocabulary);
                }
                first.len()
            }
        };

        let docs = dataset
            .rows()
            .enumerate()
            .map(|(row, values)| {
                if values.len() != vocab_size {
                    return Err(LdaError::DimensionMismatch {
                        row,
                        expected: vocab_size,
                        found: values.len(),
                    });
                }
                let mut doc = Document {
                    ids: Vec::new(),
                    counts: Vec::new(),
                };
                for (term, &value) in values.iter().enumerate() {
                    if !value.is_finite() || value < 0.0 {
                        return Err(LdaError::InvalidTermCount { row, term, value });
                    }
                    if value > 0.0 {
                        doc.ids.push(term);
                        doc.counts.push(value);
                    }
                }
                Ok(doc)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Corpus { docs, vocab_size })
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn token_count(&self) -> f64 {
        self.docs.iter().map(Document::token_count).sum()
    }

    /// Fail on the first count that is not a whole number.
    pub fn ensure_integral(&self) -> Result<(), LdaError> {
        for (row, doc) in self.docs.iter().enumerate() {
            for (&term, &value) in doc.ids.iter().zip(&doc.counts) {
                if value.fract() != 0.0 {
                    return Err(LdaError::NonIntegralCount { row, term, value });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_non_zero_counts() {
        let ds = Dataset::from_rows(vec![vec![0.0, 2.0, 0.0, 1.0], vec![0.0; 4]]).unwrap();
        let corpus = Corpus::from_dataset(&ds, None).unwrap();
        assert_eq!(corpus.vocab_size, 4);
        assert_eq!(corpus.docs[0].ids, vec![1, 3]);
        assert_eq!(corpus.docs[0].counts, vec![2.0, 1.0]);
        assert!(corpus.docs[1].is_empty());
        assert_eq!(corpus.token_count(), 3.0);
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let ds = Dataset::from_rows(vec![]).unwrap();
        assert_eq!(Corpus::from_dataset(&ds, None).unwrap_err(), LdaError::EmptyCorpus);
        // With a known vocabulary an empty corpus is fine.
        assert_eq!(Corpus::from_dataset(&ds, Some(3)).unwrap().len(), 0);
    }

    #[test]
    fn zero_length_first_row_is_rejected() {
        let ds = Dataset::from_rows(vec![vec![]]).unwrap();
        assert_eq!(Corpus::from_dataset(&ds, None).unwrap_err(), LdaError::EmptyVocabulary);
    }

    #[test]
    fn heterogeneous_lengths_are_rejected() {
        let ds = Dataset::from_rows(vec![vec![1.0, 2.0], vec![1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(
            Corpus::from_dataset(&ds, None).unwrap_err(),
            LdaError::DimensionMismatch {
                row: 1,
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn negative_and_nan_counts_are_rejected() {
        let ds = Dataset::from_rows(vec![vec![1.0, -2.0]]).unwrap();
        assert!(matches!(
            Corpus::from_dataset(&ds, None),
            Err(LdaError::InvalidTermCount { row: 0, term: 1, .. })
        ));
        let ds = Dataset::from_rows(vec![vec![f64::NAN, 1.0]]).unwrap();
        assert!(Corpus::from_dataset(&ds, None).is_err());
    }

    #[test]
    fn fractional_counts_fail_integral_check() {
        let ds = Dataset::from_rows(vec![vec![1.0, 2.0], vec![0.5, 1.0]]).unwrap();
        let corpus = Corpus::from_dataset(&ds, None).unwrap();
        assert_eq!(
            corpus.ensure_integral().unwrap_err(),
            LdaError::NonIntegralCount {
                row: 1,
                term: 0,
                value: 0.5
            }
        );
    }
}
