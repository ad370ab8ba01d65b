use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LdaError {
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("dataset has no rows")]
    EmptyCorpus,

    #[error("dataset has rows but every term count is zero")]
    NoTokens,

    #[error("{tokens} tokens exceed the gibbs optimizer limit of {limit}")]
    TooManyTokens { tokens: f64, limit: usize },

    #[error("first row has no terms, vocabulary is empty")]
    EmptyVocabulary,

    #[error("row {row} has {found} terms but the vocabulary has {expected}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}, term {term}: count {value} must be finite and non-negative")]
    InvalidTermCount { row: usize, term: usize, value: f64 },

    #[error("row {row}, term {term}: count {value} is not an integer (required by the gibbs optimizer)")]
    NonIntegralCount { row: usize, term: usize, value: f64 },

    #[error("sampling failed: {0}")]
    Sampling(String),

    #[error("building output table: {0}")]
    Arrow(String),
}

impl LdaError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        LdaError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
