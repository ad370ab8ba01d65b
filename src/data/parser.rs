use std::num::ParseFloatError;

use thiserror::Error;

use super::model::{FeatureVector, Record};

/// Token separator of the text format.
pub const SEPARATOR: char = ' ';

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("line contains no values")]
    Empty,
    #[error("token {position} ('{token}') is not a number")]
    InvalidNumber {
        token: String,
        position: usize,
        #[source]
        source: ParseFloatError,
    },
}

/// Parse one line of space-separated numbers into a `features` record.
///
/// Trailing empty tokens (trailing spaces) are ignored. An interior empty
/// token, i.e. two consecutive spaces, is an error like any other
/// non-numeric token.
pub fn parse_line(line: &str) -> Result<Record, ParseError> {
    parse_vector(line).map(Record::new)
}

/// Parse one line into a bare vector.
pub fn parse_vector(line: &str) -> Result<FeatureVector, ParseError> {
    let mut tokens: Vec<&str> = line.split(SEPARATOR).collect();
    while tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    tokens
        .iter()
        .enumerate()
        .map(|(position, tok)| {
            tok.trim_matches(|c: char| c.is_ascii_whitespace() || c.is_ascii_control())
                .parse::<f64>()
                .map_err(|source| ParseError::InvalidNumber {
                    token: tok.to_string(),
                    position,
                    source,
                })
        })
        .collect::<Result<Vec<f64>, _>>()
        .map(FeatureVector::new)
}
