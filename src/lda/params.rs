use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::error::LdaError;

// ---------------------------------------------------------------------------
// Optimizer
// ---------------------------------------------------------------------------

/// Inference algorithm used by [`super::Lda::fit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Optimizer {
    /// Online variational Bayes over mini-batches.
    #[default]
    Online,
    /// Collapsed Gibbs sampling over the full corpus.
    Gibbs,
}

impl fmt::Display for Optimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Optimizer::Online => write!(f, "online"),
            Optimizer::Gibbs => write!(f, "gibbs"),
        }
    }
}

impl FromStr for Optimizer {
    type Err = LdaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "online" => Ok(Optimizer::Online),
            "gibbs" => Ok(Optimizer::Gibbs),
            other => Err(LdaError::invalid(
                "optimizer",
                format!("unknown optimizer '{other}', expected 'online' or 'gibbs'"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// LdaParams
// ---------------------------------------------------------------------------

/// Estimator configuration. Serialized as camelCase JSON; missing fields
/// take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LdaParams {
    /// Number of topics.
    pub k: usize,
    pub max_iter: usize,
    pub seed: u64,
    pub optimizer: Optimizer,
    /// Dirichlet prior on document-topic mixtures, one value or `k` values.
    /// `None` means `1/k` for every topic.
    pub doc_concentration: Option<Vec<f64>>,
    /// Dirichlet prior on topic-term distributions. `None` means `1/k`.
    pub topic_concentration: Option<f64>,
    /// τ₀: downweights early online iterations.
    pub learning_offset: f64,
    /// κ: exponential decay of the online learning rate.
    pub learning_decay: f64,
    /// Fraction of the corpus sampled per online iteration.
    pub subsampling_rate: f64,
    /// Re-estimate the doc concentration during online training.
    pub optimize_doc_concentration: bool,
}

impl Default for LdaParams {
    fn default() -> Self {
        Self {
            k: 10,
            max_iter: 10,
            seed: 42,
            optimizer: Optimizer::Online,
            doc_concentration: None,
            topic_concentration: None,
            learning_offset: 1024.0,
            learning_decay: 0.51,
            subsampling_rate: 0.05,
            optimize_doc_concentration: true,
        }
    }
}

impl LdaParams {
    /// Read parameters from a JSON file.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading params file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing params file {}", path.display()))
    }

    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<(), LdaError> {
        if self.k < 2 {
            return Err(LdaError::invalid("k", format!("must be > 1, got {}", self.k)));
        }

        // Gibbs weights are proportional to the priors, so they must be positive.
        let strict = self.optimizer == Optimizer::Gibbs;
        let check_prior = |name: &'static str, v: f64| -> Result<(), LdaError> {
            if !v.is_finite() || v < 0.0 || (strict && v == 0.0) {
                let bound = if strict { "> 0" } else { ">= 0" };
                return Err(LdaError::invalid(name, format!("must be finite and {bound}, got {v}")));
            }
            Ok(())
        };

        if let Some(alpha) = &self.doc_concentration {
            if alpha.len() != 1 && alpha.len() != self.k {
                return Err(LdaError::invalid(
                    "docConcentration",
                    format!("must have length 1 or k={}, got {}", self.k, alpha.len()),
                ));
            }
            for &a in alpha {
                check_prior("docConcentration", a)?;
            }
        }
        if let Some(eta) = self.topic_concentration {
            check_prior("topicConcentration", eta)?;
        }

        if !(self.learning_offset > 0.0) {
            return Err(LdaError::invalid(
                "learningOffset",
                format!("must be > 0, got {}", self.learning_offset),
            ));
        }
        if !(self.learning_decay > 0.5 && self.learning_decay <= 1.0) {
            return Err(LdaError::invalid(
                "learningDecay",
                format!("must be in (0.5, 1.0], got {}", self.learning_decay),
            ));
        }
        if !(self.subsampling_rate > 0.0 && self.subsampling_rate <= 1.0) {
            return Err(LdaError::invalid(
                "subsamplingRate",
                format!("must be in (0, 1], got {}", self.subsampling_rate),
            ));
        }
        Ok(())
    }

    /// Doc concentration expanded to one value per topic.
    pub fn resolved_doc_concentration(&self) -> Vec<f64> {
        match &self.doc_concentration {
            None => vec![1.0 / self.k as f64; self.k],
            Some(v) if v.len() == 1 => vec![v[0]; self.k],
            Some(v) => v.clone(),
        }
    }

    pub fn resolved_topic_concentration(&self) -> f64 {
        self.topic_concentration.unwrap_or(1.0 / self.k as f64)
    }
}
