use std::sync::Arc;

use arrow::array::{Float64Builder, Int32Builder, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rayon::prelude::*;
use serde::Serialize;

use crate::data::model::{Dataset, features_type};

use super::corpus::Corpus;
use super::error::LdaError;
use super::inference::{
    DocInference, doc_rng, exp_dirichlet_expectation_rows, gamma_sampler,
    variational_topic_inference,
};
use super::special::{dirichlet_expectation, ln_gamma, log_sum_exp};

// ---------------------------------------------------------------------------
// TopicTerms – one row of describe_topics
// ---------------------------------------------------------------------------

/// The highest-weighted terms of one topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicTerms {
    pub topic: usize,
    /// Term indices, highest weight first.
    pub term_indices: Vec<usize>,
    /// Probability of each term within the topic.
    pub term_weights: Vec<f64>,
}

// ---------------------------------------------------------------------------
// LdaModel
// ---------------------------------------------------------------------------

/// A trained topic model: Dirichlet posteriors over each topic's term
/// distribution plus the document prior.
#[derive(Debug, Clone)]
pub struct LdaModel {
    lambda: Vec<Vec<f64>>,
    doc_concentration: Vec<f64>,
    topic_concentration: f64,
    vocab_size: usize,
    seed: u64,
}

impl LdaModel {
    pub(crate) fn new(
        lambda: Vec<Vec<f64>>,
        doc_concentration: Vec<f64>,
        topic_concentration: f64,
        seed: u64,
    ) -> Self {
        let vocab_size = lambda.first().map_or(0, Vec::len);
        Self {
            lambda,
            doc_concentration,
            topic_concentration,
            vocab_size,
            seed,
        }
    }

    /// Number of topics.
    pub fn k(&self) -> usize {
        self.lambda.len()
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// α after training (re-estimated when the online optimizer tunes it).
    pub fn doc_concentration(&self) -> &[f64] {
        &self.doc_concentration
    }

    /// η.
    pub fn topic_concentration(&self) -> f64 {
        self.topic_concentration
    }

    /// Unnormalised topic-term weights, `[topic][term]`.
    pub fn topics_matrix(&self) -> &[Vec<f64>] {
        &self.lambda
    }

    /// Per-document variational posteriors; `None` for documents without terms.
    fn infer(&self, corpus: &Corpus) -> Result<Vec<Option<DocInference>>, LdaError> {
        let exp_elog_beta = exp_dirichlet_expectation_rows(&self.lambda);
        let gamma_init = gamma_sampler()?;
        let alpha = &self.doc_concentration;

        Ok(corpus
            .docs
            .par_iter()
            .enumerate()
            .map(|(i, doc)| {
                if doc.is_empty() {
                    return None;
                }
                let mut rng = doc_rng(self.seed, i);
                Some(variational_topic_inference(
                    doc,
                    &exp_elog_beta,
                    alpha,
                    &gamma_init,
                    &mut rng,
                ))
            })
            .collect())
    }

    /// Variational lower bound on the log likelihood of `dataset`.
    pub fn log_likelihood(&self, dataset: &Dataset) -> Result<f64, LdaError> {
        let corpus = Corpus::from_dataset(dataset, Some(self.vocab_size))?;
        self.log_likelihood_bound(&corpus)
    }

    /// Upper bound on perplexity: −log_likelihood / token count.
    pub fn log_perplexity(&self, dataset: &Dataset) -> Result<f64, LdaError> {
        let corpus = Corpus::from_dataset(dataset, Some(self.vocab_size))?;
        let tokens = corpus.token_count();
        if tokens <= 0.0 {
            return Err(LdaError::NoTokens);
        }
        Ok(-self.log_likelihood_bound(&corpus)? / tokens)
    }

    fn log_likelihood_bound(&self, corpus: &Corpus) -> Result<f64, LdaError> {
        let alpha = &self.doc_concentration;
        let eta = self.topic_concentration;
        // lnΓ(0) is infinite, the bound has no finite value.
        if eta <= 0.0 {
            return Err(LdaError::invalid(
                "topicConcentration",
                "must be > 0 to evaluate the likelihood",
            ));
        }
        if alpha.iter().any(|&a| a <= 0.0) {
            return Err(LdaError::invalid(
                "docConcentration",
                "must be > 0 to evaluate the likelihood",
            ));
        }
        let elog_beta: Vec<Vec<f64>> = self.lambda.iter().map(|row| dirichlet_expectation(row)).collect();

        let sum_alpha: f64 = alpha.iter().sum();
        let ln_gamma_alpha: Vec<f64> = alpha.iter().map(|&a| ln_gamma(a)).collect();

        // E[log p(docs | θ, β)] + E[log p(θ | α) − log q(θ | γ)]
        let doc_bounds: Vec<f64> = self
            .infer(corpus)?
            .into_par_iter()
            .zip(corpus.docs.par_iter())
            .map(|(inference, doc)| {
                let Some(inference) = inference else {
                    return 0.0;
                };
                let gamma = &inference.gamma;
                let elog_theta = dirichlet_expectation(gamma);

                let mut bound: f64 = doc
                    .ids
                    .iter()
                    .zip(&doc.counts)
                    .map(|(&w, &c)| {
                        c * log_sum_exp(elog_theta.iter().zip(&elog_beta).map(|(et, eb)| et + eb[w]))
                    })
                    .sum();
                bound += alpha
                    .iter()
                    .zip(gamma)
                    .zip(&elog_theta)
                    .map(|((a, g), e)| (a - g) * e)
                    .sum::<f64>();
                bound += gamma
                    .iter()
                    .zip(&ln_gamma_alpha)
                    .map(|(&g, lga)| ln_gamma(g) - lga)
                    .sum::<f64>();
                bound += ln_gamma(sum_alpha) - ln_gamma(gamma.iter().sum());
                bound
            })
            .collect();
        let corpus_part: f64 = doc_bounds.iter().sum();

        // E[log p(β | η) − log q(β | λ)]
        let sum_eta = eta * self.vocab_size as f64;
        let ln_gamma_eta = ln_gamma(eta);
        let topics_part: f64 = self
            .lambda
            .iter()
            .zip(&elog_beta)
            .map(|(lambda_t, elog_beta_t)| {
                let terms: f64 = lambda_t
                    .iter()
                    .zip(elog_beta_t)
                    .map(|(&l, &e)| (eta - l) * e + ln_gamma(l) - ln_gamma_eta)
                    .sum();
                terms + ln_gamma(sum_eta) - ln_gamma(lambda_t.iter().sum())
            })
            .sum();

        Ok(corpus_part + topics_part)
    }

    /// Top `max_terms` terms of every topic, by normalised weight.
    pub fn describe_topics(&self, max_terms: usize) -> Vec<TopicTerms> {
        self.lambda
            .iter()
            .enumerate()
            .map(|(topic, row)| {
                let total: f64 = row.iter().sum();
                let mut weighted: Vec<(usize, f64)> =
                    row.iter().map(|&l| l / total).enumerate().collect();
                // Stable sort keeps ties in ascending term order.
                weighted.sort_by(|a, b| b.1.total_cmp(&a.1));
                weighted.truncate(max_terms);
                let (term_indices, term_weights) = weighted.into_iter().unzip();
                TopicTerms {
                    topic,
                    term_indices,
                    term_weights,
                }
            })
            .collect()
    }

    /// [`describe_topics`](Self::describe_topics) as a table with columns
    /// `topic`, `termIndices`, `termWeights`.
    pub fn describe_topics_frame(&self, max_terms: usize) -> Result<RecordBatch, LdaError> {
        let topics = self.describe_topics(max_terms);

        let mut topic_col = Int32Builder::new();
        let mut indices_col = ListBuilder::new(Int32Builder::new());
        let mut weights_col = ListBuilder::new(Float64Builder::new());
        for t in &topics {
            topic_col.append_value(t.topic as i32);
            for &i in &t.term_indices {
                indices_col.values().append_value(i as i32);
            }
            indices_col.append(true);
            weights_col.values().append_slice(&t.term_weights);
            weights_col.append(true);
        }

        let schema = Arc::new(Schema::new(vec![
            Field::new("topic", DataType::Int32, false),
            Field::new(
                "termIndices",
                DataType::List(Arc::new(Field::new("item", DataType::Int32, true))),
                false,
            ),
            Field::new("termWeights", features_type(), false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(topic_col.finish()),
                Arc::new(indices_col.finish()),
                Arc::new(weights_col.finish()),
            ],
        )
        .map_err(|e| LdaError::Arrow(e.to_string()))
    }

    /// Normalised γ of every row; all zeros for rows without terms.
    pub fn topic_distributions(&self, dataset: &Dataset) -> Result<Vec<Vec<f64>>, LdaError> {
        let corpus = Corpus::from_dataset(dataset, Some(self.vocab_size))?;
        let k = self.k();
        Ok(self
            .infer(&corpus)?
            .into_iter()
            .map(|inference| match inference {
                Some(inf) => {
                    let total: f64 = inf.gamma.iter().sum();
                    inf.gamma.iter().map(|g| g / total).collect()
                }
                None => vec![0.0; k],
            })
            .collect())
    }

    /// `dataset` with an added `topicDistribution` column.
    pub fn transform(&self, dataset: &Dataset) -> Result<RecordBatch, LdaError> {
        let distributions = self.topic_distributions(dataset)?;

        let mut builder = ListBuilder::new(Float64Builder::new());
        for dist in &distributions {
            builder.values().append_slice(dist);
            builder.append(true);
        }

        let input = dataset.record_batch();
        let mut fields: Vec<Field> = input.schema().fields().iter().map(|f| f.as_ref().clone()).collect();
        fields.push(Field::new("topicDistribution", features_type(), false));
        let mut columns = input.columns().to_vec();
        columns.push(Arc::new(builder.finish()));

        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
            .map_err(|e| LdaError::Arrow(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn model() -> LdaModel {
        LdaModel::new(
            vec![vec![5.0, 1.0, 3.0, 1.0], vec![1.0, 6.0, 1.0, 2.0]],
            vec![0.5, 0.5],
            0.5,
            7,
        )
    }

    #[test]
    fn describe_topics_sorts_by_weight() {
        let topics = model().describe_topics(3);
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].topic, 0);
        assert_eq!(topics[0].term_indices, vec![0, 2, 1]);
        assert_abs_diff_eq!(topics[0].term_weights[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(topics[0].term_weights[1], 0.3, epsilon = 1e-12);
        assert_eq!(topics[1].term_indices, vec![1, 3, 0]);
        for t in &topics {
            assert!(t.term_weights.windows(2).all(|w| w[0] >= w[1]));
        }
    }

    #[test]
    fn ties_keep_ascending_term_order() {
        let m = LdaModel::new(vec![vec![1.0, 2.0, 2.0, 2.0]; 2], vec![0.5; 2], 0.5, 0);
        assert_eq!(m.describe_topics(2)[0].term_indices, vec![1, 2]);
    }

    #[test]
    fn describe_topics_caps_at_vocabulary() {
        let topics = model().describe_topics(10);
        assert_eq!(topics[0].term_indices.len(), 4);
        let total: f64 = topics[0].term_weights.iter().sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn topics_frame_has_expected_columns() {
        let frame = model().describe_topics_frame(2).unwrap();
        let schema = frame.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["topic", "termIndices", "termWeights"]);
        assert_eq!(frame.num_rows(), 2);
    }

    #[test]
    fn perplexity_is_negative_likelihood_per_token() {
        let m = model();
        let ds = Dataset::from_rows(vec![vec![2.0, 0.0, 1.0, 0.0], vec![0.0, 3.0, 0.0, 1.0]]).unwrap();
        let ll = m.log_likelihood(&ds).unwrap();
        let lp = m.log_perplexity(&ds).unwrap();
        assert!(ll.is_finite());
        assert!(ll < 0.0);
        assert_abs_diff_eq!(lp, -ll / 7.0, epsilon = 1e-9);
    }

    #[test]
    fn likelihood_is_deterministic() {
        let m = model();
        let ds = Dataset::from_rows(vec![vec![1.0, 1.0, 0.0, 4.0]]).unwrap();
        assert_eq!(m.log_likelihood(&ds).unwrap(), m.log_likelihood(&ds).unwrap());
    }

    #[test]
    fn empty_rows_only_contribute_topic_term() {
        let m = model();
        let empty = Dataset::from_rows(vec![vec![0.0; 4]]).unwrap();
        let none = Dataset::from_rows(vec![]).unwrap();
        assert_eq!(m.log_likelihood(&empty).unwrap(), m.log_likelihood(&none).unwrap());
        assert_eq!(m.log_perplexity(&empty).unwrap_err(), LdaError::NoTokens);
    }

    #[test]
    fn evaluation_rejects_other_vocabulary() {
        let ds = Dataset::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        assert!(matches!(
            model().log_likelihood(&ds),
            Err(LdaError::DimensionMismatch { expected: 4, found: 2, .. })
        ));
    }

    #[test]
    fn zero_priors_cannot_be_evaluated() {
        let ds = Dataset::from_rows(vec![vec![2.0, 0.0, 1.0, 0.0]]).unwrap();
        let lambda = model().topics_matrix().to_vec();

        let no_eta = LdaModel::new(lambda.clone(), vec![0.5, 0.5], 0.0, 7);
        assert!(matches!(
            no_eta.log_likelihood(&ds),
            Err(LdaError::InvalidParameter { name: "topicConcentration", .. })
        ));
        assert!(no_eta.log_perplexity(&ds).is_err());

        let no_alpha = LdaModel::new(lambda, vec![0.0, 0.5], 0.5, 7);
        assert!(matches!(
            no_alpha.log_likelihood(&ds),
            Err(LdaError::InvalidParameter { name: "docConcentration", .. })
        ));
    }

    #[test]
    fn transform_appends_normalised_distributions() {
        let ds = Dataset::from_rows(vec![vec![4.0, 0.0, 2.0, 0.0], vec![0.0; 4]]).unwrap();
        let m = model();
        let dists = m.topic_distributions(&ds).unwrap();
        assert_abs_diff_eq!(dists[0].iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(dists[0][0] > dists[0][1]);
        assert_eq!(dists[1], vec![0.0, 0.0]);

        let batch = m.transform(&ds).unwrap();
        assert_eq!(batch.num_columns(), 2);
        assert_eq!(batch.schema().field(1).name(), "topicDistribution");
        assert_eq!(batch.num_rows(), 2);
    }
}
