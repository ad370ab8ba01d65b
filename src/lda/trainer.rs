use log::{debug, info};

use crate::data::model::Dataset;

use super::corpus::Corpus;
use super::error::LdaError;
use super::gibbs::GibbsSampler;
use super::model::LdaModel;
use super::online::OnlineOptimizer;
use super::params::{LdaParams, Optimizer};

/// LDA estimator. Configure with the setters, then [`fit`](Lda::fit) a
/// `features` dataset of term counts.
#[derive(Debug, Clone, Default)]
pub struct Lda {
    params: LdaParams,
}

impl Lda {
    pub fn new(params: LdaParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LdaParams {
        &self.params
    }

    pub fn set_k(mut self, k: usize) -> Self {
        self.params.k = k;
        self
    }

    pub fn set_max_iter(mut self, max_iter: usize) -> Self {
        self.params.max_iter = max_iter;
        self
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.params.seed = seed;
        self
    }

    pub fn set_optimizer(mut self, optimizer: Optimizer) -> Self {
        self.params.optimizer = optimizer;
        self
    }

    /// Train on every row of `dataset`. Rows must all have the length of
    /// the first row.
    pub fn fit(&self, dataset: &Dataset) -> Result<LdaModel, LdaError> {
        let params = &self.params;
        params.validate()?;
        let corpus = Corpus::from_dataset(dataset, None)?;

        info!(
            "Training LDA: k={}, maxIter={}, optimizer={}, {} documents, vocabulary {}",
            params.k,
            params.max_iter,
            params.optimizer,
            corpus.len(),
            corpus.vocab_size
        );

        let (lambda, alpha) = match params.optimizer {
            Optimizer::Online => {
                let mut optimizer = OnlineOptimizer::new(&corpus, params)?;
                for _ in 0..params.max_iter {
                    optimizer.step();
                }
                debug!(
                    "Online LDA applied {} of {} iterations",
                    optimizer.iteration(),
                    params.max_iter
                );
                optimizer.into_parts()
            }
            Optimizer::Gibbs => {
                let mut sampler = GibbsSampler::new(&corpus, params)?;
                for _ in 0..params.max_iter {
                    sampler.sweep();
                }
                sampler.into_parts()
            }
        };

        Ok(LdaModel::new(
            lambda,
            alpha,
            params.resolved_topic_concentration(),
            params.seed,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two disjoint vocabularies: terms 0..3 and 3..6.
    fn separated() -> Dataset {
        let mut rows = Vec::new();
        for i in 0..10 {
            let a = (i % 3) as f64;
            rows.push(vec![5.0 + a, 4.0, 6.0 - a, 0.0, 0.0, 0.0]);
            rows.push(vec![0.0, 0.0, 0.0, 4.0 + a, 6.0, 5.0 - a]);
        }
        Dataset::from_rows(rows).unwrap()
    }

    fn fast_params() -> LdaParams {
        LdaParams {
            k: 2,
            subsampling_rate: 1.0,
            learning_offset: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn setters_chain_like_an_estimator() {
        let lda = Lda::default().set_k(4).set_max_iter(3).set_seed(9).set_optimizer(Optimizer::Gibbs);
        assert_eq!(lda.params().k, 4);
        assert_eq!(lda.params().max_iter, 3);
        assert_eq!(lda.params().seed, 9);
        assert_eq!(lda.params().optimizer, Optimizer::Gibbs);
    }

    #[test]
    fn fit_returns_k_topics_over_vocabulary() {
        let model = Lda::new(fast_params()).set_k(3).fit(&separated()).unwrap();
        assert_eq!(model.k(), 3);
        assert_eq!(model.vocab_size(), 6);
        assert_eq!(model.describe_topics(2).len(), 3);
    }

    #[test]
    fn invalid_k_is_rejected_before_training() {
        let err = Lda::new(fast_params()).set_k(1).fit(&separated()).unwrap_err();
        assert!(matches!(err, LdaError::InvalidParameter { name: "k", .. }));
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let ds = Dataset::from_rows(vec![]).unwrap();
        assert_eq!(Lda::new(fast_params()).fit(&ds).unwrap_err(), LdaError::EmptyCorpus);
    }

    #[test]
    fn heterogeneous_rows_fail_in_fit() {
        let ds = Dataset::from_rows(vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0]]).unwrap();
        assert_eq!(
            Lda::new(fast_params()).fit(&ds).unwrap_err(),
            LdaError::DimensionMismatch {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let ds = separated();
        let a = Lda::new(fast_params()).set_max_iter(5).fit(&ds).unwrap();
        let b = Lda::new(fast_params()).set_max_iter(5).fit(&ds).unwrap();
        assert_eq!(a.topics_matrix(), b.topics_matrix());
        assert_eq!(a.log_likelihood(&ds).unwrap(), b.log_likelihood(&ds).unwrap());
    }

    #[test]
    fn online_training_improves_the_bound() {
        let ds = separated();
        let untrained = Lda::new(fast_params()).set_max_iter(0).fit(&ds).unwrap();
        let trained = Lda::new(fast_params()).set_max_iter(30).fit(&ds).unwrap();
        assert!(trained.log_likelihood(&ds).unwrap() > untrained.log_likelihood(&ds).unwrap());
        assert!(trained.log_perplexity(&ds).unwrap() < untrained.log_perplexity(&ds).unwrap());
    }

    #[test]
    fn gibbs_training_improves_the_bound() {
        let ds = separated();
        let params = LdaParams {
            optimizer: Optimizer::Gibbs,
            ..fast_params()
        };
        let untrained = Lda::new(params.clone()).set_max_iter(0).fit(&ds).unwrap();
        let trained = Lda::new(params).set_max_iter(50).fit(&ds).unwrap();
        assert!(trained.log_likelihood(&ds).unwrap() > untrained.log_likelihood(&ds).unwrap());
    }

    #[test]
    fn gibbs_rejects_fractional_counts() {
        let ds = Dataset::from_rows(vec![vec![0.5, 1.0]]).unwrap();
        let err = Lda::new(fast_params())
            .set_optimizer(Optimizer::Gibbs)
            .fit(&ds)
            .unwrap_err();
        assert!(matches!(err, LdaError::NonIntegralCount { .. }));
    }
}
