use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma};
use rayon::prelude::*;

use super::corpus::{Corpus, Document};
use super::error::LdaError;
use super::inference::{
    DocInference, doc_rng, exp_dirichlet_expectation_rows, gamma_sampler,
    variational_topic_inference,
};
use super::params::LdaParams;
use super::special::{dirichlet_expectation, trigamma};

/// Online variational Bayes (Hoffman et al.) over Bernoulli-sampled
/// mini-batches.
pub(crate) struct OnlineOptimizer<'a> {
    corpus: &'a Corpus,
    k: usize,
    /// λ, `[topic][term]`.
    lambda: Vec<Vec<f64>>,
    alpha: Vec<f64>,
    eta: f64,
    tau0: f64,
    kappa: f64,
    subsampling_rate: f64,
    optimize_doc_concentration: bool,
    iteration: usize,
    rng: StdRng,
    gamma_init: Gamma<f64>,
}

impl<'a> OnlineOptimizer<'a> {
    pub fn new(corpus: &'a Corpus, params: &LdaParams) -> Result<Self, LdaError> {
        let gamma_init = gamma_sampler()?;
        let mut rng = StdRng::seed_from_u64(params.seed);
        let lambda = (0..params.k)
            .map(|_| {
                (0..corpus.vocab_size)
                    .map(|_| gamma_init.sample(&mut rng))
                    .collect()
            })
            .collect();

        Ok(Self {
            corpus,
            k: params.k,
            lambda,
            alpha: params.resolved_doc_concentration(),
            eta: params.resolved_topic_concentration(),
            tau0: params.learning_offset,
            kappa: params.learning_decay,
            subsampling_rate: params.subsampling_rate,
            optimize_doc_concentration: params.optimize_doc_concentration,
            iteration: 0,
            rng,
            gamma_init,
        })
    }

    /// Learning rate for the current iteration: (τ₀ + t)^(−κ).
    fn rho(&self) -> f64 {
        (self.tau0 + self.iteration as f64).powf(-self.kappa)
    }

    /// Sample a mini-batch and update λ (and α) from it.
    pub fn step(&mut self) {
        let rate = self.subsampling_rate;
        let corpus = self.corpus;
        let batch: Vec<(usize, &Document)> = corpus
            .docs
            .iter()
            .enumerate()
            .filter(|_| rate >= 1.0 || self.rng.gen_bool(rate))
            .filter(|(_, d)| !d.is_empty())
            .collect();

        if batch.is_empty() {
            debug!("Online LDA: sampled mini-batch has no non-empty documents, skipping");
            return;
        }
        let batch_seed: u64 = self.rng.gen();
        self.submit_mini_batch(&batch, batch_seed);
    }

    fn submit_mini_batch(&mut self, batch: &[(usize, &Document)], batch_seed: u64) {
        self.iteration += 1;
        let exp_elog_beta = exp_dirichlet_expectation_rows(&self.lambda);

        let alpha = &self.alpha;
        let gamma_init = &self.gamma_init;
        let results: Vec<(usize, DocInference)> = batch
            .par_iter()
            .map(|&(i, doc)| {
                let mut rng = doc_rng(batch_seed, i);
                (i, variational_topic_inference(doc, &exp_elog_beta, alpha, gamma_init, &mut rng))
            })
            .collect();

        let mut stat = vec![vec![0.0; self.corpus.vocab_size]; self.k];
        let mut logphat = vec![0.0; self.k];
        for (i, inference) in &results {
            let doc = &self.corpus.docs[*i];
            for (t, row) in inference.sstats.iter().enumerate() {
                for (&w, &s) in doc.ids.iter().zip(row) {
                    stat[t][w] += s;
                }
            }
            for (acc, e) in logphat.iter_mut().zip(dirichlet_expectation(&inference.gamma)) {
                *acc += e;
            }
        }

        let n = results.len() as f64;
        for (stat_t, beta_t) in stat.iter_mut().zip(&exp_elog_beta) {
            for (s, &b) in stat_t.iter_mut().zip(beta_t) {
                *s *= b;
            }
        }
        self.update_lambda(&stat, n);

        if self.optimize_doc_concentration {
            logphat.iter_mut().for_each(|v| *v /= n);
            self.update_alpha(&logphat, n);
        }
        debug!(
            "Online LDA iteration {}: batch of {} documents, rho = {:.5}",
            self.iteration,
            results.len(),
            self.rho()
        );
    }

    /// λ ← (1 − ρ)λ + ρ(stat · D/|batch| + η)
    fn update_lambda(&mut self, stat: &[Vec<f64>], batch_size: f64) {
        let weight = self.rho();
        let scale = self.corpus.len() as f64 / batch_size;
        let eta = self.eta;
        for (lambda_t, stat_t) in self.lambda.iter_mut().zip(stat) {
            for (l, &s) in lambda_t.iter_mut().zip(stat_t) {
                *l = (1.0 - weight) * *l + weight * (s * scale + eta);
            }
        }
    }

    /// One Newton step on α from the batch mean of E[log θ]; skipped if
    /// any component would become non-positive.
    fn update_alpha(&mut self, logphat: &[f64], n: f64) {
        let weight = self.rho();
        let alpha = &self.alpha;

        let gradf: Vec<f64> = dirichlet_expectation(alpha)
            .iter()
            .zip(logphat)
            .map(|(e, l)| n * (-e + l))
            .collect();
        let c = n * trigamma(alpha.iter().sum());
        let q: Vec<f64> = alpha.iter().map(|&a| -n * trigamma(a)).collect();
        let b = gradf.iter().zip(&q).map(|(g, q)| g / q).sum::<f64>()
            / (1.0 / c + q.iter().map(|q| 1.0 / q).sum::<f64>());
        let updated: Vec<f64> = alpha
            .iter()
            .zip(gradf.iter().zip(&q))
            .map(|(&a, (g, q))| a + weight * (-(g - b) / q))
            .collect();

        if updated.iter().all(|&a| a > 0.0) {
            self.alpha = updated;
        }
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Final (λ, α).
    pub fn into_parts(self) -> (Vec<Vec<f64>>, Vec<f64>) {
        (self.lambda, self.alpha)
    }
}
