use log::debug;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::corpus::Corpus;
use super::error::LdaError;
use super::params::LdaParams;

/// Upper bound on the tokens expanded for sampling.
pub(crate) const MAX_TOKENS: usize = 100_000_000;

/// Collapsed Gibbs sampler over token-level topic assignments.
pub(crate) struct GibbsSampler {
    k: usize,
    vocab_size: usize,
    alpha: Vec<f64>,
    eta: f64,

    // documents expanded to one term id per token
    docs: Vec<Vec<usize>>,

    z: Vec<Vec<usize>>,   // topic of each token
    ndk: Vec<Vec<usize>>, // [doc][topic]
    nkw: Vec<Vec<usize>>, // [topic][term]
    nk: Vec<usize>,       // [topic]

    rng: StdRng,
    sweeps: usize,
}

impl GibbsSampler {
    pub fn new(corpus: &Corpus, params: &LdaParams) -> Result<Self, LdaError> {
        corpus.ensure_integral()?;
        let tokens = corpus.token_count();
        if tokens > MAX_TOKENS as f64 {
            return Err(LdaError::TooManyTokens {
                tokens,
                limit: MAX_TOKENS,
            });
        }

        let k = params.k;
        let v = corpus.vocab_size;
        let docs: Vec<Vec<usize>> = corpus
            .docs
            .iter()
            .map(|doc| {
                doc.ids
                    .iter()
                    .zip(&doc.counts)
                    .flat_map(|(&w, &c)| std::iter::repeat(w).take(c as usize))
                    .collect()
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut ndk = vec![vec![0usize; k]; docs.len()];
        let mut nkw = vec![vec![0usize; v]; k];
        let mut nk = vec![0usize; k];
        let mut z = Vec::with_capacity(docs.len());

        for (d, doc) in docs.iter().enumerate() {
            let assignments: Vec<usize> = doc
                .iter()
                .map(|&w| {
                    let topic = rng.gen_range(0..k);
                    ndk[d][topic] += 1;
                    nkw[topic][w] += 1;
                    nk[topic] += 1;
                    topic
                })
                .collect();
            z.push(assignments);
        }

        Ok(Self {
            k,
            vocab_size: v,
            alpha: params.resolved_doc_concentration(),
            eta: params.resolved_topic_concentration(),
            docs,
            z,
            ndk,
            nkw,
            nk,
            rng,
            sweeps: 0,
        })
    }

    /// Resample every token once.
    pub fn sweep(&mut self) {
        let v_eta = self.vocab_size as f64 * self.eta;
        let mut weights = vec![0.0f64; self.k];

        for d in 0..self.docs.len() {
            for i in 0..self.docs[d].len() {
                let w = self.docs[d][i];
                let old = self.z[d][i];

                self.ndk[d][old] -= 1;
                self.nkw[old][w] -= 1;
                self.nk[old] -= 1;

                // p(t) ∝ (n_dt + α_t)(n_tw + η) / (n_t + Vη)
                for (t, weight) in weights.iter_mut().enumerate() {
                    let left = self.ndk[d][t] as f64 + self.alpha[t];
                    let right = (self.nkw[t][w] as f64 + self.eta) / (self.nk[t] as f64 + v_eta);
                    *weight = left * right;
                }
                let new = match WeightedIndex::new(&weights) {
                    Ok(dist) => dist.sample(&mut self.rng),
                    Err(_) => self.rng.gen_range(0..self.k),
                };

                self.z[d][i] = new;
                self.ndk[d][new] += 1;
                self.nkw[new][w] += 1;
                self.nk[new] += 1;
            }
        }

        self.sweeps += 1;
        debug!("Gibbs LDA sweep {}", self.sweeps);
    }

    /// Topic-term pseudo-counts λ = n_kw + η, and α.
    pub fn into_parts(self) -> (Vec<Vec<f64>>, Vec<f64>) {
        let eta = self.eta;
        let lambda = self
            .nkw
            .into_iter()
            .map(|row| row.into_iter().map(|n| n as f64 + eta).collect())
            .collect();
        (lambda, self.alpha)
    }
}
