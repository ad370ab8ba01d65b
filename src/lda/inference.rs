use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma};

use super::corpus::Document;
use super::error::LdaError;
use super::special::dirichlet_expectation;

/// Shape of the Gamma used to initialise λ and per-document γ.
pub(crate) const GAMMA_SHAPE: f64 = 100.0;

const MEAN_CHANGE_TOL: f64 = 1e-3;
const MAX_INNER_ITERATIONS: usize = 1_000;
const PHI_FLOOR: f64 = 1e-100;

/// Gamma(shape = 100, scale = 1/100): mean 1, small spread.
pub(crate) fn gamma_sampler() -> Result<Gamma<f64>, LdaError> {
    Gamma::new(GAMMA_SHAPE, 1.0 / GAMMA_SHAPE).map_err(|e| LdaError::Sampling(e.to_string()))
}

/// Deterministic RNG for document `index` under `seed`.
pub(crate) fn doc_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_add(index as u64))
}

/// exp(E[log β]) for each row of λ (rows are topics).
pub(crate) fn exp_dirichlet_expectation_rows(lambda: &[Vec<f64>]) -> Vec<Vec<f64>> {
    lambda
        .iter()
        .map(|row| dirichlet_expectation(row).into_iter().map(f64::exp).collect())
        .collect()
}

/// Variational posterior of one document.
#[derive(Debug, Clone)]
pub(crate) struct DocInference {
    /// γ: Dirichlet parameters of q(θ), one per topic.
    pub gamma: Vec<f64>,
    /// Sufficient statistics, `[topic][j]` for the j-th non-zero term of the document.
    pub sstats: Vec<Vec<f64>>,
}

/// Fit q(θ | γ) for a single document with the topics held fixed.
///
/// Alternates the γ update and the φ normaliser until the mean absolute
/// change of γ drops to 1e-3.
pub(crate) fn variational_topic_inference<R: Rng>(
    doc: &Document,
    exp_elog_beta: &[Vec<f64>],
    alpha: &[f64],
    gamma_init: &Gamma<f64>,
    rng: &mut R,
) -> DocInference {
    let k = alpha.len();
    let mut gamma: Vec<f64> = (0..k).map(|_| gamma_init.sample(rng)).collect();
    let mut exp_elog_theta = exp_expectation(&gamma);
    let mut phi_norm = phi_normalizer(doc, exp_elog_beta, &exp_elog_theta);

    for _ in 0..MAX_INNER_ITERATIONS {
        let last = gamma.clone();
        for (t, g) in gamma.iter_mut().enumerate() {
            let beta_t = &exp_elog_beta[t];
            let weighted: f64 = doc
                .ids
                .iter()
                .zip(&doc.counts)
                .zip(&phi_norm)
                .map(|((&w, &c), &p)| beta_t[w] * c / p)
                .sum();
            *g = exp_elog_theta[t] * weighted + alpha[t];
        }
        exp_elog_theta = exp_expectation(&gamma);
        phi_norm = phi_normalizer(doc, exp_elog_beta, &exp_elog_theta);

        let mean_change =
            gamma.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum::<f64>() / k as f64;
        if mean_change <= MEAN_CHANGE_TOL {
            break;
        }
    }

    let sstats = exp_elog_theta
        .iter()
        .map(|&theta| {
            doc.counts
                .iter()
                .zip(&phi_norm)
                .map(|(&c, &p)| theta * c / p)
                .collect()
        })
        .collect();

    DocInference { gamma, sstats }
}

fn exp_expectation(gamma: &[f64]) -> Vec<f64> {
    dirichlet_expectation(gamma).into_iter().map(f64::exp).collect()
}

fn phi_normalizer(doc: &Document, exp_elog_beta: &[Vec<f64>], exp_elog_theta: &[f64]) -> Vec<f64> {
    doc.ids
        .iter()
        .map(|&w| {
            exp_elog_beta
                .iter()
                .zip(exp_elog_theta)
                .map(|(beta_t, &theta_t)| beta_t[w] * theta_t)
                .sum::<f64>()
                + PHI_FLOOR
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn doc(ids: Vec<usize>, counts: Vec<f64>) -> Document {
        Document { ids, counts }
    }

    #[test]
    fn gamma_sampler_has_unit_mean() {
        let g = gamma_sampler().unwrap();
        let mut rng = doc_rng(7, 0);
        let mean: f64 = (0..2000).map(|_| g.sample(&mut rng)).sum::<f64>() / 2000.0;
        assert_abs_diff_eq!(mean, 1.0, epsilon = 0.02);
    }

    #[test]
    fn gamma_mass_matches_token_count() {
        // Σγ = Σα + total tokens once converged.
        let exp_elog_beta = exp_dirichlet_expectation_rows(&[
            vec![10.0, 1.0, 1.0],
            vec![1.0, 1.0, 10.0],
        ]);
        let alpha = [0.5, 0.5];
        let d = doc(vec![0, 2], vec![3.0, 4.0]);
        let g = gamma_sampler().unwrap();
        let inf = variational_topic_inference(&d, &exp_elog_beta, &alpha, &g, &mut doc_rng(1, 0));

        let total: f64 = inf.gamma.iter().sum();
        assert_abs_diff_eq!(total, 1.0 + 7.0, epsilon = 1e-2);
        // Term 0 belongs to topic 0, term 2 to topic 1.
        assert!(inf.gamma[1] > inf.gamma[0]);
        assert_eq!(inf.sstats.len(), 2);
        assert_eq!(inf.sstats[0].len(), 2);
        // Weighted by β, the statistics of each term split its count across topics.
        for (j, (&w, &c)) in d.ids.iter().zip(&d.counts).enumerate() {
            let assigned: f64 = (0..2).map(|t| inf.sstats[t][j] * exp_elog_beta[t][w]).sum();
            assert_abs_diff_eq!(assigned, c, epsilon = 1e-9);
        }
    }

    #[test]
    fn same_seed_same_result() {
        let exp_elog_beta = exp_dirichlet_expectation_rows(&[vec![2.0, 1.0], vec![1.0, 2.0]]);
        let d = doc(vec![0, 1], vec![1.0, 5.0]);
        let g = gamma_sampler().unwrap();
        let a = variational_topic_inference(&d, &exp_elog_beta, &[0.5, 0.5], &g, &mut doc_rng(3, 4));
        let b = variational_topic_inference(&d, &exp_elog_beta, &[0.5, 0.5], &g, &mut doc_rng(3, 4));
        assert_eq!(a.gamma, b.gamma);
    }
}
