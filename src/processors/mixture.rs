//! Two-component univariate Gaussian mixture fitted by expectation-maximization.
//!
//! Used to split pooled log-MSE values into a "true match" mode and a
//! "spurious best fit" mode without a fixed threshold.
//!
//! # Algorithm
//!
//! 1. **Initialisation**: 1-D k-means (Lloyd) seeded at the lower and upper
//!    quartiles, or at the extremes when the quartiles coincide. The
//!    hard assignment gives the starting weights, means and variances.
//! 2. **E-step**: posterior responsibility of each component for every
//!    sample, computed in log space.
//! 3. **M-step**: responsibility-weighted weights, means and per-component
//!    variances, with `reg_variance` added to every variance.
//! 4. Stop when the mean log-likelihood changes by less than `tolerance`,
//!    or after `max_iter` iterations.
//!
//! The fit is fully deterministic. It does not detect unimodal data: such
//! inputs still produce two components whose split is arbitrary.

use std::f64::consts::PI;

use thiserror::Error;

use crate::config::MixtureConfig;

/// Maximum number of k-means refinement passes during initialisation.
const KMEANS_ITERATIONS: usize = 10;

/// Numerical failures of the mixture fit.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MixtureError {
    #[error("need at least 2 finite samples to fit a 2-component mixture, got {0}")]
    TooFewSamples(usize),

    #[error("all {0} samples are identical; the data has zero variance")]
    ZeroVariance(usize),

    #[error("mixture component {component} collapsed (effective sample count {weight:.3e})")]
    CollapsedComponent { component: usize, weight: f64 },

    #[error("sample {0} is not finite")]
    NonFiniteSample(usize),

    #[error("log-likelihood became non-finite at iteration {0}")]
    NonFiniteLikelihood(usize),
}

/// A fitted two-component Gaussian mixture.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianMixture {
    /// Mixing weights, summing to one.
    pub weights: [f64; 2],
    /// Component means.
    pub means: [f64; 2],
    /// Component variances (regularised).
    pub variances: [f64; 2],
    /// EM iterations performed.
    pub n_iter: usize,
    /// Whether the likelihood change fell below the tolerance.
    pub converged: bool,
    /// Mean per-sample log-likelihood at the last E-step.
    pub log_likelihood: f64,
}

impl GaussianMixture {
    /// Fit a two-component mixture to `data`.
    ///
    /// Non-finite samples must be removed by the caller.
    pub fn fit(data: &[f64], config: &MixtureConfig) -> Result<Self, MixtureError> {
        let n = data.len();
        if n < 2 {
            return Err(MixtureError::TooFewSamples(n));
        }
        if let Some(idx) = data.iter().position(|x| !x.is_finite()) {
            return Err(MixtureError::NonFiniteSample(idx));
        }

        let mut sorted = data.to_vec();
        sorted.sort_by(f64::total_cmp);
        if sorted[0] == sorted[n - 1] {
            return Err(MixtureError::ZeroVariance(n));
        }

        let mut model = Self::initialise(&sorted, config.reg_variance)?;

        let mut resp = vec![0.0f64; n];
        let mut prev_ll = f64::NEG_INFINITY;

        for iter in 1..=config.max_iter.max(1) {
            // E-step: responsibility of component 1 for each sample
            let mut ll_sum = 0.0;
            for (r, &x) in resp.iter_mut().zip(data) {
                let lp = model.log_joint(x);
                let lse = log_sum_exp(lp);
                ll_sum += lse;
                *r = (lp[1] - lse).exp();
            }
            let ll = ll_sum / n as f64;
            if !ll.is_finite() {
                return Err(MixtureError::NonFiniteLikelihood(iter));
            }

            // M-step
            model.update(data, &resp, config.reg_variance)?;
            model.n_iter = iter;
            model.log_likelihood = ll;

            log::debug!(
                "EM iter {}: ll={:.6} means=[{:.4}, {:.4}] vars=[{:.4}, {:.4}] weights=[{:.3}, {:.3}]",
                iter,
                ll,
                model.means[0],
                model.means[1],
                model.variances[0],
                model.variances[1],
                model.weights[0],
                model.weights[1]
            );

            if (ll - prev_ll).abs() < config.tolerance {
                model.converged = true;
                break;
            }
            prev_ll = ll;
        }

        if !model.converged {
            log::warn!(
                "Gaussian mixture did not converge within {} iterations",
                config.max_iter
            );
        }

        Ok(model)
    }

    /// Hard-assignment starting point from 1-D k-means on sorted data.
    fn initialise(sorted: &[f64], reg_variance: f64) -> Result<Self, MixtureError> {
        let n = sorted.len();
        let q1 = sorted[n / 4];
        let q3 = sorted[(3 * n) / 4];
        let mut centers = if q1 < q3 {
            [q1, q3]
        } else {
            [sorted[0], sorted[n - 1]]
        };

        // Sorted data: cluster 0 is a prefix, cluster 1 the remaining suffix
        let mut split = 0;
        for _ in 0..KMEANS_ITERATIONS {
            let threshold = 0.5 * (centers[0] + centers[1]);
            let new_split = sorted.partition_point(|&x| x <= threshold);
            if new_split == split {
                break;
            }
            split = new_split;
            centers = [mean(&sorted[..split]), mean(&sorted[split..])];
        }

        let (lower, upper) = sorted.split_at(split);
        for (component, part) in [lower, upper].iter().enumerate() {
            if part.is_empty() {
                return Err(MixtureError::CollapsedComponent {
                    component,
                    weight: 0.0,
                });
            }
        }

        Ok(Self {
            weights: [lower.len() as f64 / n as f64, upper.len() as f64 / n as f64],
            means: [mean(lower), mean(upper)],
            variances: [
                variance(lower) + reg_variance,
                variance(upper) + reg_variance,
            ],
            n_iter: 0,
            converged: false,
            log_likelihood: f64::NEG_INFINITY,
        })
    }

    /// M-step from the responsibilities of component 1.
    fn update(&mut self, data: &[f64], resp: &[f64], reg_variance: f64) -> Result<(), MixtureError> {
        let n = data.len() as f64;
        let mut nk = [0.0f64; 2];
        let mut sx = [0.0f64; 2];
        for (&x, &r1) in data.iter().zip(resp) {
            let r = [1.0 - r1, r1];
            for k in 0..2 {
                nk[k] += r[k];
                sx[k] += r[k] * x;
            }
        }

        let min_weight = 10.0 * f64::EPSILON * n;
        for k in 0..2 {
            if nk[k] < min_weight {
                return Err(MixtureError::CollapsedComponent {
                    component: k,
                    weight: nk[k],
                });
            }
        }

        let means = [sx[0] / nk[0], sx[1] / nk[1]];
        let mut ss = [0.0f64; 2];
        for (&x, &r1) in data.iter().zip(resp) {
            let r = [1.0 - r1, r1];
            for k in 0..2 {
                let d = x - means[k];
                ss[k] += r[k] * d * d;
            }
        }

        self.weights = [nk[0] / n, nk[1] / n];
        self.means = means;
        self.variances = [ss[0] / nk[0] + reg_variance, ss[1] / nk[1] + reg_variance];
        Ok(())
    }

    /// `log(weight_k) + log N(x | mean_k, variance_k)` for both components.
    pub fn log_joint(&self, x: f64) -> [f64; 2] {
        let mut out = [0.0; 2];
        for (k, slot) in out.iter_mut().enumerate() {
            let var = self.variances[k];
            let d = x - self.means[k];
            *slot = self.weights[k].ln() - 0.5 * ((2.0 * PI * var).ln() + d * d / var);
        }
        out
    }

    /// Posterior probability of each component for `x`.
    pub fn responsibilities(&self, x: f64) -> [f64; 2] {
        let lp = self.log_joint(x);
        let lse = log_sum_exp(lp);
        [(lp[0] - lse).exp(), (lp[1] - lse).exp()]
    }

    /// Component with the highest posterior for `x`. Ties go to component 0.
    pub fn predict(&self, x: f64) -> usize {
        let lp = self.log_joint(x);
        if lp[1] > lp[0] {
            1
        } else {
            0
        }
    }

    /// Index of the component with the lower mean.
    pub fn lower_component(&self) -> usize {
        if self.means[1] < self.means[0] {
            1
        } else {
            0
        }
    }
}

fn log_sum_exp(lp: [f64; 2]) -> f64 {
    let m = lp[0].max(lp[1]);
    if m == f64::NEG_INFINITY {
        return m;
    }
    m + ((lp[0] - m).exp() + (lp[1] - m).exp()).ln()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_distr::{Distribution, StandardNormal};
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn bimodal(n_low: usize, n_high: usize) -> Vec<f64> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut data = Vec::with_capacity(n_low + n_high);
        for _ in 0..n_low {
            let z: f64 = StandardNormal.sample(&mut rng);
            data.push(2.0 + 0.5 * z);
        }
        for _ in 0..n_high {
            let z: f64 = StandardNormal.sample(&mut rng);
            data.push(10.0 + 1.0 * z);
        }
        data
    }

    #[test]
    fn test_fit_separates_modes() {
        let data = bimodal(200, 200);
        let gmm = GaussianMixture::fit(&data, &MixtureConfig::default()).unwrap();

        let low = gmm.lower_component();
        let high = 1 - low;
        assert!((gmm.means[low] - 2.0).abs() < 0.3);
        assert!((gmm.means[high] - 10.0).abs() < 0.3);
        assert!((gmm.weights[0] + gmm.weights[1] - 1.0).abs() < 1e-9);
        assert!(gmm.converged);

        assert_eq!(gmm.predict(1.5), low);
        assert_eq!(gmm.predict(11.0), high);
    }

    #[test]
    fn test_fit_unbalanced_modes() {
        let data = bimodal(300, 30);
        let gmm = GaussianMixture::fit(&data, &MixtureConfig::default()).unwrap();
        let low = gmm.lower_component();
        assert!(gmm.weights[low] > 0.8);
        assert_eq!(gmm.predict(2.5), low);
        assert_eq!(gmm.predict(9.0), 1 - low);
    }

    #[test]
    fn test_responsibilities_sum_to_one() {
        let data = bimodal(50, 50);
        let gmm = GaussianMixture::fit(&data, &MixtureConfig::default()).unwrap();
        for x in [0.0, 4.0, 6.0, 12.0] {
            let r = gmm.responsibilities(x);
            assert!((r[0] + r[1] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let data = bimodal(100, 80);
        let a = GaussianMixture::fit(&data, &MixtureConfig::default()).unwrap();
        let b = GaussianMixture::fit(&data, &MixtureConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fit_too_few_samples() {
        let config = MixtureConfig::default();
        assert_eq!(
            GaussianMixture::fit(&[], &config),
            Err(MixtureError::TooFewSamples(0))
        );
        assert_eq!(
            GaussianMixture::fit(&[1.0], &config),
            Err(MixtureError::TooFewSamples(1))
        );
    }

    #[test]
    fn test_fit_zero_variance() {
        let result = GaussianMixture::fit(&[3.0; 12], &MixtureConfig::default());
        assert_eq!(result, Err(MixtureError::ZeroVariance(12)));
    }

    #[test]
    fn test_fit_nan_sample_is_reported() {
        let mut data = bimodal(20, 20);
        data.push(f64::NAN);
        let result = GaussianMixture::fit(&data, &MixtureConfig::default());
        assert_eq!(result, Err(MixtureError::NonFiniteSample(40)));
    }

    #[test]
    fn test_two_samples() {
        let gmm = GaussianMixture::fit(&[0.0, 1.0], &MixtureConfig::default()).unwrap();
        let low = gmm.lower_component();
        assert_eq!(gmm.predict(0.0), low);
        assert_eq!(gmm.predict(1.0), 1 - low);
    }
}
