//! Independent component analysis for artifact removal
//!
//! FastICA with PCA whitening, a `tanh` contrast function and symmetric
//! decorrelation. The initial unmixing matrix comes from a seeded RNG, so a
//! fit is fully deterministic for a given seed.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use neurotwin_core::error::{AnalysisError, AnalysisResult};

/// Relative eigenvalue floor below which whitening dimensions are dropped.
const RANK_TOLERANCE: f64 = 1e-10;

/// FastICA estimator settings
#[derive(Clone, Debug)]
pub struct FastIca {
    /// Maximum number of components to extract
    pub n_components: usize,
    /// Seed for the initial unmixing matrix
    pub seed: u64,
    /// Iteration cap
    pub max_iter: usize,
    /// Convergence tolerance on the unmixing update
    pub tolerance: f64,
}

/// Result of an ICA fit
#[derive(Clone, Debug)]
pub struct IcaDecomposition {
    /// Unmixing matrix (components × channels)
    pub unmixing: DMatrix<f64>,
    /// Mixing matrix (channels × components)
    pub mixing: DMatrix<f64>,
    /// Component time courses (components × samples)
    pub sources: DMatrix<f64>,
    /// Whether the fixed-point iteration converged
    pub converged: bool,
    /// Iterations performed
    pub iterations: usize,
}

impl IcaDecomposition {
    /// Number of fitted components
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.sources.nrows()
    }

    /// Time course of one component
    #[must_use]
    pub fn source(&self, component: usize) -> Vec<f64> {
        self.sources.row(component).iter().copied().collect()
    }

    /// Reconstruct the fitted channels with the given components removed.
    ///
    /// Signal outside the whitened subspace is left untouched.
    #[must_use]
    pub fn remove_components(&self, data: &[Vec<f64>], exclude: &[usize]) -> Vec<Vec<f64>> {
        let mut cleaned: Vec<Vec<f64>> = data.to_vec();
        for &comp in exclude.iter().filter(|&&c| c < self.n_components()) {
            for (ch, row) in cleaned.iter_mut().enumerate() {
                let weight = self.mixing[(ch, comp)];
                for (t, v) in row.iter_mut().enumerate() {
                    *v -= weight * self.sources[(comp, t)];
                }
            }
        }
        cleaned
    }
}

impl FastIca {
    /// Fit the decomposition on a channels × samples matrix.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] if the data is empty, has fewer
    /// than two samples, or carries no variance to decompose.
    pub fn fit(&self, data: &[Vec<f64>]) -> AnalysisResult<IcaDecomposition> {
        let n_ch = data.len();
        let n = data.first().map_or(0, Vec::len);
        if n_ch == 0 || n < 2 {
            return Err(AnalysisError::invalid_input("ica", "need at least one channel and two samples"));
        }

        let mut x = DMatrix::from_fn(n_ch, n, |i, j| data[i][j]);
        let means = DVector::from_iterator(n_ch, x.row_iter().map(|r| r.mean()));
        for (i, mut row) in x.row_iter_mut().enumerate() {
            row.add_scalar_mut(-means[i]);
        }

        // PCA whitening
        let cov = (&x * x.transpose()) / n as f64;
        let eig = cov.symmetric_eigen();
        let mut order: Vec<usize> = (0..n_ch).collect();
        order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

        let largest = eig.eigenvalues[order[0]];
        let kept: Vec<usize> = order
            .into_iter()
            .filter(|&i| largest > 0.0 && eig.eigenvalues[i] > largest * RANK_TOLERANCE)
            .take(self.n_components.max(1))
            .collect();
        if kept.is_empty() {
            return Err(AnalysisError::invalid_input("ica", "signal has no variance"));
        }
        let k = kept.len();

        let whitening = DMatrix::from_fn(k, n_ch, |r, c| {
            let idx = kept[r];
            eig.eigenvectors[(c, idx)] / eig.eigenvalues[idx].sqrt()
        });
        let z = &whitening * &x;

        // Fixed-point iteration
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut w = symmetric_decorrelation(&DMatrix::from_fn(k, k, |_, _| rng.gen_range(-1.0_f64..1.0)));
        let mut converged = false;
        let mut iterations = 0;

        for iter in 0..self.max_iter {
            let wz = &w * &z;
            let g = wz.map(f64::tanh);
            let g_prime_mean = DVector::from_iterator(
                k,
                g.row_iter().map(|r| r.iter().map(|v| 1.0 - v * v).sum::<f64>() / n as f64),
            );

            let update = (&g * z.transpose()) / n as f64 - DMatrix::from_diagonal(&g_prime_mean) * &w;
            let w_next = symmetric_decorrelation(&update);

            let agreement = &w_next * w.transpose();
            let limit = (0..k)
                .map(|i| (agreement[(i, i)].abs() - 1.0).abs())
                .fold(0.0, f64::max);

            w = w_next;
            iterations = iter + 1;
            if limit < self.tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::warn!(
                "FastICA did not converge after {} iterations (tolerance {})",
                self.max_iter,
                self.tolerance
            );
        }

        let unmixing = &w * &whitening;
        let sources = &unmixing * &x;
        let mixing = unmixing
            .clone()
            .pseudo_inverse(1e-12)
            .map_err(|e| AnalysisError::invalid_input("ica", format!("cannot invert unmixing matrix: {e}")))?;

        tracing::debug!(components = k, iterations, converged, "ICA fit complete");

        Ok(IcaDecomposition { unmixing, mixing, sources, converged, iterations })
    }
}

/// `W ← (W Wᵀ)^{-1/2} W`
fn symmetric_decorrelation(w: &DMatrix<f64>) -> DMatrix<f64> {
    let eig = (w * w.transpose()).symmetric_eigen();
    let inv_sqrt = eig.eigenvalues.map(|d| 1.0 / d.max(f64::EPSILON).sqrt());
    &eig.eigenvectors * DMatrix::from_diagonal(&inv_sqrt) * eig.eigenvectors.transpose() * w
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use neurotwin_core::math::pearson_correlation;

    use super::*;

    fn ica() -> FastIca {
        FastIca { n_components: 15, seed: 42, max_iter: 400, tolerance: 1e-6 }
    }

    /// Two independent sources (sine + square wave) mixed into three channels.
    fn mixed() -> (Vec<f64>, Vec<f64>, Vec<Vec<f64>>) {
        let n = 2000;
        let s1: Vec<f64> = (0..n).map(|i| (2.0 * PI * 7.0 * i as f64 / 250.0).sin()).collect();
        let s2: Vec<f64> = (0..n)
            .map(|i| if (i / 37) % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let data = vec![
            s1.iter().zip(&s2).map(|(a, b)| a + 0.5 * b).collect(),
            s1.iter().zip(&s2).map(|(a, b)| 0.3 * a + b).collect(),
            s1.iter().zip(&s2).map(|(a, b)| 0.8 * a - 0.6 * b).collect(),
        ];
        (s1, s2, data)
    }

    #[test]
    fn test_recovers_independent_sources() {
        let (s1, s2, data) = mixed();
        let decomp = ica().fit(&data).unwrap();

        // Rank-2 mixture: only two components survive whitening.
        assert_eq!(decomp.n_components(), 2);

        let best = |target: &[f64]| {
            (0..decomp.n_components())
                .map(|c| pearson_correlation(&decomp.source(c), target).abs())
                .fold(0.0, f64::max)
        };
        assert!(best(&s1) > 0.95);
        assert!(best(&s2) > 0.95);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (_, _, data) = mixed();
        let a = ica().fit(&data).unwrap();
        let b = ica().fit(&data).unwrap();
        assert_eq!(a.sources, b.sources);
    }

    #[test]
    fn test_removing_nothing_is_identity() {
        let (_, _, data) = mixed();
        let decomp = ica().fit(&data).unwrap();
        assert_eq!(decomp.remove_components(&data, &[]), data);
    }

    #[test]
    fn test_removing_component_cancels_it() {
        let (_, s2, data) = mixed();
        let decomp = ica().fit(&data).unwrap();
        let square = (0..decomp.n_components())
            .max_by(|&a, &b| {
                pearson_correlation(&decomp.source(a), &s2)
                    .abs()
                    .total_cmp(&pearson_correlation(&decomp.source(b), &s2).abs())
            })
            .unwrap();

        let cleaned = decomp.remove_components(&data, &[square]);
        for row in &cleaned {
            assert!(pearson_correlation(row, &s2).abs() < 0.2);
        }
    }

    #[test]
    fn test_flat_signal_is_rejected() {
        assert!(ica().fit(&[vec![1.0; 100], vec![1.0; 100]]).is_err());
    }
}
