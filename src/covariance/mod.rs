//! Boundary-conditioned covariance matrices and their Cholesky factors.
//!
//! One synthesis cycle is sampled at evenly spaced angles over one period.
//! In wavetable mode the prior is conditioned on zero-valued anchors so the
//! sampled path passes through zero at the seam (and, for non-periodic
//! kernels with continuity enforced, closes at both ends). In waveshaping
//! mode the angles are warped through `sin` and the prior is used as is.

mod cholesky;
mod matrix;

use std::f64::consts::TAU;

use log::debug;

pub use cholesky::{cholesky_shifted, forward_substitute, jittered_cholesky, JitterExhausted};
pub use matrix::Matrix;

use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::params::{GenerationConfig, SynthParams};

/// Which observations the prior is conditioned on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conditioning {
    /// Prior covariance, no observations (waveshaping)
    Prior,
    /// First position observed as zero
    SingleAnchor,
    /// First and last positions observed as zero
    BothEnds,
}

/// Covariance matrix over the sample positions of one cycle
#[derive(Debug, Clone)]
pub struct GramMatrix {
    matrix: Matrix,
    conditioning: Conditioning,
}

impl GramMatrix {
    pub fn dim(&self) -> usize {
        self.matrix.rows()
    }

    pub fn conditioning(&self) -> Conditioning {
        self.conditioning
    }

    pub fn as_matrix(&self) -> &Matrix {
        &self.matrix
    }
}

/// Lower-triangular L with L·Lᵀ ≈ covariance + jitter·I
#[derive(Debug, Clone)]
pub struct CholeskyFactor {
    lower: Matrix,
    jitter: f64,
    kernel: String,
}

impl CholeskyFactor {
    pub fn dim(&self) -> usize {
        self.lower.rows()
    }

    /// Diagonal jitter that made the covariance factorizable
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Description of the kernel and mode this factor was built for
    pub fn kernel(&self) -> &str {
        &self.kernel
    }

    pub fn lower(&self) -> &Matrix {
        &self.lower
    }

    /// Correlate standard-normal noise: returns L·z
    pub fn correlate(&self, z: &[f64]) -> Vec<f64> {
        debug_assert_eq!(z.len(), self.dim());
        (0..self.dim())
            .map(|i| {
                let row = self.lower.row(i);
                row[..=i].iter().zip(&z[..=i]).map(|(l, z)| l * z).sum::<f64>()
            })
            .collect()
    }
}

/// Builds the (conditioned) covariance of one synthesis cycle for a kernel
pub struct CovarianceBuilder<'a> {
    kernel: &'a Kernel,
    config: &'a GenerationConfig,
    table_size: usize,
}

impl<'a> CovarianceBuilder<'a> {
    pub fn new(kernel: &'a Kernel, config: &'a GenerationConfig, params: &SynthParams) -> Self {
        Self {
            kernel,
            config,
            table_size: params.table_size(),
        }
    }

    /// Sample positions of one cycle.
    ///
    /// Wavetable mode: N+1 angles `i·2π/N`, both ends of the period included.
    /// Waveshaping mode: N points `sin(i·2π/N)`.
    pub fn positions(&self) -> Vec<f64> {
        let n = self.table_size;
        let step = TAU / n as f64;
        if self.config.waveshaping {
            (0..n).map(|i| (i as f64 * step).sin()).collect()
        } else {
            (0..=n).map(|i| i as f64 * step).collect()
        }
    }

    /// Conditioning selected for this kernel and configuration.
    ///
    /// Periodic kernels always take the single anchor, even with continuity
    /// enforcement requested.
    pub fn conditioning(&self) -> Conditioning {
        if self.config.waveshaping {
            Conditioning::Prior
        } else if self.kernel.is_periodic() || !self.config.enforce_continuity {
            Conditioning::SingleAnchor
        } else {
            Conditioning::BothEnds
        }
    }

    /// Posterior (or prior) covariance over [`Self::positions`]
    pub fn build(&self) -> Result<GramMatrix> {
        let xs = self.positions();
        let mut cov = self.kernel.gram_symmetric(&xs);
        let conditioning = self.conditioning();

        let anchors: Vec<f64> = match conditioning {
            Conditioning::Prior => Vec::new(),
            Conditioning::SingleAnchor => vec![xs[0]],
            Conditioning::BothEnds => vec![xs[0], xs[xs.len() - 1]],
        };

        if !anchors.is_empty() {
            // Zero-noise regression on zero observations: the posterior mean
            // vanishes, the covariance is K - K_xa K_aa⁻¹ K_ax.
            let k_aa = self.kernel.gram_symmetric(&anchors);
            let (l_aa, _) = jittered_cholesky(
                &k_aa,
                self.config.base_jitter_scale,
                self.config.max_jitter_attempts,
            )
            .map_err(|e| self.factorization_error(e))?;

            let k_ax = self.kernel.gram(&anchors, &xs);
            let n = xs.len();
            let m = anchors.len();
            // v[k][x] = (L_aa⁻¹ K_ax)[k][x], stored per position
            let mut v = Matrix::zeros(n, m);
            let mut column = vec![0.0; m];
            for x in 0..n {
                for (k, c) in column.iter_mut().enumerate() {
                    *c = k_ax[(k, x)];
                }
                let solved = forward_substitute(&l_aa, &column);
                for (k, s) in solved.into_iter().enumerate() {
                    v[(x, k)] = s;
                }
            }

            for i in 0..n {
                for j in 0..=i {
                    let reduced = cov[(i, j)] - matrix::dot(v.row(i), v.row(j));
                    cov[(i, j)] = reduced;
                    cov[(j, i)] = reduced;
                }
            }
        }

        debug!(
            "Built {}x{} covariance for {} ({:?})",
            cov.rows(),
            cov.cols(),
            self.kernel,
            conditioning
        );

        Ok(GramMatrix {
            matrix: cov,
            conditioning,
        })
    }

    /// Build the covariance and factor it with escalating jitter
    pub fn factor(&self) -> Result<CholeskyFactor> {
        let gram = self.build()?;
        let (lower, jitter) = jittered_cholesky(
            gram.as_matrix(),
            self.config.base_jitter_scale,
            self.config.max_jitter_attempts,
        )
        .map_err(|e| self.factorization_error(e))?;

        Ok(CholeskyFactor {
            lower,
            jitter,
            kernel: self.describe(),
        })
    }

    fn describe(&self) -> String {
        let mode = if self.config.waveshaping {
            "waveshaping"
        } else {
            "wavetable"
        };
        format!("{} [{}, {:?}]", self.kernel, mode, self.conditioning())
    }

    fn factorization_error(&self, e: JitterExhausted) -> Error {
        Error::Factorization {
            kernel: self.describe(),
            attempts: e.attempts,
            jitter: e.jitter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{kernel_for_name, ALL_KERNELS};
    use approx::assert_relative_eq;

    /// 64-sample tables keep the factorizations cheap
    fn small_params() -> SynthParams {
        SynthParams {
            table_base_hz: 44_100.0 / 64.0,
            ..SynthParams::default()
        }
    }

    #[test]
    fn test_positions_wavetable_mode() {
        let kernel = Kernel::rbf(1.0).unwrap();
        let config = GenerationConfig::default();
        let params = SynthParams::default();
        let xs = CovarianceBuilder::new(&kernel, &config, &params).positions();
        assert_eq!(xs.len(), 2206);
        assert_eq!(xs[0], 0.0);
        assert_relative_eq!(xs[2205], TAU, epsilon = 1e-12);
    }

    #[test]
    fn test_positions_waveshaping_mode() {
        let kernel = Kernel::rbf(1.0).unwrap();
        let config = GenerationConfig {
            waveshaping: true,
            ..GenerationConfig::default()
        };
        let params = SynthParams::default();
        let builder = CovarianceBuilder::new(&kernel, &config, &params);
        let xs = builder.positions();
        assert_eq!(xs.len(), 2205);
        assert!(xs.iter().all(|x| (-1.0..=1.0).contains(x)));
        assert_eq!(builder.conditioning(), Conditioning::Prior);
    }

    #[test]
    fn test_conditioning_selection() {
        let params = small_params();
        let rbf = Kernel::rbf(1.0).unwrap();
        let periodic = kernel_for_name("PeriodicMatern52", 1.0).unwrap();

        let enforced = GenerationConfig::default();
        let relaxed = GenerationConfig {
            enforce_continuity: false,
            ..GenerationConfig::default()
        };

        assert_eq!(
            CovarianceBuilder::new(&rbf, &enforced, &params).conditioning(),
            Conditioning::BothEnds
        );
        assert_eq!(
            CovarianceBuilder::new(&rbf, &relaxed, &params).conditioning(),
            Conditioning::SingleAnchor
        );
        // Periodic wins over continuity enforcement
        assert_eq!(
            CovarianceBuilder::new(&periodic, &enforced, &params).conditioning(),
            Conditioning::SingleAnchor
        );
    }

    #[test]
    fn test_both_ends_pinned_to_zero() {
        let params = small_params();
        let kernel = Kernel::rbf(1.0).unwrap();
        let config = GenerationConfig::default();
        let gram = CovarianceBuilder::new(&kernel, &config, &params)
            .build()
            .unwrap();
        let cov = gram.as_matrix();
        let last = gram.dim() - 1;

        assert_eq!(gram.conditioning(), Conditioning::BothEnds);
        assert!(cov[(0, 0)].abs() < 1e-6);
        assert!(cov[(last, last)].abs() < 1e-6);
        assert!(cov[(0, last)].abs() < 1e-6);
        // Interior points keep most of their prior variance
        assert!(cov[(last / 2, last / 2)] > 0.5);
    }

    #[test]
    fn test_single_anchor_leaves_far_end_free() {
        let params = small_params();
        let kernel = Kernel::rbf(1.0).unwrap();
        let config = GenerationConfig {
            enforce_continuity: false,
            ..GenerationConfig::default()
        };
        let gram = CovarianceBuilder::new(&kernel, &config, &params)
            .build()
            .unwrap();
        let cov = gram.as_matrix();
        let last = gram.dim() - 1;
        assert!(cov[(0, 0)].abs() < 1e-6);
        assert!(cov[(last, last)] > 0.9);
    }

    #[test]
    fn test_gram_matrices_positive_semi_definite() {
        let params = small_params();
        for waveshaping in [false, true] {
            let config = GenerationConfig {
                waveshaping,
                ..GenerationConfig::default()
            };
            for name in ALL_KERNELS.iter().chain(["Brownian", "White"].iter()) {
                let kernel = kernel_for_name(name, 0.5).unwrap();
                let gram = CovarianceBuilder::new(&kernel, &config, &params)
                    .build()
                    .unwrap();
                let m = gram.as_matrix();
                for i in 0..gram.dim() {
                    for j in 0..i {
                        assert_eq!(m[(i, j)], m[(j, i)]);
                    }
                }
                // Eigenvalues >= -eps  <=>  G + eps·I is positive-definite
                let eps = 1e-6 * m.mean_diagonal().max(1.0);
                assert!(
                    cholesky_shifted(m, eps).is_some(),
                    "{name} (waveshaping={waveshaping}) is not PSD"
                );
            }
        }
    }

    #[test]
    fn test_factor_every_kernel() {
        let params = small_params();
        let config = GenerationConfig::default();
        for name in ALL_KERNELS {
            let kernel = kernel_for_name(name, 1.0).unwrap();
            let factor = CovarianceBuilder::new(&kernel, &config, &params)
                .factor()
                .unwrap();
            assert_eq!(factor.dim(), 65);
            assert!(factor.kernel().contains(kernel.name()));
        }
    }

    #[test]
    fn test_factorization_error_reports_kernel() {
        let params = small_params();
        let kernel = Kernel::rbf(1.0).unwrap();
        let config = GenerationConfig {
            max_jitter_attempts: 0,
            ..GenerationConfig::default()
        };
        match CovarianceBuilder::new(&kernel, &config, &params).factor() {
            Err(Error::Factorization { kernel, attempts, .. }) => {
                assert!(kernel.contains("RBF"));
                assert_eq!(attempts, 1);
            }
            other => panic!("expected Factorization, got {other:?}"),
        }
    }

    #[test]
    fn test_correlate_uses_lower_triangle() {
        let params = small_params();
        let kernel = Kernel::matern32(0.5).unwrap();
        let config = GenerationConfig::default();
        let factor = CovarianceBuilder::new(&kernel, &config, &params)
            .factor()
            .unwrap();
        let z = vec![1.0; factor.dim()];
        let full = factor.lower().mul_vec(&z);
        let tri = factor.correlate(&z);
        for (a, b) in full.iter().zip(&tri) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }
}
