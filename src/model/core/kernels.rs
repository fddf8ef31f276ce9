//! Memory kernels and interaction Laplacians.
//!
//! This module provides two closed families used by the covariance model:
//! - [`MemoryKernel`]: the exponential kernel whose Markovian lift is the
//!   memory variable `I` with `dI/dt = −η·I + ψ`. Its capability is the
//!   decay rate η.
//! - [`InteractionLaplacian`]: the correlation-graph construction used by the
//!   geometric operators. Its capability is the edge weight `w(r)` for a
//!   correlation `r` and the degree of a weight row.
//!
//! Both are enums so new variants are added by extending the match arms.
use crate::model::errors::{ConfigError, ConfigResult};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Memory kernel family.
///
/// - `Exponential { eta }`: `K(s) = exp(−η·s)`, lifted exactly by one
///   auxiliary variable decaying at rate η.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemoryKernel {
    Exponential { eta: f64 },
}

impl MemoryKernel {
    /// Validated exponential kernel; `eta` must be finite and > 0.
    pub fn exponential(eta: f64) -> ConfigResult<Self> {
        if !eta.is_finite() {
            return Err(ConfigError::InvalidKernel {
                value: eta,
                reason: "Kernel decay rate must be finite.",
            });
        }
        if eta <= 0.0 {
            return Err(ConfigError::InvalidKernel {
                value: eta,
                reason: "Kernel decay rate must be strictly positive.",
            });
        }
        Ok(MemoryKernel::Exponential { eta })
    }

    /// Decay rate of the lifted memory variable.
    pub fn decay_rate(&self) -> f64 {
        match self {
            MemoryKernel::Exponential { eta } => *eta,
        }
    }

    /// Kernel weight at a non-negative lag.
    pub fn weight(&self, lag: f64) -> f64 {
        match self {
            MemoryKernel::Exponential { eta } => (-eta * lag.max(0.0)).exp(),
        }
    }

    pub(crate) fn validate(&self) -> ConfigResult<()> {
        match self {
            MemoryKernel::Exponential { eta } => MemoryKernel::exponential(*eta).map(|_| ()),
        }
    }
}

impl Default for MemoryKernel {
    fn default() -> Self {
        MemoryKernel::Exponential { eta: 1.0 }
    }
}

/// Interaction-graph construction for the Laplacian operator.
///
/// - `Correlation { alpha, normalize }`: weights built from absolute
///   correlations, `w(r) = α·|r|`, or `w(r) = α·|r| / (1 + |r|)` when
///   `normalize` is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionLaplacian {
    Correlation { alpha: f64, normalize: bool },
}

impl InteractionLaplacian {
    /// Validated correlation Laplacian; `alpha` must be finite and > 0.
    pub fn correlation(alpha: f64, normalize: bool) -> ConfigResult<Self> {
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(ConfigError::InvalidLaplacian {
                value: alpha,
                reason: "Interaction strength must be finite and strictly positive.",
            });
        }
        Ok(InteractionLaplacian::Correlation { alpha, normalize })
    }

    /// Edge weight for a correlation coefficient `r`.
    pub fn weight(&self, r: f64) -> f64 {
        match self {
            InteractionLaplacian::Correlation { alpha, normalize } => {
                let abs_r = r.abs();
                if *normalize {
                    alpha * abs_r / (1.0 + abs_r)
                } else {
                    alpha * abs_r
                }
            }
        }
    }

    /// Degree of a node given its row of edge weights.
    pub fn degree(&self, weights: ArrayView1<f64>) -> f64 {
        match self {
            InteractionLaplacian::Correlation { .. } => weights.sum(),
        }
    }

    pub(crate) fn validate(&self) -> ConfigResult<()> {
        match self {
            InteractionLaplacian::Correlation { alpha, normalize } => {
                InteractionLaplacian::correlation(*alpha, *normalize).map(|_| ())
            }
        }
    }
}

impl Default for InteractionLaplacian {
    fn default() -> Self {
        InteractionLaplacian::Correlation { alpha: 1.0, normalize: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn exponential_kernel_exposes_decay_rate_and_weights() {
        let kernel = MemoryKernel::exponential(2.0).unwrap();
        assert_eq!(kernel.decay_rate(), 2.0);
        assert_eq!(kernel.weight(0.0), 1.0);
        assert_relative_eq!(kernel.weight(0.5), (-1.0_f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn exponential_kernel_rejects_non_positive_rates() {
        assert!(matches!(MemoryKernel::exponential(0.0), Err(ConfigError::InvalidKernel { .. })));
        assert!(matches!(
            MemoryKernel::exponential(f64::NAN),
            Err(ConfigError::InvalidKernel { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Check both weight variants and the degree capability.
    //
    // Given
    // -----
    // - α = 2, r = ±0.5, normalized and unnormalized.
    //
    // Expect
    // ------
    // - Normalized weight 2·0.5/1.5, raw weight 1.0, sign-independent.
    // - Degree is the row sum.
    fn correlation_laplacian_weights_and_degree() {
        let normalized = InteractionLaplacian::correlation(2.0, true).unwrap();
        let raw = InteractionLaplacian::correlation(2.0, false).unwrap();

        assert_relative_eq!(normalized.weight(0.5), 2.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(normalized.weight(-0.5), 2.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(raw.weight(-0.5), 1.0, epsilon = 1e-15);
        assert_relative_eq!(raw.degree(array![0.0, 0.25, 0.5].view()), 0.75, epsilon = 1e-15);
    }

    #[test]
    fn correlation_laplacian_rejects_non_positive_alpha() {
        assert!(matches!(
            InteractionLaplacian::correlation(0.0, true),
            Err(ConfigError::InvalidLaplacian { .. })
        ));
    }
}
