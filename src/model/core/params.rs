//! Model parameters — the validated, immutable configuration of the covariance
//! model.
//!
//! This module provides [`ParameterSet`], which bundles the matrix dimension,
//! the mean-reversion and flux rates, the noise intensities, the reference and
//! noise-geometry matrices, the memory kernel, and the interaction Laplacian.
//!
//! ## Invariants validated by the constructor
//! - `n > 0`
//! - `Cbar` and `U` are `n × n`, finite, and symmetric within
//!   [`SYMMETRY_TOL`]
//! - `λ > 0`, `β > 0`; `σψ ≥ 0`, `ε ≥ 0`; all finite
//! - memory kernel decay rate `η > 0`; Laplacian strength `α > 0`
//!
//! `Cbar` is not required to be positive definite.
//!
//! ## Sharing
//! Fields are private and only exposed through read-only accessors, so a
//! `ParameterSet` behind an `Arc` can be evaluated against from any number of
//! threads without synchronization.
use crate::model::{
    core::{
        kernels::{InteractionLaplacian, MemoryKernel},
        linalg::SYMMETRY_TOL,
        validation::{
            validate_dimension, validate_nonnegative_rate, validate_positive_rate,
            validate_reference_matrix,
        },
    },
    errors::ConfigResult,
};
use ndarray::{Array2, ArrayView2};

/// Validated parameters of the SPD covariance model.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    n: usize,
    lambda: f64,
    c_bar: Array2<f64>,
    beta: f64,
    sigma_psi: f64,
    epsilon: f64,
    u: Array2<f64>,
    kernel: MemoryKernel,
    laplacian: InteractionLaplacian,
}

impl ParameterSet {
    /// Create a validated parameter set.
    ///
    /// Parameters
    /// ----------
    /// - `n`: matrix dimension, `> 0`.
    /// - `lambda`: covariance mean-reversion rate, `> 0`.
    /// - `c_bar`: `n × n` symmetric reference covariance.
    /// - `beta`: flux decay rate, `> 0`.
    /// - `sigma_psi`: flux noise intensity, `≥ 0`.
    /// - `epsilon`: covariance noise intensity, `≥ 0`.
    /// - `u`: `n × n` symmetric noise-geometry matrix.
    /// - `kernel`: memory kernel carrying the decay rate η.
    /// - `laplacian`: interaction Laplacian carrying `(α, normalize)`.
    ///
    /// Errors
    /// ------
    /// - `ConfigError` describing the first violated precondition.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        n: usize, lambda: f64, c_bar: Array2<f64>, beta: f64, sigma_psi: f64, epsilon: f64,
        u: Array2<f64>, kernel: MemoryKernel, laplacian: InteractionLaplacian,
    ) -> ConfigResult<Self> {
        validate_dimension(n)?;
        validate_positive_rate("lambda", lambda)?;
        validate_positive_rate("beta", beta)?;
        validate_nonnegative_rate("sigma_psi", sigma_psi)?;
        validate_nonnegative_rate("epsilon", epsilon)?;
        validate_reference_matrix("Cbar", c_bar.view(), n, SYMMETRY_TOL)?;
        validate_reference_matrix("U", u.view(), n, SYMMETRY_TOL)?;
        kernel.validate()?;
        laplacian.validate()?;
        Ok(ParameterSet { n, lambda, c_bar, beta, sigma_psi, epsilon, u, kernel, laplacian })
    }

    /// Parameter set with `Cbar = U = Iₙ` and default Laplacian `(α = 1, normalize)`.
    pub fn with_identity_references(
        n: usize, lambda: f64, beta: f64, sigma_psi: f64, epsilon: f64, eta: f64,
    ) -> ConfigResult<Self> {
        validate_dimension(n)?;
        ParameterSet::new(
            n,
            lambda,
            Array2::eye(n),
            beta,
            sigma_psi,
            epsilon,
            Array2::eye(n),
            MemoryKernel::exponential(eta)?,
            InteractionLaplacian::default(),
        )
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Length of the flat state vector, `n² + 2`.
    pub fn state_len(&self) -> usize {
        self.n * self.n + 2
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Reference covariance `Cbar`.
    pub fn c_bar(&self) -> ArrayView2<'_, f64> {
        self.c_bar.view()
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn sigma_psi(&self) -> f64 {
        self.sigma_psi
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Noise-geometry matrix `U`.
    pub fn u(&self) -> ArrayView2<'_, f64> {
        self.u.view()
    }

    pub fn kernel(&self) -> &MemoryKernel {
        &self.kernel
    }

    /// Decay rate η of the memory variable.
    pub fn eta(&self) -> f64 {
        self.kernel.decay_rate()
    }

    pub fn laplacian(&self) -> &InteractionLaplacian {
        &self.laplacian
    }
}
