//! Diffusion field — structured stochastic forcing of the covariance model.
//!
//! Purpose
//! -------
//! Provide the noise amplitudes an external integrator multiplies by
//! independent Wiener increments (diagonal noise, one increment per flat
//! component):
//! - covariance block: `ε·sym(F·U + U·F)` with `F` the lower Cholesky factor
//!   of `C` and `sym(A) = (A + Aᵀ)/2`;
//! - flux: `σψ·sqrt(max(ψ, 0))` (CIR-type square-root noise);
//! - memory: `0` (the lift variable receives no direct noise).
//!
//! Key behaviors
//! -------------
//! - A failed Cholesky factorization is an SPD violation and propagates as
//!   `NumericalBreakdown`. Nothing is repaired here; repair happens between
//!   steps in the invariant guard.
//! - `F·U + U·F` is not symmetric for a triangular `F`; the symmetric part is
//!   returned so the perturbation of `C` stays symmetric.
//! - With `ε = 0` the covariance block is exactly zero and no factorization
//!   is attempted.
//! - The `max(ψ, 0)` clamp only absorbs transient roundoff within a single
//!   evaluation. A non-finite ψ is reported, not clamped.
//!
//! Conventions
//! -----------
//! - [`diffusion`] mirrors [`drift`](crate::model::drift::drift): same length
//!   checks, same accessors, same packing through
//!   [`StateLayout::write`].
use crate::model::{
    core::{
        linalg::{cholesky_lower, symmetrize},
        params::ParameterSet,
        state::StateLayout,
    },
    errors::{ModelError, ModelResult},
};
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1};

/// Noise amplitude of the covariance block, `ε·sym(F·U + U·F)`.
///
/// Parameters
/// ----------
/// - `c`: `ArrayView2<f64>`
///   Symmetric positive-definite `n × n` covariance.
/// - `params`: `&ParameterSet`
///   Supplies `ε` and the noise geometry `U`.
///
/// Returns
/// -------
/// `ModelResult<Array2<f64>>`
///   Exactly symmetric `n × n` amplitude matrix.
///
/// Errors
/// ------
/// - `ModelError::NumericalBreakdown` if `C` is not numerically positive
///   definite or contains non-finite entries.
pub fn covariance_diffusion(c: ArrayView2<f64>, params: &ParameterSet) -> ModelResult<Array2<f64>> {
    let n = params.n();
    if params.epsilon() == 0.0 {
        return Ok(Array2::zeros((n, n)));
    }
    let f = cholesky_lower(c)?;
    let u = params.u();
    let product = f.dot(&u) + u.dot(&f);
    Ok(symmetrize(product.view()) * params.epsilon())
}

/// CIR-type flux amplitude `σψ·sqrt(max(ψ, 0))`.
///
/// A NaN `ψ` yields NaN so that callers' finiteness checks see it.
pub fn flux_diffusion(flux: f64, params: &ParameterSet) -> f64 {
    if flux.is_nan() {
        return f64::NAN;
    }
    params.sigma_psi() * flux.max(0.0).sqrt()
}

/// Memory amplitude; always zero.
pub fn memory_diffusion() -> f64 {
    0.0
}

/// In-place diffusion callback `du ← g(u, t)`.
///
/// Errors
/// ------
/// - `ModelError::DimensionMismatch` if `u` or `du` has length `≠ n² + 2`.
/// - `ModelError::NumericalBreakdown` if the Cholesky factorization fails or
///   any amplitude is non-finite; `du` is left untouched in that case.
pub fn diffusion(
    du: ArrayViewMut1<f64>, u: ArrayView1<f64>, params: &ParameterSet, _t: f64,
) -> ModelResult<()> {
    let layout = StateLayout::for_params(params);
    layout.check("state", u.len())?;
    layout.check("diffusion output", du.len())?;

    let c = layout.covariance(u)?;
    let flux = layout.flux(u)?;
    if !flux.is_finite() {
        tracing::warn!(flux, "diffusion received a non-finite flux");
        return Err(ModelError::breakdown("diffusion", format!("non-finite flux {flux}")));
    }

    let g_cov = covariance_diffusion(c.view(), params).inspect_err(|e| {
        tracing::warn!(n = params.n(), error = %e, "covariance diffusion failed");
    })?;
    let g_flux = flux_diffusion(flux, params);

    if !(g_cov.iter().all(|x| x.is_finite()) && g_flux.is_finite()) {
        tracing::warn!(n = params.n(), "diffusion produced non-finite output");
        return Err(ModelError::breakdown("diffusion", "non-finite diffusion component"));
    }

    layout.write(du, g_cov.view(), g_flux, memory_diffusion())
}
