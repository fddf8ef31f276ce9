//! Problem assembly — the callback contract handed to an external
//! stochastic integrator.
//!
//! Purpose
//! -------
//! Package a shared [`ParameterSet`], a validated initial state, a time span,
//! and an [`InvariantGuard`] into an [`SdeProblem`] that exposes the drift and
//! diffusion callbacks plus the post-step hook through the
//! [`StochasticSystem`] trait. The integration loop itself (step control,
//! Brownian increments, error estimation) lives outside this crate.
//!
//! Key behaviors
//! -------------
//! - [`build_initial_state`] validates `(C0, ψ0, I0)` (default `C0 = Cbar`)
//!   and returns the flat vector.
//! - [`assemble_problem`] checks `u0` against `n² + 2`, validates the time
//!   span, and re-validates the state preconditions of `u0`.
//! - With `noise = false` the diffusion callback writes zeros, giving the
//!   deterministic variant of the same model.
//! - The guard is the combined one by default; pass
//!   [`InvariantGuard::disabled`] to leave soft drift visible.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameters are shared through `Arc` and never mutated, so one problem
//!   (or many problems over the same parameters) can be evaluated from any
//!   number of threads.
use crate::model::{
    core::{
        linalg::SYMMETRY_TOL,
        params::ParameterSet,
        state::{flatten, State, StateLayout},
        validation::{validate_state_components, validate_time_span},
    },
    diffusion::diffusion,
    drift::drift,
    errors::{ModelError, ModelResult},
    guard::{GuardReport, InvariantGuard},
};
use ndarray::{Array1, ArrayView1, ArrayView2, ArrayViewMut1};
use std::sync::Arc;

/// Two-callback SDE contract plus post-step hook.
///
/// An integrator generic over this trait calls `drift` and `diffusion` on
/// candidate states and `post_step` on every accepted state.
pub trait StochasticSystem {
    /// Flat state length.
    fn dimension(&self) -> usize;

    /// `du ← f(u, t)`.
    fn drift(&self, du: ArrayViewMut1<f64>, u: ArrayView1<f64>, t: f64) -> ModelResult<()>;

    /// `du ← g(u, t)`, one amplitude per component (diagonal noise).
    fn diffusion(&self, du: ArrayViewMut1<f64>, u: ArrayView1<f64>, t: f64) -> ModelResult<()>;

    /// Hook run after each accepted step. The default does nothing.
    fn post_step(&self, _u: ArrayViewMut1<f64>) -> ModelResult<GuardReport> {
        Ok(GuardReport::default())
    }
}

/// Options for [`assemble_problem`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProblemOptions {
    pub guard: InvariantGuard,
    pub noise: bool,
}

impl Default for ProblemOptions {
    fn default() -> Self {
        ProblemOptions { guard: InvariantGuard::combined(), noise: true }
    }
}

/// Assembled SDE problem over the covariance model.
#[derive(Debug, Clone)]
pub struct SdeProblem {
    params: Arc<ParameterSet>,
    u0: Array1<f64>,
    t_span: (f64, f64),
    guard: InvariantGuard,
    noise: bool,
}

impl SdeProblem {
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Shared handle to the parameters.
    pub fn shared_params(&self) -> Arc<ParameterSet> {
        Arc::clone(&self.params)
    }

    pub fn u0(&self) -> ArrayView1<'_, f64> {
        self.u0.view()
    }

    pub fn t_span(&self) -> (f64, f64) {
        self.t_span
    }

    pub fn guard(&self) -> &InvariantGuard {
        &self.guard
    }

    pub fn has_noise(&self) -> bool {
        self.noise
    }
}

impl StochasticSystem for SdeProblem {
    fn dimension(&self) -> usize {
        self.params.state_len()
    }

    fn drift(&self, du: ArrayViewMut1<f64>, u: ArrayView1<f64>, t: f64) -> ModelResult<()> {
        drift(du, u, &self.params, t)
    }

    fn diffusion(&self, mut du: ArrayViewMut1<f64>, u: ArrayView1<f64>, t: f64) -> ModelResult<()> {
        if self.noise {
            return diffusion(du, u, &self.params, t);
        }
        let layout = StateLayout::for_params(&self.params);
        layout.check("state", u.len())?;
        layout.check("diffusion output", du.len())?;
        du.fill(0.0);
        Ok(())
    }

    fn post_step(&self, u: ArrayViewMut1<f64>) -> ModelResult<GuardReport> {
        self.guard.apply(u, &self.params)
    }
}

/// Validated flat initial state.
///
/// Parameters
/// ----------
/// - `params`: `&ParameterSet`
/// - `c0`: `Option<ArrayView2<f64>>`
///   Initial covariance; `None` uses `Cbar`.
/// - `flux0`, `memory0`: `f64`
///   Initial ψ and I (both `≥ 0`).
///
/// Returns
/// -------
/// `ModelResult<Array1<f64>>`
///   Flat vector of length `n² + 2`.
///
/// Errors
/// ------
/// - Invalid-state errors if `c0` is not `n × n`, finite, and symmetric, or
///   if `flux0`/`memory0` is negative or non-finite.
///
/// Notes
/// -----
/// - Positive definiteness of `c0` is not checked here. A non-PD start
///   surfaces as a Cholesky breakdown in the first diffusion evaluation or is
///   repaired by the guard after the first step.
pub fn build_initial_state<'a>(
    params: &'a ParameterSet, c0: Option<ArrayView2<'a, f64>>, flux0: f64, memory0: f64,
) -> ModelResult<Array1<f64>> {
    let covariance = c0.unwrap_or_else(|| params.c_bar());
    let n = params.n();
    if covariance.dim() != (n, n) {
        return Err(ModelError::StateShapeMismatch {
            expected: n,
            rows: covariance.nrows(),
            cols: covariance.ncols(),
        });
    }
    let state = State::new(covariance.to_owned(), flux0, memory0)?;
    Ok(flatten(&state))
}

/// Bundle parameters, initial state, time span, and options into an
/// [`SdeProblem`].
///
/// Errors
/// ------
/// - `ModelError::DimensionMismatch` if `u0.len() != n² + 2`.
/// - `ModelError::Configuration(InvalidTimeSpan)` unless `t0 < t1`, both finite.
/// - Invalid-state errors if `u0` violates the state preconditions. The raw
///   covariance block is checked, so an asymmetric `u0` is rejected rather
///   than silently symmetrized.
pub fn assemble_problem(
    params: Arc<ParameterSet>, u0: Array1<f64>, t_span: (f64, f64), options: ProblemOptions,
) -> ModelResult<SdeProblem> {
    let layout = StateLayout::for_params(&params);
    layout.check("initial state", u0.len())?;
    let t_span = validate_time_span(t_span)?;
    let raw = layout.raw_covariance(u0.view())?;
    validate_state_components(
        raw.view(),
        layout.flux(u0.view())?,
        layout.memory(u0.view())?,
        params.n(),
        SYMMETRY_TOL,
    )?;

    tracing::debug!(
        n = params.n(),
        noise = options.noise,
        guard = ?options.guard.policy(),
        t0 = t_span.0,
        t1 = t_span.1,
        "assembled SDE problem"
    );

    Ok(SdeProblem { params, u0, t_span, guard: options.guard, noise: options.noise })
}
