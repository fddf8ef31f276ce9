//! State representation — structured `(C, ψ, I)` states and the flat vector
//! layout consumed by external integrators.
//!
//! Purpose
//! -------
//! Define the model state and the single source of truth for how it is laid
//! out in a flat `f64` buffer. Every other module reads and writes flat
//! vectors exclusively through [`StateLayout`] or the free accessors below,
//! so the layout cannot drift between components.
//!
//! Key behaviors
//! -------------
//! - [`State::new`] enforces the hard preconditions (square, finite,
//!   symmetric `C`; `ψ ≥ 0`; `I ≥ 0`) and fails with an invalid-state error.
//! - [`flatten`] / [`unflatten`] convert between [`State`] and the flat
//!   vector; `unflatten` symmetrizes the covariance block to absorb roundoff
//!   asymmetry before validating.
//! - [`get_covariance`], [`get_flux`], [`get_memory`] are the accessors used
//!   by drift, diffusion, and diagnostics.
//! - [`lyapunov`] evaluates `tr(C) + tr(C⁻¹) + ψ + I`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Flat vectors have length `n² + 2`; every accessor checks the length and
//!   reports [`ModelError::DimensionMismatch`] otherwise.
//! - Positive definiteness of `C` is *not* checked by [`State::new`]; it is
//!   the invariant the dynamics preserve and the guard repairs.
//!
//! Conventions
//! -----------
//! - Layout (0-based):
//!   - `u[0 .. n²]`: `C` flattened **row-major**: `u[i·n + j] = C[i, j]`
//!   - `u[n²]`     : flux `ψ`
//!   - `u[n² + 1]` : memory `I`
//! - This layout is stable; saved trajectories depend on it.
//!
//! Downstream usage
//! ----------------
//! - The problem assembler flattens the initial state with [`flatten`].
//! - Drift/diffusion unpack with the accessors and pack results with
//!   [`StateLayout::write`].
//! - The invariant guard uses [`StateLayout::raw_covariance`] to see the
//!   unsymmetrized block and the in-place setters to repair it.
use crate::model::{
    core::{
        linalg::{inverse, symmetrize, SYMMETRY_TOL},
        params::ParameterSet,
        validation::{validate_dimension, validate_flat_len, validate_state_components},
    },
    errors::ModelResult,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1};

pub use crate::model::core::linalg::project_to_spd;

/// Index arithmetic for the flat state vector of an `n × n` model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateLayout {
    n: usize,
}

impl StateLayout {
    pub fn new(n: usize) -> Self {
        StateLayout { n }
    }

    pub fn for_params(params: &ParameterSet) -> Self {
        StateLayout { n: params.n() }
    }

    /// Matrix dimension.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Total flat length, `n² + 2`.
    pub fn len(&self) -> usize {
        self.covariance_len() + 2
    }

    /// Number of covariance entries, `n²`.
    pub fn covariance_len(&self) -> usize {
        self.n * self.n
    }

    fn flux_index(&self) -> usize {
        self.covariance_len()
    }

    fn memory_index(&self) -> usize {
        self.covariance_len() + 1
    }

    /// Fail with a dimension error unless `len == n² + 2`.
    pub fn check(&self, role: &'static str, len: usize) -> ModelResult<()> {
        validate_flat_len(role, len, self.len())
    }

    /// Covariance block reshaped row-major, without symmetrization.
    pub fn raw_covariance(&self, u: ArrayView1<f64>) -> ModelResult<Array2<f64>> {
        self.check("state", u.len())?;
        let n = self.n;
        Ok(Array2::from_shape_fn((n, n), |(i, j)| u[i * n + j]))
    }

    /// Covariance block reshaped row-major and symmetrized.
    pub fn covariance(&self, u: ArrayView1<f64>) -> ModelResult<Array2<f64>> {
        let raw = self.raw_covariance(u)?;
        Ok(symmetrize(raw.view()))
    }

    pub fn flux(&self, u: ArrayView1<f64>) -> ModelResult<f64> {
        self.check("state", u.len())?;
        Ok(u[self.flux_index()])
    }

    pub fn memory(&self, u: ArrayView1<f64>) -> ModelResult<f64> {
        self.check("state", u.len())?;
        Ok(u[self.memory_index()])
    }

    /// Pack `(C, ψ, I)` into `out`.
    pub fn write(
        &self, mut out: ArrayViewMut1<f64>, covariance: ArrayView2<f64>, flux: f64, memory: f64,
    ) -> ModelResult<()> {
        self.check("output", out.len())?;
        self.write_covariance(out.view_mut(), covariance)?;
        out[self.flux_index()] = flux;
        out[self.memory_index()] = memory;
        Ok(())
    }

    /// Overwrite only the covariance block of `out`.
    pub fn write_covariance(
        &self, mut out: ArrayViewMut1<f64>, covariance: ArrayView2<f64>,
    ) -> ModelResult<()> {
        self.check("output", out.len())?;
        let n = self.n;
        for ((i, j), value) in covariance.indexed_iter() {
            out[i * n + j] = *value;
        }
        Ok(())
    }

    pub fn set_flux(&self, mut out: ArrayViewMut1<f64>, flux: f64) -> ModelResult<()> {
        self.check("output", out.len())?;
        out[self.flux_index()] = flux;
        Ok(())
    }

    pub fn set_memory(&self, mut out: ArrayViewMut1<f64>, memory: f64) -> ModelResult<()> {
        self.check("output", out.len())?;
        out[self.memory_index()] = memory;
        Ok(())
    }
}

/// Structured model state `(C, ψ, I)`.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    covariance: Array2<f64>,
    flux: f64,
    memory: f64,
}

impl State {
    /// Build a state, enforcing its hard preconditions.
    ///
    /// Errors
    /// ------
    /// - `ModelError::StateShapeMismatch` when `covariance` is not square.
    /// - `ModelError::NonSymmetricState`, `NegativeFlux`, `NegativeMemory`,
    ///   `NonFiniteState` from [`validate_state_components`].
    /// - `ModelError::Configuration` when `covariance` is `0 × 0`.
    pub fn new(covariance: Array2<f64>, flux: f64, memory: f64) -> ModelResult<Self> {
        let n = covariance.nrows();
        validate_dimension(n)?;
        validate_state_components(covariance.view(), flux, memory, n, SYMMETRY_TOL)?;
        Ok(State { covariance, flux, memory })
    }

    /// Default initial condition: `C = Cbar`, `ψ = 0`, `I = 0`.
    pub fn initial(params: &ParameterSet) -> Self {
        State { covariance: params.c_bar().to_owned(), flux: 0.0, memory: 0.0 }
    }

    pub fn dimension(&self) -> usize {
        self.covariance.nrows()
    }

    pub fn covariance(&self) -> ArrayView2<'_, f64> {
        self.covariance.view()
    }

    pub fn flux(&self) -> f64 {
        self.flux
    }

    pub fn memory(&self) -> f64 {
        self.memory
    }

    pub fn flatten(&self) -> Array1<f64> {
        flatten(self)
    }

    pub fn lyapunov(&self) -> ModelResult<f64> {
        lyapunov(self)
    }
}

/// Flatten a state into a new vector of length `n² + 2`.
pub fn flatten(state: &State) -> Array1<f64> {
    let layout = StateLayout::new(state.dimension());
    let mut out = Array1::zeros(layout.len());
    let n = layout.n();
    for ((i, j), value) in state.covariance.indexed_iter() {
        out[i * n + j] = *value;
    }
    out[layout.flux_index()] = state.flux;
    out[layout.memory_index()] = state.memory;
    out
}

/// Rebuild a validated [`State`] from a flat vector.
///
/// The covariance block is symmetrized before validation, so roundoff-level
/// asymmetry is absorbed. Negative `ψ`/`I` are hard errors here; the guard
/// is the tool for repairing them inside a running simulation.
pub fn unflatten(u: ArrayView1<f64>, params: &ParameterSet) -> ModelResult<State> {
    let layout = StateLayout::for_params(params);
    let covariance = layout.covariance(u)?;
    State::new(covariance, layout.flux(u)?, layout.memory(u)?)
}

/// Symmetrized covariance block of `u`.
pub fn get_covariance(u: ArrayView1<f64>, params: &ParameterSet) -> ModelResult<Array2<f64>> {
    StateLayout::for_params(params).covariance(u)
}

/// Flux variable `ψ` of `u`.
pub fn get_flux(u: ArrayView1<f64>, params: &ParameterSet) -> ModelResult<f64> {
    StateLayout::for_params(params).flux(u)
}

/// Memory variable `I` of `u`.
pub fn get_memory(u: ArrayView1<f64>, params: &ParameterSet) -> ModelResult<f64> {
    StateLayout::for_params(params).memory(u)
}

/// Lyapunov-type diagnostic `V = tr(C) + tr(C⁻¹) + ψ + I`.
///
/// Errors
/// ------
/// - `ModelError::NumericalBreakdown` if `C` is singular.
pub fn lyapunov(state: &State) -> ModelResult<f64> {
    let inv = inverse(state.covariance())?;
    Ok(state.covariance.diag().sum() + inv.diag().sum() + state.flux + state.memory)
}

/// Evaluate [`lyapunov`] along a saved trajectory (one flat state per row).
pub fn lyapunov_series(
    trajectory: ArrayView2<f64>, params: &ParameterSet,
) -> ModelResult<Array1<f64>> {
    let values = trajectory
        .rows()
        .into_iter()
        .map(|row| lyapunov(&unflatten(row, params)?))
        .collect::<ModelResult<Vec<f64>>>()?;
    Ok(Array1::from(values))
}
