//! spd_flow — SPD covariance dynamics with a Markovian memory lift, with
//! optional Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! the model callbacks to Python integrators via the `_spd_flow` extension
//! module. When the `python-bindings` feature is enabled, this module defines
//! the Python-facing [`SpdFlowModel`] class.
//!
//! Key behaviors
//! -------------
//! - Re-export the [`model`] layer as the public crate surface.
//! - Define the `#[pyclass]` wrapper and the `#[pymodule]` initializer for the
//!   `_spd_flow` Python extension.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work is implemented in [`model`]; this file performs only
//!   FFI glue, input conversion, and error mapping.
//! - Python callers receive new NumPy arrays from every evaluation; the
//!   in-place Rust callbacks are used internally on owned buffers.
//!
//! Conventions
//! -----------
//! - Flat states follow the row-major layout documented in
//!   [`model::core::state`].
//! - `ConfigError` / `ModelError` are converted to `ValueError` at the PyO3
//!   boundary.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code depends on [`model`] (or [`model::prelude`]) and can
//!   ignore the PyO3 items.
//! - A Python integrator constructs `SpdFlowModel(...)`, takes
//!   `initial_state()`, and calls `drift`, `diffusion`, and `guard` inside its
//!   own stepping loop.

pub mod model;
pub mod utils;

#[cfg(feature = "python-bindings")]
use std::sync::Arc;

#[cfg(feature = "python-bindings")]
use ndarray::Array1;

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray1, PyArray2};

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    model::{
        core::{
            params::ParameterSet,
            state::{get_covariance, lyapunov, unflatten},
        },
        diffusion::diffusion,
        drift::drift,
        guard::InvariantGuard,
        problem::build_initial_state,
    },
    utils::{build_params, extract_f64_array, extract_f64_matrix, extract_guard},
};

/// SpdFlowModel — Python-facing handle to the covariance model callbacks.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `SpdFlowModel(n, lam, c_bar, beta, sigma_psi, epsilon, u, eta=1.0,
/// alpha=1.0, normalize=True, guard="combined", guard_thresholds=None)`:
/// - `c_bar`, `u`: 2-D array-likes of shape `(n, n)`, symmetric.
/// - `guard`: one of `"combined"`, `"spd"`, `"nonneg"`, `"none"`.
/// - `guard_thresholds`: optional `(floor, symmetry_tol)`.
///
/// Fields
/// ------
/// - `params`: shared validated [`ParameterSet`].
/// - `guard`: [`InvariantGuard`] applied by `guard(u)`.
///
/// Notes
/// -----
/// - Every method accepts a flat state of length `n² + 2` as a 1-D
///   array-like and raises `ValueError` on dimension mismatch or numerical
///   breakdown.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "spd_flow", frozen)]
pub struct SpdFlowModel {
    params: Arc<ParameterSet>,
    guard: InvariantGuard,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl SpdFlowModel {
    #[new]
    #[pyo3(
        signature = (
            n,
            lam,
            c_bar,
            beta,
            sigma_psi,
            epsilon,
            u,
            eta = 1.0,
            alpha = 1.0,
            normalize = true,
            guard = "combined",
            guard_thresholds = None,
        ),
        text_signature = "(n, lam, c_bar, beta, sigma_psi, epsilon, u, /, eta=1.0, alpha=1.0, \
                          normalize=True, guard='combined', guard_thresholds=None)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn new<'py>(
        n: usize, lam: f64, c_bar: &Bound<'py, PyAny>, beta: f64, sigma_psi: f64, epsilon: f64,
        u: &Bound<'py, PyAny>, eta: f64, alpha: f64, normalize: bool, guard: &str,
        guard_thresholds: Option<(f64, f64)>,
    ) -> PyResult<Self> {
        let params =
            build_params(n, lam, c_bar, beta, sigma_psi, epsilon, u, eta, alpha, normalize)?;
        let guard = extract_guard(guard, guard_thresholds)?;
        Ok(SpdFlowModel { params: Arc::new(params), guard })
    }

    /// Matrix dimension `n`.
    #[getter]
    pub fn n(&self) -> usize {
        self.params.n()
    }

    /// Flat state length `n² + 2`.
    #[getter]
    pub fn state_len(&self) -> usize {
        self.params.state_len()
    }

    /// Validated flat initial state; `c0` defaults to `c_bar`.
    #[pyo3(signature = (c0 = None, psi0 = 0.0, i0 = 0.0))]
    pub fn initial_state<'py>(
        &self, py: Python<'py>, c0: Option<&Bound<'py, PyAny>>, psi0: f64, i0: f64,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let c0 = c0.map(|raw| extract_f64_matrix("c0", raw)).transpose()?;
        let u0 = build_initial_state(&self.params, c0.as_ref().map(|c| c.view()), psi0, i0)?;
        Ok(u0.into_pyarray(py))
    }

    /// Drift `f(u, t)` as a new array.
    #[pyo3(signature = (u, t = 0.0))]
    pub fn drift<'py>(
        &self, py: Python<'py>, u: &Bound<'py, PyAny>, t: f64,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let u = extract_f64_array(py, u)?;
        let mut du = Array1::zeros(self.params.state_len());
        drift(du.view_mut(), u.as_array(), &self.params, t)?;
        Ok(du.into_pyarray(py))
    }

    /// Diffusion amplitudes `g(u, t)` as a new array (diagonal noise).
    #[pyo3(signature = (u, t = 0.0))]
    pub fn diffusion<'py>(
        &self, py: Python<'py>, u: &Bound<'py, PyAny>, t: f64,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let u = extract_f64_array(py, u)?;
        let mut du = Array1::zeros(self.params.state_len());
        diffusion(du.view_mut(), u.as_array(), &self.params, t)?;
        Ok(du.into_pyarray(py))
    }

    /// Apply the configured guard to a copy of `u`.
    ///
    /// Returns `(repaired_state, repaired)`.
    pub fn guard<'py>(
        &self, py: Python<'py>, u: &Bound<'py, PyAny>,
    ) -> PyResult<(Bound<'py, PyArray1<f64>>, bool)> {
        let mut state = extract_f64_array(py, u)?.as_array().to_owned();
        let report = self.guard.apply(state.view_mut(), &self.params)?;
        Ok((state.into_pyarray(py), report.repaired()))
    }

    /// Whether `u` violates an invariant checked by the configured guard.
    pub fn violates_invariants<'py>(&self, py: Python<'py>, u: &Bound<'py, PyAny>) -> PyResult<bool> {
        let u = extract_f64_array(py, u)?;
        Ok(self.guard.violates(u.as_array(), &self.params)?)
    }

    /// Lyapunov diagnostic `tr(C) + tr(C⁻¹) + ψ + I`.
    pub fn lyapunov<'py>(&self, py: Python<'py>, u: &Bound<'py, PyAny>) -> PyResult<f64> {
        let u = extract_f64_array(py, u)?;
        let state = unflatten(u.as_array(), &self.params)?;
        Ok(lyapunov(&state)?)
    }

    /// Symmetrized covariance block of `u` as an `(n, n)` array.
    pub fn covariance<'py>(
        &self, py: Python<'py>, u: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let u = extract_f64_array(py, u)?;
        Ok(get_covariance(u.as_array(), &self.params)?.into_pyarray(py))
    }
}

/// _spd_flow — PyO3 module initializer for the Python extension.
///
/// Notes
/// -----
/// - Invoked by Python when importing the compiled extension; not called
///   directly by user code.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _spd_flow<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<SpdFlowModel>()?;
    Ok(())
}
