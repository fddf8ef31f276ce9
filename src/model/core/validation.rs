//! Validation helpers — reusable checks for configuration, states, and flat
//! vectors.
//!
//! Purpose
//! -------
//! Centralize the precondition checks used by the parameter set, the state
//! constructor, the assembled problem, and the drift/diffusion callbacks, so
//! every boundary fails fast with a structured error rather than panicking.
//!
//! Key behaviors
//! -------------
//! - Validate the matrix dimension, reference matrices (shape, finiteness,
//!   symmetry), and scalar rates (positivity or non-negativity, finiteness).
//! - Validate explicit states: covariance shape, finiteness, symmetry, and
//!   non-negativity of the flux and memory variables.
//! - Validate flat vector lengths against `n² + 2`.
//! - Validate guard options and integration time spans.
//!
//! Invariants & assumptions
//! ------------------------
//! - Symmetry is judged with the scaled asymmetry measure of
//!   [`max_asymmetry`] against a tolerance supplied by the caller.
//! - Configuration checks return [`ConfigResult`]; state and vector checks
//!   return [`ModelResult`].
//!
//! Conventions
//! -----------
//! - Indices are 0-based.
//! - This module contains no I/O and no logging; it only inspects values and
//!   array shapes.
//!
//! Testing notes
//! -------------
//! - Unit tests exercise each helper on representative valid and invalid
//!   inputs, including boundary cases (zeros, NaNs, off-by-one lengths).
use crate::model::{
    core::linalg::max_asymmetry,
    errors::{ConfigError, ConfigResult, ModelError, ModelResult},
};
use ndarray::ArrayView2;

/// Validate the matrix dimension (`n > 0`).
pub fn validate_dimension(n: usize) -> ConfigResult<usize> {
    if n == 0 {
        return Err(ConfigError::InvalidDimension { n });
    }
    Ok(n)
}

/// Validate a reference matrix such as `Cbar` or `U`.
///
/// Parameters
/// ----------
/// - `name`: `&'static str`
///   Label used in error messages.
/// - `m`: `ArrayView2<f64>`
///   Candidate matrix.
/// - `n`: `usize`
///   Required dimension.
/// - `tol`: `f64`
///   Scaled symmetry tolerance.
///
/// Errors
/// ------
/// - `ConfigError::MatrixShapeMismatch` if `m` is not `n × n`.
/// - `ConfigError::NonFiniteMatrix` for the first NaN/±inf entry.
/// - `ConfigError::NonSymmetricMatrix` if the worst asymmetry exceeds `tol`.
pub fn validate_reference_matrix(
    name: &'static str, m: ArrayView2<f64>, n: usize, tol: f64,
) -> ConfigResult<()> {
    if m.nrows() != n || m.ncols() != n {
        return Err(ConfigError::MatrixShapeMismatch {
            name,
            expected: n,
            rows: m.nrows(),
            cols: m.ncols(),
        });
    }
    if let Some(((row, col), value)) = m.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(ConfigError::NonFiniteMatrix { name, row, col, value: *value });
    }
    let worst = max_asymmetry(m);
    if worst.value > tol {
        return Err(ConfigError::NonSymmetricMatrix {
            name,
            row: worst.row,
            col: worst.col,
            asymmetry: worst.value,
        });
    }
    Ok(())
}

/// Validate a rate that must be finite and strictly positive.
pub fn validate_positive_rate(name: &'static str, value: f64) -> ConfigResult<f64> {
    if !value.is_finite() {
        return Err(ConfigError::InvalidRate { name, value, reason: "Must be finite." });
    }
    if value <= 0.0 {
        return Err(ConfigError::InvalidRate { name, value, reason: "Must be strictly positive." });
    }
    Ok(value)
}

/// Validate an intensity that must be finite and non-negative.
pub fn validate_nonnegative_rate(name: &'static str, value: f64) -> ConfigResult<f64> {
    if !value.is_finite() {
        return Err(ConfigError::InvalidRate { name, value, reason: "Must be finite." });
    }
    if value < 0.0 {
        return Err(ConfigError::InvalidRate { name, value, reason: "Must be non-negative." });
    }
    Ok(value)
}

/// Validate guard options: `floor` finite and > 0, `tol` finite and ≥ 0.
pub fn validate_guard_options(floor: f64, tol: f64) -> ConfigResult<()> {
    if !floor.is_finite() || floor <= 0.0 {
        return Err(ConfigError::InvalidFloor { value: floor });
    }
    if !tol.is_finite() || tol < 0.0 {
        return Err(ConfigError::InvalidTolerance { value: tol });
    }
    Ok(())
}

/// Validate an integration time span `(t0, t1)`.
pub fn validate_time_span(t_span: (f64, f64)) -> ConfigResult<(f64, f64)> {
    let (t0, t1) = t_span;
    if !t0.is_finite() || !t1.is_finite() || t0 >= t1 {
        return Err(ConfigError::InvalidTimeSpan { t0, t1 });
    }
    Ok(t_span)
}

/// Validate the components of an explicit state `(C, ψ, I)`.
///
/// Errors
/// ------
/// - `ModelError::StateShapeMismatch` if `C` is not `n × n`.
/// - `ModelError::NonFiniteState` for the first non-finite entry, indexed in
///   the flat layout (row-major `C`, then ψ, then I).
/// - `ModelError::NonSymmetricState` if `C` is asymmetric beyond `tol`.
/// - `ModelError::NegativeFlux` / `ModelError::NegativeMemory` for `ψ < 0`
///   or `I < 0`.
pub fn validate_state_components(
    covariance: ArrayView2<f64>, flux: f64, memory: f64, n: usize, tol: f64,
) -> ModelResult<()> {
    if covariance.nrows() != n || covariance.ncols() != n {
        return Err(ModelError::StateShapeMismatch {
            expected: n,
            rows: covariance.nrows(),
            cols: covariance.ncols(),
        });
    }
    if let Some(((row, col), value)) = covariance.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(ModelError::NonFiniteState { index: row * n + col, value: *value });
    }
    if !flux.is_finite() {
        return Err(ModelError::NonFiniteState { index: n * n, value: flux });
    }
    if !memory.is_finite() {
        return Err(ModelError::NonFiniteState { index: n * n + 1, value: memory });
    }
    let worst = max_asymmetry(covariance);
    if worst.value > tol {
        return Err(ModelError::NonSymmetricState {
            row: worst.row,
            col: worst.col,
            asymmetry: worst.value,
        });
    }
    if flux < 0.0 {
        return Err(ModelError::NegativeFlux { value: flux });
    }
    if memory < 0.0 {
        return Err(ModelError::NegativeMemory { value: memory });
    }
    Ok(())
}

/// Validate a flat vector length against `expected = n² + 2`.
pub fn validate_flat_len(role: &'static str, actual: usize, expected: usize) -> ModelResult<()> {
    if actual != expected {
        return Err(ModelError::DimensionMismatch { role, expected, actual });
    }
    Ok(())
}
