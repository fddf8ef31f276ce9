//! utils — PyO3 conversion helpers for the Python bindings.
//!
//! Converts NumPy arrays, pandas objects, and plain Python sequences into
//! `ndarray` containers, and Python-friendly arguments into validated model
//! types. Everything here is compiled only with the `python-bindings`
//! feature.
#[cfg(feature = "python-bindings")]
use ndarray::Array2;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::model::{
    core::{
        kernels::{InteractionLaplacian, MemoryKernel},
        params::ParameterSet,
    },
    guard::{GuardOptions, GuardPolicy, InvariantGuard},
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
    PyReadonlyArray2,
};

/// Borrow or copy a 1-D float64 input as a contiguous read-only array.
///
/// Accepts a contiguous `numpy.ndarray`, any object with `to_numpy()`
/// (pandas), or a sequence of floats (copied).
#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Copy a 2-D float64 input (`numpy.ndarray`, DataFrame, or nested
/// sequence) into an owned `Array2`.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix(name: &str, raw_data: &Bound<'_, PyAny>) -> PyResult<Array2<f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr_ro.as_array().to_owned());
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(frame_ro) = obj.extract::<PyReadonlyArray2<f64>>() {
            return Ok(frame_ro.as_array().to_owned());
        }
    }

    let rows: Vec<Vec<f64>> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(format!(
            "{name} must be a 2-D numpy.ndarray or nested sequence of float64"
        ))
    })?;
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(PyValueError::new_err(format!("{name} has rows of unequal length")));
    }
    Ok(Array2::from_shape_fn((rows.len(), ncols), |(i, j)| rows[i][j]))
}

/// Build a validated [`ParameterSet`] from Python-side arguments.
#[cfg(feature = "python-bindings")]
#[allow(clippy::too_many_arguments)]
pub fn build_params<'py>(
    n: usize, lam: f64, c_bar: &Bound<'py, PyAny>, beta: f64, sigma_psi: f64, epsilon: f64,
    u: &Bound<'py, PyAny>, eta: f64, alpha: f64, normalize: bool,
) -> PyResult<ParameterSet> {
    let c_bar = extract_f64_matrix("c_bar", c_bar)?;
    let u = extract_f64_matrix("u", u)?;
    let params = ParameterSet::new(
        n,
        lam,
        c_bar,
        beta,
        sigma_psi,
        epsilon,
        u,
        MemoryKernel::exponential(eta)?,
        InteractionLaplacian::correlation(alpha, normalize)?,
    )?;
    Ok(params)
}

/// Parse the guard policy name and optional `(floor, symmetry_tol)`.
#[cfg(feature = "python-bindings")]
pub fn extract_guard(policy: &str, thresholds: Option<(f64, f64)>) -> PyResult<InvariantGuard> {
    let policy = match policy.to_ascii_lowercase().as_str() {
        "combined" => GuardPolicy::Combined,
        "spd" | "spd_only" => GuardPolicy::SpdOnly,
        "nonneg" | "non_negative_only" => GuardPolicy::NonNegativeOnly,
        "none" | "disabled" => GuardPolicy::Disabled,
        other => {
            return Err(PyValueError::new_err(format!(
                "unknown guard policy '{other}'; expected 'combined', 'spd', 'nonneg', or 'none'"
            )));
        }
    };
    let options = match thresholds {
        Some((floor, tol)) => GuardOptions::new(floor, tol)?,
        None => GuardOptions::default(),
    };
    Ok(InvariantGuard::new(policy, options)?)
}
