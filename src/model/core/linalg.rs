//! linalg — dense symmetric-matrix helpers bridging `ndarray` and `nalgebra`.
//!
//! Purpose
//! -------
//! Collect the small set of dense linear-algebra routines the covariance
//! model needs: symmetrization, asymmetry measurement, eigenvalue clipping
//! onto the SPD cone, lower Cholesky factors, inverses, and a few traces and
//! norms. The model keeps its state in `ndarray` containers; decompositions
//! are delegated to `nalgebra` by copying into a `DMatrix`.
//!
//! Key behaviors
//! -------------
//! - [`project_to_spd`] returns the symmetric part unchanged when its
//!   computed minimum eigenvalue already meets the floor. Otherwise it
//!   eigendecomposes, floors eigenvalues at `max(λ, floor)`, reconstructs,
//!   symmetrizes, and lifts the diagonal until the reconstruction's computed
//!   minimum eigenvalue meets the floor. A projected matrix therefore passes
//!   through a second projection bit-for-bit.
//! - [`cholesky_lower`] and [`inverse`] surface decomposition failures as
//!   [`ModelError::NumericalBreakdown`] instead of patching the input.
//! - Shared tolerances ([`EIGEN_FLOOR`], [`SYMMETRY_TOL`]) live here so the
//!   state, guard, and validation layers agree on them.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are square; callers validate shapes upstream.
//! - Asymmetry is measured entrywise and scaled by `max(1, |a_ij|, |a_ji|)`,
//!   so the tolerance behaves absolutely for small entries and relatively for
//!   large ones.
//!
//! Conventions
//! -----------
//! - `ndarray` matrices are indexed `[[row, col]]`; `DMatrix` is
//!   `(row, col)` and column-major. Copies go through `from_fn` /
//!   `from_shape_fn` so storage order never leaks into callers.
//! - No logging and no I/O; these helpers run inside every evaluation.
use crate::model::errors::{ModelError, ModelResult};
use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView2, Zip};

/// Default eigenvalue floor used when projecting onto the SPD cone.
pub const EIGEN_FLOOR: f64 = 1e-10;

/// Default scaled tolerance for symmetry checks.
pub const SYMMETRY_TOL: f64 = 1e-10;

/// Eigenvalue floor relative to the matrix scale `‖C‖_F`, used by the guard
/// so that repaired large-scale blocks stay Cholesky-factorizable.
pub const RELATIVE_EIGEN_FLOOR: f64 = 1e-12;

/// Upper bound on diagonal lifts after an eigenvalue reconstruction.
const MAX_FLOOR_LIFTS: usize = 8;

/// Location and size of the largest scaled asymmetry in a square matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Asymmetry {
    pub value: f64,
    pub row: usize,
    pub col: usize,
}

/// Copy a square `ndarray` matrix into a `nalgebra::DMatrix`.
pub fn to_dmatrix(m: ArrayView2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[[i, j]])
}

/// Copy a `nalgebra::DMatrix` back into an owned `ndarray` matrix.
pub fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Return `(m + mᵀ) / 2`.
///
/// The result is exactly symmetric in floating point because each pair of
/// mirrored entries is computed from the same two summands. Halving before
/// adding keeps entries near `f64::MAX` finite.
pub fn symmetrize(m: ArrayView2<f64>) -> Array2<f64> {
    let mut out = m.to_owned();
    Zip::from(&mut out).and(&m.t()).for_each(|o, &mt| *o = 0.5 * *o + 0.5 * mt);
    out
}

/// Largest scaled asymmetry `|a_ij − a_ji| / max(1, |a_ij|, |a_ji|)`.
///
/// NaN entries are reported as an infinite asymmetry so they never pass a
/// symmetry check.
pub fn max_asymmetry(m: ArrayView2<f64>) -> Asymmetry {
    let n = m.nrows();
    let mut worst = Asymmetry { value: 0.0, row: 0, col: 0 };
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (m[[i, j]], m[[j, i]]);
            let scale = 1.0_f64.max(a.abs()).max(b.abs());
            let mut value = (a - b).abs() / scale;
            if value.is_nan() {
                value = f64::INFINITY;
            }
            if value > worst.value {
                worst = Asymmetry { value, row: i, col: j };
            }
        }
    }
    worst
}

/// Smallest eigenvalue of the symmetric part of `m`.
///
/// Errors
/// ------
/// - `ModelError::NumericalBreakdown` if `m` has non-finite entries.
pub fn min_eigenvalue(m: ArrayView2<f64>) -> ModelResult<f64> {
    ensure_finite(m, "eigendecomposition")?;
    let eig = to_dmatrix(symmetrize(m).view()).symmetric_eigen();
    Ok(eig.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min))
}

/// project_to_spd — nearest-in-spectrum SPD matrix via eigenvalue clipping.
///
/// Parameters
/// ----------
/// - `c`: `ArrayView2<f64>`
///   Square matrix, possibly slightly asymmetric or indefinite.
/// - `floor`: `f64`
///   Eigenvalue floor; every eigenvalue `λ` is replaced by `max(λ, floor)`.
///
/// Returns
/// -------
/// `ModelResult<Array2<f64>>`
///   Exactly symmetric matrix whose computed minimum eigenvalue is at least
///   `floor`. Applying the projection twice returns the same matrix.
///
/// Errors
/// ------
/// - `ModelError::NumericalBreakdown` when `c` contains NaN/±inf or the
///   reconstruction is non-finite.
///
/// Notes
/// -----
/// - This is a numerical safeguard for the invariant guard. Drift and
///   diffusion never call it.
pub fn project_to_spd(c: ArrayView2<f64>, floor: f64) -> ModelResult<Array2<f64>> {
    ensure_finite(c, "spd projection")?;
    let sym = symmetrize(c);
    if min_eigenvalue(sym.view())? >= floor {
        return Ok(sym);
    }

    let mut eig = to_dmatrix(sym.view()).symmetric_eigen();
    eig.eigenvalues.iter_mut().for_each(|lambda| *lambda = lambda.max(floor));
    let rebuilt = from_dmatrix(&eig.recompose());
    let mut projected = symmetrize(rebuilt.view());
    ensure_finite(projected.view(), "spd projection")?;

    // Reconstruction roundoff can leave the smallest eigenvalue just under
    // the floor; shift the spectrum up until the computed minimum clears it.
    let slack = c.nrows() as f64 * f64::EPSILON * frobenius_norm(projected.view());
    for _ in 0..MAX_FLOOR_LIFTS {
        let lowest = min_eigenvalue(projected.view())?;
        if lowest >= floor {
            break;
        }
        let lift = (floor - lowest) + slack;
        projected.diag_mut().iter_mut().for_each(|d| *d += lift);
    }
    ensure_finite(projected.view(), "spd projection")?;
    Ok(projected)
}

/// Eigenvalue floor for repairing `c`: `max(floor, RELATIVE_EIGEN_FLOOR·‖c‖_F)`.
pub fn scaled_floor(c: ArrayView2<f64>, floor: f64) -> f64 {
    floor.max(RELATIVE_EIGEN_FLOOR * frobenius_norm(c))
}

/// Lower Cholesky factor `F` with `C = F·Fᵀ`.
///
/// Only the lower triangle of `c` is read. Failure means `c` is not
/// numerically positive definite and is reported, never patched.
pub fn cholesky_lower(c: ArrayView2<f64>) -> ModelResult<Array2<f64>> {
    ensure_finite(c, "cholesky")?;
    let chol = to_dmatrix(c)
        .cholesky()
        .ok_or_else(|| ModelError::breakdown("cholesky", "matrix is not positive definite"))?;
    let factor = from_dmatrix(&chol.l());
    ensure_finite(factor.view(), "cholesky")?;
    Ok(factor)
}

/// Matrix inverse; singular or non-finite input is a numerical breakdown.
pub fn inverse(c: ArrayView2<f64>) -> ModelResult<Array2<f64>> {
    ensure_finite(c, "inverse")?;
    let inv = to_dmatrix(c)
        .try_inverse()
        .ok_or_else(|| ModelError::breakdown("inverse", "matrix is singular"))?;
    let out = from_dmatrix(&inv);
    ensure_finite(out.view(), "inverse")?;
    Ok(out)
}

/// `tr(A·B)` without forming the product.
pub fn trace_product(a: ArrayView2<f64>, b: ArrayView2<f64>) -> f64 {
    Zip::from(&a).and(&b.t()).fold(0.0, |acc, &x, &y| acc + x * y)
}

/// Frobenius norm `sqrt(Σ a_ij²)`.
pub fn frobenius_norm(m: ArrayView2<f64>) -> f64 {
    m.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn ensure_finite(m: ArrayView2<f64>, stage: &'static str) -> ModelResult<()> {
    match m.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((i, j), v)) => {
            Err(ModelError::breakdown(stage, format!("non-finite entry at ({i}, {j}): {v}")))
        }
        None => Ok(()),
    }
}
