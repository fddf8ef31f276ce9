//! Geometric operators on the covariance matrix.
//!
//! Purpose
//! -------
//! Provide the three pure algebraic operators the drift is built from, plus a
//! non-dynamical diagnostic summary for validation consumers:
//! - [`laplacian`]: graph Laplacian of the correlation structure of `C`.
//! - [`transport`]: Jordan product `C·L + L·C`, redistributing covariance
//!   mass along edges of the interaction graph.
//! - [`curvature`]: global feedback `tr(C·L)·C`.
//! - [`operator_diagnostics`]: norms, symmetry, and growth ratios.
//!
//! Key behaviors
//! -------------
//! - `laplacian` normalizes `C` to a correlation matrix `R = D⁻¹·C·D⁻¹` with
//!   `D = diag(sqrt(C_ii))`. Rows with `C_ii ≤ 0` get inverse scale 0, which
//!   isolates the node instead of dividing by zero.
//! - Edge weights and degrees come from the configured
//!   [`InteractionLaplacian`](crate::model::core::kernels::InteractionLaplacian);
//!   the diagonal of `W` is zero and `L = diag(deg) − W`.
//!
//! Invariants & assumptions
//! ------------------------
//! - For symmetric `C`, `L` is symmetric, positive semidefinite, and has zero
//!   row sums (`L·1 = 0`).
//! - `transport` and `curvature` are symmetric whenever `C` is.
//! - For PSD `C`, `tr(C·L) ≥ 0`, so the curvature term never flips the
//!   eigenvector structure of `C`.
//! - Inputs are square `n × n` with `n == params.n()`; callers unpack them
//!   through the state accessors, which guarantee this.
//!
//! Conventions
//! -----------
//! - All operators allocate and return new matrices; none mutate `C`.
//! - No logging; these run inside every drift evaluation.
//!
//! Testing notes
//! -------------
//! - Unit tests cover zero row sums, symmetry, PSD-ness of `L`, the
//!   degenerate-diagonal path, and hand-computed 2x2 values. Randomized
//!   symmetry properties are checked with `proptest`.
use crate::model::core::{
    linalg::{frobenius_norm, max_asymmetry, trace_product},
    params::ParameterSet,
};
use ndarray::{Array1, Array2, ArrayView2};

/// Interaction Laplacian `L = diag(deg) − W` of the correlation graph of `C`.
///
/// Parameters
/// ----------
/// - `c`: `ArrayView2<f64>`
///   Symmetric `n × n` covariance.
/// - `params`: `&ParameterSet`
///   Supplies the Laplacian variant (`α`, `normalize`).
///
/// Returns
/// -------
/// `Array2<f64>`
///   Symmetric PSD matrix with zero row sums.
pub fn laplacian(c: ArrayView2<f64>, params: &ParameterSet) -> Array2<f64> {
    let n = c.nrows();
    let kind = params.laplacian();
    let inv_scale: Array1<f64> =
        c.diag().mapv(|c_ii| if c_ii > 0.0 { 1.0 / c_ii.sqrt() } else { 0.0 });

    // Upper triangle only, mirrored, so W is exactly symmetric.
    let mut w = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let r_ij = inv_scale[i] * c[[i, j]] * inv_scale[j];
            let w_ij = kind.weight(r_ij);
            w[[i, j]] = w_ij;
            w[[j, i]] = w_ij;
        }
    }

    let mut l = w.mapv(|x| -x);
    for (i, row) in w.rows().into_iter().enumerate() {
        l[[i, i]] = kind.degree(row);
    }
    l
}

/// Transport operator `C·L + L·C`.
pub fn transport(c: ArrayView2<f64>, params: &ParameterSet) -> Array2<f64> {
    let l = laplacian(c, params);
    transport_with(c, l.view())
}

/// Curvature feedback `tr(C·L)·C`.
pub fn curvature(c: ArrayView2<f64>, params: &ParameterSet) -> Array2<f64> {
    let l = laplacian(c, params);
    curvature_with(c, l.view())
}

/// Transport for a precomputed Laplacian.
pub(crate) fn transport_with(c: ArrayView2<f64>, l: ArrayView2<f64>) -> Array2<f64> {
    c.dot(&l) + l.dot(&c)
}

/// Curvature for a precomputed Laplacian.
pub(crate) fn curvature_with(c: ArrayView2<f64>, l: ArrayView2<f64>) -> Array2<f64> {
    c.to_owned() * trace_product(c, l)
}

/// Summary of operator magnitudes relative to `‖C‖_F`.
///
/// Fields
/// ------
/// - `covariance_norm`: `‖C‖_F`.
/// - `laplacian_norm`, `transport_norm`, `curvature_norm`: Frobenius norms
///   of `L`, `C·L + L·C`, and `tr(C·L)·C`.
/// - `transport_ratio`, `curvature_ratio`: the two operator norms divided by
///   `‖C‖_F` (0 when `C = 0`).
/// - `curvature_coefficient`: `tr(C·L)`.
/// - `max_asymmetry`: largest scaled asymmetry across `L`, transport, and
///   curvature.
/// - `max_row_sum`: largest `|Σ_j L_ij|`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatorDiagnostics {
    pub covariance_norm: f64,
    pub laplacian_norm: f64,
    pub transport_norm: f64,
    pub curvature_norm: f64,
    pub transport_ratio: f64,
    pub curvature_ratio: f64,
    pub curvature_coefficient: f64,
    pub max_asymmetry: f64,
    pub max_row_sum: f64,
}

/// Compute [`OperatorDiagnostics`] for `C`. Not used by the dynamics.
pub fn operator_diagnostics(c: ArrayView2<f64>, params: &ParameterSet) -> OperatorDiagnostics {
    let l = laplacian(c, params);
    let t = transport_with(c, l.view());
    let k = curvature_with(c, l.view());

    let covariance_norm = frobenius_norm(c);
    let transport_norm = frobenius_norm(t.view());
    let curvature_norm = frobenius_norm(k.view());
    let ratio = |x: f64| if covariance_norm > 0.0 { x / covariance_norm } else { 0.0 };

    OperatorDiagnostics {
        covariance_norm,
        laplacian_norm: frobenius_norm(l.view()),
        transport_norm,
        curvature_norm,
        transport_ratio: ratio(transport_norm),
        curvature_ratio: ratio(curvature_norm),
        curvature_coefficient: trace_product(c, l.view()),
        max_asymmetry: max_asymmetry(l.view())
            .value
            .max(max_asymmetry(t.view()).value)
            .max(max_asymmetry(k.view()).value),
        max_row_sum: l.rows().into_iter().map(|r| r.sum().abs()).fold(0.0, f64::max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::core::{
        kernels::{InteractionLaplacian, MemoryKernel},
        linalg::{min_eigenvalue, symmetrize},
    };
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use proptest::prelude::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Laplacian invariants: zero row sums, symmetry, PSD, zero diagonal of W.
    // - Degenerate rows (C_ii = 0) being isolated.
    // - Hand-computed 2x2 values for transport and curvature.
    // - Diagnostics consistency.
    //
    // They intentionally DO NOT cover:
    // - How these operators enter the drift; see `drift`.
    // -------------------------------------------------------------------------

    fn params(n: usize, normalize: bool) -> ParameterSet {
        ParameterSet::new(
            n,
            1.0,
            Array2::eye(n),
            1.0,
            0.2,
            0.1,
            Array2::eye(n),
            MemoryKernel::exponential(2.0).unwrap(),
            InteractionLaplacian::correlation(1.0, normalize).unwrap(),
        )
        .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Verify the 2x2 Laplacian against the formula.
    //
    // Given
    // -----
    // - C = [[4, 1], [1, 1]] → R_01 = 1 / (2·1) = 0.5.
    // - Normalized weights: w = 0.5 / 1.5 = 1/3.
    //
    // Expect
    // ------
    // - L = [[1/3, −1/3], [−1/3, 1/3]].
    fn laplacian_matches_two_by_two_formula() {
        let c = array![[4.0, 1.0], [1.0, 1.0]];
        let l = laplacian(c.view(), &params(2, true));
        let w = 1.0 / 3.0;
        assert_abs_diff_eq!(l[[0, 0]], w, epsilon = 1e-15);
        assert_abs_diff_eq!(l[[0, 1]], -w, epsilon = 1e-15);
        assert_abs_diff_eq!(l[[1, 0]], -w, epsilon = 1e-15);
        assert_abs_diff_eq!(l[[1, 1]], w, epsilon = 1e-15);

        let raw = laplacian(c.view(), &params(2, false));
        assert_abs_diff_eq!(raw[[0, 1]], -0.5, epsilon = 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // A zero diagonal entry isolates its node rather than producing NaN.
    //
    // Given
    // -----
    // - C with C_22 = 0 and a nonzero off-diagonal in that row.
    //
    // Expect
    // ------
    // - All entries of L are finite and the third row/column is zero.
    fn laplacian_isolates_degenerate_rows() {
        let c = array![[1.0, 0.5, 0.3], [0.5, 1.0, 0.2], [0.3, 0.2, 0.0]];
        let l = laplacian(c.view(), &params(3, true));
        assert!(l.iter().all(|x| x.is_finite()));
        for k in 0..3 {
            assert_eq!(l[[2, k]], 0.0);
            assert_eq!(l[[k, 2]], 0.0);
        }
    }

    #[test]
    // Purpose
    // -------
    // Identity covariance has no edges, so every operator except curvature's
    // coefficient vanishes.
    //
    // Given
    // -----
    // - C = I₃.
    //
    // Expect
    // ------
    // - L = 0, transport = 0, curvature = 0.
    fn operators_vanish_on_uncorrelated_covariance() {
        let c = Array2::<f64>::eye(3);
        let p = params(3, true);
        assert!(laplacian(c.view(), &p).iter().all(|&x| x == 0.0));
        assert!(transport(c.view(), &p).iter().all(|&x| x == 0.0));
        assert!(curvature(c.view(), &p).iter().all(|&x| x == 0.0));
    }

    #[test]
    // Purpose
    // -------
    // Check transport and curvature values on a 2x2 example.
    //
    // Given
    // -----
    // - C = [[4, 1], [1, 1]], L = (1/3)·[[1, −1], [−1, 1]].
    //
    // Expect
    // ------
    // - tr(C·L) = (4 − 1 − 1 + 1)/3 = 1.
    // - curvature == C; transport == C·L + L·C.
    fn transport_and_curvature_match_hand_computation() {
        let c = array![[4.0, 1.0], [1.0, 1.0]];
        let p = params(2, true);
        let l = laplacian(c.view(), &p);

        let k = curvature(c.view(), &p);
        for (a, b) in k.iter().zip(c.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-14);
        }

        let t = transport(c.view(), &p);
        let expected = c.dot(&l) + l.dot(&c);
        for (a, b) in t.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-14);
        }
        assert_abs_diff_eq!(t[[0, 1]], t[[1, 0]], epsilon = 1e-14);
    }

    #[test]
    fn diagnostics_report_consistent_norms() {
        let c = array![[4.0, 1.0], [1.0, 1.0]];
        let diag = operator_diagnostics(c.view(), &params(2, true));
        assert_abs_diff_eq!(diag.covariance_norm, 19.0_f64.sqrt(), epsilon = 1e-14);
        assert_abs_diff_eq!(diag.curvature_coefficient, 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(diag.curvature_ratio, 1.0, epsilon = 1e-14);
        assert!(diag.max_row_sum < 1e-15);
        assert!(diag.max_asymmetry < 1e-12);
    }

    proptest! {
        // Purpose
        // -------
        // For random symmetric C: L has zero row sums, is symmetric and PSD;
        // transport and curvature are symmetric.
        #[test]
        fn laplacian_invariants_hold_for_random_symmetric_c(
            entries in prop::collection::vec(-2.0f64..2.0, 16),
            normalize in any::<bool>(),
        ) {
            let a = Array2::from_shape_vec((4, 4), entries).unwrap();
            let c = symmetrize((a.dot(&a.t()) + Array2::<f64>::eye(4) * 0.1).view());
            let p = params(4, normalize);

            let l = laplacian(c.view(), &p);
            for row in l.rows() {
                prop_assert!(row.sum().abs() <= 1e-12);
            }
            prop_assert!(max_asymmetry(l.view()).value <= 1e-14);
            prop_assert!(min_eigenvalue(l.view()).unwrap() >= -1e-10);

            let t = transport(c.view(), &p);
            let k = curvature(c.view(), &p);
            prop_assert!(max_asymmetry(t.view()).value <= 1e-12);
            prop_assert!(max_asymmetry(k.view()).value <= 1e-12);
            prop_assert!(trace_product(c.view(), l.view()) >= -1e-10);
        }

        // Purpose
        // -------
        // Symmetry does not depend on definiteness: for random symmetric,
        // generally indefinite C (including non-positive diagonals), L keeps
        // zero row sums and transport and curvature stay symmetric.
        #[test]
        fn operators_are_symmetric_for_indefinite_symmetric_c(
            entries in prop::collection::vec(-2.0f64..2.0, 16),
            normalize in any::<bool>(),
        ) {
            let a = Array2::from_shape_vec((4, 4), entries).unwrap();
            let c = symmetrize(a.view());
            let p = params(4, normalize);

            let l = laplacian(c.view(), &p);
            for (i, row) in l.rows().into_iter().enumerate() {
                prop_assert!(row.sum().abs() <= 1e-12 * (1.0 + l[[i, i]].abs()));
            }
            prop_assert!(max_asymmetry(l.view()).value <= 1e-14);

            let t = transport(c.view(), &p);
            let k = curvature(c.view(), &p);
            prop_assert!(max_asymmetry(t.view()).value <= 1e-12);
            prop_assert!(max_asymmetry(k.view()).value <= 1e-12);
        }
    }
}
