//! Integration tests for the SPD covariance model pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end flow an external integrator follows: parameter
//!   construction (directly or from a serde config), initial-state building,
//!   problem assembly, repeated drift/diffusion evaluation, and the post-step
//!   invariant guard.
//! - Exercise the model over many steps of a hand-rolled Euler–Maruyama loop
//!   with deterministic increments, so results are reproducible.
//!
//! Coverage
//! --------
//! - `model::core`: `ModelConfig` → `ParameterSet`, `lyapunov_series`.
//! - `model::problem`: `build_initial_state`, `assemble_problem`, and the
//!   `StochasticSystem` callbacks on `SdeProblem`.
//! - `model::guard`: repair of a step that left the SPD cone, and the
//!   disabled-guard path leaving drift visible.
//! - `model::ensemble`: parallel evaluation over several trajectories.
//! - `model::errors`: the four-way error taxonomy from the public API.
//!
//! Exclusions
//! ----------
//! - Operator algebra and validation helpers; covered by unit tests.
//! - Python bindings.
use approx::assert_relative_eq;
use ndarray::{array, Array1, Array2};
use spd_flow::model::{
    core::linalg::min_eigenvalue, diffusion_ensemble, drift_ensemble, get_covariance, get_flux,
    get_memory, lyapunov_series, operator_diagnostics, prelude::*,
};
use std::sync::Arc;

/// Deterministic stand-in for Brownian increments: bounded, sign-changing,
/// scaled by `sqrt(dt)`.
fn increment(step: usize, component: usize, dt: f64) -> f64 {
    let phase = 0.7 * step as f64 + 1.3 * component as f64;
    dt.sqrt() * phase.sin()
}

/// One Euler–Maruyama step followed by the post-step hook. Returns whether
/// the guard repaired anything.
fn euler_step<S: StochasticSystem>(
    system: &S, u: &mut Array1<f64>, step: usize, dt: f64, t: f64,
) -> ModelResult<bool> {
    let dim = system.dimension();
    let mut f = Array1::<f64>::zeros(dim);
    let mut g = Array1::<f64>::zeros(dim);
    system.drift(f.view_mut(), u.view(), t)?;
    system.diffusion(g.view_mut(), u.view(), t)?;
    for k in 0..dim {
        u[k] += f[k] * dt + g[k] * increment(step, k, dt);
    }
    Ok(system.post_step(u.view_mut())?.repaired())
}

fn identity_params(n: usize, sigma_psi: f64, epsilon: f64) -> Arc<ParameterSet> {
    Arc::new(ParameterSet::with_identity_references(n, 1.0, 1.0, sigma_psi, epsilon, 2.0).unwrap())
}

#[test]
// Purpose
// -------
// The noise-free model with no flux relaxes the covariance toward Cbar.
//
// Given
// -----
// - n = 2, Cbar = I, λ = 1, C0 = diag(2, 0.5), ψ0 = I0 = 0, noise off.
// - 500 explicit Euler steps with dt = 0.01.
//
// Expect
// ------
// - ψ and I stay exactly zero.
// - ‖C − I‖ contracts by (1 − λ·dt)^500 ≈ 0.0066.
// - The guard never fires.
fn deterministic_relaxation_reaches_reference() {
    let params = identity_params(2, 0.2, 0.1);
    let c0 = array![[2.0, 0.0], [0.0, 0.5]];
    let u0 = build_initial_state(&params, Some(c0.view()), 0.0, 0.0).unwrap();
    let options = ProblemOptions { noise: false, ..ProblemOptions::default() };
    let problem = assemble_problem(params.clone(), u0.clone(), (0.0, 5.0), options).unwrap();

    let mut u = u0;
    for step in 0..500 {
        let repaired = euler_step(&problem, &mut u, step, 0.01, step as f64 * 0.01).unwrap();
        assert!(!repaired);
    }

    assert_eq!(get_flux(u.view(), &params).unwrap(), 0.0);
    assert_eq!(get_memory(u.view(), &params).unwrap(), 0.0);
    let c = get_covariance(u.view(), &params).unwrap();
    let gap = (&c - &Array2::<f64>::eye(2)).mapv(|x| x * x).sum().sqrt();
    let expected = 0.99f64.powi(500) * (1.0f64 + 0.25).sqrt();
    assert_relative_eq!(gap, expected, max_relative = 1e-9);
}

#[test]
// Purpose
// -------
// The auxiliary variables follow their closed-form Euler recursions while
// transport and curvature act on C.
//
// Given
// -----
// - n = 3, ψ0 = 0.5, I0 = 0, C0 with off-diagonal correlation, noise off.
// - 100 Euler steps with dt = 0.01, β = 1, η = 2.
//
// Expect
// ------
// - ψ_k = 0.5·(1 − β·dt)^k to roundoff.
// - I_{k+1} = (1 − η·dt)·I_k + dt·ψ_k reproduced step by step.
// - The covariance stays SPD and the Lyapunov series is finite.
fn flux_and_memory_follow_their_recursions() {
    let params = identity_params(3, 0.3, 0.1);
    let c0 = array![[1.5, 0.4, 0.1], [0.4, 1.0, -0.2], [0.1, -0.2, 0.8]];
    let u0 = build_initial_state(&params, Some(c0.view()), 0.5, 0.0).unwrap();
    let options = ProblemOptions { noise: false, ..ProblemOptions::default() };
    let problem = assemble_problem(params.clone(), u0.clone(), (0.0, 1.0), options).unwrap();

    let dt = 0.01;
    let mut u = u0;
    let mut psi_ref = 0.5;
    let mut mem_ref = 0.0;
    let mut trajectory = Array2::<f64>::zeros((101, params.state_len()));
    trajectory.row_mut(0).assign(&u);
    for step in 0..100 {
        euler_step(&problem, &mut u, step, dt, step as f64 * dt).unwrap();
        mem_ref = (1.0 - 2.0 * dt) * mem_ref + dt * psi_ref;
        psi_ref *= 1.0 - dt;
        trajectory.row_mut(step + 1).assign(&u);

        assert_relative_eq!(get_flux(u.view(), &params).unwrap(), psi_ref, max_relative = 1e-12);
        assert_relative_eq!(get_memory(u.view(), &params).unwrap(), mem_ref, max_relative = 1e-12);
    }

    let c = get_covariance(u.view(), &params).unwrap();
    assert!(min_eigenvalue(c.view()).unwrap() > 0.0);
    let series = lyapunov_series(trajectory.view(), &params).unwrap();
    assert_eq!(series.len(), 101);
    assert!(series.iter().all(|v| v.is_finite() && *v > 0.0));

    let diag = operator_diagnostics(c.view(), &params);
    assert!(diag.curvature_coefficient >= 0.0);
    assert!(diag.max_asymmetry < 1e-12);
}

#[test]
// Purpose
// -------
// A stochastic run with the combined guard never leaves the admissible set
// after a post-step hook.
//
// Given
// -----
// - Config parsed from JSON (n = 3, σψ = 0.3, ε = 0.2, η = 2).
// - ψ0 = 0.4, I0 = 0.1, 300 Euler–Maruyama steps with dt = 0.01 and
//   deterministic increments.
//
// Expect
// ------
// - Every drift/diffusion evaluation succeeds.
// - After each post-step hook the state satisfies all invariants.
fn stochastic_run_stays_admissible_from_config() {
    let json = r#"{
        "n": 3,
        "lambda": 1.0,
        "c_bar": [[1.0, 0.2, 0.0], [0.2, 1.0, 0.1], [0.0, 0.1, 1.0]],
        "beta": 1.0,
        "sigma_psi": 0.3,
        "epsilon": 0.2,
        "u": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        "eta": 2.0,
        "normalize": false
    }"#;
    let config: ModelConfig = serde_json::from_str(json).unwrap();
    let params = Arc::new(ParameterSet::try_from(config).unwrap());
    let u0 = build_initial_state(&params, None, 0.4, 0.1).unwrap();
    let problem =
        assemble_problem(params.clone(), u0.clone(), (0.0, 3.0), ProblemOptions::default()).unwrap();

    let mut u = u0;
    for step in 0..300 {
        euler_step(&problem, &mut u, step, 0.01, step as f64 * 0.01).unwrap();
        assert!(!violates_invariants(u.view(), &params).unwrap(), "step {step}: {u}");
    }
    assert!(u.iter().all(|x| x.is_finite()));
}

#[test]
// Purpose
// -------
// A step that leaves the SPD cone is repaired by the default guard and left
// visible when the guard is disabled.
//
// Given
// -----
// - n = 2; a post-step state with C = [[1, 1.2], [1.2, 1]] (eigenvalue −0.2)
//   and ψ = −0.01.
//
// Expect
// ------
// - Disabled guard: no change; invariants reported as violated; diffusion
//   fails with NumericalBreakdown.
// - Combined guard: both repairs fire; diffusion then succeeds.
fn guard_repairs_a_step_outside_the_cone() {
    let params = identity_params(2, 0.2, 0.1);
    let u0 = build_initial_state(&params, None, 0.0, 0.0).unwrap();
    let guarded =
        assemble_problem(params.clone(), u0.clone(), (0.0, 1.0), ProblemOptions::default()).unwrap();
    let unguarded = assemble_problem(
        params.clone(),
        u0,
        (0.0, 1.0),
        ProblemOptions { guard: InvariantGuard::disabled(), noise: true },
    )
    .unwrap();
    let bad = array![1.0, 1.2, 1.2, 1.0, -0.01, 0.0];
    let mut du = Array1::<f64>::zeros(6);

    let mut u = bad.clone();
    assert!(!unguarded.post_step(u.view_mut()).unwrap().repaired());
    assert_eq!(u, bad);
    assert!(violates_invariants(u.view(), &params).unwrap());
    let err = unguarded.diffusion(du.view_mut(), u.view(), 0.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NumericalBreakdown);

    let mut u = bad;
    let report = guarded.post_step(u.view_mut()).unwrap();
    assert!(report.spd_repaired && report.nonneg_repaired);
    assert_relative_eq!(report.min_eigenvalue_before.unwrap(), -0.2, epsilon = 1e-12);
    assert!(!violates_invariants(u.view(), &params).unwrap());
    guarded.diffusion(du.view_mut(), u.view(), 0.0).unwrap();
    assert!(du.iter().all(|x| x.is_finite()));
}

#[test]
// Purpose
// -------
// Ensemble evaluation over independent trajectories agrees with the single
// trajectory callbacks.
//
// Given
// -----
// - 8 trajectories with distinct diagonal covariances and fluxes.
//
// Expect
// ------
// - Each ensemble output equals the per-trajectory evaluation.
fn ensemble_matches_single_trajectory_evaluation() {
    let params = identity_params(2, 0.2, 0.1);
    let u0 = build_initial_state(&params, None, 0.0, 0.0).unwrap();
    let problem = assemble_problem(params.clone(), u0, (0.0, 1.0), ProblemOptions::default()).unwrap();

    let states: Vec<Array1<f64>> = (0..8)
        .map(|k| {
            let s = 1.0 + 0.25 * k as f64;
            let c = array![[s, 0.1], [0.1, 1.0 / s + 0.2]];
            build_initial_state(&params, Some(c.view()), 0.1 * k as f64, 0.05).unwrap()
        })
        .collect();
    let mut drifts = vec![Array1::<f64>::zeros(6); states.len()];
    let mut noises = vec![Array1::<f64>::zeros(6); states.len()];

    drift_ensemble(&problem, &mut drifts, &states, 0.0).unwrap();
    diffusion_ensemble(&problem, &mut noises, &states, 0.0).unwrap();

    for (k, state) in states.iter().enumerate() {
        let mut f = Array1::<f64>::zeros(6);
        let mut g = Array1::<f64>::zeros(6);
        problem.drift(f.view_mut(), state.view(), 0.0).unwrap();
        problem.diffusion(g.view_mut(), state.view(), 0.0).unwrap();
        assert_eq!(drifts[k], f);
        assert_eq!(noises[k], g);
    }
}

#[test]
// Purpose
// -------
// Each failure class surfaces with its own kind through the public API.
//
// Given
// -----
// - n = 0; a non-symmetric State; a state one entry short; an indefinite
//   covariance passed to diffusion.
//
// Expect
// ------
// - Configuration, InvalidState, Dimension, NumericalBreakdown.
fn error_taxonomy_is_preserved_end_to_end() {
    let err: ModelError = ParameterSet::with_identity_references(0, 1.0, 1.0, 0.2, 0.1, 2.0)
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = State::new(array![[1.0, 0.5], [0.0, 1.0]], 0.0, 0.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let params = identity_params(2, 0.2, 0.1);
    let u0 = build_initial_state(&params, None, 0.0, 0.0).unwrap();
    let problem = assemble_problem(params, u0, (0.0, 1.0), ProblemOptions::default()).unwrap();
    let short = Array1::<f64>::zeros(5);
    let mut du = Array1::<f64>::zeros(6);
    let err = problem.drift(du.view_mut(), short.view(), 0.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Dimension);

    let indefinite = array![1.0, 2.0, 2.0, 1.0, 0.0, 0.0];
    let err = problem.diffusion(du.view_mut(), indefinite.view(), 0.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NumericalBreakdown);
}
