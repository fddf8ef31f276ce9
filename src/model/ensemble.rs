//! Ensemble evaluation — callbacks over many independent trajectories in
//! parallel.
//!
//! Each trajectory owns its own state and output buffers, and the system is
//! only read, so evaluations are distributed with `rayon` without any
//! synchronization. The first error from any trajectory is returned; buffers
//! of other trajectories may already have been written at that point.
use crate::model::{
    errors::{ModelError, ModelResult},
    guard::GuardReport,
    problem::StochasticSystem,
};
use ndarray::Array1;
use rayon::prelude::*;

fn check_ensemble_len(outputs: usize, states: usize) -> ModelResult<()> {
    if outputs != states {
        return Err(ModelError::DimensionMismatch {
            role: "ensemble output",
            expected: states,
            actual: outputs,
        });
    }
    Ok(())
}

/// Drift of every trajectory, `du[k] ← f(u[k], t)`.
pub fn drift_ensemble<S>(
    system: &S, du: &mut [Array1<f64>], u: &[Array1<f64>], t: f64,
) -> ModelResult<()>
where
    S: StochasticSystem + Sync,
{
    check_ensemble_len(du.len(), u.len())?;
    du.par_iter_mut()
        .zip(u.par_iter())
        .try_for_each(|(out, state)| system.drift(out.view_mut(), state.view(), t))
}

/// Diffusion amplitudes of every trajectory, `du[k] ← g(u[k], t)`.
pub fn diffusion_ensemble<S>(
    system: &S, du: &mut [Array1<f64>], u: &[Array1<f64>], t: f64,
) -> ModelResult<()>
where
    S: StochasticSystem + Sync,
{
    check_ensemble_len(du.len(), u.len())?;
    du.par_iter_mut()
        .zip(u.par_iter())
        .try_for_each(|(out, state)| system.diffusion(out.view_mut(), state.view(), t))
}

/// Post-step hook on every trajectory; one report per trajectory, in order.
pub fn guard_ensemble<S>(system: &S, u: &mut [Array1<f64>]) -> ModelResult<Vec<GuardReport>>
where
    S: StochasticSystem + Sync,
{
    u.par_iter_mut().map(|state| system.post_step(state.view_mut())).collect()
}
