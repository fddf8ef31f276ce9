//! model — SPD covariance dynamics with a Markovian memory lift.
//!
//! Purpose
//! -------
//! Provide the mathematical model layer for a covariance matrix `C` that must
//! stay symmetric positive definite, driven by a CIR-type flux `ψ` and a
//! memory variable `I` (the Markovian lift of an exponentially weighted
//! integral of `ψ`). The layer exposes the drift and diffusion callbacks an
//! external stochastic integrator consumes, plus the post-step invariant
//! guard.
//!
//! Key behaviors
//! -------------
//! - [`core`]: validated parameters, config mirror, kernel variants, state
//!   layout, and linear-algebra primitives.
//! - [`operators`]: interaction Laplacian, transport, curvature, and
//!   operator diagnostics.
//! - [`drift`] / [`diffusion`]: structured and in-place flat callbacks.
//! - [`guard`]: SPD and non-negativity checks and repairs.
//! - [`problem`]: initial-state construction, problem assembly, and the
//!   [`StochasticSystem`] trait.
//! - [`ensemble`]: parallel evaluation over independent trajectories.
//! - [`errors`]: `ConfigError` / `ModelError` and their four-way taxonomy.
//!
//! Invariants & assumptions
//! ------------------------
//! - A [`ParameterSet`] is immutable after construction and safe to share
//!   across threads.
//! - Flat states have length `n² + 2` and are only indexed through
//!   [`StateLayout`].
//! - Drift and diffusion never repair states; a failed decomposition is a
//!   `NumericalBreakdown` returned to the integrator. Repair happens between
//!   steps, in the guard.
//!
//! Conventions
//! -----------
//! - Logging goes through `tracing` (guard repairs and problem assembly at
//!   `debug`, numerical breakdowns at `warn`). No subscriber is installed
//!   here.
//! - The time argument `t` of the callbacks is accepted and unused; the model
//!   is autonomous.
//!
//! Downstream usage
//! ----------------
//! 1. Build a [`ParameterSet`] directly or from a deserialized
//!    [`ModelConfig`].
//! 2. Build `u0` with [`build_initial_state`].
//! 3. Call [`assemble_problem`] and hand the resulting [`SdeProblem`] to an
//!    integrator generic over [`StochasticSystem`].
//! 4. Inspect saved trajectories with the state accessors and
//!    [`lyapunov_series`].
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each component; randomized properties use
//!   `proptest`. End-to-end scenarios are in `tests/`.

pub mod core;
pub mod diffusion;
pub mod drift;
pub mod ensemble;
pub mod errors;
pub mod guard;
pub mod operators;
pub mod problem;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    flatten, get_covariance, get_flux, get_memory, lyapunov, lyapunov_series, project_to_spd,
    unflatten, InteractionLaplacian, MemoryKernel, ModelConfig, ParameterSet, State, StateLayout,
};
pub use self::diffusion::{covariance_diffusion, diffusion, flux_diffusion, memory_diffusion};
pub use self::drift::{drift, drift_terms, DriftTerms};
pub use self::ensemble::{diffusion_ensemble, drift_ensemble, guard_ensemble};
pub use self::errors::{ConfigError, ConfigResult, ErrorKind, ModelError, ModelResult};
pub use self::guard::{
    violates_invariants, GuardOptions, GuardPolicy, GuardReport, InvariantGuard,
};
pub use self::operators::{curvature, laplacian, operator_diagnostics, transport, OperatorDiagnostics};
pub use self::problem::{
    assemble_problem, build_initial_state, ProblemOptions, SdeProblem, StochasticSystem,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use spd_flow::model::prelude::*;
//
// to import the everyday model surface in a single line.

pub mod prelude {
    pub use super::{
        assemble_problem, build_initial_state, flatten, unflatten, violates_invariants,
        ConfigError, ErrorKind, GuardOptions, GuardPolicy, GuardReport, InvariantGuard,
        ModelConfig, ModelError, ModelResult, ParameterSet, ProblemOptions, SdeProblem, State,
        StateLayout, StochasticSystem,
    };
}
