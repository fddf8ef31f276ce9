//! core — parameters, state layout, and numerical primitives of the covariance
//! model.
//!
//! Purpose
//! -------
//! Collect the building blocks every model component depends on: the
//! validated [`ParameterSet`] and its serde mirror [`ModelConfig`], the memory
//! kernel and interaction Laplacian variants, the flat state layout, and the
//! small linear-algebra layer bridging `ndarray` containers to `nalgebra`
//! decompositions.
//!
//! Key behaviors
//! -------------
//! - [`params`] / [`config`]: construction-time validation; every violated
//!   precondition surfaces as a `ConfigError`.
//! - [`kernels`]: closed enums [`MemoryKernel`] and [`InteractionLaplacian`]
//!   with the capability set {decay rate} and {weight, degree}.
//! - [`state`]: [`State`], [`StateLayout`], flatten/unflatten, accessors, and
//!   the Lyapunov diagnostic.
//! - [`linalg`]: symmetrization, asymmetry measurement, eigenvalue clipping,
//!   Cholesky, and inverse.
//! - [`validation`]: reusable checks shared by the constructors above.
//!
//! Conventions
//! -----------
//! - No logging and no I/O in this layer.
//! - Matrices are `ndarray::Array2<f64>`; flat states are `Array1<f64>` in the
//!   row-major layout documented in [`state`].

pub mod config;
pub mod kernels;
pub mod linalg;
pub mod params;
pub mod state;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::config::ModelConfig;
pub use self::kernels::{InteractionLaplacian, MemoryKernel};
pub use self::linalg::{project_to_spd, EIGEN_FLOOR, SYMMETRY_TOL};
pub use self::params::ParameterSet;
pub use self::state::{
    flatten, get_covariance, get_flux, get_memory, lyapunov, lyapunov_series, unflatten, State,
    StateLayout,
};
