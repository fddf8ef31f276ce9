//! Invariant guard — post-step detection and repair of SPD and
//! non-negativity violations.
//!
//! Purpose
//! -------
//! Explicit time discretization can push a trajectory slightly outside the
//! admissible state space. The guard is the post-step hook an external
//! integrator runs after each accepted step to detect and repair that soft
//! drift. It is never called from drift or diffusion.
//!
//! Key behaviors
//! -------------
//! - SPD check: violated if the covariance block is asymmetric beyond
//!   `symmetry_tol` (scaled, see [`max_asymmetry`]) or its minimum eigenvalue
//!   is `≤ 0`. Repair: symmetrize, clip eigenvalues at
//!   `max(floor, RELATIVE_EIGEN_FLOOR·‖C‖_F)`, rewrite the block in place.
//!   The scaled floor keeps large-scale blocks factorizable after repair.
//! - Non-negativity check: violated if `ψ < 0` or `I < 0`. Repair: clamp both
//!   to `max(value, 0)`.
//! - [`GuardPolicy`] selects which checks run; `Combined` runs SPD first, then
//!   non-negativity.
//! - [`violates_invariants`] is a read-only diagnostic with no side effects.
//!
//! Invariants & assumptions
//! ------------------------
//! - Repair is idempotent: a repaired state passes both checks, and its
//!   covariance block admits a Cholesky factor.
//! - Non-finite entries count as violations. They cannot be repaired and are
//!   reported as `NumericalBreakdown` by [`InvariantGuard::apply`].
//! - Soft drift is not an error; with `GuardPolicy::Disabled` the state is
//!   left as-is for inspection.
//!
//! Conventions
//! -----------
//! - Flat vectors are accessed only through [`StateLayout`].
//! - Repairs are logged at `debug` level via `tracing`.
use crate::model::{
    core::{
        linalg::{
            max_asymmetry, min_eigenvalue, project_to_spd, scaled_floor, EIGEN_FLOOR,
            SYMMETRY_TOL,
        },
        params::ParameterSet,
        state::StateLayout,
        validation::validate_guard_options,
    },
    errors::{ConfigResult, ModelError, ModelResult},
};
use ndarray::{ArrayView1, ArrayViewMut1};

/// Which invariant checks the guard runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardPolicy {
    Disabled,
    SpdOnly,
    NonNegativeOnly,
    #[default]
    Combined,
}

impl GuardPolicy {
    pub fn checks_spd(self) -> bool {
        matches!(self, GuardPolicy::SpdOnly | GuardPolicy::Combined)
    }

    pub fn checks_nonnegative(self) -> bool {
        matches!(self, GuardPolicy::NonNegativeOnly | GuardPolicy::Combined)
    }
}

/// Numerical thresholds of the guard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardOptions {
    /// Absolute eigenvalue floor used by the SPD repair.
    pub floor: f64,
    /// Scaled asymmetry above which the covariance counts as non-symmetric.
    pub symmetry_tol: f64,
}

impl Default for GuardOptions {
    fn default() -> Self {
        GuardOptions { floor: EIGEN_FLOOR, symmetry_tol: SYMMETRY_TOL }
    }
}

impl GuardOptions {
    /// Validated options; `floor > 0`, `symmetry_tol ≥ 0`, both finite.
    pub fn new(floor: f64, symmetry_tol: f64) -> ConfigResult<Self> {
        validate_guard_options(floor, symmetry_tol)?;
        Ok(GuardOptions { floor, symmetry_tol })
    }
}

/// Outcome of the SPD check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpdCheck {
    pub asymmetry: f64,
    /// Minimum eigenvalue of the symmetric part; NaN if the block is non-finite.
    pub min_eigenvalue: f64,
    pub violated: bool,
}

/// Outcome of the non-negativity check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonNegativeCheck {
    pub flux: f64,
    pub memory: f64,
    pub violated: bool,
}

/// What a single guard application did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GuardReport {
    pub spd_repaired: bool,
    pub nonneg_repaired: bool,
    /// Minimum eigenvalue before repair, when the SPD check ran.
    pub min_eigenvalue_before: Option<f64>,
}

impl GuardReport {
    pub fn repaired(&self) -> bool {
        self.spd_repaired || self.nonneg_repaired
    }
}

/// Post-step hook enforcing the state invariants.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InvariantGuard {
    policy: GuardPolicy,
    options: GuardOptions,
}

impl InvariantGuard {
    pub fn new(policy: GuardPolicy, options: GuardOptions) -> ConfigResult<Self> {
        validate_guard_options(options.floor, options.symmetry_tol)?;
        Ok(InvariantGuard { policy, options })
    }

    /// Both checks with default thresholds.
    pub fn combined() -> Self {
        InvariantGuard::default()
    }

    pub fn disabled() -> Self {
        InvariantGuard { policy: GuardPolicy::Disabled, options: GuardOptions::default() }
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }

    pub fn options(&self) -> GuardOptions {
        self.options
    }

    /// Check and repair `u` in place according to the policy.
    ///
    /// Parameters
    /// ----------
    /// - `u`: `ArrayViewMut1<f64>`
    ///   Flat state of length `n² + 2`, overwritten on repair.
    /// - `params`: `&ParameterSet`
    ///
    /// Returns
    /// -------
    /// `ModelResult<GuardReport>`
    ///   Which repairs fired and the minimum eigenvalue seen before repair.
    ///
    /// Errors
    /// ------
    /// - `ModelError::DimensionMismatch` for a wrong-length `u`.
    /// - `ModelError::NumericalBreakdown` if the state holds non-finite
    ///   values that cannot be projected or clamped.
    pub fn apply(&self, mut u: ArrayViewMut1<f64>, params: &ParameterSet) -> ModelResult<GuardReport> {
        let layout = StateLayout::for_params(params);
        layout.check("state", u.len())?;
        let mut report = GuardReport::default();

        if self.policy.checks_spd() {
            let check = check_spd(u.view(), params, self.options.symmetry_tol)?;
            report.min_eigenvalue_before = Some(check.min_eigenvalue);
            if check.violated {
                repair_spd(u.view_mut(), params, self.options.floor)?;
                report.spd_repaired = true;
                tracing::debug!(
                    asymmetry = check.asymmetry,
                    min_eigenvalue = check.min_eigenvalue,
                    floor = self.options.floor,
                    "guard repaired covariance"
                );
            }
        }

        if self.policy.checks_nonnegative() {
            let check = check_nonnegative(u.view(), params)?;
            if check.violated {
                repair_nonnegative(u.view_mut(), params)?;
                report.nonneg_repaired = true;
                tracing::debug!(
                    flux = check.flux,
                    memory = check.memory,
                    "guard clamped auxiliary variables"
                );
            }
        }

        Ok(report)
    }

    /// Whether `u` violates any invariant this guard checks. Read-only.
    pub fn violates(&self, u: ArrayView1<f64>, params: &ParameterSet) -> ModelResult<bool> {
        let spd = self.policy.checks_spd()
            && check_spd(u, params, self.options.symmetry_tol)?.violated;
        let nonneg = self.policy.checks_nonnegative() && check_nonnegative(u, params)?.violated;
        Ok(spd || nonneg)
    }
}

/// SPD check on the raw (unsymmetrized) covariance block of `u`.
pub fn check_spd(u: ArrayView1<f64>, params: &ParameterSet, symmetry_tol: f64) -> ModelResult<SpdCheck> {
    let raw = StateLayout::for_params(params).raw_covariance(u)?;
    let asymmetry = max_asymmetry(raw.view()).value;
    let min_eigenvalue = match min_eigenvalue(raw.view()) {
        Ok(value) => value,
        Err(ModelError::NumericalBreakdown { .. }) => f64::NAN,
        Err(e) => return Err(e),
    };
    let violated = asymmetry > symmetry_tol || min_eigenvalue.is_nan() || min_eigenvalue <= 0.0;
    Ok(SpdCheck { asymmetry, min_eigenvalue, violated })
}

/// Replace the covariance block of `u` by its SPD projection.
///
/// The effective floor is [`scaled_floor`] of the block, so the repaired
/// block has a positive computed minimum eigenvalue and a condition number
/// Cholesky can handle at any scale.
pub fn repair_spd(u: ArrayViewMut1<f64>, params: &ParameterSet, floor: f64) -> ModelResult<()> {
    let layout = StateLayout::for_params(params);
    let raw = layout.raw_covariance(u.view())?;
    let projected = project_to_spd(raw.view(), scaled_floor(raw.view(), floor))?;
    layout.write_covariance(u, projected.view())
}

/// Non-negativity check on ψ and I. NaN counts as a violation.
pub fn check_nonnegative(u: ArrayView1<f64>, params: &ParameterSet) -> ModelResult<NonNegativeCheck> {
    let layout = StateLayout::for_params(params);
    let flux = layout.flux(u)?;
    let memory = layout.memory(u)?;
    let violated = flux.is_nan() || memory.is_nan() || flux < 0.0 || memory < 0.0;
    Ok(NonNegativeCheck { flux, memory, violated })
}

/// Clamp ψ and I to `max(value, 0)`.
pub fn repair_nonnegative(mut u: ArrayViewMut1<f64>, params: &ParameterSet) -> ModelResult<()> {
    let layout = StateLayout::for_params(params);
    let flux = layout.flux(u.view())?;
    let memory = layout.memory(u.view())?;
    if !flux.is_finite() || !memory.is_finite() {
        return Err(ModelError::breakdown(
            "non-negativity repair",
            format!("non-finite auxiliary state (psi = {flux}, I = {memory})"),
        ));
    }
    layout.set_flux(u.view_mut(), flux.max(0.0))?;
    layout.set_memory(u, memory.max(0.0))
}

/// Whether `u` violates either invariant under default thresholds.
///
/// Pure diagnostic: `u` is not modified and no repair is attempted.
pub fn violates_invariants(u: ArrayView1<f64>, params: &ParameterSet) -> ModelResult<bool> {
    InvariantGuard::combined().violates(u, params)
}
