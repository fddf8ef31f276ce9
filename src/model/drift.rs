//! Drift field — deterministic vector field of the covariance model.
//!
//! ## Model
//! ```text
//! dC = −λ(C − Cbar) + ψ·(C·L + L·C) + I·tr(C·L)·C
//! dψ = −β·ψ
//! dI = −η·I + ψ
//! ```
//! with `L` the interaction Laplacian of `C`. The ψ- and I-weighted terms are
//! skipped (exactly zero) when `ψ = 0` or `I = 0`; the Laplacian is not built
//! at all when both vanish.
//!
//! ## Flat form
//! [`drift`] is the in-place callback handed to an external integrator. It
//! checks both buffers against `n² + 2`, unpacks through the state accessors,
//! and packs the result through [`StateLayout::write`]. Non-finite output is
//! surfaced as `NumericalBreakdown` instead of being written back silently.
//!
//! `t` is accepted for interface symmetry with time-dependent models and is
//! currently unused.
use crate::model::{
    core::{params::ParameterSet, state::StateLayout},
    errors::{ModelError, ModelResult},
    operators::{curvature_with, laplacian, transport_with},
};
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1};

/// Structured drift `(dC, dψ, dI)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftTerms {
    pub d_covariance: Array2<f64>,
    pub d_flux: f64,
    pub d_memory: f64,
}

/// Evaluate the drift at `(C, ψ, I)`.
///
/// Parameters
/// ----------
/// - `c`: `ArrayView2<f64>`
///   Symmetric `n × n` covariance.
/// - `flux`, `memory`: `f64`
///   Auxiliary variables ψ and I.
/// - `params`: `&ParameterSet`
///
/// Returns
/// -------
/// `DriftTerms`
///   Symmetric `dC` (for symmetric `C`) and the two scalar derivatives.
pub fn drift_terms(
    c: ArrayView2<f64>, flux: f64, memory: f64, params: &ParameterSet,
) -> DriftTerms {
    let mut d_covariance = (&params.c_bar() - &c) * params.lambda();

    if flux != 0.0 || memory != 0.0 {
        let l = laplacian(c, params);
        if flux != 0.0 {
            d_covariance.scaled_add(flux, &transport_with(c, l.view()));
        }
        if memory != 0.0 {
            d_covariance.scaled_add(memory, &curvature_with(c, l.view()));
        }
    }

    DriftTerms {
        d_covariance,
        d_flux: -params.beta() * flux,
        d_memory: -params.eta() * memory + flux,
    }
}

/// In-place drift callback `du ← f(u, t)`.
///
/// Errors
/// ------
/// - `ModelError::DimensionMismatch` if `u` or `du` has length `≠ n² + 2`.
/// - `ModelError::NumericalBreakdown` if any output component is non-finite;
///   `du` is left untouched in that case.
pub fn drift(
    du: ArrayViewMut1<f64>, u: ArrayView1<f64>, params: &ParameterSet, _t: f64,
) -> ModelResult<()> {
    let layout = StateLayout::for_params(params);
    layout.check("state", u.len())?;
    layout.check("drift output", du.len())?;

    let c = layout.covariance(u)?;
    let terms = drift_terms(c.view(), layout.flux(u)?, layout.memory(u)?, params);

    let finite = terms.d_covariance.iter().all(|x| x.is_finite())
        && terms.d_flux.is_finite()
        && terms.d_memory.is_finite();
    if !finite {
        tracing::warn!(n = params.n(), "drift produced non-finite output");
        return Err(ModelError::breakdown("drift", "non-finite drift component"));
    }

    layout.write(du, terms.d_covariance.view(), terms.d_flux, terms.d_memory)
}
