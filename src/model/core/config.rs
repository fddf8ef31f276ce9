//! Model configuration — serde-backed plain-data mirror of [`ParameterSet`].
//!
//! Purpose
//! -------
//! Give callers a serializable description of the model that can travel
//! through any serde format (JSON, TOML, YAML, ...) and be turned into a
//! validated [`ParameterSet`] in one call. Reading files is left to the
//! caller; this module only defines the shape of the data and its defaults.
//!
//! Key behaviors
//! -------------
//! - Matrices are stored as nested row vectors (`Vec<Vec<f64>>`), row-major.
//! - Optional fields fall back to documented defaults: `alpha = 1.0`,
//!   `normalize = true`, `eta = 1.0`.
//! - [`ModelConfig::into_params`] (and the equivalent `TryFrom`) runs the full
//!   [`ParameterSet::new`] validation; ragged rows are reported as a shape
//!   mismatch.
//! - [`ParameterSet::to_config`] produces the inverse mapping.
//!
//! Conventions
//! -----------
//! - Field names are the ASCII spellings of the model symbols
//!   (`lambda`, `c_bar`, `beta`, `sigma_psi`, `epsilon`, `u`, `eta`,
//!   `alpha`, `normalize`).
use crate::model::{
    core::{
        kernels::{InteractionLaplacian, MemoryKernel},
        params::ParameterSet,
    },
    errors::{ConfigError, ConfigResult},
};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

fn default_alpha() -> f64 {
    1.0
}

fn default_normalize() -> bool {
    true
}

fn default_eta() -> f64 {
    1.0
}

/// Serializable model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub n: usize,
    pub lambda: f64,
    pub c_bar: Vec<Vec<f64>>,
    pub beta: f64,
    pub sigma_psi: f64,
    pub epsilon: f64,
    pub u: Vec<Vec<f64>>,
    #[serde(default = "default_eta")]
    pub eta: f64,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_normalize")]
    pub normalize: bool,
}

impl ModelConfig {
    /// Validate and convert into a [`ParameterSet`].
    pub fn into_params(self) -> ConfigResult<ParameterSet> {
        let c_bar = rows_to_matrix("Cbar", &self.c_bar, self.n)?;
        let u = rows_to_matrix("U", &self.u, self.n)?;
        ParameterSet::new(
            self.n,
            self.lambda,
            c_bar,
            self.beta,
            self.sigma_psi,
            self.epsilon,
            u,
            MemoryKernel::exponential(self.eta)?,
            InteractionLaplacian::correlation(self.alpha, self.normalize)?,
        )
    }
}

impl TryFrom<ModelConfig> for ParameterSet {
    type Error = ConfigError;

    fn try_from(config: ModelConfig) -> ConfigResult<ParameterSet> {
        config.into_params()
    }
}

impl ParameterSet {
    /// Plain-data description of this parameter set.
    pub fn to_config(&self) -> ModelConfig {
        let InteractionLaplacian::Correlation { alpha, normalize } = *self.laplacian();
        ModelConfig {
            n: self.n(),
            lambda: self.lambda(),
            c_bar: matrix_to_rows(self.c_bar()),
            beta: self.beta(),
            sigma_psi: self.sigma_psi(),
            epsilon: self.epsilon(),
            u: matrix_to_rows(self.u()),
            eta: self.eta(),
            alpha,
            normalize,
        }
    }
}

fn rows_to_matrix(name: &'static str, rows: &[Vec<f64>], n: usize) -> ConfigResult<Array2<f64>> {
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.len() != n || rows.iter().any(|r| r.len() != n) {
        return Err(ConfigError::MatrixShapeMismatch {
            name,
            expected: n,
            rows: rows.len(),
            cols: ncols,
        });
    }
    Ok(Array2::from_shape_fn((n, n), |(i, j)| rows[i][j]))
}

fn matrix_to_rows(m: ArrayView2<f64>) -> Vec<Vec<f64>> {
    m.rows().into_iter().map(|r| r.to_vec()).collect()
}
