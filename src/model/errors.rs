//! Errors for the SPD covariance model (configuration, state preconditions,
//! flat-vector dimensions, and numerical breakdown).
//!
//! This module defines a configuration error type, [`ConfigError`], raised once
//! when a [`ParameterSet`](crate::model::core::params::ParameterSet) or an
//! assembled problem is built, and a model error type, [`ModelError`], raised by
//! state construction and by drift/diffusion/guard evaluation. Both implement
//! `Display`/`Error` and, with the `python-bindings` feature, convert to `PyErr`.
//!
//! ## Taxonomy
//! Every error maps onto one of four kinds via [`ModelError::kind`]:
//! - **Configuration**: fatal, raised at construction; never retried.
//! - **InvalidState**: fatal, raised when an explicit `State` violates its
//!   symmetry/non-negativity preconditions.
//! - **Dimension**: caller misuse: a flat vector whose length is not `n² + 2`.
//! - **NumericalBreakdown**: a decomposition failed or produced non-finite
//!   output during an evaluation; the integrator should shrink the step or abort.
//!
//! Soft invariant drift between steps is *not* an error; it is repaired by the
//! invariant guard or left visible in the state when guards are disabled.
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

/// Result alias for parameter and problem construction.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result alias for state construction and model evaluation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Coarse classification of every model error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    InvalidState,
    Dimension,
    NumericalBreakdown,
}

/// Errors raised while validating model configuration.
///
/// Typical causes include a zero dimension, reference matrices that are not
/// square/symmetric, and non-positive or non-finite rates.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Matrix dimension must be > 0.
    InvalidDimension { n: usize },

    /// A reference matrix does not have shape `n × n`.
    MatrixShapeMismatch { name: &'static str, expected: usize, rows: usize, cols: usize },

    /// A reference matrix is not symmetric within tolerance.
    NonSymmetricMatrix { name: &'static str, row: usize, col: usize, asymmetry: f64 },

    /// A reference matrix has a NaN/±inf entry.
    NonFiniteMatrix { name: &'static str, row: usize, col: usize, value: f64 },

    /// A scalar rate or intensity violates its sign/finiteness constraint.
    InvalidRate { name: &'static str, value: f64, reason: &'static str },

    /// Memory kernel parameters are invalid.
    InvalidKernel { value: f64, reason: &'static str },

    /// Interaction Laplacian parameters are invalid.
    InvalidLaplacian { value: f64, reason: &'static str },

    /// Time span must be finite with `t0 < t1`.
    InvalidTimeSpan { t0: f64, t1: f64 },

    /// Eigenvalue floor must be finite and > 0.
    InvalidFloor { value: f64 },

    /// Symmetry tolerance must be finite and ≥ 0.
    InvalidTolerance { value: f64 },

    /// Initial state vector has the wrong length.
    InitialStateLength { expected: usize, actual: usize },
}

impl std::error::Error for ConfigError {}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidDimension { n } => {
                write!(f, "Matrix dimension must be > 0; got: {n}")
            }
            ConfigError::MatrixShapeMismatch { name, expected, rows, cols } => {
                write!(f, "{name} must be {expected}x{expected}; got {rows}x{cols}")
            }
            ConfigError::NonSymmetricMatrix { name, row, col, asymmetry } => {
                write!(
                    f,
                    "{name} must be symmetric; entries ({row}, {col}) and ({col}, {row}) differ by {asymmetry}"
                )
            }
            ConfigError::NonFiniteMatrix { name, row, col, value } => {
                write!(f, "{name} entry ({row}, {col}) is non-finite: {value}")
            }
            ConfigError::InvalidRate { name, value, reason } => {
                write!(f, "Invalid {name}: {value}. {reason}")
            }
            ConfigError::InvalidKernel { value, reason } => {
                write!(f, "Invalid memory kernel parameter: {value}. {reason}")
            }
            ConfigError::InvalidLaplacian { value, reason } => {
                write!(f, "Invalid interaction Laplacian parameter: {value}. {reason}")
            }
            ConfigError::InvalidTimeSpan { t0, t1 } => {
                write!(f, "Time span must be finite with t0 < t1; got ({t0}, {t1})")
            }
            ConfigError::InvalidFloor { value } => {
                write!(f, "Eigenvalue floor must be finite and > 0; got: {value}")
            }
            ConfigError::InvalidTolerance { value } => {
                write!(f, "Symmetry tolerance must be finite and >= 0; got: {value}")
            }
            ConfigError::InitialStateLength { expected, actual } => {
                write!(f, "Initial state must have length {expected}; got {actual}")
            }
        }
    }
}

/// Errors raised by state construction and model evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    // ---- Configuration ----
    /// Wrapped configuration failure.
    Configuration(ConfigError),

    // ---- State preconditions ----
    /// Covariance is not symmetric within tolerance.
    NonSymmetricState { row: usize, col: usize, asymmetry: f64 },

    /// Flux variable ψ must be ≥ 0.
    NegativeFlux { value: f64 },

    /// Memory variable I must be ≥ 0.
    NegativeMemory { value: f64 },

    /// State has a NaN/±inf component.
    NonFiniteState { index: usize, value: f64 },

    /// Covariance does not have shape `n × n`.
    StateShapeMismatch { expected: usize, rows: usize, cols: usize },

    // ---- Flat vector contract ----
    /// Flat vector length differs from `n² + 2`.
    DimensionMismatch { role: &'static str, expected: usize, actual: usize },

    // ---- Numerical ----
    /// A decomposition failed or produced non-finite output.
    NumericalBreakdown { stage: &'static str, reason: String },
}

impl ModelError {
    /// Classify this error into the four-way taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::Configuration(_) => ErrorKind::Configuration,
            ModelError::NonSymmetricState { .. }
            | ModelError::NegativeFlux { .. }
            | ModelError::NegativeMemory { .. }
            | ModelError::NonFiniteState { .. }
            | ModelError::StateShapeMismatch { .. } => ErrorKind::InvalidState,
            ModelError::DimensionMismatch { .. } => ErrorKind::Dimension,
            ModelError::NumericalBreakdown { .. } => ErrorKind::NumericalBreakdown,
        }
    }

    pub(crate) fn breakdown(stage: &'static str, reason: impl Into<String>) -> Self {
        ModelError::NumericalBreakdown { stage, reason: reason.into() }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Configuration(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Configuration ----
            ModelError::Configuration(err) => write!(f, "Configuration error: {err}"),
            // ---- State preconditions ----
            ModelError::NonSymmetricState { row, col, asymmetry } => {
                write!(
                    f,
                    "Covariance must be symmetric; entries ({row}, {col}) and ({col}, {row}) differ by {asymmetry}"
                )
            }
            ModelError::NegativeFlux { value } => {
                write!(f, "Flux variable must be non-negative; got: {value}")
            }
            ModelError::NegativeMemory { value } => {
                write!(f, "Memory variable must be non-negative; got: {value}")
            }
            ModelError::NonFiniteState { index, value } => {
                write!(f, "State component at index {index} is non-finite: {value}")
            }
            ModelError::StateShapeMismatch { expected, rows, cols } => {
                write!(f, "Covariance must be {expected}x{expected}; got {rows}x{cols}")
            }
            // ---- Flat vector contract ----
            ModelError::DimensionMismatch { role, expected, actual } => {
                write!(f, "Flat {role} vector must have length {expected}; got {actual}")
            }
            // ---- Numerical ----
            ModelError::NumericalBreakdown { stage, reason } => {
                write!(f, "Numerical breakdown in {stage}: {reason}")
            }
        }
    }
}

impl From<ConfigError> for ModelError {
    fn from(err: ConfigError) -> ModelError {
        ModelError::Configuration(err)
    }
}

/// Convert a [`ConfigError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<ConfigError> for PyErr {
    fn from(err: ConfigError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

/// Convert a [`ModelError`] into a Python `ValueError` with the error message.
///
/// This is used at the Rust↔Python boundary to surface model errors cleanly.
#[cfg(feature = "python-bindings")]
impl std::convert::From<ModelError> for PyErr {
    fn from(err: ModelError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
