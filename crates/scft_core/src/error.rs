//! Error taxonomy for SCFT iteration and parameter sweeps.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScftError {
    /// The mixing iterator exhausted its iteration budget.
    #[error("iterator failed to converge in {iterations} iterations (error = {error:e})")]
    ConvergenceFailure { iterations: usize, error: f64 },

    /// The continuation step fell below the configured floor.
    #[error("sweep step size {ds:e} fell below the minimum {min_ds:e} at s = {s}")]
    StepSizeUnderflow { s: f64, ds: f64, min_ds: f64 },

    #[error("Anderson mixing history matrix is singular (history size {size})")]
    SingularHistoryMatrix { size: usize },

    #[error("invalid continuation history size {size}: {reason}")]
    InvalidHistorySize { size: usize, reason: &'static str },

    #[error("invalid sweep parameter type \"{0}\"")]
    InvalidParameterType(String),

    #[error("history index {index} out of range (size {size})")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("invalid {what} index {index} (count {count})")]
    InvalidParameterIndex {
        what: &'static str,
        index: usize,
        count: usize,
    },

    #[error("cannot set {quantity} of a species in the {ensemble} ensemble")]
    EnsembleMismatch {
        quantity: &'static str,
        ensemble: &'static str,
    },

    #[error("chi matrix is singular")]
    SingularInteraction,

    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("malformed sweep parameter \"{line}\": {reason}")]
    MalformedParameter { line: String, reason: String },

    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl ScftError {
    /// Whether a sweep may recover from this error by shortening its step.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ScftError::ConvergenceFailure { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScftError>;
