//! Error types for surface reconstruction

use thiserror::Error;

/// Everything that can go wrong while reconstructing one input.
///
/// Only [`ReconstructionError::InvalidCriteria`] is fatal for a whole batch;
/// the others are recorded per input and the batch moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconstructionError {
    #[error("unreadable input: {reason}")]
    UnreadableInput { reason: String },

    #[error(
        "solver did not converge after {iterations} iterations \
         (residual {residual:.3e}, tolerance {tolerance:.3e})"
    )]
    DidNotConverge {
        iterations: usize,
        residual: f64,
        tolerance: f64,
    },

    #[error("no point could be verified inside the surface (best value {value:.3e})")]
    NoValidSeed { value: f64 },

    #[error("surface extraction produced no triangles")]
    EmptySurface,

    #[error("invalid criteria: {reason}")]
    InvalidCriteria { reason: String },

    #[error("triangulation error: {0}")]
    Triangulation(String),
}

impl ReconstructionError {
    /// Short machine-friendly name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnreadableInput { .. } => "UnreadableInput",
            Self::DidNotConverge { .. } => "DidNotConverge",
            Self::NoValidSeed { .. } => "NoValidSeed",
            Self::EmptySurface => "EmptySurface",
            Self::InvalidCriteria { .. } => "InvalidCriteria",
            Self::Triangulation(_) => "Triangulation",
        }
    }

    /// Configuration errors stop a batch, data errors do not
    pub fn is_fatal_for_batch(&self) -> bool {
        matches!(self, Self::InvalidCriteria { .. })
    }

    pub(crate) fn unreadable(reason: impl Into<String>) -> Self {
        Self::UnreadableInput { reason: reason.into() }
    }

    pub(crate) fn invalid_criteria(reason: impl Into<String>) -> Self {
        Self::InvalidCriteria { reason: reason.into() }
    }
}

impl From<poissurf_core::Error> for ReconstructionError {
    fn from(err: poissurf_core::Error) -> Self {
        Self::UnreadableInput { reason: err.to_string() }
    }
}

/// Result type alias for reconstruction operations
pub type Result<T> = std::result::Result<T, ReconstructionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_become_unreadable_input() {
        let err: ReconstructionError = poissurf_core::Error::InvalidData("empty".into()).into();
        assert_eq!(err.kind(), "UnreadableInput");
        assert!(!err.is_fatal_for_batch());
    }

    #[test]
    fn test_only_criteria_errors_stop_a_batch() {
        assert!(ReconstructionError::invalid_criteria("angle").is_fatal_for_batch());
        assert!(!ReconstructionError::EmptySurface.is_fatal_for_batch());
        let message = ReconstructionError::DidNotConverge {
            iterations: 10,
            residual: 0.5,
            tolerance: 1e-8,
        }
        .to_string();
        assert!(message.contains("10 iterations"));
    }
}
