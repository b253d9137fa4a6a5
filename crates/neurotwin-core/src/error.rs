//! Error types for NeuroTwin analysis
//!
//! One error enum covers every analysis stage. Each variant carries enough
//! context (stage, input, underlying cause) to reproduce the failure. None of
//! these errors are retried inside the analytic core.

use thiserror::Error;

use crate::types::Condition;

/// Boxed underlying cause attached to ingestion failures.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the analysis pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Malformed or empty signal input
    #[error("Invalid recording: {reason}")]
    InvalidRecording {
        /// What was wrong with the recording
        reason: String,
        /// Underlying I/O or format error, if any
        #[source]
        source: Option<BoxedCause>,
    },

    /// Malformed scorer input (wrong vector length, empty feature map, ...)
    #[error("Invalid input to {stage}: {reason}")]
    InvalidInput {
        /// Stage that rejected the input
        stage: &'static str,
        /// Reason for rejection
        reason: String,
    },

    /// No effect is registered for the requested (condition, intervention) pair
    #[error("Unknown intervention '{intervention}' for condition {condition}")]
    UnknownIntervention {
        /// Target condition
        condition: Condition,
        /// Requested intervention type
        intervention: String,
    },

    /// The classifier-inference collaborator failed or returned nothing usable
    #[error("Classifier inference unavailable: {reason}")]
    UpstreamUnavailable {
        /// Error reason
        reason: String,
    },
}

impl AnalysisError {
    /// Build an [`AnalysisError::InvalidRecording`] without an underlying cause.
    pub fn invalid_recording(reason: impl Into<String>) -> Self {
        Self::InvalidRecording { reason: reason.into(), source: None }
    }

    /// Build an [`AnalysisError::InvalidRecording`] wrapping the cause.
    pub fn invalid_recording_with<E>(reason: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::InvalidRecording { reason: reason.into(), source: Some(Box::new(cause)) }
    }

    /// Build an [`AnalysisError::InvalidInput`].
    pub fn invalid_input(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput { stage, reason: reason.into() }
    }
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_recording_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err = AnalysisError::invalid_recording_with("cannot open recording", io);

        assert!(err.to_string().contains("cannot open recording"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_unknown_intervention_message() {
        let err = AnalysisError::UnknownIntervention {
            condition: Condition::Depression,
            intervention: "surgery".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown intervention 'surgery' for condition depression"
        );
    }
}
