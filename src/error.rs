//! Error types for the timeline evaluation core.

use serde::{Deserialize, Serialize};

/// Comprehensive error type for timeline evaluation operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum TimelineError {
    /// Keyframe sequence violates an ordering invariant
    #[error("Invalid keyframes for property '{property}': {reason}")]
    InvalidKeyframes { property: String, reason: String },

    /// A value failed validation
    #[error("Invalid value: {reason}")]
    InvalidValue { reason: String },

    /// A color string could not be parsed
    #[error("Invalid color string: {input}")]
    ColorParse { input: String },

    /// Expression source failed to parse
    #[error("Expression parse error at {line}:{column}: {message}")]
    ExpressionParse {
        line: u32,
        column: u32,
        message: String,
    },

    /// Expression raised an error during evaluation
    #[error("Expression runtime error: {message}")]
    ExpressionRuntime { message: String },

    /// Expression exceeded its per-evaluation step budget
    #[error("Expression exceeded step budget of {budget} steps")]
    ExpressionBudgetExceeded { budget: u32 },

    /// Path operation received incompatible inputs
    #[error("Path error: {reason}")]
    PathError { reason: String },

    /// Serialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Generic evaluation error
    #[error("Timeline error: {message}")]
    Generic { message: String },
}

impl TimelineError {
    /// Create a new generic error
    pub fn new(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging/metrics
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidKeyframes { .. } | Self::InvalidValue { .. } | Self::ColorParse { .. } => {
                "validation"
            }
            Self::ExpressionParse { .. }
            | Self::ExpressionRuntime { .. }
            | Self::ExpressionBudgetExceeded { .. } => "expression",
            Self::PathError { .. } => "path",
            Self::SerializationError { .. } => "serialization",
            Self::Generic { .. } => "generic",
        }
    }

    /// Check whether the evaluator recovers from this error by falling back
    /// to the pre-error value instead of propagating it.
    #[inline]
    pub fn is_fail_soft(&self) -> bool {
        matches!(
            self,
            Self::ExpressionRuntime { .. }
                | Self::ExpressionBudgetExceeded { .. }
                | Self::PathError { .. }
        )
    }
}

impl From<serde_json::Error> for TimelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}
