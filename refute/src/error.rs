//! Error types and result classification for property execution.

use std::fmt;

/// Errors raised while executing or configuring a property.
///
/// Assumption violations are deliberately part of this enum: they travel the
/// same `Result` channel as real failures but are filtered out before they
/// can ever count as a counterexample.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyError {
    /// The predicate under test rejected a generated sample
    PropertyFailed {
        message: String,
        context: Option<String>,
    },

    /// A precondition/assumption rejected the input; not a failure
    AssumptionViolated { message: String },

    /// Generation of test data failed (e.g. a filter ran out of retries)
    GenerationFailed { message: String },

    /// A run configuration was rejected before any generation happened
    ConfigRejected {
        message: String,
        field: Option<String>,
    },

    /// Internal error in the engine itself
    InternalError { message: String },
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyError::PropertyFailed { message, context } => {
                write!(f, "Property failed: {}", message)?;
                if let Some(ctx) = context {
                    write!(f, " (context: {})", ctx)?;
                }
                Ok(())
            }
            PropertyError::AssumptionViolated { message } => {
                write!(f, "Assumption violated: {}", message)
            }
            PropertyError::GenerationFailed { message } => {
                write!(f, "Generation failed: {}", message)
            }
            PropertyError::ConfigRejected { message, field } => {
                write!(f, "Configuration rejected: {}", message)?;
                if let Some(field_name) = field {
                    write!(f, " (field: {})", field_name)?;
                }
                Ok(())
            }
            PropertyError::InternalError { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for PropertyError {}

impl PropertyError {
    /// Create a simple property failed error
    pub fn property_failed(message: impl Into<String>) -> Self {
        Self::PropertyFailed {
            message: message.into(),
            context: None,
        }
    }

    /// Create a property failed error with context
    pub fn property_failed_with_context(
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::PropertyFailed {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create an assumption violation; classified INVALID at the falsifier boundary
    pub fn assumption_violated(message: impl Into<String>) -> Self {
        Self::AssumptionViolated {
            message: message.into(),
        }
    }

    /// Create a generation failed error
    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::GenerationFailed {
            message: message.into(),
        }
    }

    /// Create a configuration rejection with field information
    pub fn config_rejected(message: impl Into<String>, field: Option<impl Into<String>>) -> Self {
        Self::ConfigRejected {
            message: message.into(),
            field: field.map(|f| f.into()),
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Whether this error is an assumption violation rather than a real failure
    pub fn is_assumption_violation(&self) -> bool {
        matches!(self, PropertyError::AssumptionViolated { .. })
    }
}

/// Reject the current sample without failing the property.
///
/// Returns an [`PropertyError::AssumptionViolated`] error when the condition
/// does not hold, for use with `?` inside predicates.
pub fn assume(condition: bool, message: impl Into<String>) -> Result<(), PropertyError> {
    if condition {
        Ok(())
    } else {
        Err(PropertyError::assumption_violated(message))
    }
}
