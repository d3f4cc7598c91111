//! The boundary to the predicate under test.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::distance::ShrinkingDistance;
use crate::error::PropertyError;
use crate::shrinkable::{ParamValue, Shrinkable};

/// Classification of one predicate execution.
#[derive(Debug, Clone, PartialEq)]
pub enum TryExecutionResult {
    /// The predicate held for this sample
    Satisfied,
    /// The predicate was falsified, optionally with a captured fault
    Falsified { failure: Option<PropertyError> },
    /// A precondition/assumption rejected the input; never a counterexample
    Invalid,
}

impl TryExecutionResult {
    /// Whether this result is a falsification
    pub fn is_falsified(&self) -> bool {
        matches!(self, TryExecutionResult::Falsified { .. })
    }

    /// Whether this result is an assumption rejection
    pub fn is_invalid(&self) -> bool {
        matches!(self, TryExecutionResult::Invalid)
    }

    /// Whether the predicate held
    pub fn is_satisfied(&self) -> bool {
        matches!(self, TryExecutionResult::Satisfied)
    }

    /// The captured fault of a falsification, if any
    pub fn failure(&self) -> Option<&PropertyError> {
        match self {
            TryExecutionResult::Falsified { failure } => failure.as_ref(),
            _ => None,
        }
    }
}

/// Executes a candidate parameter list and classifies the outcome.
pub trait Falsifier {
    /// Execute the predicate on one parameter list.
    fn execute(&self, parameters: &[ParamValue]) -> TryExecutionResult;
}

/// Falsifier over a fallible predicate.
///
/// `Ok(())` is satisfied; an assumption-violation error is invalid; any
/// other error is a falsification carrying the fault. Predicate panics are
/// caught and classified as falsifications with the panic payload preserved
/// in the message.
pub struct FnFalsifier<F> {
    predicate: F,
}

impl<F> FnFalsifier<F>
where
    F: Fn(&[ParamValue]) -> Result<(), PropertyError>,
{
    /// Wrap a fallible predicate.
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> Falsifier for FnFalsifier<F>
where
    F: Fn(&[ParamValue]) -> Result<(), PropertyError>,
{
    fn execute(&self, parameters: &[ParamValue]) -> TryExecutionResult {
        match catch_unwind(AssertUnwindSafe(|| (self.predicate)(parameters))) {
            Ok(Ok(())) => TryExecutionResult::Satisfied,
            Ok(Err(error)) if error.is_assumption_violation() => TryExecutionResult::Invalid,
            Ok(Err(error)) => TryExecutionResult::Falsified {
                failure: Some(error),
            },
            Err(panic) => TryExecutionResult::Falsified {
                failure: Some(PropertyError::property_failed(panic_message(&panic))),
            },
        }
    }
}

/// Falsifier over a boolean predicate: `false` falsifies without a fault.
pub struct PredicateFalsifier<F> {
    predicate: F,
}

impl<F> PredicateFalsifier<F>
where
    F: Fn(&[ParamValue]) -> bool,
{
    /// Wrap a boolean predicate.
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> Falsifier for PredicateFalsifier<F>
where
    F: Fn(&[ParamValue]) -> bool,
{
    fn execute(&self, parameters: &[ParamValue]) -> TryExecutionResult {
        match catch_unwind(AssertUnwindSafe(|| (self.predicate)(parameters))) {
            Ok(true) => TryExecutionResult::Satisfied,
            Ok(false) => TryExecutionResult::Falsified { failure: None },
            Err(panic) => TryExecutionResult::Falsified {
                failure: Some(PropertyError::property_failed(panic_message(&panic))),
            },
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "predicate panicked".to_string()
    }
}

/// The first falsifying tuple found for a property, ready for shrinking.
///
/// Carries the generated parameter values, their shrinkables (for continued
/// shrinking), and the causing failure if the predicate reported one.
#[derive(Debug, Clone)]
pub struct FalsifiedSample {
    parameters: Vec<ParamValue>,
    shrinkables: Vec<Shrinkable<ParamValue>>,
    failure: Option<PropertyError>,
}

impl FalsifiedSample {
    /// Assemble a sample from parameters, their shrinkables, and an optional
    /// fault.
    pub fn new(
        parameters: Vec<ParamValue>,
        shrinkables: Vec<Shrinkable<ParamValue>>,
        failure: Option<PropertyError>,
    ) -> Self {
        Self {
            parameters,
            shrinkables,
            failure,
        }
    }

    /// Number of parameters.
    pub fn size(&self) -> usize {
        self.parameters.len()
    }

    /// The falsifying parameter values.
    pub fn parameters(&self) -> &[ParamValue] {
        &self.parameters
    }

    /// The shrinkable wrappers of the parameters.
    pub fn shrinkables(&self) -> &[Shrinkable<ParamValue>] {
        &self.shrinkables
    }

    /// The captured fault, if the predicate reported one.
    pub fn failure(&self) -> Option<&PropertyError> {
        self.failure.as_ref()
    }

    /// The distance of the parameter at `index`.
    pub fn parameter_distance(&self, index: usize) -> &ShrinkingDistance {
        self.shrinkables[index].distance()
    }
}
