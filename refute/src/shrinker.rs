//! The multi-parameter shrinker: one parameter after the other.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::falsifier::{Falsifier, FalsifiedSample, TryExecutionResult};
use crate::shrinkable::{ParamValue, Shrinkable};

/// Shrinks a falsified sample one parameter at a time, left to right.
///
/// Per parameter the shrinker scans the current base's candidates (already
/// filtered to strictly smaller distance), substitutes each into the current
/// parameter list and re-runs the falsifier:
///
/// - The first candidate classified FALSIFIED becomes the new best sample
///   and the new shrink base.
/// - When no candidate falsifies but at least one was INVALID, the first
///   INVALID candidate (in emission order) becomes the new base *without*
///   updating the best sample — progress toward smaller distance is
///   preferred even when the predicate is inconclusive, in the hope that a
///   falsifying descendant exists. This tie-break is a heuristic, not a
///   minimality proof, and is preserved exactly.
/// - Otherwise shrinking of this parameter stops.
///
/// Parameters shrink independently and sequentially, trading the minima
/// that would require changing two parameters at once for predictable
/// termination: every parameter's candidate sequence is itself well-founded.
pub struct ParameterShrinker {
    reporter: Arc<dyn Fn(&FalsifiedSample)>,
    max_steps: usize,
}

impl ParameterShrinker {
    /// A shrinker reporting each new best sample to the given callback.
    pub fn new(reporter: impl Fn(&FalsifiedSample) + 'static) -> Self {
        Self {
            reporter: Arc::new(reporter),
            max_steps: usize::MAX,
        }
    }

    /// A shrinker without progress reporting.
    pub fn silent() -> Self {
        Self::new(|_sample| {})
    }

    /// Bound the number of accepted shrinking steps.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Shrink `sample` as far as the falsifier allows.
    ///
    /// `steps` counts accepted shrinking steps across all parameters and is
    /// shared with the caller for diagnostics. Returns the smallest still
    /// falsifying sample found, or the input sample unchanged when no
    /// parameter could be shrunk.
    pub fn shrink(
        &self,
        falsifier: &dyn Falsifier,
        sample: FalsifiedSample,
        steps: &AtomicUsize,
    ) -> FalsifiedSample {
        let mut current = sample;
        for index in 0..current.size() {
            current = self.shrink_single_parameter(falsifier, current, steps, index);
        }
        current
    }

    fn shrink_single_parameter(
        &self,
        falsifier: &dyn Falsifier,
        sample: FalsifiedSample,
        steps: &AtomicUsize,
        index: usize,
    ) -> FalsifiedSample {
        let mut base: Shrinkable<ParamValue> = sample.shrinkables()[index].clone();
        let mut best: Option<FalsifiedSample> = None;

        loop {
            if steps.load(Ordering::Relaxed) >= self.max_steps {
                break;
            }
            let base_distance = base.distance().clone();
            let mut first_invalid: Option<Shrinkable<ParamValue>> = None;
            let mut falsified: Option<FalsifiedSample> = None;

            for candidate in base.candidates() {
                if candidate.distance() >= &base_distance {
                    continue;
                }
                let parameters = replace_in(candidate.create_value(), index, sample.parameters());
                let result = falsifier.execute(&parameters);
                match result {
                    TryExecutionResult::Falsified { failure } => {
                        let shrinkables =
                            replace_in(candidate.clone(), index, sample.shrinkables());
                        falsified = Some(FalsifiedSample::new(parameters, shrinkables, failure));
                        break;
                    }
                    TryExecutionResult::Invalid => {
                        if first_invalid.is_none() {
                            first_invalid = Some(candidate);
                        }
                    }
                    TryExecutionResult::Satisfied => {}
                }
            }

            if let Some(found) = falsified {
                steps.fetch_add(1, Ordering::Relaxed);
                (self.reporter)(&found);
                base = found.shrinkables()[index].clone();
                best = Some(found);
            } else if let Some(invalid) = first_invalid {
                base = invalid;
            } else {
                break;
            }
        }

        best.unwrap_or(sample)
    }
}

fn replace_in<T: Clone>(item: T, index: usize, old: &[T]) -> Vec<T> {
    let mut replaced = old.to_vec();
    replaced[index] = item;
    replaced
}
