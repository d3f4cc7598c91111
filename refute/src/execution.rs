//! The property runner: generation loop, falsification and shrinking
//! hand-off.

use std::any::TypeId;
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::arbitrary::Arbitrary;
use crate::config::RunConfig;
use crate::error::PropertyError;
use crate::falsifier::{Falsifier, FalsifiedSample, TryExecutionResult};
use crate::generator::{FnGenerator, RandomGenerator, WithEdgeCases};
use crate::rng::{create_seeded_rng, random_seed};
use crate::shrinkable::{ParamValue, Shrinkable};
use crate::shrinker::ParameterShrinker;
use crate::support::{ContextCache, ServiceRegistry, TypeContext};

/// Progress observer invoked with each new best sample found while
/// shrinking.
pub trait SampleReporter {
    /// Called with every improvement the shrinker accepts.
    fn report(&self, sample: &FalsifiedSample);
}

/// A type-erased per-parameter descriptor: generator factory plus edge
/// cases.
///
/// Erasure is what lets one runner drive a heterogeneous parameter list
/// through a single falsifier and shrinker.
pub struct ParameterArbitrary {
    generator_fn: Arc<dyn Fn(usize) -> Box<dyn RandomGenerator<ParamValue>> + Send + Sync>,
    edge_cases_fn: Arc<dyn Fn() -> Vec<Shrinkable<ParamValue>> + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ParameterArbitrary {
    /// Erase an arbitrary into a runner parameter.
    pub fn new<A>(arbitrary: A) -> Self
    where
        A: Arbitrary + Send + Sync + 'static,
        A::Value: Debug,
    {
        let arbitrary = Arc::new(arbitrary);
        let for_generator = arbitrary.clone();
        let generator_fn = Arc::new(move |tries: usize| {
            let inner = for_generator.generator(tries);
            Box::new(FnGenerator::new(move |rng: &mut dyn rand::RngCore| {
                inner.next(rng).erased()
            })) as Box<dyn RandomGenerator<ParamValue>>
        });
        let for_edges = arbitrary;
        let edge_cases_fn = Arc::new(move || {
            for_edges
                .edge_cases()
                .iter()
                .map(|edge| edge.erased())
                .collect::<Vec<_>>()
        });
        Self {
            generator_fn,
            edge_cases_fn,
            type_id: TypeId::of::<A::Value>(),
            type_name: std::any::type_name::<A::Value>(),
        }
    }
}

/// Outcome classification of a whole property run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// No falsifying sample was found within the configured tries
    Satisfied,
    /// A falsifying sample was found (and shrunk)
    Falsified,
}

/// Everything a caller needs to report or reproduce one property run.
#[derive(Debug)]
pub struct PropertyRunResult {
    /// Outcome of the run
    pub status: RunStatus,
    /// Number of tries actually executed
    pub tries_executed: usize,
    /// Number of tries rejected by assumptions; never counterexamples
    pub invalid_tries: usize,
    /// The seed this run used; re-running with it reproduces the samples
    pub seed: u64,
    /// The first falsifying sample found during plain generation
    pub original_sample: Option<FalsifiedSample>,
    /// The smallest still-falsifying sample the shrinker reached
    pub shrunk_sample: Option<FalsifiedSample>,
    /// Number of accepted shrinking steps across all parameters
    pub shrinking_steps: usize,
    /// Display contexts of the parameter types, in parameter order
    pub parameter_types: Vec<Arc<TypeContext>>,
}

impl PropertyRunResult {
    /// Whether the run found a counterexample.
    pub fn is_falsified(&self) -> bool {
        self.status == RunStatus::Falsified
    }
}

/// Drives one property: draws samples, classifies them through the
/// falsifier, and shrinks the first falsification.
///
/// The runner owns its support services — the per-type display-context
/// cache and the registry of sample reporters — instead of reaching for
/// process-wide statics.
pub struct PropertyRunner {
    config: RunConfig,
    reporters: ServiceRegistry<Box<dyn SampleReporter + Send + Sync>>,
    type_contexts: ContextCache<TypeId, TypeContext>,
}

impl PropertyRunner {
    /// Create a runner with the given configuration and no reporters.
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            reporters: ServiceRegistry::empty(),
            type_contexts: ContextCache::new(),
        }
    }

    /// Replace the sample-reporter registry.
    pub fn with_reporters(
        mut self,
        reporters: ServiceRegistry<Box<dyn SampleReporter + Send + Sync>>,
    ) -> Self {
        self.reporters = reporters;
        self
    }

    /// Run the property described by `parameters` against `falsifier`.
    ///
    /// Invalid (assumption-rejected) tries are counted separately and never
    /// treated as counterexamples. The first falsified tuple is shrunk and
    /// both the original and the shrunk sample are returned.
    pub fn run(
        &self,
        parameters: &[ParameterArbitrary],
        falsifier: &dyn Falsifier,
    ) -> Result<PropertyRunResult, PropertyError> {
        self.config
            .validate()
            .map_err(|error| PropertyError::config_rejected(error.to_string(), None::<String>))?;

        let seed = self.config.seed.unwrap_or_else(random_seed);
        let mut rng = create_seeded_rng(seed);

        let generators: Vec<Box<dyn RandomGenerator<ParamValue>>> = parameters
            .iter()
            .map(|parameter| {
                let base = (parameter.generator_fn)(self.config.tries);
                let edges = (parameter.edge_cases_fn)();
                if edges.is_empty() || self.config.edge_case_probability <= 0.0 {
                    base
                } else {
                    Box::new(WithEdgeCases::new(
                        edges,
                        self.config.edge_case_probability,
                        base,
                    ))
                }
            })
            .collect();

        let parameter_types: Vec<Arc<TypeContext>> = parameters
            .iter()
            .map(|parameter| {
                self.type_contexts.resolve(parameter.type_id, || TypeContext {
                    type_name: parameter.type_name,
                })
            })
            .collect();

        let mut invalid_tries = 0;
        for try_index in 0..self.config.tries {
            let shrinkables: Vec<Shrinkable<ParamValue>> =
                generators.iter().map(|g| g.next(&mut rng)).collect();
            let values: Vec<ParamValue> = shrinkables.iter().map(|s| s.create_value()).collect();
            match falsifier.execute(&values) {
                TryExecutionResult::Satisfied => {}
                TryExecutionResult::Invalid => invalid_tries += 1,
                TryExecutionResult::Falsified { failure } => {
                    log::debug!(
                        "property falsified on try {} with seed {}",
                        try_index + 1,
                        seed
                    );
                    let original = FalsifiedSample::new(values, shrinkables, failure);
                    let steps = AtomicUsize::new(0);
                    let services = self.reporters.services();
                    let shrinker = ParameterShrinker::new(move |sample| {
                        for reporter in services.iter() {
                            reporter.report(sample);
                        }
                    })
                    .with_max_steps(self.config.max_shrinking_steps);
                    let shrunk = shrinker.shrink(falsifier, original.clone(), &steps);
                    return Ok(PropertyRunResult {
                        status: RunStatus::Falsified,
                        tries_executed: try_index + 1,
                        invalid_tries,
                        seed,
                        original_sample: Some(original),
                        shrunk_sample: Some(shrunk),
                        shrinking_steps: steps.load(Ordering::Relaxed),
                        parameter_types,
                    });
                }
            }
        }

        Ok(PropertyRunResult {
            status: RunStatus::Satisfied,
            tries_executed: self.config.tries,
            invalid_tries,
            seed,
            original_sample: None,
            shrunk_sample: None,
            shrinking_steps: 0,
            parameter_types,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrary::between;
    use crate::error::assume;
    use crate::falsifier::{FnFalsifier, PredicateFalsifier};
    use std::sync::Mutex;

    fn nth_i64(parameters: &[ParamValue], index: usize) -> i64 {
        *parameters[index].downcast_ref::<i64>().unwrap()
    }

    #[test]
    fn test_satisfied_property_runs_all_tries() {
        let runner = PropertyRunner::new(RunConfig::with_seed(42));
        let parameters = [ParameterArbitrary::new(between(0i64, 100))];
        let falsifier = PredicateFalsifier::new(|parameters| nth_i64(parameters, 0) <= 100);
        let result = runner.run(&parameters, &falsifier).unwrap();
        assert_eq!(result.status, RunStatus::Satisfied);
        assert_eq!(result.tries_executed, 1000);
        assert!(result.original_sample.is_none());
    }

    #[test]
    fn test_falsified_property_is_shrunk() {
        let runner = PropertyRunner::new(RunConfig::with_seed(42));
        let parameters = [ParameterArbitrary::new(between(0i64, 10_000))];
        let falsifier = PredicateFalsifier::new(|parameters| nth_i64(parameters, 0) <= 500);
        let result = runner.run(&parameters, &falsifier).unwrap();
        assert!(result.is_falsified());
        let shrunk = result.shrunk_sample.unwrap();
        assert_eq!(nth_i64(shrunk.parameters(), 0), 501);
        let original = result.original_sample.unwrap();
        assert!(nth_i64(original.parameters(), 0) > 500);
    }

    #[test]
    fn test_runs_are_reproducible_from_the_reported_seed() {
        let parameters = [ParameterArbitrary::new(between(0i64, 1_000_000))];
        let falsifier = PredicateFalsifier::new(|parameters| nth_i64(parameters, 0) < 900_000);

        let first = PropertyRunner::new(RunConfig::with_seed(7))
            .run(&parameters, &falsifier)
            .unwrap();
        let second = PropertyRunner::new(RunConfig::with_seed(7))
            .run(&parameters, &falsifier)
            .unwrap();

        assert_eq!(first.status, second.status);
        let a = first.original_sample.unwrap();
        let b = second.original_sample.unwrap();
        assert_eq!(nth_i64(a.parameters(), 0), nth_i64(b.parameters(), 0));
    }

    #[test]
    fn test_invalid_tries_are_counted_not_falsifying() {
        let runner = PropertyRunner::new(RunConfig::with_seed(42));
        let parameters = [ParameterArbitrary::new(between(0i64, 100))];
        let falsifier = FnFalsifier::new(|parameters| {
            assume(nth_i64(parameters, 0) % 2 == 0, "odd")?;
            Ok(())
        });
        let result = runner.run(&parameters, &falsifier).unwrap();
        assert_eq!(result.status, RunStatus::Satisfied);
        assert!(result.invalid_tries > 0);
        assert!(result.original_sample.is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected_before_generation() {
        let config = RunConfig {
            tries: 0,
            ..Default::default()
        };
        let runner = PropertyRunner::new(config);
        let parameters = [ParameterArbitrary::new(between(0i64, 100))];
        let falsifier = PredicateFalsifier::new(|_parameters| true);
        let error = runner.run(&parameters, &falsifier).unwrap_err();
        assert!(matches!(error, PropertyError::ConfigRejected { .. }));
    }

    #[test]
    fn test_two_parameter_property_shrinks_both() {
        let runner = PropertyRunner::new(RunConfig::with_seed(99));
        let parameters = [
            ParameterArbitrary::new(between(0i64, 200)),
            ParameterArbitrary::new(between(0i64, 200)),
        ];
        let falsifier = PredicateFalsifier::new(|parameters| {
            nth_i64(parameters, 0) + nth_i64(parameters, 1) <= 100
        });
        let result = runner.run(&parameters, &falsifier).unwrap();
        assert!(result.is_falsified());
        let shrunk = result.shrunk_sample.unwrap();
        let a = nth_i64(shrunk.parameters(), 0);
        let b = nth_i64(shrunk.parameters(), 1);
        assert!(a + b > 100);
        assert!(falsifier.execute(shrunk.parameters()).is_falsified());
    }

    #[test]
    fn test_parameter_types_are_resolved_through_the_cache() {
        let runner = PropertyRunner::new(RunConfig::with_seed(1));
        let parameters = [
            ParameterArbitrary::new(between(0i64, 10)),
            ParameterArbitrary::new(between(0i64, 10)),
        ];
        let falsifier = PredicateFalsifier::new(|_parameters| true);
        let result = runner.run(&parameters, &falsifier).unwrap();
        assert_eq!(result.parameter_types.len(), 2);
        assert_eq!(result.parameter_types[0].type_name, "i64");
        // both parameters share the cached context
        assert!(Arc::ptr_eq(
            &result.parameter_types[0],
            &result.parameter_types[1]
        ));
    }

    #[test]
    fn test_reporters_observe_shrinking_progress() {
        struct Collecting {
            seen: Mutex<Vec<i64>>,
        }
        impl SampleReporter for Collecting {
            fn report(&self, sample: &FalsifiedSample) {
                self.seen
                    .lock()
                    .unwrap()
                    .push(nth_i64(sample.parameters(), 0));
            }
        }

        let collector = Arc::new(Collecting {
            seen: Mutex::new(Vec::new()),
        });
        let service = collector.clone();
        let reporters = ServiceRegistry::new(move || {
            Ok(vec![
                Box::new(ArcReporter(service.clone())) as Box<dyn SampleReporter + Send + Sync>
            ])
        });
        struct ArcReporter(Arc<Collecting>);
        impl SampleReporter for ArcReporter {
            fn report(&self, sample: &FalsifiedSample) {
                self.0.report(sample);
            }
        }

        let runner = PropertyRunner::new(RunConfig::with_seed(5)).with_reporters(reporters);
        let parameters = [ParameterArbitrary::new(between(0i64, 10_000))];
        let falsifier = PredicateFalsifier::new(|parameters| nth_i64(parameters, 0) <= 100);
        let result = runner.run(&parameters, &falsifier).unwrap();

        let seen = collector.seen.lock().unwrap();
        assert!(result.is_falsified());
        assert_eq!(seen.len(), result.shrinking_steps);
        assert_eq!(
            *seen.last().unwrap(),
            nth_i64(result.shrunk_sample.unwrap().parameters(), 0)
        );
    }

    #[test]
    fn test_edge_cases_surface_quickly() {
        // With full edge-case probability every draw is a boundary value,
        // so the falsifying maximum is found on the first try.
        let config = RunConfig {
            seed: Some(3),
            edge_case_probability: 1.0,
            ..Default::default()
        };
        let runner = PropertyRunner::new(config);
        let parameters = [ParameterArbitrary::new(between(0i64, 1_000_000))];
        let falsifier = PredicateFalsifier::new(|parameters| nth_i64(parameters, 0) < 1_000_000);
        let result = runner.run(&parameters, &falsifier).unwrap();
        assert!(result.is_falsified());
        assert!(result.tries_executed <= 100);
    }
}
