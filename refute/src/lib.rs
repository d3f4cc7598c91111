//! # Refute - Property-Based Testing Engine
//!
//! Refute generates pseudo-random candidate values from declarative value
//! space descriptions ("arbitraries"), detects the first value that
//! falsifies a predicate, and automatically reduces that counterexample to
//! a minimal, reproducible failing case. Small bounded spaces can be
//! enumerated exhaustively instead of sampled.
//!
//! ## Quick Start
//!
//! ```rust
//! use refute::{between, ParameterArbitrary, PredicateFalsifier, PropertyRunner, RunConfig};
//!
//! let parameters = [ParameterArbitrary::new(between(0i64, 1000))];
//! let falsifier = PredicateFalsifier::new(|params| {
//!     *params[0].downcast_ref::<i64>().unwrap() <= 500
//! });
//!
//! let runner = PropertyRunner::new(RunConfig::with_seed(42));
//! let result = runner.run(&parameters, &falsifier).unwrap();
//!
//! // the counterexample was shrunk to the smallest failing value
//! assert!(result.is_falsified());
//! let shrunk = result.shrunk_sample.unwrap();
//! assert_eq!(*shrunk.parameters()[0].downcast_ref::<i64>().unwrap(), 501);
//! ```

// Public modules
pub mod arbitrary;
pub mod builder;
pub mod config;
pub mod distance;
pub mod error;
pub mod execution;
pub mod exhaustive;
pub mod falsifier;
pub mod generator;
pub mod rng;
pub mod shrinkable;
pub mod shrinker;
pub mod store;
pub mod support;
pub mod temporal;

// Re-export the main public API
pub use arbitrary::{
    Arbitrary, DEFAULT_MAX_SIZE, FilterArbitrary, FlatMapArbitrary, IntegerArbitrary,
    JustArbitrary, ListArbitrary, MapArbitrary, between, just,
};
pub use builder::{BuilderCombinator, BuiltArbitrary, with_builder};
pub use config::{ConfigError, RunConfig};
pub use distance::ShrinkingDistance;
pub use error::{PropertyError, assume};
pub use execution::{
    ParameterArbitrary, PropertyRunResult, PropertyRunner, RunStatus, SampleReporter,
};
pub use exhaustive::Exhaustive;
pub use falsifier::{Falsifier, FalsifiedSample, FnFalsifier, PredicateFalsifier, TryExecutionResult};
pub use generator::{
    FnGenerator, ListGenerator, RandomGenerator, WithEdgeCases, WithSamples, choose_size,
    default_cutoff_size, list_generator, shrinkable_integer, shrinkable_list,
};
pub use rng::{
    DefaultRngProvider, RngProvider, create_rng, create_seeded_rng, derive_seed, random_seed,
};
pub use shrinkable::{Candidates, ParamValue, Shrinkable};
pub use shrinker::ParameterShrinker;
pub use store::{CloseOnReset, Lifespan, Scope, ScopedStore};
pub use support::{ContextCache, ServiceLoadError, ServiceRegistry, TypeContext};
pub use temporal::{DateArbitrary, dates_between};
