//! Combine arbitraries by means of a builder value.
//!
//! A builder combinator starts from a freshly created builder object,
//! feeds it the values of registered sub-arbitraries through mutation
//! functions in registration order — each optionally skipped with a
//! configured probability — and finally projects the mutated builder into
//! the target value.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use rand::Rng;

use crate::arbitrary::Arbitrary;
use crate::generator::{FnGenerator, RandomGenerator};
use crate::shrinkable::{ParamValue, Shrinkable};

/// Start a builder combinator.
///
/// The supplier is called freshly for each value generation.
pub fn with_builder<B>(initial: impl Fn() -> B + Send + Sync + 'static) -> BuilderCombinator<B>
where
    B: Clone + 'static,
{
    BuilderCombinator {
        initial: Arc::new(initial),
        mutations: Vec::new(),
    }
}

struct BuilderMutation<B> {
    probability: f64,
    generator_fn: Arc<dyn Fn(usize) -> Box<dyn RandomGenerator<ParamValue>> + Send + Sync>,
    mutate: Arc<dyn Fn(B, &ParamValue) -> B + Send + Sync>,
}

impl<B> Clone for BuilderMutation<B> {
    fn clone(&self) -> Self {
        Self {
            probability: self.probability,
            generator_fn: self.generator_fn.clone(),
            mutate: self.mutate.clone(),
        }
    }
}

/// Accumulates sub-arbitraries and their mutation functions.
///
/// Every call returns a new combinator value; combinators are never mutated
/// in place and stay safe to share.
pub struct BuilderCombinator<B> {
    initial: Arc<dyn Fn() -> B + Send + Sync>,
    mutations: Vec<BuilderMutation<B>>,
}

impl<B: Clone + 'static> BuilderCombinator<B> {
    /// Register a sub-arbitrary whose value always mutates the builder.
    pub fn use_arbitrary<A, F>(self, arbitrary: A, mutate: F) -> Self
    where
        A: Arbitrary + Send + Sync + 'static,
        A::Value: Any + Debug,
        F: Fn(B, &A::Value) -> B + Send + Sync + 'static,
    {
        self.maybe_use(arbitrary, 1.0, mutate)
    }

    /// Register a sub-arbitrary whose value mutates the builder with the
    /// given probability per generation.
    ///
    /// Panics when the probability lies outside `[0.0, 1.0]`; a bad
    /// probability is a configuration error and fails before any value is
    /// generated.
    pub fn maybe_use<A, F>(mut self, arbitrary: A, probability: f64, mutate: F) -> Self
    where
        A: Arbitrary + Send + Sync + 'static,
        A::Value: Any + Debug,
        F: Fn(B, &A::Value) -> B + Send + Sync + 'static,
    {
        if !(0.0..=1.0).contains(&probability) {
            panic!(
                "Usage probability of [{}] is outside allowed range (0;1)",
                probability
            );
        }
        let generator_fn = {
            let arbitrary = Arc::new(arbitrary);
            Arc::new(move |tries: usize| {
                let inner = arbitrary.generator(tries);
                Box::new(FnGenerator::new(move |rng: &mut dyn rand::RngCore| {
                    inner.next(rng).erased()
                })) as Box<dyn RandomGenerator<ParamValue>>
            })
        };
        let mutate = Arc::new(move |builder: B, value: &ParamValue| {
            let Some(typed) = value.downcast_ref::<A::Value>() else {
                panic!("Builder mutation received a value of unexpected type");
            };
            mutate(builder, typed)
        });
        self.mutations.push(BuilderMutation {
            probability,
            generator_fn,
            mutate,
        });
        self
    }

    /// Create the final arbitrary by projecting the fully mutated builder.
    pub fn build<T, F>(self, project: F) -> BuiltArbitrary<B, T>
    where
        T: Clone + 'static,
        F: Fn(B) -> T + Send + Sync + 'static,
    {
        BuiltArbitrary {
            initial: self.initial,
            mutations: self.mutations,
            project: Arc::new(project),
        }
    }
}

impl<B: Clone + 'static> BuilderCombinator<B> {
    /// Create the final arbitrary for the builder itself.
    pub fn build_value(self) -> BuiltArbitrary<B, B> {
        self.build(|builder| builder)
    }
}

/// The arbitrary produced by a [`BuilderCombinator`].
pub struct BuiltArbitrary<B, T> {
    initial: Arc<dyn Fn() -> B + Send + Sync>,
    mutations: Vec<BuilderMutation<B>>,
    project: Arc<dyn Fn(B) -> T + Send + Sync>,
}

impl<B, T> Arbitrary for BuiltArbitrary<B, T>
where
    B: Clone + 'static,
    T: Clone + 'static,
{
    type Value = T;

    fn generator(&self, tries: usize) -> Box<dyn RandomGenerator<T>> {
        let generators: Vec<Box<dyn RandomGenerator<ParamValue>>> = self
            .mutations
            .iter()
            .map(|m| (m.generator_fn)(tries))
            .collect();
        let probabilities: Vec<f64> = self.mutations.iter().map(|m| m.probability).collect();
        let mutators: Vec<Arc<dyn Fn(B, &ParamValue) -> B + Send + Sync>> =
            self.mutations.iter().map(|m| m.mutate.clone()).collect();
        let initial = self.initial.clone();
        let project = self.project.clone();
        Box::new(FnGenerator::new(move |rng| {
            let mut parts: Vec<Shrinkable<ParamValue>> = Vec::new();
            let mut applied: Vec<usize> = Vec::new();
            for (index, generator) in generators.iter().enumerate() {
                if rng.gen_bool(probabilities[index]) {
                    parts.push(generator.next(rng));
                    applied.push(index);
                }
            }
            let initial = initial.clone();
            let project = project.clone();
            let mutators = mutators.clone();
            Shrinkable::combine(parts, move |values| {
                let mut builder = initial();
                for (slot, &mutation_index) in applied.iter().enumerate() {
                    builder = (mutators[mutation_index])(builder, &values[slot]);
                }
                project(builder)
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrary::between;
    use crate::rng::create_seeded_rng;

    #[derive(Debug, Clone, PartialEq)]
    struct Account {
        owner: String,
        balance: i64,
        flagged: bool,
    }

    fn empty_account() -> Account {
        Account {
            owner: String::new(),
            balance: 0,
            flagged: false,
        }
    }

    #[test]
    fn test_mutations_apply_in_registration_order() {
        let arbitrary = with_builder(Vec::<i64>::new)
            .use_arbitrary(between(1i64, 1), |mut trace, n| {
                trace.push(*n);
                trace
            })
            .use_arbitrary(between(2i64, 2), |mut trace, n| {
                trace.push(*n);
                trace
            })
            .use_arbitrary(between(3i64, 3), |mut trace, n| {
                trace.push(*n);
                trace
            })
            .build_value();

        let generator = arbitrary.generator(10);
        let mut rng = create_seeded_rng(21);
        assert_eq!(*generator.next(&mut rng).value(), vec![1, 2, 3]);
    }

    #[test]
    fn test_projection_maps_the_final_builder() {
        let arbitrary = with_builder(empty_account)
            .use_arbitrary(between(10i64, 99), |account, balance| Account {
                balance: *balance,
                ..account
            })
            .build(|account| account.balance);

        let generator = arbitrary.generator(10);
        let mut rng = create_seeded_rng(22);
        for _ in 0..20 {
            let balance = *generator.next(&mut rng).value();
            assert!((10..=99).contains(&balance));
        }
    }

    #[test]
    fn test_zero_probability_never_mutates() {
        let arbitrary = with_builder(empty_account)
            .maybe_use(between(1i64, 100), 0.0, |account, balance| Account {
                balance: *balance,
                ..account
            })
            .build_value();

        let generator = arbitrary.generator(10);
        let mut rng = create_seeded_rng(23);
        for _ in 0..20 {
            assert_eq!(generator.next(&mut rng).value().balance, 0);
        }
    }

    #[test]
    fn test_full_probability_always_mutates() {
        let arbitrary = with_builder(empty_account)
            .maybe_use(between(1i64, 100), 1.0, |account, balance| Account {
                balance: *balance,
                ..account
            })
            .build_value();

        let generator = arbitrary.generator(10);
        let mut rng = create_seeded_rng(24);
        for _ in 0..20 {
            assert!(generator.next(&mut rng).value().balance >= 1);
        }
    }

    #[test]
    #[should_panic(expected = "outside allowed range")]
    fn test_probability_above_one_fails_at_construction() {
        with_builder(empty_account).maybe_use(between(1i64, 100), 1.5, |account, balance| {
            Account {
                balance: *balance,
                ..account
            }
        });
    }

    #[test]
    #[should_panic(expected = "outside allowed range")]
    fn test_negative_probability_fails_at_construction() {
        with_builder(empty_account).maybe_use(between(1i64, 100), -0.1, |account, balance| {
            Account {
                balance: *balance,
                ..account
            }
        });
    }

    #[test]
    fn test_built_values_shrink_through_their_parts() {
        let arbitrary = with_builder(empty_account)
            .use_arbitrary(between(0i64, 100), |account, balance| Account {
                balance: *balance,
                ..account
            })
            .build(|account| account.balance);

        let generator = arbitrary.generator(10);
        let mut rng = create_seeded_rng(25);
        let shrinkable = generator.next(&mut rng);
        for candidate in shrinkable.candidates() {
            assert!(candidate.distance() < shrinkable.distance());
            assert!((0..=100).contains(candidate.value()));
        }
    }
}
