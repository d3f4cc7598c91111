//! Chains: ordered, lazily advancing sequences of states driven by
//! generated transformers.

use std::fmt;
use std::sync::{Arc, Mutex};

use rand::Rng;
use refute::{Arbitrary, FnGenerator, PropertyError, RandomGenerator, Shrinkable, shrinkable_list};

use crate::transformer::Transformer;

/// An ordered, lazily advancing sequence of states.
///
/// The iterator yields the initial state first and then one state per
/// applied transformer. `transformations` and `transformers` reflect the
/// steps applied so far; `max_transformations` is a display bound for
/// chains that have not run yet.
pub trait Chain<T> {
    /// Start a fresh traversal of the chain's states.
    fn start(&self) -> Box<dyn Iterator<Item = Result<T, PropertyError>> + '_>;

    /// Human-readable descriptions of the steps applied so far.
    fn transformations(&self) -> Vec<String>;

    /// The transformer descriptors applied so far.
    fn transformers(&self) -> Vec<Transformer<T>>;

    /// Upper bound on the number of transformations, for display before the
    /// chain has run.
    fn max_transformations(&self) -> usize;
}

/// A chain replayed from recorded transformer choices.
///
/// The choices were drawn from arbitraries during generation, so replay is
/// deterministic: the same recorded chain always visits the same states.
pub struct GeneratedChain<T> {
    initial: Arc<dyn Fn() -> T + Send + Sync>,
    steps: Vec<Transformer<T>>,
    applied: Arc<Mutex<Vec<Transformer<T>>>>,
}

impl<T> Clone for GeneratedChain<T> {
    // Clones replay independently: the applied-step record starts fresh.
    fn clone(&self) -> Self {
        Self {
            initial: self.initial.clone(),
            steps: self.steps.clone(),
            applied: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone + 'static> GeneratedChain<T> {
    /// Create a chain from an initial-state factory and recorded steps.
    pub fn new(initial: impl Fn() -> T + Send + Sync + 'static, steps: Vec<Transformer<T>>) -> Self {
        Self::from_arc(Arc::new(initial), steps)
    }

    fn from_arc(initial: Arc<dyn Fn() -> T + Send + Sync>, steps: Vec<Transformer<T>>) -> Self {
        Self {
            initial,
            steps,
            applied: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The recorded steps of this chain.
    pub fn steps(&self) -> &[Transformer<T>] {
        &self.steps
    }
}

impl<T: Clone + 'static> Chain<T> for GeneratedChain<T> {
    fn start(&self) -> Box<dyn Iterator<Item = Result<T, PropertyError>> + '_> {
        self.applied.lock().unwrap().clear();
        Box::new(GeneratedChainIterator {
            chain: self,
            index: 0,
            current: None,
            halted: false,
        })
    }

    fn transformations(&self) -> Vec<String> {
        self.applied
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.description().to_string())
            .collect()
    }

    fn transformers(&self) -> Vec<Transformer<T>> {
        self.applied.lock().unwrap().clone()
    }

    fn max_transformations(&self) -> usize {
        self.steps.len()
    }
}

impl<T> fmt::Debug for GeneratedChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let descriptions: Vec<&str> = self.steps.iter().map(|t| t.description()).collect();
        write!(f, "GeneratedChain{:?}", descriptions)
    }
}

struct GeneratedChainIterator<'a, T> {
    chain: &'a GeneratedChain<T>,
    index: usize,
    current: Option<T>,
    halted: bool,
}

impl<'a, T: Clone + 'static> Iterator for GeneratedChainIterator<'a, T> {
    type Item = Result<T, PropertyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }
        if self.index == 0 {
            self.index = 1;
            let state = (self.chain.initial)();
            self.current = Some(state.clone());
            return Some(Ok(state));
        }
        let step_index = self.index - 1;
        let transformer = self.chain.steps.get(step_index)?;
        if transformer.is_end_of_chain() {
            self.halted = true;
            return None;
        }
        self.index += 1;
        // record the step before applying it, so a faulting step is listed
        self.chain
            .applied
            .lock()
            .unwrap()
            .push(transformer.clone());
        let state = self.current.take()?;
        match transformer.apply(state) {
            Ok(next) => {
                self.current = Some(next.clone());
                Some(Ok(next))
            }
            Err(error) => {
                self.halted = true;
                Some(Err(error))
            }
        }
    }
}

/// An arbitrary over [`GeneratedChain`]s.
///
/// Each generation draws a step count in `[1, max_transformations]` and a
/// uniformly chosen transformer arbitrary per step. The result shrinks like
/// any other generated list: steps are removed and individual transformer
/// choices simplified, and the shrunk chain replays deterministically from
/// its recorded choices.
pub struct ChainArbitrary<T> {
    initial: Arc<dyn Fn() -> T + Send + Sync>,
    max_transformations: usize,
    providers: Vec<Arc<dyn Arbitrary<Value = Transformer<T>> + Send + Sync>>,
}

impl<T> Clone for ChainArbitrary<T> {
    fn clone(&self) -> Self {
        Self {
            initial: self.initial.clone(),
            max_transformations: self.max_transformations,
            providers: self.providers.clone(),
        }
    }
}

/// Start describing chains over states created by `initial`.
pub fn action_chains<T: Clone + 'static>(
    initial: impl Fn() -> T + Send + Sync + 'static,
) -> ChainArbitrary<T> {
    ChainArbitrary {
        initial: Arc::new(initial),
        max_transformations: 10,
        providers: Vec::new(),
    }
}

impl<T: Clone + 'static> ChainArbitrary<T> {
    /// A copy of this arbitrary with one more transformer arbitrary
    /// registered. Clone-on-write: the receiver is untouched.
    pub fn with_transformation(
        &self,
        arbitrary: impl Arbitrary<Value = Transformer<T>> + Send + Sync + 'static,
    ) -> Self {
        let mut providers = self.providers.clone();
        providers.push(Arc::new(arbitrary));
        Self {
            initial: self.initial.clone(),
            max_transformations: self.max_transformations,
            providers,
        }
    }

    /// A copy of this arbitrary with a different step-count bound.
    pub fn with_max_transformations(&self, max_transformations: usize) -> Self {
        Self {
            initial: self.initial.clone(),
            max_transformations,
            providers: self.providers.clone(),
        }
    }
}

impl<T: Clone + 'static> Arbitrary for ChainArbitrary<T> {
    type Value = GeneratedChain<T>;

    fn generator(&self, tries: usize) -> Box<dyn RandomGenerator<GeneratedChain<T>>> {
        if self.providers.is_empty() {
            panic!("Chain arbitrary needs at least one registered transformation");
        }
        let generators: Vec<Box<dyn RandomGenerator<Transformer<T>>>> = self
            .providers
            .iter()
            .map(|provider| provider.generator(tries))
            .collect();
        let initial = self.initial.clone();
        let max_transformations = self.max_transformations.max(1);
        Box::new(FnGenerator::new(move |rng| {
            let count = rng.gen_range(1..=max_transformations);
            let steps: Vec<Shrinkable<Transformer<T>>> = (0..count)
                .map(|_| {
                    let pick = rng.gen_range(0..generators.len());
                    generators[pick].next(rng)
                })
                .collect();
            let initial = initial.clone();
            shrinkable_list(steps, 1)
                .map(move |transformers| GeneratedChain::from_arc(initial.clone(), transformers))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refute::{between, create_seeded_rng, just};

    fn collect_states(chain: &GeneratedChain<i64>) -> Vec<i64> {
        chain.start().map(|step| step.unwrap()).collect()
    }

    #[test]
    fn test_chain_yields_initial_state_first() {
        let chain = GeneratedChain::new(
            || 10i64,
            vec![
                Transformer::mapping("add one", |n| n + 1),
                Transformer::mapping("double", |n| n * 2),
            ],
        );
        assert_eq!(collect_states(&chain), vec![10, 11, 22]);
        assert_eq!(
            chain.transformations(),
            vec!["add one".to_string(), "double".to_string()]
        );
    }

    #[test]
    fn test_chain_replay_is_deterministic() {
        let chain = GeneratedChain::new(|| 1i64, vec![Transformer::mapping("triple", |n| n * 3)]);
        assert_eq!(collect_states(&chain), vec![1, 3]);
        assert_eq!(collect_states(&chain), vec![1, 3]);
    }

    #[test]
    fn test_end_of_chain_stops_iteration() {
        let chain = GeneratedChain::new(
            || 0i64,
            vec![
                Transformer::mapping("add one", |n| n + 1),
                Transformer::end_of_chain(),
                Transformer::mapping("never applied", |n| n + 100),
            ],
        );
        assert_eq!(collect_states(&chain), vec![0, 1]);
        assert_eq!(chain.transformations(), vec!["add one".to_string()]);
    }

    #[test]
    fn test_step_fault_is_yielded_and_halts() {
        let chain = GeneratedChain::new(
            || 0i64,
            vec![
                Transformer::mapping("add one", |n| n + 1),
                Transformer::new("blow up", |_n| {
                    Err(PropertyError::property_failed("step exploded"))
                }),
                Transformer::mapping("never applied", |n| n + 100),
            ],
        );
        let steps: Vec<Result<i64, PropertyError>> = chain.start().collect();
        assert_eq!(steps.len(), 3);
        assert_eq!(*steps[1].as_ref().unwrap(), 1);
        assert!(steps[2].is_err());
        // the faulting step is recorded
        assert_eq!(
            chain.transformations(),
            vec!["add one".to_string(), "blow up".to_string()]
        );
    }

    #[test]
    fn test_generated_chains_stay_within_step_bounds() {
        let arbitrary = action_chains(|| 0i64)
            .with_transformation(just(Transformer::mapping("add one", |n: i64| n + 1)))
            .with_max_transformations(6);
        let generator = arbitrary.generator(100);
        let mut rng = create_seeded_rng(41);
        for _ in 0..50 {
            let chain = generator.next(&mut rng);
            let steps = chain.value().max_transformations();
            assert!((1..=6).contains(&steps));
        }
    }

    #[test]
    fn test_chain_candidates_remove_steps() {
        let arbitrary = action_chains(|| 0i64)
            .with_transformation(just(Transformer::mapping("add one", |n: i64| n + 1)))
            .with_max_transformations(8);
        let generator = arbitrary.generator(100);
        let mut rng = create_seeded_rng(43);
        let chain = generator.next(&mut rng);
        for candidate in chain.candidates() {
            assert!(candidate.distance() < chain.distance());
            assert!(candidate.value().max_transformations() >= 1);
        }
    }

    #[test]
    fn test_transformer_parameters_shrink_too() {
        // The transformer's parameter comes from an arbitrary, so chains
        // shrink not only by dropping steps but by simplifying steps.
        let arbitrary = action_chains(|| 0i64)
            .with_transformation(between(1i64, 100).map(|amount| {
                Transformer::mapping(format!("add {}", amount), move |n| n + amount)
            }))
            .with_max_transformations(4);
        let generator = arbitrary.generator(100);
        let mut rng = create_seeded_rng(47);
        let chain = generator.next(&mut rng);
        let has_candidates = chain.candidates().next().is_some();
        assert!(has_candidates);
    }

    #[test]
    fn test_generation_is_stable_across_rng_backends() {
        use rand::SeedableRng;
        let arbitrary = action_chains(|| 0i64)
            .with_transformation(just(Transformer::mapping("add one", |n: i64| n + 1)))
            .with_max_transformations(5);
        let generator = arbitrary.generator(100);
        let mut rng1 = rand_chacha::ChaCha8Rng::seed_from_u64(53);
        let mut rng2 = rand_chacha::ChaCha8Rng::seed_from_u64(53);
        for _ in 0..10 {
            assert_eq!(
                generator.next(&mut rng1).value().max_transformations(),
                generator.next(&mut rng2).value().max_transformations()
            );
        }
    }

    #[test]
    fn test_clone_on_write_registration() {
        let base = action_chains(|| 0i64);
        let extended =
            base.with_transformation(just(Transformer::mapping("add one", |n: i64| n + 1)));
        // the base still has no transformations and refuses to build
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            base.generator(10);
        }));
        assert!(result.is_err());
        let _ = extended.generator(10);
    }
}
