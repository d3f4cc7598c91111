//! Arbitraries: composable, immutable descriptors of value spaces.
//!
//! An arbitrary describes *how* to generate values of a type; combinators
//! return new descriptors without ever mutating the receiver, so arbitraries
//! can be shared freely across generation calls.

use std::fmt::Debug;
use std::sync::Arc;

use num_traits::{FromPrimitive, PrimInt, ToPrimitive};
use rand::Rng;
use rand::distributions::uniform::SampleUniform;

use crate::distance::ShrinkingDistance;
use crate::exhaustive::Exhaustive;
use crate::generator::{
    FnGenerator, RandomGenerator, default_cutoff_size, list_generator, shrinkable_integer,
    shrinkable_list,
};
use crate::rng::{create_seeded_rng, derive_seed};
use crate::shrinkable::{Candidates, Shrinkable};

/// Default upper size bound for generated collections.
pub const DEFAULT_MAX_SIZE: usize = 255;

/// Number of draws a filtered arbitrary attempts before giving up.
const MAX_FILTER_TRIES: usize = 1000;

/// A composable descriptor of a generation strategy for a value type.
///
/// Arbitraries build [`RandomGenerator`]s tuned for the requested number of
/// tries, may expose a deterministic [`Exhaustive`] enumerator for small
/// domains, and may expose a set of boundary values worth testing
/// preferentially.
pub trait Arbitrary {
    /// The type of values this arbitrary describes
    type Value: Clone + 'static;

    /// Build a random generator tuned for the given number of tries.
    fn generator(&self, tries: usize) -> Box<dyn RandomGenerator<Self::Value>>;

    /// Deterministic enumeration of the whole domain, when it is finite and
    /// its (upper-bound) count does not exceed `max_count`.
    fn exhaustive(&self, max_count: u64) -> Option<Exhaustive<Self::Value>> {
        let _ = max_count;
        None
    }

    /// Deduplicated boundary values of the domain.
    fn edge_cases(&self) -> Vec<Shrinkable<Self::Value>> {
        Vec::new()
    }

    /// Map generated values to a different type.
    fn map<U, F>(self, f: F) -> MapArbitrary<Self, U>
    where
        Self: Sized,
        U: Clone + 'static,
        F: Fn(Self::Value) -> U + Send + Sync + 'static,
    {
        MapArbitrary {
            inner: self,
            mapper: Arc::new(f),
        }
    }

    /// Derive a sub-arbitrary from each generated value.
    ///
    /// The sub-arbitrary is re-resolved for every generated value; shrinking
    /// the outer value regenerates the inner one from a recorded seed so the
    /// whole composition stays reproducible.
    fn flat_map<B, F>(self, f: F) -> FlatMapArbitrary<Self, B>
    where
        Self: Sized,
        B: Arbitrary + 'static,
        F: Fn(&Self::Value) -> B + Send + Sync + 'static,
    {
        FlatMapArbitrary {
            inner: self,
            to_arbitrary: Arc::new(f),
        }
    }

    /// Keep only values satisfying the predicate.
    ///
    /// Generation retries up to a fixed budget and panics when the predicate
    /// never accepts — a too-strict filter is a usage error, not a runtime
    /// condition.
    fn filter<F>(self, predicate: F) -> FilterArbitrary<Self>
    where
        Self: Sized,
        F: Fn(&Self::Value) -> bool + Send + Sync + 'static,
    {
        FilterArbitrary {
            inner: self,
            predicate: Arc::new(predicate),
        }
    }

    /// Lists of this arbitrary's values, sized `0..=DEFAULT_MAX_SIZE` until
    /// narrowed with [`ListArbitrary::of_min_size`] /
    /// [`ListArbitrary::of_max_size`].
    fn list(self) -> ListArbitrary<Self>
    where
        Self: Sized,
    {
        ListArbitrary {
            element: self,
            min_size: 0,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

/// An arbitrary that maps values from one type to another
pub struct MapArbitrary<A: Arbitrary, U> {
    inner: A,
    mapper: Arc<dyn Fn(A::Value) -> U + Send + Sync>,
}

impl<A: Arbitrary, U: Clone + 'static> Arbitrary for MapArbitrary<A, U> {
    type Value = U;

    fn generator(&self, tries: usize) -> Box<dyn RandomGenerator<U>> {
        let inner = self.inner.generator(tries);
        let mapper = self.mapper.clone();
        Box::new(FnGenerator::new(move |rng| {
            let mapper: Arc<dyn Fn(A::Value) -> U> = mapper.clone();
            inner.next(rng).map_arc(mapper)
        }))
    }

    fn exhaustive(&self, max_count: u64) -> Option<Exhaustive<U>> {
        Some(
            self.inner
                .exhaustive(max_count)?
                .map_values(self.mapper.clone()),
        )
    }

    fn edge_cases(&self) -> Vec<Shrinkable<U>> {
        let mapper: Arc<dyn Fn(A::Value) -> U> = self.mapper.clone();
        self.inner
            .edge_cases()
            .iter()
            .map(|edge| edge.map_arc(mapper.clone()))
            .collect()
    }
}

/// An arbitrary that filters values based on a predicate
pub struct FilterArbitrary<A: Arbitrary> {
    inner: A,
    predicate: Arc<dyn Fn(&A::Value) -> bool + Send + Sync>,
}

impl<A: Arbitrary> Arbitrary for FilterArbitrary<A> {
    type Value = A::Value;

    fn generator(&self, tries: usize) -> Box<dyn RandomGenerator<A::Value>> {
        let inner = self.inner.generator(tries);
        let predicate = self.predicate.clone();
        Box::new(FnGenerator::new(move |rng| {
            for _ in 0..MAX_FILTER_TRIES {
                let shrinkable = inner.next(rng);
                if predicate(shrinkable.value()) {
                    let keep: Arc<dyn Fn(&A::Value) -> bool> = predicate.clone();
                    return shrinkable.filter_arc(keep);
                }
            }
            panic!(
                "Filter predicate failed to accept a value after {} attempts",
                MAX_FILTER_TRIES
            );
        }))
    }

    fn exhaustive(&self, max_count: u64) -> Option<Exhaustive<A::Value>> {
        Some(
            self.inner
                .exhaustive(max_count)?
                .filter_values(self.predicate.clone()),
        )
    }

    fn edge_cases(&self) -> Vec<Shrinkable<A::Value>> {
        let keep: Arc<dyn Fn(&A::Value) -> bool> = self.predicate.clone();
        self.inner
            .edge_cases()
            .into_iter()
            .filter(|edge| keep(edge.value()))
            .map(|edge| edge.filter_arc(keep.clone()))
            .collect()
    }
}

/// An arbitrary whose values are drawn from a sub-arbitrary derived per
/// generated value
pub struct FlatMapArbitrary<A: Arbitrary, B: Arbitrary> {
    inner: A,
    to_arbitrary: Arc<dyn Fn(&A::Value) -> B + Send + Sync>,
}

impl<A, B> Arbitrary for FlatMapArbitrary<A, B>
where
    A: Arbitrary + 'static,
    B: Arbitrary + 'static,
{
    type Value = B::Value;

    fn generator(&self, tries: usize) -> Box<dyn RandomGenerator<B::Value>> {
        let outer = self.inner.generator(tries);
        let to_arbitrary = self.to_arbitrary.clone();
        Box::new(FnGenerator::new(move |rng| {
            let outer_shrinkable = outer.next(rng);
            let seed = derive_seed(rng);
            let to_generator: Arc<dyn Fn(&A::Value) -> Box<dyn RandomGenerator<B::Value>>> = {
                let to_arbitrary = to_arbitrary.clone();
                Arc::new(move |value: &A::Value| to_arbitrary(value).generator(tries))
            };
            flat_mapped(outer_shrinkable, to_generator, seed)
        }))
    }

    /// Composes counts as the outer count times the supremum of the inner
    /// counts. This is an upper bound: range restriction or filtering inside
    /// the derived arbitraries removes elements without adjusting it.
    fn exhaustive(&self, max_count: u64) -> Option<Exhaustive<B::Value>> {
        let outer = self.inner.exhaustive(max_count)?;
        let outer_values: Vec<A::Value> = outer.iter().collect();
        let mut supremum: u64 = 0;
        let mut inners: Vec<Exhaustive<B::Value>> = Vec::with_capacity(outer_values.len());
        for value in &outer_values {
            let inner = (self.to_arbitrary)(value).exhaustive(max_count)?;
            supremum = supremum.max(inner.max_count());
            inners.push(inner);
        }
        let total = outer.max_count().checked_mul(supremum)?;
        if total > max_count {
            return None;
        }
        Some(Exhaustive::new(total, move || {
            let inners = inners.clone();
            Box::new(inners.into_iter().flat_map(|inner| inner.iter()))
        }))
    }
}

// A flat-mapped shrinkable: shrinking the outer value regenerates the inner
// one from the recorded seed; shrinking the inner value keeps the outer
// fixed. The outer distance is prepended so outer progress dominates.
fn flat_mapped<T, U>(
    outer: Shrinkable<T>,
    to_generator: Arc<dyn Fn(&T) -> Box<dyn RandomGenerator<U>>>,
    seed: u64,
) -> Shrinkable<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    let mut rng = create_seeded_rng(seed);
    let inner = to_generator(outer.value()).next(&mut rng);
    let distance = outer.distance().append(inner.distance());
    let value = inner.create_value();
    let outer_for_source = outer;
    let inner_for_source = inner;
    let generator_for_source = to_generator;
    let distance_for_source = distance.clone();
    Shrinkable::new(value, distance, move || {
        let own_distance = distance_for_source.clone();
        let to_generator = generator_for_source.clone();
        let outer_candidates = outer_for_source
            .candidates()
            .map(move |oc| flat_mapped(oc, to_generator.clone(), seed))
            .filter(move |c| c.distance() < &own_distance);
        let prefix = outer_for_source.distance().clone();
        let inner_candidates = inner_for_source
            .candidates()
            .map(move |ic| with_distance_prefix(prefix.clone(), ic));
        Box::new(outer_candidates.chain(inner_candidates)) as Candidates<U>
    })
}

fn with_distance_prefix<U: Clone + 'static>(
    prefix: ShrinkingDistance,
    inner: Shrinkable<U>,
) -> Shrinkable<U> {
    let distance = prefix.append(inner.distance());
    let value = inner.create_value();
    let inner_for_source = inner;
    let prefix_for_source = prefix;
    Shrinkable::new(value, distance, move || {
        let prefix = prefix_for_source.clone();
        Box::new(
            inner_for_source
                .candidates()
                .map(move |c| with_distance_prefix(prefix.clone(), c)),
        ) as Candidates<U>
    })
}

/// An arbitrary for lists of another arbitrary's values
pub struct ListArbitrary<A> {
    element: A,
    min_size: usize,
    max_size: usize,
}

impl<A: Clone> ListArbitrary<A> {
    /// A copy of this arbitrary with the minimum size changed.
    ///
    /// Clone-on-write: the receiver is untouched and stays shareable.
    pub fn of_min_size(&self, min_size: usize) -> Self {
        Self {
            element: self.element.clone(),
            min_size,
            max_size: self.max_size,
        }
    }

    /// A copy of this arbitrary with the maximum size changed.
    pub fn of_max_size(&self, max_size: usize) -> Self {
        Self {
            element: self.element.clone(),
            min_size: self.min_size,
            max_size,
        }
    }
}

impl<A: Arbitrary> Arbitrary for ListArbitrary<A> {
    type Value = Vec<A::Value>;

    fn generator(&self, tries: usize) -> Box<dyn RandomGenerator<Vec<A::Value>>> {
        let cutoff = default_cutoff_size(self.min_size, self.max_size, tries);
        Box::new(list_generator(
            self.element.generator(tries),
            self.min_size,
            self.max_size,
            cutoff,
        ))
    }

    fn exhaustive(&self, max_count: u64) -> Option<Exhaustive<Vec<A::Value>>> {
        let element = self.element.exhaustive(max_count)?;
        Exhaustive::list(&element, self.min_size, self.max_size, max_count)
    }

    fn edge_cases(&self) -> Vec<Shrinkable<Vec<A::Value>>> {
        let mut edges = Vec::new();
        if self.min_size == 0 {
            edges.push(shrinkable_list(Vec::new(), 0));
        }
        if self.min_size <= 1 && self.max_size >= 1 {
            for edge in self.element.edge_cases() {
                edges.push(shrinkable_list(vec![edge], self.min_size));
            }
        }
        edges
    }
}

/// An arbitrary over an inclusive integer range
#[derive(Debug, Clone)]
pub struct IntegerArbitrary<T> {
    min: T,
    max: T,
}

/// Create an arbitrary for integers in `[min, max]`.
///
/// Panics when `min > max`; an inverted range is a configuration error.
pub fn between<T>(min: T, max: T) -> IntegerArbitrary<T>
where
    T: PrimInt + Debug,
{
    if min > max {
        panic!(
            "Invalid integer range: min {:?} is greater than max {:?}",
            min, max
        );
    }
    IntegerArbitrary { min, max }
}

impl<T> Arbitrary for IntegerArbitrary<T>
where
    T: PrimInt + FromPrimitive + ToPrimitive + SampleUniform + Debug + Send + Sync + 'static,
{
    type Value = T;

    fn generator(&self, _tries: usize) -> Box<dyn RandomGenerator<T>> {
        let (min, max) = (self.min, self.max);
        Box::new(FnGenerator::new(move |rng| {
            let value = rng.gen_range(min..=max);
            shrinkable_integer(value, min, max)
        }))
    }

    fn exhaustive(&self, max_count: u64) -> Option<Exhaustive<T>> {
        let lo = self.min.to_i128()?;
        let hi = self.max.to_i128()?;
        let count = u64::try_from(hi - lo + 1).ok()?;
        if count > max_count {
            return None;
        }
        Some(Exhaustive::new(count, move || {
            Box::new((0..count).filter_map(move |offset| T::from_i128(lo + offset as i128)))
        }))
    }

    fn edge_cases(&self) -> Vec<Shrinkable<T>> {
        let mut candidates = vec![self.min, self.max, T::zero(), T::one()];
        if let Some(minus_one) = T::zero().checked_sub(&T::one()) {
            candidates.push(minus_one);
        }
        let (min, max) = (self.min, self.max);
        let mut edges: Vec<T> = Vec::new();
        for value in candidates.drain(..) {
            if value >= min && value <= max && !edges.contains(&value) {
                edges.push(value);
            }
        }
        edges
            .into_iter()
            .map(|value| shrinkable_integer(value, min, max))
            .collect()
    }
}

/// An arbitrary that always produces the same value
#[derive(Debug, Clone)]
pub struct JustArbitrary<T> {
    value: T,
}

/// Create an arbitrary that always produces `value`.
pub fn just<T>(value: T) -> JustArbitrary<T>
where
    T: Clone + Send + Sync + 'static,
{
    JustArbitrary { value }
}

impl<T> Arbitrary for JustArbitrary<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Value = T;

    fn generator(&self, _tries: usize) -> Box<dyn RandomGenerator<T>> {
        let value = self.value.clone();
        Box::new(FnGenerator::new(move |_rng| {
            Shrinkable::unshrinkable(value.clone())
        }))
    }

    fn exhaustive(&self, _max_count: u64) -> Option<Exhaustive<T>> {
        let value = self.value.clone();
        Some(Exhaustive::new(1, move || {
            Box::new(std::iter::once(value.clone()))
        }))
    }

    fn edge_cases(&self) -> Vec<Shrinkable<T>> {
        vec![Shrinkable::unshrinkable(self.value.clone())]
    }
}
