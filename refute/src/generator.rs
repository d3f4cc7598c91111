//! Random generators: turning a source of randomness into shrinkable values.

use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

use num_traits::{FromPrimitive, PrimInt, ToPrimitive};
use rand::Rng;

use crate::distance::ShrinkingDistance;
use crate::shrinkable::{Candidates, Shrinkable};

/// Produces one shrinkable value per draw.
///
/// A generator is a pure function of the randomness source: identical RNG
/// state yields identical values, which is what makes a failed run
/// reproducible from its reported seed. Size and tries hints are baked in
/// when the generator is built from an [`crate::arbitrary::Arbitrary`].
pub trait RandomGenerator<T> {
    /// Generate the next shrinkable value from the given source of
    /// randomness.
    fn next(&self, rng: &mut dyn rand::RngCore) -> Shrinkable<T>;
}

/// A generator backed by a closure.
pub struct FnGenerator<T> {
    f: Box<dyn Fn(&mut dyn rand::RngCore) -> Shrinkable<T>>,
}

impl<T> FnGenerator<T> {
    /// Wrap a closure as a generator.
    pub fn new(f: impl Fn(&mut dyn rand::RngCore) -> Shrinkable<T> + 'static) -> Self {
        Self { f: Box::new(f) }
    }
}

impl<T> RandomGenerator<T> for FnGenerator<T> {
    fn next(&self, rng: &mut dyn rand::RngCore) -> Shrinkable<T> {
        (self.f)(rng)
    }
}

/// Decorator that hands out a fixed pool of registered samples before
/// falling back to the wrapped generator.
///
/// Samples are delivered in registration order, one per draw, and are not
/// shrunk any further.
pub struct WithSamples<T> {
    samples: Vec<Shrinkable<T>>,
    cursor: AtomicUsize,
    inner: Box<dyn RandomGenerator<T>>,
}

impl<T: Clone + 'static> WithSamples<T> {
    /// Decorate `inner` with a pool of literal samples.
    pub fn new(samples: Vec<T>, inner: Box<dyn RandomGenerator<T>>) -> Self {
        Self {
            samples: samples.into_iter().map(Shrinkable::unshrinkable).collect(),
            cursor: AtomicUsize::new(0),
            inner,
        }
    }
}

impl<T: Clone + 'static> RandomGenerator<T> for WithSamples<T> {
    fn next(&self, rng: &mut dyn rand::RngCore) -> Shrinkable<T> {
        let drawn = self.cursor.fetch_add(1, Ordering::Relaxed);
        match self.samples.get(drawn) {
            Some(sample) => sample.clone(),
            None => self.inner.next(rng),
        }
    }
}

/// Decorator that injects edge cases with a fixed probability.
///
/// This is the documented generation bias toward boundary values: each draw
/// picks a uniformly chosen edge case instead of a random value with the
/// configured probability.
pub struct WithEdgeCases<T> {
    edge_cases: Vec<Shrinkable<T>>,
    probability: f64,
    inner: Box<dyn RandomGenerator<T>>,
}

impl<T: Clone + 'static> WithEdgeCases<T> {
    /// Decorate `inner` with edge-case injection.
    pub fn new(
        edge_cases: Vec<Shrinkable<T>>,
        probability: f64,
        inner: Box<dyn RandomGenerator<T>>,
    ) -> Self {
        Self {
            edge_cases,
            probability,
            inner,
        }
    }
}

impl<T: Clone + 'static> RandomGenerator<T> for WithEdgeCases<T> {
    fn next(&self, rng: &mut dyn rand::RngCore) -> Shrinkable<T> {
        if !self.edge_cases.is_empty() && self.probability > 0.0 && rng.gen_bool(self.probability) {
            let index = rng.gen_range(0..self.edge_cases.len());
            return self.edge_cases[index].clone();
        }
        self.inner.next(rng)
    }
}

/// The list size below which most generated collections stay.
///
/// Monotone in `tries`: more tries drift the cutoff toward `max_size`, fewer
/// keep it near `min_size`; the result is always within `[min_size,
/// max_size]`.
pub fn default_cutoff_size(min_size: usize, max_size: usize, tries: usize) -> usize {
    let offset = ((tries as f64).sqrt().round() as usize).max(10);
    if max_size - min_size <= offset {
        return max_size;
    }
    (min_size + offset).min(max_size)
}

/// Choose a collection size biased toward the cutoff.
///
/// 90% of draws land in `[min_size, cutoff]`; the remaining 10% explore
/// `(cutoff, max_size]` so degenerate sizes still appear occasionally.
pub fn choose_size(
    rng: &mut dyn rand::RngCore,
    min_size: usize,
    max_size: usize,
    cutoff: usize,
) -> usize {
    if cutoff < max_size {
        if rng.gen_bool(0.9) {
            rng.gen_range(min_size..=cutoff)
        } else {
            rng.gen_range((cutoff + 1)..=max_size)
        }
    } else {
        rng.gen_range(min_size..=max_size)
    }
}

/// Generator for lists of a fixed element generator.
pub struct ListGenerator<T> {
    element: Box<dyn RandomGenerator<T>>,
    min_size: usize,
    max_size: usize,
    cutoff: usize,
}

/// Create a list generator with explicit size bounds and cutoff.
pub fn list_generator<T: Clone + 'static>(
    element: Box<dyn RandomGenerator<T>>,
    min_size: usize,
    max_size: usize,
    cutoff: usize,
) -> ListGenerator<T> {
    ListGenerator {
        element,
        min_size,
        max_size,
        cutoff,
    }
}

impl<T: Clone + 'static> RandomGenerator<Vec<T>> for ListGenerator<T> {
    fn next(&self, rng: &mut dyn rand::RngCore) -> Shrinkable<Vec<T>> {
        let size = choose_size(rng, self.min_size, self.max_size, self.cutoff);
        let elements: Vec<Shrinkable<T>> = (0..size).map(|_| self.element.next(rng)).collect();
        shrinkable_list(elements, self.min_size)
    }
}

/// Build a shrinkable list from already generated element shrinkables.
///
/// The distance is the collection distance (size first, summed element
/// distances after). Candidates reduce the size first — truncation to the
/// minimum, first half, then dropping single elements — and shrink
/// individual elements afterwards.
pub fn shrinkable_list<T: Clone + 'static>(
    elements: Vec<Shrinkable<T>>,
    min_size: usize,
) -> Shrinkable<Vec<T>> {
    let value: Vec<T> = elements.iter().map(|e| e.create_value()).collect();
    let distance =
        ShrinkingDistance::for_collection(elements.len(), elements.iter().map(|e| e.distance()));
    let source_elements = elements;
    Shrinkable::new(value, distance, move || {
        let elements = source_elements.clone();
        let len = elements.len();
        let mut candidates: Vec<Shrinkable<Vec<T>>> = Vec::new();
        if len > min_size {
            candidates.push(shrinkable_list(elements[..min_size].to_vec(), min_size));
            let half = len / 2;
            if half > min_size && half < len {
                candidates.push(shrinkable_list(elements[..half].to_vec(), min_size));
            }
            for i in 0..len {
                let mut fewer = elements.clone();
                fewer.remove(i);
                candidates.push(shrinkable_list(fewer, min_size));
            }
        }
        for i in 0..len {
            for candidate in elements[i].candidates() {
                let mut replaced = elements.clone();
                replaced[i] = candidate;
                candidates.push(shrinkable_list(replaced, min_size));
            }
        }
        Box::new(candidates.into_iter()) as Candidates<Vec<T>>
    })
}

/// Build an integer shrinkable that reduces toward the in-range value
/// closest to zero.
///
/// The distance is the absolute difference to that target. Candidates are
/// emitted most aggressive first: the target itself, then successive
/// halfway points, ending with the direct neighbor of the current value —
/// which is what guarantees a per-parameter local minimum.
pub fn shrinkable_integer<T>(value: T, min: T, max: T) -> Shrinkable<T>
where
    T: PrimInt + ToPrimitive + FromPrimitive + Debug + 'static,
{
    let (Some(v), Some(lo), Some(hi)) = (value.to_i128(), min.to_i128(), max.to_i128()) else {
        return Shrinkable::unshrinkable(value);
    };
    let target = shrink_target(lo, hi);
    build_integer(value, v, target)
}

fn shrink_target(min: i128, max: i128) -> i128 {
    if min <= 0 && 0 <= max {
        0
    } else if min > 0 {
        min
    } else {
        max
    }
}

fn build_integer<T>(value: T, v: i128, target: i128) -> Shrinkable<T>
where
    T: PrimInt + FromPrimitive + Debug + 'static,
{
    let distance = ShrinkingDistance::of(&[distance_to(v, target)]);
    Shrinkable::new(value, distance, move || {
        Box::new(
            integer_candidates(v, target)
                .into_iter()
                .filter_map(move |c| T::from_i128(c).map(|typed| build_integer(typed, c, target))),
        ) as Candidates<T>
    })
}

fn integer_candidates(v: i128, target: i128) -> Vec<i128> {
    if v == target {
        return Vec::new();
    }
    let mut values = vec![target];
    let mut delta = v - target;
    loop {
        delta /= 2;
        if delta == 0 {
            break;
        }
        values.push(v - delta);
    }
    values
}

fn distance_to(v: i128, target: i128) -> u64 {
    u64::try_from((v - target).unsigned_abs()).unwrap_or(u64::MAX)
}
