//! Shrinkable values: a generated value paired with the metadata needed to
//! systematically reduce it toward a simpler failing input.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::distance::ShrinkingDistance;

/// A lazily produced, finite-per-call iterator of shrink candidates.
pub type Candidates<T> = Box<dyn Iterator<Item = Shrinkable<T>>>;

/// A generated value, its shrinking distance, and a restartable source of
/// smaller candidates.
///
/// Every candidate produced by [`Shrinkable::candidates`] has a strictly
/// smaller distance than the shrinkable it came from, so any chain of shrink
/// steps is finite. The candidate source is re-invoked on every call and
/// yields a fresh, finite iterator; candidates themselves carry their own
/// sources, which is what lets shrinking recurse without materializing the
/// whole candidate tree.
///
/// A shrinkable tree is owned by the single shrinking call that produced it;
/// cloning is cheap (the source is shared) and never shares mutable state.
pub struct Shrinkable<T> {
    value: T,
    distance: ShrinkingDistance,
    source: Arc<dyn Fn() -> Candidates<T>>,
}

impl<T: Clone> Clone for Shrinkable<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            distance: self.distance.clone(),
            source: self.source.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Shrinkable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shrinkable")
            .field("value", &self.value)
            .field("distance", &self.distance)
            .finish()
    }
}

impl<T: Clone + 'static> Shrinkable<T> {
    /// Create a shrinkable from a value, its distance, and a candidate
    /// source.
    ///
    /// The source must produce a finite iterator on each call, and every
    /// produced candidate must have a strictly smaller distance than
    /// `distance`.
    pub fn new(
        value: T,
        distance: ShrinkingDistance,
        source: impl Fn() -> Candidates<T> + 'static,
    ) -> Self {
        Self {
            value,
            distance,
            source: Arc::new(source),
        }
    }

    /// Wrap a value that must not be reduced any further.
    ///
    /// Used for literal and registered sample values; the candidate sequence
    /// is empty and the distance is minimal.
    pub fn unshrinkable(value: T) -> Self {
        Self::new(value, ShrinkingDistance::min(), || {
            Box::new(std::iter::empty())
        })
    }

    /// The generated value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// A fresh copy of the generated value.
    pub fn create_value(&self) -> T {
        self.value.clone()
    }

    /// The shrinking distance of this value.
    pub fn distance(&self) -> &ShrinkingDistance {
        &self.distance
    }

    /// Produce this step's shrink candidates.
    ///
    /// Finite per call; restartable (each call yields an equivalent fresh
    /// iterator).
    pub fn candidates(&self) -> Candidates<T> {
        (self.source)()
    }

    /// Map the value, keeping distance and candidate structure intact.
    pub fn map<U, F>(&self, f: F) -> Shrinkable<U>
    where
        U: Clone + 'static,
        F: Fn(T) -> U + 'static,
    {
        self.map_arc(Arc::new(f))
    }

    pub(crate) fn map_arc<U: Clone + 'static>(&self, f: Arc<dyn Fn(T) -> U>) -> Shrinkable<U> {
        let value = f(self.value.clone());
        let inner = self.clone();
        let mapper = f;
        Shrinkable {
            value,
            distance: self.distance.clone(),
            source: Arc::new(move || {
                let mapper = mapper.clone();
                Box::new(inner.candidates().map(move |c| c.map_arc(mapper.clone())))
            }),
        }
    }

    /// Drop candidates (recursively) that do not satisfy the predicate.
    ///
    /// The shrinkable's own value is assumed to satisfy it already.
    pub fn filter<F>(&self, predicate: F) -> Shrinkable<T>
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.filter_arc(Arc::new(predicate))
    }

    pub(crate) fn filter_arc(&self, predicate: Arc<dyn Fn(&T) -> bool>) -> Shrinkable<T> {
        let inner = self.clone();
        let pred = predicate;
        Shrinkable {
            value: self.value.clone(),
            distance: self.distance.clone(),
            source: Arc::new(move || {
                let keep = pred.clone();
                let wrap = pred.clone();
                Box::new(
                    inner
                        .candidates()
                        .filter(move |c| keep(c.value()))
                        .map(move |c| c.filter_arc(wrap.clone())),
                )
            }),
        }
    }

    /// Combine several erased parts into one value.
    ///
    /// The combined distance is the pairwise sum of the part distances, and
    /// candidates shrink one part at a time while the others stay fixed.
    pub fn combine(
        parts: Vec<Shrinkable<ParamValue>>,
        assemble: impl Fn(&[ParamValue]) -> T + 'static,
    ) -> Shrinkable<T> {
        Self::combine_arc(parts, Arc::new(assemble))
    }

    pub(crate) fn combine_arc(
        parts: Vec<Shrinkable<ParamValue>>,
        assemble: Arc<dyn Fn(&[ParamValue]) -> T>,
    ) -> Shrinkable<T> {
        let values: Vec<ParamValue> = parts.iter().map(|p| p.create_value()).collect();
        let value = assemble(&values);
        let distance = parts
            .iter()
            .fold(ShrinkingDistance::min(), |acc, p| acc.plus(p.distance()));
        let source_parts = parts;
        let source_assemble = assemble;
        Shrinkable {
            value,
            distance,
            source: Arc::new(move || {
                let parts = source_parts.clone();
                let assemble = source_assemble.clone();
                Box::new((0..parts.len()).flat_map(move |i| {
                    let part_candidates = parts[i].candidates();
                    let parts = parts.clone();
                    let assemble = assemble.clone();
                    part_candidates.map(move |candidate| {
                        let mut replaced = parts.clone();
                        replaced[i] = candidate;
                        Shrinkable::combine_arc(replaced, assemble.clone())
                    })
                }))
            }),
        }
    }

    /// Erase the value type for use in heterogeneous parameter lists.
    pub fn erased(&self) -> Shrinkable<ParamValue>
    where
        T: Any + fmt::Debug,
    {
        self.map_arc(Arc::new(|value: T| ParamValue::new(value)))
    }
}

/// A type-erased parameter value.
///
/// Falsifiers receive the parameters of one property call as a slice of
/// these; the concrete type is recovered with [`ParamValue::downcast_ref`].
/// The `Debug` rendering of the original value is captured at erasure time
/// so failure reports stay readable.
#[derive(Clone)]
pub struct ParamValue {
    value: Arc<dyn Any>,
    type_name: &'static str,
    rendered: Arc<str>,
}

impl ParamValue {
    /// Erase a concrete value.
    pub fn new<T: Any + fmt::Debug>(value: T) -> Self {
        let rendered: Arc<str> = format!("{:?}", value).into();
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
            rendered,
        }
    }

    /// Recover the concrete value, if `T` is the erased type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// The `TypeId` of the erased value.
    pub fn type_id(&self) -> TypeId {
        self.value.as_ref().type_id()
    }

    /// The type name of the erased value, for display purposes.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}
