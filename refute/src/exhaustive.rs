//! Deterministic full enumeration of bounded value spaces.
//!
//! When a domain is finite and small enough, exhaustive enumeration replaces
//! random sampling: every value is visited exactly once, in a fixed order.

use std::sync::Arc;

/// An exhaustive enumerator over a bounded domain.
///
/// `max_count` is an **upper bound** on the number of enumerated values, not
/// an exact count: combinators such as `filter` (and range restriction after
/// a `flat_map`) remove elements without adjusting the count. Exact counts
/// are not tracked.
pub struct Exhaustive<T> {
    max_count: u64,
    source: Arc<dyn Fn() -> Box<dyn Iterator<Item = T>> + Send + Sync>,
}

impl<T> Clone for Exhaustive<T> {
    fn clone(&self) -> Self {
        Self {
            max_count: self.max_count,
            source: self.source.clone(),
        }
    }
}

impl<T: 'static> Exhaustive<T> {
    /// Create an enumerator from a count and a restartable iterator factory.
    pub fn new(
        max_count: u64,
        source: impl Fn() -> Box<dyn Iterator<Item = T>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            max_count,
            source: Arc::new(source),
        }
    }

    /// Upper bound on the number of enumerated values.
    pub fn max_count(&self) -> u64 {
        self.max_count
    }

    /// Start a fresh enumeration in the domain's fixed order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = T>> {
        (self.source)()
    }

    pub(crate) fn map_values<U: 'static>(
        &self,
        f: Arc<dyn Fn(T) -> U + Send + Sync>,
    ) -> Exhaustive<U> {
        let inner = self.clone();
        Exhaustive {
            max_count: self.max_count,
            source: Arc::new(move || {
                let f = f.clone();
                Box::new(inner.iter().map(move |v| f(v)))
            }),
        }
    }

    pub(crate) fn filter_values(&self, predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>) -> Self {
        let inner = self.clone();
        Exhaustive {
            // count intentionally unchanged: it stays an upper bound
            max_count: self.max_count,
            source: Arc::new(move || {
                let predicate = predicate.clone();
                Box::new(inner.iter().filter(move |v| predicate(v)))
            }),
        }
    }
}

impl<T: Clone + 'static> Exhaustive<T> {
    /// Enumerate all lists of the element domain with sizes in
    /// `[min_size, max_size]`, ordered by size and then lexicographically by
    /// element order.
    ///
    /// Returns `None` when the composed count exceeds `ceiling` or
    /// overflows.
    pub fn list(
        element: &Exhaustive<T>,
        min_size: usize,
        max_size: usize,
        ceiling: u64,
    ) -> Option<Exhaustive<Vec<T>>> {
        let count = list_count(element.max_count(), min_size, max_size)?;
        if count > ceiling {
            return None;
        }
        let element = element.clone();
        Some(Exhaustive::new(count, move || {
            let values: Vec<T> = element.iter().collect();
            Box::new(ListEnumerator {
                values,
                max_size,
                size: min_size,
                indices: Vec::new(),
                done: false,
            })
        }))
    }
}

fn list_count(element_count: u64, min_size: usize, max_size: usize) -> Option<u64> {
    let mut total: u64 = 0;
    for size in min_size..=max_size {
        let mut combinations: u64 = 1;
        for _ in 0..size {
            combinations = combinations.checked_mul(element_count)?;
        }
        total = total.checked_add(combinations)?;
    }
    Some(total)
}

struct ListEnumerator<T> {
    values: Vec<T>,
    max_size: usize,
    size: usize,
    indices: Vec<usize>,
    done: bool,
}

impl<T: Clone> Iterator for ListEnumerator<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        if self.done || self.size > self.max_size {
            return None;
        }
        if self.size == 0 {
            self.size = 1;
            self.indices.clear();
            return Some(Vec::new());
        }
        if self.values.is_empty() {
            self.done = true;
            return None;
        }
        if self.indices.len() != self.size {
            self.indices = vec![0; self.size];
        }
        let item: Vec<T> = self
            .indices
            .iter()
            .map(|&i| self.values[i].clone())
            .collect();
        self.advance();
        Some(item)
    }
}

impl<T> ListEnumerator<T> {
    // Odometer step: rightmost index first, carry to the left, grow the
    // size when every index wraps.
    fn advance(&mut self) {
        let mut pos = self.indices.len();
        while pos > 0 {
            pos -= 1;
            self.indices[pos] += 1;
            if self.indices[pos] < self.values.len() {
                return;
            }
            self.indices[pos] = 0;
        }
        self.size += 1;
        self.indices.clear();
    }
}
