//! The well-founded metric that orders shrink candidates.

use std::cmp::Ordering;
use std::fmt;

/// Distance of a generated value from the "simplest" value of its domain.
///
/// A distance is an ordered sequence of non-negative dimensions, one per
/// aspect of a value: a collection contributes its size first and the
/// combined distance of its elements after. Comparison is element-wise with
/// the shorter operand padded by zeros, so `[2]` and `[2, 0]` are equal and
/// `[2, 1]` is larger than both.
///
/// Every shrink candidate has a strictly smaller distance than the value it
/// was derived from. Together with the all-zero lower bound this makes any
/// chain of shrink steps finite.
#[derive(Debug, Clone, Default)]
pub struct ShrinkingDistance {
    dimensions: Vec<u64>,
}

impl ShrinkingDistance {
    /// The minimal distance: no dimensions, equal to all-zeros of any width.
    pub fn min() -> Self {
        Self {
            dimensions: Vec::new(),
        }
    }

    /// Construct a distance from explicit dimensions.
    pub fn of(dimensions: &[u64]) -> Self {
        Self {
            dimensions: dimensions.to_vec(),
        }
    }

    /// Distance of a collection: its size, followed by the pairwise sum of
    /// the element distances.
    pub fn for_collection<'a>(
        size: usize,
        element_distances: impl IntoIterator<Item = &'a ShrinkingDistance>,
    ) -> Self {
        let summed = element_distances
            .into_iter()
            .fold(Self::min(), |acc, d| acc.plus(d));
        Self::of(&[size as u64]).append(&summed)
    }

    /// Number of dimensions.
    pub fn size(&self) -> usize {
        self.dimensions.len()
    }

    /// The raw dimensions.
    pub fn dimensions(&self) -> &[u64] {
        &self.dimensions
    }

    /// Concatenate the dimensions of `other` after the dimensions of `self`.
    ///
    /// Used when a value is a composition of an outer and an inner part
    /// (e.g. flat-mapped values) and the outer part dominates the order.
    pub fn append(&self, other: &ShrinkingDistance) -> Self {
        let mut dimensions = self.dimensions.clone();
        dimensions.extend_from_slice(&other.dimensions);
        Self { dimensions }
    }

    /// Pairwise sum, padding the shorter operand with zeros.
    ///
    /// This is how distances combine across tuple components and parameter
    /// lists. Addition is saturating; distances never wrap.
    pub fn plus(&self, other: &ShrinkingDistance) -> Self {
        let len = self.dimensions.len().max(other.dimensions.len());
        let dimensions = (0..len)
            .map(|i| {
                let a = self.dimensions.get(i).copied().unwrap_or(0);
                let b = other.dimensions.get(i).copied().unwrap_or(0);
                a.saturating_add(b)
            })
            .collect();
        Self { dimensions }
    }
}

impl PartialEq for ShrinkingDistance {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ShrinkingDistance {}

impl PartialOrd for ShrinkingDistance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ShrinkingDistance {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.dimensions.len().max(other.dimensions.len());
        for i in 0..len {
            let a = self.dimensions.get(i).copied().unwrap_or(0);
            let b = other.dimensions.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for ShrinkingDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .dimensions
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(":");
        write!(f, "{}", joined)
    }
}
