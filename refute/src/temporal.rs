//! Date arbitraries over calendar day ranges.

use chrono::{Duration, NaiveDate};

use crate::arbitrary::Arbitrary;
use crate::exhaustive::Exhaustive;
use crate::generator::{FnGenerator, RandomGenerator, shrinkable_integer};
use crate::shrinkable::Shrinkable;

/// An arbitrary over an inclusive range of calendar dates.
///
/// Values shrink toward the start of the range; the shrinking distance of a
/// date is its day offset from the range minimum.
#[derive(Debug, Clone)]
pub struct DateArbitrary {
    min: NaiveDate,
    max: NaiveDate,
}

/// Create an arbitrary for dates in `[min, max]`.
///
/// Panics when `min > max`; an inverted range is a configuration error.
pub fn dates_between(min: NaiveDate, max: NaiveDate) -> DateArbitrary {
    if min > max {
        panic!("Invalid date range: min {} is after max {}", min, max);
    }
    DateArbitrary { min, max }
}

impl DateArbitrary {
    fn span_days(&self) -> i64 {
        self.max.signed_duration_since(self.min).num_days()
    }

    fn date_shrinkable(&self, offset: i64) -> Shrinkable<NaiveDate> {
        let min = self.min;
        shrinkable_integer(offset, 0, self.span_days()).map(move |days| min + Duration::days(days))
    }
}

impl Arbitrary for DateArbitrary {
    type Value = NaiveDate;

    fn generator(&self, _tries: usize) -> Box<dyn RandomGenerator<NaiveDate>> {
        let arbitrary = self.clone();
        let span = self.span_days();
        Box::new(FnGenerator::new(move |rng| {
            use rand::Rng;
            let offset = rng.gen_range(0..=span);
            arbitrary.date_shrinkable(offset)
        }))
    }

    fn exhaustive(&self, max_count: u64) -> Option<Exhaustive<NaiveDate>> {
        let count = self.span_days() as u64 + 1;
        if count > max_count {
            return None;
        }
        let min = self.min;
        Some(Exhaustive::new(count, move || {
            Box::new((0..count).map(move |offset| min + Duration::days(offset as i64)))
        }))
    }

    fn edge_cases(&self) -> Vec<Shrinkable<NaiveDate>> {
        let mut edges = vec![self.date_shrinkable(0)];
        if self.max > self.min {
            edges.push(self.date_shrinkable(self.span_days()));
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_seeded_rng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_generated_dates_stay_in_range() {
        let arbitrary = dates_between(date(2023, 1, 1), date(2023, 12, 31));
        let generator = arbitrary.generator(100);
        let mut rng = create_seeded_rng(13);
        for _ in 0..100 {
            let value = *generator.next(&mut rng).value();
            assert!(value >= date(2023, 1, 1));
            assert!(value <= date(2023, 12, 31));
        }
    }

    #[test]
    fn test_dates_shrink_toward_range_start() {
        let arbitrary = dates_between(date(2023, 1, 1), date(2023, 12, 31));
        let shrinkable = arbitrary.date_shrinkable(10);
        let first = shrinkable.candidates().next().unwrap();
        assert_eq!(*first.value(), date(2023, 1, 1));
        for candidate in shrinkable.candidates() {
            assert!(candidate.distance() < shrinkable.distance());
        }
    }

    #[test]
    fn test_exhaustive_four_day_range() {
        let arbitrary = dates_between(date(2024, 2, 27), date(2024, 3, 1));
        let exhaustive = arbitrary.exhaustive(1000).unwrap();
        assert_eq!(exhaustive.max_count(), 4);
        let dates: Vec<NaiveDate> = exhaustive.iter().collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 2, 27),
                date(2024, 2, 28),
                date(2024, 2, 29),
                date(2024, 3, 1),
            ]
        );
    }

    #[test]
    fn test_exhaustive_respects_ceiling() {
        let arbitrary = dates_between(date(2000, 1, 1), date(2100, 1, 1));
        assert!(arbitrary.exhaustive(1000).is_none());
    }

    #[test]
    fn test_edge_cases_are_range_boundaries() {
        let arbitrary = dates_between(date(2023, 5, 1), date(2023, 5, 31));
        let edges: Vec<NaiveDate> = arbitrary.edge_cases().iter().map(|e| *e.value()).collect();
        assert_eq!(edges, vec![date(2023, 5, 1), date(2023, 5, 31)]);

        let single = dates_between(date(2023, 5, 1), date(2023, 5, 1));
        assert_eq!(single.edge_cases().len(), 1);
    }

    #[test]
    #[should_panic(expected = "Invalid date range")]
    fn test_inverted_range_is_rejected_eagerly() {
        dates_between(date(2023, 2, 1), date(2023, 1, 1));
    }
}
