//! Date bucket generation.

use crate::models::DateBucket;
use chrono::{Days, NaiveDate};

/// Split `[start, end]` into consecutive buckets of `interval_days`.
///
/// Buckets start at `start` and step forward while the bucket start is not
/// after `end`. The last bucket keeps its full width and may reach past
/// `end` unless `clamp` is set, in which case its upper bound is capped at the
/// day after `end`.
///
/// Bounds that would fall past the last representable date are capped at
/// `NaiveDate::MAX`, and the bucket holding it is the last one.
pub fn generate_buckets(
    start: NaiveDate,
    end: NaiveDate,
    interval_days: u32,
    clamp: bool,
) -> Vec<DateBucket> {
    let step = Days::new(u64::from(interval_days.max(1)));
    let limit = end.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);

    let mut buckets = Vec::new();
    let mut current = start;
    while current <= end {
        let next = current.checked_add_days(step);
        let upper = next.unwrap_or(NaiveDate::MAX);
        let upper = if clamp { upper.min(limit) } else { upper };
        buckets.push(DateBucket::new(current, upper));

        match next {
            Some(next) => current = next,
            None => break,
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_january_fifteen_day_buckets() {
        let buckets = generate_buckets(day("2024-01-01"), day("2024-01-31"), 15, false);

        assert_eq!(
            buckets,
            vec![
                DateBucket::new(day("2024-01-01"), day("2024-01-16")),
                DateBucket::new(day("2024-01-16"), day("2024-01-31")),
                DateBucket::new(day("2024-01-31"), day("2024-02-15")),
            ]
        );
    }

    #[test]
    fn test_clamped_final_bucket() {
        let buckets = generate_buckets(day("2024-01-01"), day("2024-01-31"), 15, true);

        assert_eq!(buckets.len(), 3);
        assert_eq!(
            buckets[2],
            DateBucket::new(day("2024-01-31"), day("2024-02-01"))
        );
        // earlier buckets are untouched
        assert_eq!(buckets[1].end, day("2024-01-31"));
    }

    #[test]
    fn test_bucket_count_matches_stepping() {
        let start = day("2023-03-10");
        for interval in [1u32, 2, 7, 15, 30, 400] {
            for span in [0i64, 1, 14, 15, 16, 29, 30, 31, 365] {
                let end = start + Duration::days(span);
                let buckets = generate_buckets(start, end, interval, false);
                let expected = span / i64::from(interval) + 1;
                assert_eq!(buckets.len() as i64, expected, "interval {interval}, span {span}");
                assert!(buckets.iter().all(|b| b.days() == i64::from(interval)));
            }
        }
    }

    #[test]
    fn test_single_day_range() {
        let buckets = generate_buckets(day("2024-06-01"), day("2024-06-01"), 15, false);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].end, day("2024-06-16"));
    }

    #[test]
    fn test_end_before_start_is_empty() {
        assert!(generate_buckets(day("2024-02-01"), day("2024-01-01"), 15, false).is_empty());
    }

    #[test]
    fn test_buckets_are_contiguous() {
        let buckets = generate_buckets(day("2024-01-01"), day("2024-12-31"), 10, false);
        for pair in buckets.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_huge_interval_caps_at_max_date() {
        let buckets = generate_buckets(day("2024-01-01"), day("2024-01-31"), 200_000_000, false);
        assert_eq!(
            buckets,
            vec![DateBucket::new(day("2024-01-01"), NaiveDate::MAX)]
        );

        let clamped = generate_buckets(day("2024-01-01"), day("2024-01-31"), 200_000_000, true);
        assert_eq!(clamped[0].end, day("2024-02-01"));
    }

    #[test]
    fn test_range_ending_at_max_date() {
        let buckets = generate_buckets(NaiveDate::MAX, NaiveDate::MAX, 1, false);
        assert_eq!(buckets, vec![DateBucket::new(NaiveDate::MAX, NaiveDate::MAX)]);

        let clamped = generate_buckets(NaiveDate::MAX, NaiveDate::MAX, 1, true);
        assert_eq!(clamped.len(), 1);

        let start = NaiveDate::MAX - Duration::days(3);
        let buckets = generate_buckets(start, NaiveDate::MAX, 2, false);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[1].end, NaiveDate::MAX);
    }
}
