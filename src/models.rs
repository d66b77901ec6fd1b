//! Data models for the index analysis.
//!
//! This module contains the core data structures shared by the aggregator,
//! the imagery service client and the report/export layer.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A location to sample, as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Longitude in degrees (WGS84).
    pub lon: f64,
    /// Latitude in degrees (WGS84).
    pub lat: f64,
    /// Display name used in the result table.
    pub name: String,
}

impl Point {
    pub fn new(lon: f64, lat: f64, name: impl Into<String>) -> Self {
        Self {
            lon,
            lat,
            name: name.into(),
        }
    }

    /// Check that the coordinates are within WGS84 bounds.
    pub fn validate(&self) -> Result<(), String> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!(
                "Latitude {} of '{}' is outside [-90, 90]",
                self.lat, self.name
            ));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(format!(
                "Longitude {} of '{}' is outside [-180, 180]",
                self.lon, self.name
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.6}, {:.6})", self.name, self.lat, self.lon)
    }
}

/// A half-open date interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateBucket {
    /// First day included in the bucket.
    pub start: NaiveDate,
    /// First day NOT included in the bucket.
    pub end: NaiveDate,
}

impl DateBucket {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of days covered by the bucket.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Whether the bucket reaches past `last_day` (inclusive end of the range).
    pub fn overruns(&self, last_day: NaiveDate) -> bool {
        last_day
            .checked_add_days(Days::new(1))
            .is_some_and(|limit| self.end > limit)
    }
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// One aggregated result: mean index values of a point over a bucket.
///
/// Rows never carry undefined means; pairs without valid samples are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Start date of the bucket.
    pub date: NaiveDate,
    /// Name of the sampled point.
    pub location: String,
    /// Mean vegetation index over the bucket.
    pub ndvi: f64,
    /// Mean water index over the bucket.
    pub ndwi: f64,
}

/// Ordered result rows: bucket ascending, then point input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: ResultRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultRow> {
        self.rows.iter()
    }
}

impl From<Vec<ResultRow>> for ResultTable {
    fn from(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }
}

/// Everything the aggregator needs for one run.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub points: Vec<Point>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Bucket width in days (>= 1).
    pub interval_days: u32,
    /// Images must have a cloud percentage strictly below this value.
    pub cloud_threshold: f64,
}

/// Counters describing how a run went.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of buckets generated from the date range.
    pub buckets: usize,
    /// Buckets skipped because no image passed the cloud filter.
    pub empty_buckets: usize,
    /// (bucket, point) pairs dropped for lack of valid samples.
    pub omitted_pairs: usize,
    /// Rows written to the result table.
    pub rows: usize,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// Result of a completed analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    pub table: ResultTable,
    pub summary: RunSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_point_validation() {
        assert!(Point::new(0.0, 0.0, "Origin").validate().is_ok());
        assert!(Point::new(12.5, 95.0, "North").validate().is_err());
        assert!(Point::new(-181.0, 10.0, "West").validate().is_err());
    }

    #[test]
    fn test_point_display() {
        let point = Point::new(12.4964, 41.9028, "Rome");
        assert_eq!(point.to_string(), "Rome (41.902800, 12.496400)");
    }

    #[test]
    fn test_bucket_display_and_days() {
        let bucket = DateBucket::new(date("2024-01-01"), date("2024-01-16"));
        assert_eq!(bucket.days(), 15);
        assert_eq!(bucket.to_string(), "[2024-01-01, 2024-01-16)");
    }

    #[test]
    fn test_bucket_overruns() {
        let bucket = DateBucket::new(date("2024-01-31"), date("2024-02-15"));
        assert!(bucket.overruns(date("2024-01-31")));

        let exact = DateBucket::new(date("2024-01-16"), date("2024-02-01"));
        assert!(!exact.overruns(date("2024-01-31")));

        let last = DateBucket::new(NaiveDate::MAX, NaiveDate::MAX);
        assert!(!last.overruns(NaiveDate::MAX));
    }

    #[test]
    fn test_result_table_preserves_order() {
        let mut table = ResultTable::new();
        table.push(ResultRow {
            date: date("2024-01-01"),
            location: "B".to_string(),
            ndvi: 0.1,
            ndwi: 0.2,
        });
        table.push(ResultRow {
            date: date("2024-01-01"),
            location: "A".to_string(),
            ndvi: 0.3,
            ndwi: 0.4,
        });

        let names: Vec<_> = table.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(table.len(), 2);
    }
}
