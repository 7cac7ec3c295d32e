//! Facet types - derived aggregates over the active catalog
//!
//! Facets are never synced. They are materialized from local company rows
//! after every companies pass and computed live for search results.

use crate::catalog::string_enum;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

string_enum! {
    /// Dimension a facet bucket groups by
    FacetType {
        Region => "region",
        Industry => "industry",
        ScoreRange => "score_range",
        EmployeeCount => "employee_count",
        RiskLevel => "risk_level",
    }
}

string_enum! {
    /// Three-tier mapping of `risk_score` onto sub-ranges
    RiskLevel {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

impl FacetType {
    /// Company column the facet groups on
    pub fn column(&self) -> &'static str {
        match self {
            FacetType::Region => "region",
            FacetType::Industry => "industry",
            FacetType::ScoreRange => "final_score",
            FacetType::EmployeeCount => "employee_count",
            FacetType::RiskLevel => "risk_score",
        }
    }

    /// Fixed buckets for range facets; `None` for categorical ones
    pub fn buckets(&self) -> Option<Vec<BucketDef>> {
        match self {
            FacetType::Region | FacetType::Industry => None,
            FacetType::ScoreRange => Some(SCORE_RANGES.to_vec()),
            FacetType::EmployeeCount => Some(EMPLOYEE_BANDS.to_vec()),
            FacetType::RiskLevel => Some(
                RiskLevel::all()
                    .iter()
                    .map(|level| BucketDef { label: level.as_str(), range: level.bounds() })
                    .collect(),
            ),
        }
    }
}

impl RiskLevel {
    /// Score interval covered by this tier. `High` includes 1.0.
    pub fn bounds(&self) -> NumericRange {
        match self {
            RiskLevel::Low => NumericRange::half_open(0.0, 0.3),
            RiskLevel::Medium => NumericRange::half_open(0.3, 0.7),
            RiskLevel::High => NumericRange::closed(0.7, 1.0),
        }
    }
}

/// A numeric interval used for bucketing; `max = None` means unbounded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub min: f64,
    pub max: Option<f64>,
    pub max_inclusive: bool,
}

impl NumericRange {
    pub const fn half_open(min: f64, max: f64) -> Self {
        Self { min, max: Some(max), max_inclusive: false }
    }

    pub const fn closed(min: f64, max: f64) -> Self {
        Self { min, max: Some(max), max_inclusive: true }
    }

    pub const fn at_least(min: f64) -> Self {
        Self { min, max: None, max_inclusive: false }
    }

    /// Parameterized SQL predicate testing `column` against this range
    pub fn sql_predicate(&self, column: &str) -> (String, Vec<f64>) {
        match self.max {
            Some(max) if self.max_inclusive => {
                (format!("{col} >= ? AND {col} <= ?", col = column), vec![self.min, max])
            }
            Some(max) => (format!("{col} >= ? AND {col} < ?", col = column), vec![self.min, max]),
            None => (format!("{} >= ?", column), vec![self.min]),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        if value < self.min {
            return false;
        }
        match self.max {
            Some(max) if self.max_inclusive => value <= max,
            Some(max) => value < max,
            None => true,
        }
    }
}

/// Label and interval of a fixed bucket
#[derive(Debug, Clone, Copy)]
pub struct BucketDef {
    pub label: &'static str,
    pub range: NumericRange,
}

/// The five fixed `final_score` buckets. The top bucket is closed so 1.0 is counted.
pub const SCORE_RANGES: [BucketDef; 5] = [
    BucketDef { label: "0-20", range: NumericRange::half_open(0.0, 0.2) },
    BucketDef { label: "20-40", range: NumericRange::half_open(0.2, 0.4) },
    BucketDef { label: "40-60", range: NumericRange::half_open(0.4, 0.6) },
    BucketDef { label: "60-80", range: NumericRange::half_open(0.6, 0.8) },
    BucketDef { label: "80-100", range: NumericRange::closed(0.8, 1.0) },
];

/// Head-count bands for the `employee_count` facet. Zero counts land in the first band.
pub const EMPLOYEE_BANDS: [BucketDef; 5] = [
    BucketDef { label: "0-10", range: NumericRange::closed(0.0, 10.0) },
    BucketDef { label: "11-50", range: NumericRange::closed(11.0, 50.0) },
    BucketDef { label: "51-200", range: NumericRange::closed(51.0, 200.0) },
    BucketDef { label: "201-1000", range: NumericRange::closed(201.0, 1000.0) },
    BucketDef { label: "1000+", range: NumericRange::at_least(1001.0) },
];

/// A materialized facet count for one dataset version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub facet_type: FacetType,
    pub bucket_value: String,
    pub count: u64,
    pub dataset_version: String,
    pub updated_at: String,
}

/// A live facet count computed for a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetCount {
    pub bucket_value: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_ranges_cover_unit_interval() {
        for value in [0.0, 0.19, 0.2, 0.5, 0.79, 0.8, 1.0] {
            let hits = SCORE_RANGES.iter().filter(|b| b.range.contains(value)).count();
            assert_eq!(hits, 1, "value {} should land in exactly one bucket", value);
        }
    }

    #[test]
    fn test_risk_level_bounds() {
        assert!(RiskLevel::Low.bounds().contains(0.29));
        assert!(!RiskLevel::Low.bounds().contains(0.3));
        assert!(RiskLevel::Medium.bounds().contains(0.3));
        assert!(RiskLevel::High.bounds().contains(1.0));
    }

    #[test]
    fn test_employee_bands_cover_zero() {
        assert!(EMPLOYEE_BANDS[0].range.contains(0.0));
        assert!(EMPLOYEE_BANDS[0].range.contains(10.0));
        assert!(EMPLOYEE_BANDS[1].range.contains(11.0));
        for n in [0.0, 7.0, 10.0, 11.0, 50.0, 51.0, 200.0, 201.0, 1000.0, 1001.0, 50_000.0] {
            let hits = EMPLOYEE_BANDS.iter().filter(|b| b.range.contains(n)).count();
            assert_eq!(hits, 1, "{} employees", n);
        }
    }

    #[test]
    fn test_sql_predicate_shapes() {
        let (sql, args) = RiskLevel::High.bounds().sql_predicate("risk_score");
        assert_eq!(sql, "risk_score >= ? AND risk_score <= ?");
        assert_eq!(args, vec![0.7, 1.0]);

        let (sql, args) = EMPLOYEE_BANDS[4].range.sql_predicate("employee_count");
        assert_eq!(sql, "employee_count >= ?");
        assert_eq!(args, vec![1001.0]);
    }

    #[test]
    fn test_facet_type_parse() {
        assert_eq!(FacetType::from_str("score_range").unwrap(), FacetType::ScoreRange);
        assert!(FacetType::from_str("color").is_err());
    }
}
