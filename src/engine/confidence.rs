//! Confidence scoring for computed value ranges.
//!
//! A weighted point system rather than a single threshold, so a band with a
//! slightly small sample can still earn Medium on tightness and source
//! diversity. The numeric score is internal; only the coarse label leaves this
//! module.

use crate::domain::Confidence;
use rust_decimal::Decimal;

/// Quality signals for one locality band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceInputs {
    /// Listings behind the band.
    pub sample_size: u32,
    /// `(max - min) / min` of the band.
    pub range_width_ratio: Decimal,
    /// Distinct data sources contributing.
    pub source_count: u32,
    /// Age of the underlying data in days.
    pub data_age_days: i64,
}

/// Score a band into a coarse label.
pub fn score(inputs: &ConfidenceInputs) -> Confidence {
    let total = sample_points(inputs.sample_size)
        + width_points(inputs.range_width_ratio)
        + source_points(inputs.source_count)
        + age_points(inputs.data_age_days);

    if total >= 6 {
        Confidence::High
    } else if total >= 3 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

fn sample_points(sample_size: u32) -> u32 {
    if sample_size >= 20 {
        3
    } else if sample_size >= 10 {
        2
    } else if sample_size >= 5 {
        1
    } else {
        0
    }
}

fn width_points(ratio: Decimal) -> u32 {
    if ratio < Decimal::new(15, 2) {
        2
    } else if ratio < Decimal::new(25, 2) {
        1
    } else {
        0
    }
}

fn source_points(source_count: u32) -> u32 {
    if source_count >= 3 {
        2
    } else if source_count == 2 {
        1
    } else {
        0
    }
}

fn age_points(data_age_days: i64) -> u32 {
    if data_age_days < 3 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn inputs(sample: u32, ratio: &str, sources: u32, age: i64) -> ConfidenceInputs {
        ConfidenceInputs {
            sample_size: sample,
            range_width_ratio: Decimal::from_str(ratio).unwrap(),
            source_count: sources,
            data_age_days: age,
        }
    }

    #[test]
    fn test_best_case_is_high() {
        // 3 + 2 + 2 + 1 = 8
        assert_eq!(score(&inputs(25, "0.10", 3, 0)), Confidence::High);
    }

    #[test]
    fn test_worst_case_is_low() {
        // 0 + 0 + 0 + 0
        assert_eq!(score(&inputs(2, "0.40", 1, 30)), Confidence::Low);
    }

    #[test]
    fn test_exact_high_boundary() {
        // 3 (sample >= 20) + 2 (ratio < 0.15) + 1 (2 sources) = 6
        assert_eq!(score(&inputs(20, "0.14", 2, 10)), Confidence::High);
    }

    #[test]
    fn test_exact_medium_boundary() {
        // 2 (sample >= 10) + 1 (ratio < 0.25) = 3
        assert_eq!(score(&inputs(10, "0.20", 1, 10)), Confidence::Medium);
    }

    #[test]
    fn test_just_under_medium_is_low() {
        // 1 (sample >= 5) + 1 (2 sources) = 2
        assert_eq!(score(&inputs(5, "0.30", 2, 10)), Confidence::Low);
    }

    #[test]
    fn test_fresh_data_point_tips_the_label() {
        // 2 + 0 + 0 + age: stale -> 2 (Low), fresh -> 3 (Medium)
        assert_eq!(score(&inputs(10, "0.30", 1, 5)), Confidence::Low);
        assert_eq!(score(&inputs(10, "0.30", 1, 1)), Confidence::Medium);
    }

    #[test]
    fn test_width_ratio_boundaries() {
        assert_eq!(width_points(Decimal::from_str("0.1499").unwrap()), 2);
        assert_eq!(width_points(Decimal::from_str("0.15").unwrap()), 1);
        assert_eq!(width_points(Decimal::from_str("0.25").unwrap()), 0);
    }
}
