// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Divide & Draw backend.

use serde::{Deserialize, Serialize};

/// Sample value of an ink (stroke) pixel in a binary edge raster.
pub const INK: u8 = 0;

/// Sample value of a background pixel in a binary edge raster.
pub const BACKGROUND: u8 = 255;

/// Pixel-overlap comparison of a user sketch against a reference sketch.
///
/// Percentages are clamped to `[0, 100]` and rounded to two decimal places;
/// the raw counts are kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    /// Share of reference ink pixels that the user also inked.
    pub coverage_percent: f64,
    /// Shared ink over the combined ink footprint of both sketches.
    pub iou_percent: f64,
    /// Pixels inked in both rasters.
    pub intersection: u64,
    /// Pixels inked in either raster.
    pub union: u64,
    /// Pixels inked in the reference raster.
    pub reference_ink: u64,
}

impl AccuracyMetrics {
    /// Derive both percentages from raw ink counts. Empty denominators yield 0.
    pub fn from_counts(intersection: u64, union: u64, reference_ink: u64) -> Self {
        Self {
            coverage_percent: percent(intersection, reference_ink),
            iou_percent: percent(intersection, union),
            intersection,
            union,
            reference_ink,
        }
    }
}

fn percent(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let raw = numerator as f64 / denominator as f64 * 100.0;
    round_2dp(raw.clamp(0.0, 100.0))
}

/// Round to two decimal places for reporting.
///
/// The exact binary value is rounded, ties to even, so `3.125` becomes `3.12`.
pub fn round_2dp(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Lifecycle status of the HTTP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_counts_give_full_scores() {
        let m = AccuracyMetrics::from_counts(420, 420, 420);
        assert_eq!(m.coverage_percent, 100.0);
        assert_eq!(m.iou_percent, 100.0);
    }

    #[test]
    fn empty_denominators_give_zero() {
        let m = AccuracyMetrics::from_counts(0, 0, 0);
        assert_eq!(m.coverage_percent, 0.0);
        assert_eq!(m.iou_percent, 0.0);
    }

    #[test]
    fn reference_without_ink_has_zero_coverage() {
        let m = AccuracyMetrics::from_counts(0, 37, 0);
        assert_eq!(m.coverage_percent, 0.0);
        assert_eq!(m.iou_percent, 0.0);
    }

    #[test]
    fn percentages_round_to_two_places() {
        // 1/3 -> 33.333..., 1/6 -> 16.666...
        let m = AccuracyMetrics::from_counts(1, 6, 3);
        assert_eq!(m.coverage_percent, 33.33);
        assert_eq!(m.iou_percent, 16.67);
    }

    #[test]
    fn exact_ties_round_to_even() {
        let m = AccuracyMetrics::from_counts(1, 32, 32);
        assert_eq!(m.coverage_percent, 3.12);
        assert_eq!(m.iou_percent, 3.12);
        assert_eq!(AccuracyMetrics::from_counts(5, 32, 32).coverage_percent, 15.62);
        assert_eq!(round_2dp(0.375), 0.38);
    }

    #[test]
    fn metrics_serialize_with_snake_case_fields() {
        let m = AccuracyMetrics::from_counts(1, 2, 2);
        let json = serde_json::to_value(m).unwrap();
        assert_eq!(json["coverage_percent"], 50.0);
        assert_eq!(json["iou_percent"], 50.0);
    }
}
