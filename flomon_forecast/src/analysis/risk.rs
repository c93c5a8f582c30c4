/// Flood-risk scoring and classification.
///
/// A station's score is the sum of two components:
///   - magnitude: how large the mean forecast discharge is
///   - trend: how much discharge grows from the first to the last step
///
/// The score is a unitless heuristic, not a calibrated hydrological measure.

use crate::model::RiskCategory;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// (exclusive lower bound on mean discharge, points), evaluated high to low.
const MAGNITUDE_BUCKETS: &[(f64, u32)] = &[(400.0, 4), (250.0, 3), (150.0, 2), (50.0, 1)];

/// (exclusive lower bound on relative change, points), evaluated high to low.
const TREND_BUCKETS: &[(f64, u32)] = &[(0.30, 3), (0.15, 2), (0.05, 1)];

/// (inclusive lower bound on score, category), evaluated high to low.
const CATEGORY_THRESHOLDS: &[(u32, RiskCategory)] = &[
    (6, RiskCategory::Extreme),
    (5, RiskCategory::High),
    (3, RiskCategory::Medium),
    (1, RiskCategory::Low),
];

fn bucket(value: f64, buckets: &[(f64, u32)]) -> u32 {
    buckets
        .iter()
        .find(|(bound, _)| value > *bound)
        .map(|(_, points)| *points)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Points for the mean forecast discharge: >400 → 4, >250 → 3, >150 → 2,
/// >50 → 1, else 0.
pub fn magnitude_points(avg_discharge: f64) -> u32 {
    bucket(avg_discharge, MAGNITUDE_BUCKETS)
}

/// Relative change from first to last step, `(last - first) / |first|`.
///
/// `None` with fewer than two steps or a zero first step.
pub fn relative_trend(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let first = values[0];
    let last = values[values.len() - 1];
    if first == 0.0 {
        return None;
    }
    Some((last - first) / first.abs())
}

/// Points for the forecast trend: >0.30 → 3, >0.15 → 2, >0.05 → 1, else 0.
pub fn trend_points(values: &[f64]) -> u32 {
    relative_trend(values)
        .map(|trend| bucket(trend, TREND_BUCKETS))
        .unwrap_or(0)
}

/// Total flood-risk score for a station's per-step discharge values.
pub fn flood_risk_score(avg_discharge: f64, values: &[f64]) -> u32 {
    magnitude_points(avg_discharge) + trend_points(values)
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Maps a score to its category: ≥6 Extreme, ≥5 High, ≥3 Medium, ≥1 Low,
/// else Very Low. Never returns `RiskCategory::Unknown`.
pub fn categorize_risk(score: u32) -> RiskCategory {
    CATEGORY_THRESHOLDS
        .iter()
        .find(|(min, _)| score >= *min)
        .map(|(_, category)| *category)
        .unwrap_or(RiskCategory::VeryLow)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- Magnitude -----------------------------------------------------------

    #[test]
    fn test_magnitude_bucket_boundaries_are_exclusive() {
        assert_eq!(magnitude_points(400.0), 3, "exactly 400 is not >400");
        assert_eq!(magnitude_points(400.1), 4);
        assert_eq!(magnitude_points(250.0), 2);
        assert_eq!(magnitude_points(150.0), 1);
        assert_eq!(magnitude_points(50.0), 0);
        assert_eq!(magnitude_points(50.5), 1);
        assert_eq!(magnitude_points(0.0), 0);
    }

    // --- Trend ---------------------------------------------------------------

    #[test]
    fn test_trend_requires_two_steps() {
        assert_eq!(relative_trend(&[120.0]), None);
        assert_eq!(trend_points(&[120.0]), 0);
        assert_eq!(trend_points(&[]), 0);
    }

    #[test]
    fn test_trend_skipped_for_zero_first_step() {
        assert_eq!(relative_trend(&[0.0, 80.0, 300.0]), None);
        assert_eq!(trend_points(&[0.0, 80.0, 300.0]), 0);
    }

    #[test]
    fn test_trend_uses_first_and_last_only() {
        // middle step spikes, but last == first
        assert_eq!(relative_trend(&[100.0, 900.0, 100.0]), Some(0.0));
    }

    #[test]
    fn test_trend_buckets() {
        assert_eq!(trend_points(&[100.0, 131.0]), 3);
        assert_eq!(trend_points(&[100.0, 120.0]), 2);
        assert_eq!(trend_points(&[100.0, 110.0]), 1);
        assert_eq!(trend_points(&[100.0, 104.0]), 0);
        assert_eq!(trend_points(&[100.0, 60.0]), 0, "falling discharge scores nothing");
    }

    #[test]
    fn test_trend_uses_absolute_first_value() {
        // negative first value: (-50 - -100) / 100 = 0.5
        assert_eq!(relative_trend(&[-100.0, -50.0]), Some(0.5));
    }

    // --- Score scenarios -----------------------------------------------------

    #[test]
    fn test_high_rising_discharge_scores_extreme() {
        // avg 500 → +4; [100, 100, 400] → trend 3.0 → +3
        let score = flood_risk_score(500.0, &[100.0, 100.0, 400.0]);
        assert_eq!(score, 7);
        assert_eq!(categorize_risk(score), RiskCategory::Extreme);
    }

    #[test]
    fn test_moderate_flat_discharge_scores_low() {
        // avg 60 → +1; flat trend → +0
        let score = flood_risk_score(60.0, &[60.0, 61.0, 62.0]);
        assert_eq!(score, 1);
        assert_eq!(categorize_risk(score), RiskCategory::Low);
    }

    // --- Classification ------------------------------------------------------

    #[test]
    fn test_category_table() {
        assert_eq!(categorize_risk(0), RiskCategory::VeryLow);
        assert_eq!(categorize_risk(1), RiskCategory::Low);
        assert_eq!(categorize_risk(2), RiskCategory::Low);
        assert_eq!(categorize_risk(3), RiskCategory::Medium);
        assert_eq!(categorize_risk(4), RiskCategory::Medium);
        assert_eq!(categorize_risk(5), RiskCategory::High);
        assert_eq!(categorize_risk(6), RiskCategory::Extreme);
        assert_eq!(categorize_risk(7), RiskCategory::Extreme);
        assert_eq!(categorize_risk(u32::MAX), RiskCategory::Extreme);
    }

    #[test]
    fn test_category_is_monotonic_in_score() {
        let mut previous = categorize_risk(0);
        for score in 1..=20 {
            let current = categorize_risk(score);
            assert!(
                current >= previous,
                "score {} mapped to {} below score {}'s {}",
                score,
                current,
                score - 1,
                previous
            );
            assert_ne!(current, RiskCategory::Unknown, "Unknown is never a scored category");
            previous = current;
        }
    }
}
