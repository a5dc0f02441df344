use serde::Serialize;

use crate::findings::{round_to, Condition, ToothRecord};
use crate::sample::ImageStats;

/// Per-image quality readout, every field rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub clarity: f64,
    pub sharpness: f64,
    pub brightness_balance: f64,
    pub contrast_level: f64,
    pub mean_intensity: f64,
}

impl QualityMetrics {
    pub fn of(stats: &ImageStats) -> Self {
        let clarity = (stats.std_dev / 128.0 * 100.0).min(100.0);
        let sharpness = (stats.entropy / 8.0 * 100.0).min(100.0);
        let brightness_balance = ((128.0 - stats.mean).abs() * 2.0).min(100.0);

        Self {
            clarity: round_to(clarity, 1),
            sharpness: round_to(sharpness, 1),
            brightness_balance: round_to(brightness_balance, 1),
            contrast_level: round_to(stats.std_dev, 1),
            mean_intensity: round_to(stats.mean, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConditionCounts {
    pub total: usize,
    pub healthy: usize,
    pub treated: usize,
    pub anomalous: usize,
}

impl ConditionCounts {
    pub fn tally(records: &[ToothRecord]) -> Self {
        records.iter().fold(
            Self {
                total: records.len(),
                ..Self::default()
            },
            |mut acc, r| {
                if r.condition == Condition::Healthy {
                    acc.healthy += 1;
                } else if r.condition.is_treated() {
                    acc.treated += 1;
                } else if r.condition.is_anomalous() {
                    acc.anomalous += 1;
                }
                acc
            },
        )
    }

    /// Treated plus anomalous teeth.
    pub fn distinctive(&self) -> usize {
        self.treated + self.anomalous
    }

    fn share(&self, n: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            n as f64 / self.total as f64
        }
    }
}

/// Aggregate scores for one enhance run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForensicMetrics {
    pub image_clarity: f64,
    pub sharpness_quality: f64,
    pub clarity_improvement: f64,
    pub sharpness_improvement: f64,
    pub forensic_utility: f64,
    pub identification_confidence: f64,
    pub distinctive_features: usize,
    pub dental_health_score: f64,
    pub counts: ConditionCounts,
}

impl ForensicMetrics {
    /// `before` is the degraded input, `after` the enhanced output.
    pub fn compute(before: &ImageStats, after: &ImageStats, records: &[ToothRecord]) -> Self {
        let orig = QualityMetrics::of(before);
        let enhanced = QualityMetrics::of(after);
        let counts = ConditionCounts::tally(records);

        let base_utility = enhanced.clarity * 0.4 + enhanced.sharpness * 0.3;
        let dental_utility = counts.share(counts.healthy) * 30.0 + counts.share(counts.treated) * 40.0;
        let forensic_utility = (base_utility + dental_utility).min(100.0);

        let distinctive = counts.distinctive();
        let id_confidence = (50.0 + distinctive as f64 * 8.0 + forensic_utility * 0.4).min(100.0);

        Self {
            image_clarity: enhanced.clarity,
            sharpness_quality: enhanced.sharpness,
            clarity_improvement: round_to(enhanced.clarity - orig.clarity, 1),
            sharpness_improvement: round_to(enhanced.sharpness - orig.sharpness, 1),
            forensic_utility: round_to(forensic_utility, 1),
            identification_confidence: round_to(id_confidence, 1),
            distinctive_features: distinctive,
            dental_health_score: round_to(counts.share(counts.healthy) * 100.0, 1),
            counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dentition::PositionScheme;
    use crate::findings::generate_findings;

    fn stats(mean: f64, std_dev: f64, entropy: f64) -> ImageStats {
        ImageStats {
            rows: 400,
            cols: 600,
            mean,
            std_dev,
            entropy,
        }
    }

    #[test]
    fn flat_grey_metrics() {
        let flat = stats(120.0, 0.0, 0.0);
        let records = generate_findings(&flat, &PositionScheme::UpperRight.positions());
        let m = ForensicMetrics::compute(&flat, &flat, &records);

        assert_eq!(m.sharpness_quality, 0.0);
        assert_eq!(m.image_clarity, 0.0);
        assert_eq!(
            m.counts,
            ConditionCounts {
                total: 8,
                healthy: 5,
                treated: 1,
                anomalous: 2
            }
        );
        // 30 * 5/8 + 40 * 1/8
        assert_eq!(m.forensic_utility, 23.8);
        // 50 + 8 * 3 + 0.4 * 23.75
        assert_eq!(m.identification_confidence, 83.5);
        assert_eq!(m.dental_health_score, 62.5);
        assert_eq!(m.clarity_improvement, 0.0);
    }

    #[test]
    fn black_frame_utility_tie_rounds_to_even() {
        let black = stats(0.0, 0.0, 0.0);
        let records = generate_findings(&black, &PositionScheme::UpperRight.positions());
        let m = ForensicMetrics::compute(&black, &black, &records);

        assert_eq!(
            m.counts,
            ConditionCounts {
                total: 8,
                healthy: 3,
                treated: 3,
                anomalous: 2
            }
        );
        // 30 * 3/8 + 40 * 3/8 = 26.25 exactly
        assert_eq!(m.forensic_utility, 26.2);
        // 50 + 8 * 5 + 0.4 * 26.25, capped
        assert_eq!(m.identification_confidence, 100.0);
        assert_eq!(m.dental_health_score, 37.5);
    }

    #[test]
    fn improvement_can_be_negative() {
        let before = stats(120.0, 64.0, 6.0);
        let after = stats(120.0, 32.0, 4.0);
        let m = ForensicMetrics::compute(&before, &after, &[]);
        assert_eq!(m.clarity_improvement, -25.0);
        assert_eq!(m.sharpness_improvement, -25.0);
    }

    #[test]
    fn scores_are_capped_at_one_hundred() {
        let wild = stats(0.0, 500.0, 12.0);
        let q = QualityMetrics::of(&wild);
        assert_eq!(q.clarity, 100.0);
        assert_eq!(q.sharpness, 100.0);
        assert_eq!(q.brightness_balance, 100.0);

        let records = generate_findings(&wild, &PositionScheme::Full.positions());
        let m = ForensicMetrics::compute(&wild, &wild, &records);
        assert!(m.forensic_utility <= 100.0);
        assert!(m.identification_confidence <= 100.0);
    }

    #[test]
    fn empty_record_list_does_not_divide_by_zero() {
        let s = stats(128.0, 64.0, 7.0);
        let m = ForensicMetrics::compute(&s, &s, &[]);
        assert_eq!(m.dental_health_score, 0.0);
        assert_eq!(m.distinctive_features, 0);
        assert!(m.forensic_utility.is_finite());
    }
}
