//! Fingerprint → findings generator.
//!
//! Each tooth is drawn from its own freshly seeded stream
//! (`base_seed + position code`), so a tooth's outcome does not depend on
//! which other positions are analysed or in what order.

use serde::Serialize;
use tracing::debug;

use crate::dentition::ToothPosition;
use crate::fingerprint::Fingerprint;
use crate::legacy_rng::LegacyRng;
use crate::sample::ImageStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Condition {
    Healthy,
    Filled,
    Crowned,
    #[serde(rename = "Root Canal")]
    RootCanal,
    Impacted,
    Missing,
    Carious,
}

impl Condition {
    /// Draw order of the probability tables.
    pub const ALL: [Condition; 7] = [
        Condition::Healthy,
        Condition::Filled,
        Condition::Crowned,
        Condition::RootCanal,
        Condition::Impacted,
        Condition::Missing,
        Condition::Carious,
    ];

    /// Restorative work: filled, crowned, root canal.
    pub fn is_treated(self) -> bool {
        matches!(
            self,
            Condition::Filled | Condition::Crowned | Condition::RootCanal
        )
    }

    /// Impacted, missing, carious.
    pub fn is_anomalous(self) -> bool {
        matches!(
            self,
            Condition::Impacted | Condition::Missing | Condition::Carious
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Condition::Healthy => "Healthy",
            Condition::Filled => "Filled",
            Condition::Crowned => "Crowned",
            Condition::RootCanal => "Root Canal",
            Condition::Impacted => "Impacted",
            Condition::Missing => "Missing",
            Condition::Carious => "Carious",
        }
    }
}

/// Images whose deviation is below this draw from [`ConditionTable::LowContrast`].
pub const LOW_CONTRAST_STD: f64 = 30.0;
/// Confidence is damped below this deviation...
pub const DAMPEN_BELOW_STD: f64 = 25.0;
/// ...and boosted above this one.
pub const BOOST_ABOVE_STD: f64 = 80.0;

pub const CONFIDENCE_LOW: f64 = 0.75;
pub const CONFIDENCE_HIGH: f64 = 0.98;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionTable {
    Default,
    LowContrast,
}

impl ConditionTable {
    pub fn for_std_dev(std_dev: f64) -> Self {
        if std_dev < LOW_CONTRAST_STD {
            ConditionTable::LowContrast
        } else {
            ConditionTable::Default
        }
    }

    /// Probabilities in [`Condition::ALL`] order.
    pub fn weights(self) -> [f64; 7] {
        match self {
            ConditionTable::Default => [0.60, 0.15, 0.08, 0.06, 0.05, 0.04, 0.02],
            ConditionTable::LowContrast => [0.40, 0.20, 0.10, 0.10, 0.10, 0.08, 0.02],
        }
    }
}

/// Confidence multiplier for a given image deviation.
pub fn confidence_factor(std_dev: f64) -> f64 {
    if std_dev < DAMPEN_BELOW_STD {
        0.8
    } else if std_dev > BOOST_ABOVE_STD {
        1.1
    } else {
        1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToothRecord {
    #[serde(flatten)]
    pub position: ToothPosition,
    pub condition: Condition,
    /// Rounded to 3 decimals. Not clamped: the high-contrast boost can lift it
    /// past 1.0.
    pub confidence: f64,
}

/// Raw draw for one seed, before the confidence adjustment.
pub fn draw_tooth(seed: u32, table: ConditionTable) -> (Condition, f64) {
    let mut rng = LegacyRng::seeded(seed);
    let idx = rng.choice_weighted(&table.weights());
    let confidence = rng.uniform(CONFIDENCE_LOW, CONFIDENCE_HIGH);
    (Condition::ALL[idx], confidence)
}

/// Generate one record per position for an (enhanced) image.
pub fn generate_findings(stats: &ImageStats, positions: &[ToothPosition]) -> Vec<ToothRecord> {
    let fingerprint = Fingerprint::of(stats);
    let base_seed = fingerprint.base_seed();
    let table = ConditionTable::for_std_dev(stats.std_dev);
    let factor = confidence_factor(stats.std_dev);

    debug!(
        %fingerprint,
        base_seed,
        ?table,
        factor,
        teeth = positions.len(),
        "generating findings"
    );

    positions
        .iter()
        .map(|position| {
            let seed = base_seed + position.seed_offset();
            let (condition, raw) = draw_tooth(seed, table);
            ToothRecord {
                position: *position,
                condition,
                confidence: round_to(raw * factor, 3),
            }
        })
        .collect()
}

/// Round to `decimals` places the way decimal formatting does: the exact
/// binary value is rounded, and exact ties go to the even digit.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{value:.decimals$}").parse().unwrap_or(value)
}
