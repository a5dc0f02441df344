use serde::Serialize;
use tracing::info;

use crate::dentition::PositionScheme;
use crate::error::DentalResult;
use crate::evidence::EvidenceDigests;
use crate::filters;
use crate::findings::{generate_findings, ConditionTable, ToothRecord};
use crate::quality::{ForensicMetrics, QualityMetrics};
use crate::sample::ImageSample;

/// Everything an enhance run produces. Lives only as long as its session's
/// image does.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub scheme: PositionScheme,
    pub condition_table: ConditionTable,
    pub evidence: EvidenceDigests,
    pub quality_before: QualityMetrics,
    pub quality_after: QualityMetrics,
    pub teeth: Vec<ToothRecord>,
    pub metrics: ForensicMetrics,
}

/// Score an already enhanced sample against the degraded input it came from.
pub fn analyze(degraded: &ImageSample, enhanced: &ImageSample, scheme: PositionScheme) -> AnalysisResult {
    let after = enhanced.stats();
    let teeth = generate_findings(after, &scheme.positions());
    let metrics = ForensicMetrics::compute(degraded.stats(), after, &teeth);

    AnalysisResult {
        scheme,
        condition_table: ConditionTable::for_std_dev(after.std_dev),
        evidence: EvidenceDigests::of(enhanced),
        quality_before: QualityMetrics::of(degraded.stats()),
        quality_after: QualityMetrics::of(after),
        teeth,
        metrics,
    }
}

/// Enhance `degraded`, then analyse the result.
pub fn enhance_and_analyze(
    degraded: &ImageSample,
    scheme: PositionScheme,
) -> DentalResult<(ImageSample, AnalysisResult)> {
    let enhanced = filters::enhance(degraded)?;
    let result = analyze(degraded, &enhanced, scheme);

    info!(
        fingerprint = %result.evidence.fingerprint,
        scheme = %scheme,
        teeth = result.teeth.len(),
        id_confidence = result.metrics.identification_confidence,
        "analysis complete"
    );

    Ok((enhanced, result))
}
