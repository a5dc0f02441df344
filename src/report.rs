use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::AnalysisResult;
use crate::filters::{Degradation, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Conclusion {
    Excellent,
    Good,
    Moderate,
}

impl Conclusion {
    pub fn from_confidence(identification_confidence: f64) -> Self {
        if identification_confidence >= 90.0 {
            Conclusion::Excellent
        } else if identification_confidence >= 75.0 {
            Conclusion::Good
        } else {
            Conclusion::Moderate
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            Conclusion::Excellent => "**EXCELLENT** - Highly suitable for positive identification",
            Conclusion::Good => "**GOOD** - Suitable for identification purposes",
            Conclusion::Moderate => "**MODERATE** - Limited identification value",
        }
    }
}

/// Case header for a report.
#[derive(Debug, Clone, Serialize)]
pub struct CaseInfo {
    pub case_id: String,
    pub analysis_date: DateTime<Utc>,
    pub degradation: Option<Degradation>,
    pub severity: Severity,
}

impl CaseInfo {
    pub fn new(at: DateTime<Utc>, degradation: Option<Degradation>, severity: Severity) -> Self {
        Self {
            case_id: format!("DENT-{}", at.format("%Y%m%d-%H%M")),
            analysis_date: at,
            degradation,
            severity,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ForensicReport {
    pub case: CaseInfo,
    pub conclusion: Conclusion,
    pub markdown: String,
}

impl ForensicReport {
    pub fn build(case: CaseInfo, result: &AnalysisResult) -> Self {
        let conclusion = Conclusion::from_confidence(result.metrics.identification_confidence);
        let markdown = render_markdown(&case, conclusion, result);
        Self {
            case,
            conclusion,
            markdown,
        }
    }
}

fn signed(v: f64) -> String {
    // fold -0.0 so it is not printed as "+-0"
    let v = if v == 0.0 { 0.0 } else { v };
    if v >= 0.0 {
        format!("+{v}")
    } else {
        format!("{v}")
    }
}

fn render_markdown(case: &CaseInfo, conclusion: Conclusion, result: &AnalysisResult) -> String {
    let m = &result.metrics;
    let evidence = case
        .degradation
        .map(|d| format!("{d} (severity {}/10)", case.severity.level()))
        .unwrap_or_else(|| "Undamaged".to_string());

    let mut lines = vec![
        "# FORENSIC DENTAL ANALYSIS REPORT".to_string(),
        String::new(),
        "## Case Information".to_string(),
        format!("- **Case ID**: {}", case.case_id),
        format!(
            "- **Analysis Date**: {}",
            case.analysis_date.format("%Y-%m-%d %H:%M:%S")
        ),
        format!("- **Evidence Condition**: {evidence}"),
        String::new(),
        "## Technical Analysis".to_string(),
        format!("- **Final Clarity Score**: {}%", m.image_clarity),
        format!("- **Sharpness Quality**: {}%", m.sharpness_quality),
        format!("- **Clarity Improvement**: {}%", signed(m.clarity_improvement)),
        format!("- **Sharpness Improvement**: {}%", signed(m.sharpness_improvement)),
        String::new(),
        "## Forensic Evaluation".to_string(),
        format!("- **Overall Forensic Utility**: {}%", m.forensic_utility),
        format!("- **Identification Confidence**: {}%", m.identification_confidence),
        format!("- **Distinctive Dental Features**: {}", m.distinctive_features),
        String::new(),
        "## Dental Findings".to_string(),
        format!("- **Total Teeth Analyzed**: {}", m.counts.total),
        format!("- **Healthy Teeth**: {}", m.counts.healthy),
        format!("- **Restored Teeth**: {}", m.counts.treated),
        format!("- **Dental Anomalies**: {}", m.counts.anomalous),
        String::new(),
        "| Tooth | Name | Condition | Confidence |".to_string(),
        "|-------|------|-----------|------------|".to_string(),
    ];

    lines.extend(result.teeth.iter().map(|t| {
        format!(
            "| {} | {} | {} | {:.1}% |",
            t.position.code,
            t.position.name,
            t.condition.label(),
            t.confidence * 100.0
        )
    }));

    lines.extend([
        String::new(),
        "## Conclusion".to_string(),
        conclusion.summary().to_string(),
        String::new(),
        "---".to_string(),
        format!(
            "*Report generated by Forensic Dental AI System | {} | Analysis ID {}*",
            case.analysis_date.format("%Y-%m-%d %H:%M"),
            result.evidence.fingerprint
        ),
    ]);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::enhance_and_analyze;
    use crate::dentition::PositionScheme;
    use crate::sample::ImageSample;
    use chrono::TimeZone;
    use image::{GrayImage, Luma};

    #[test]
    fn conclusion_tiers() {
        assert_eq!(Conclusion::from_confidence(90.0), Conclusion::Excellent);
        assert_eq!(Conclusion::from_confidence(89.9), Conclusion::Good);
        assert_eq!(Conclusion::from_confidence(75.0), Conclusion::Good);
        assert_eq!(Conclusion::from_confidence(74.9), Conclusion::Moderate);
    }

    #[test]
    fn case_id_uses_minute_precision() {
        let at = Utc.with_ymd_and_hms(2025, 10, 22, 14, 5, 59).unwrap();
        let case = CaseInfo::new(at, Some(Degradation::Water), Severity::default());
        assert_eq!(case.case_id, "DENT-20251022-1405");
    }

    #[test]
    fn flat_grey_report_contents() {
        let flat = ImageSample::from_gray(GrayImage::from_pixel(600, 400, Luma([120]))).unwrap();
        let (_, result) = enhance_and_analyze(&flat, PositionScheme::UpperRight).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 10, 22, 9, 30, 0).unwrap();
        let report = ForensicReport::build(
            CaseInfo::new(at, Some(Degradation::Thermal), Severity::from_level(3).unwrap()),
            &result,
        );

        assert_eq!(report.conclusion, Conclusion::Good);
        let md = &report.markdown;
        assert!(md.contains("- **Case ID**: DENT-20251022-0930"));
        assert!(md.contains("Thermal Damage (severity 3/10)"));
        assert!(md.contains("- **Identification Confidence**: 83.5%"));
        assert!(md.contains("- **Clarity Improvement**: +0%"));
        assert!(md.contains("| 18 | Third Molar | Impacted | 62.1% |"));
        assert!(md.contains("Analysis ID 56598eb0"));
        assert!(md.contains("**GOOD**"));
    }

    #[test]
    fn markdown_layout_has_blank_lines_between_sections() {
        let flat = ImageSample::from_gray(GrayImage::from_pixel(600, 400, Luma([120]))).unwrap();
        let (_, result) = enhance_and_analyze(&flat, PositionScheme::UpperRight).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 10, 22, 9, 30, 0).unwrap();
        let md = ForensicReport::build(CaseInfo::new(at, None, Severity::default()), &result).markdown;

        assert!(md.starts_with("# FORENSIC DENTAL ANALYSIS REPORT\n\n## Case Information\n"));
        assert!(md.contains("- **Evidence Condition**: Undamaged\n\n## Technical Analysis\n"));
        assert!(md.contains("| 11 | Central Incisor | Healthy | 78.1% |\n\n## Conclusion\n"));
        assert!(md.ends_with("Analysis ID 56598eb0*\n"));
        // header, separator and one row per tooth
        assert_eq!(md.lines().filter(|l| l.starts_with('|')).count(), 2 + 8);
    }

    #[test]
    fn negative_improvement_keeps_its_sign() {
        assert_eq!(signed(-2.5), "-2.5");
        assert_eq!(signed(3.0), "+3");
        assert_eq!(signed(-0.0), "+0");
    }
}
