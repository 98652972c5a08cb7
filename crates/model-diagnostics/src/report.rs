//! Model Diagnostics Reporting
//!
//! Runs the check catalogue against a model run and rolls the results up into
//! a scored report with key issues and recommendations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use valuation_core::{DcfData, DcfModel};

use crate::checks::{CheckCategory, CheckStatus, DiagnosticCheck, CHECKS};

const MAX_KEY_ISSUES: usize = 5;
const MAX_RECOMMENDATIONS: usize = 5;
const MAX_HIGHLIGHTS: usize = 3;

/// Confidence in the model output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            ConfidenceLevel::High
        } else if score >= 70.0 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticSummary {
    pub passed: usize,
    pub warnings: usize,
    pub failed: usize,
}

/// Complete diagnostic report for one model run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Rounded mean of the finite check scores
    pub overall_score: f64,
    pub confidence: ConfidenceLevel,
    pub checks: Vec<DiagnosticCheck>,
    pub summary: DiagnosticSummary,
    pub key_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl DiagnosticReport {
    fn from_checks(checks: Vec<DiagnosticCheck>) -> Self {
        let scores: Vec<f64> = checks.iter().map(|c| c.score).filter(|s| s.is_finite()).collect();
        let overall_score = if scores.is_empty() {
            0.0
        } else {
            (scores.iter().sum::<f64>() / scores.len() as f64).round()
        };

        let count = |status: CheckStatus| checks.iter().filter(|c| c.status == status).count();
        let summary = DiagnosticSummary {
            passed: count(CheckStatus::Pass),
            warnings: count(CheckStatus::Warning),
            failed: count(CheckStatus::Fail),
        };

        let key_issues = checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .map(|c| c.message.clone())
            .take(MAX_KEY_ISSUES)
            .collect();
        let recommendations = checks
            .iter()
            .filter_map(|c| c.recommendation.clone())
            .take(MAX_RECOMMENDATIONS)
            .collect();

        Self {
            overall_score,
            confidence: ConfidenceLevel::from_score(overall_score),
            checks,
            summary,
            key_issues,
            recommendations,
            generated_at: Utc::now(),
        }
    }
}

/// Run every check in the catalogue against `model`.
///
/// A check that errors is replaced by a Fail/0 placeholder and the remaining
/// checks still run.
pub fn run_diagnostics(data: &DcfData, model: &DcfModel) -> DiagnosticReport {
    let mut checks = Vec::with_capacity(CHECKS.len());
    for def in CHECKS.iter() {
        match (def.run)(def, data, model) {
            Ok(Some(check)) => checks.push(check),
            Ok(None) => {}
            Err(e) => {
                warn!(check = def.id, error = %e, "diagnostic check failed");
                checks.push(DiagnosticCheck::failed(
                    def.id,
                    def.name,
                    def.category,
                    format!("Unable to evaluate {}", def.name.to_lowercase()),
                ));
            }
        }
    }

    let report = DiagnosticReport::from_checks(checks);
    info!(
        symbol = %data.company.symbol,
        overall_score = report.overall_score,
        confidence = report.confidence.as_str(),
        failed = report.summary.failed,
        "diagnostics complete"
    );
    report
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallHealth {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl OverallHealth {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            OverallHealth::Excellent
        } else if score >= 80.0 {
            OverallHealth::Good
        } else if score >= 70.0 {
            OverallHealth::Fair
        } else {
            OverallHealth::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndicatorStatus {
    Good,
    Caution,
    Risk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceIndicator {
    pub category: CheckCategory,
    pub status: IndicatorStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticOverview {
    pub overall_health: OverallHealth,
    pub key_strengths: Vec<String>,
    pub major_concerns: Vec<String>,
    pub indicators: Vec<ConfidenceIndicator>,
}

/// Condensed view of a report for quick display.
pub fn diagnostic_overview(report: &DiagnosticReport) -> DiagnosticOverview {
    let key_strengths = report
        .checks
        .iter()
        .filter(|c| c.status == CheckStatus::Pass && c.score >= 90.0)
        .map(|c| c.name.clone())
        .take(MAX_HIGHLIGHTS)
        .collect();
    let major_concerns = report
        .checks
        .iter()
        .filter(|c| c.status == CheckStatus::Fail)
        .map(|c| c.name.clone())
        .take(MAX_HIGHLIGHTS)
        .collect();

    let indicators = CheckCategory::ALL
        .iter()
        .map(|&category| {
            let mut in_category = report.checks.iter().filter(|c| c.category == category);
            let status = if in_category.clone().all(|c| c.status == CheckStatus::Pass) {
                IndicatorStatus::Good
            } else if in_category.any(|c| c.status == CheckStatus::Fail) {
                IndicatorStatus::Risk
            } else {
                IndicatorStatus::Caution
            };
            ConfidenceIndicator { category, status }
        })
        .collect();

    DiagnosticOverview {
        overall_health: OverallHealth::from_score(report.overall_score),
        key_strengths,
        major_concerns,
        indicators,
    }
}
