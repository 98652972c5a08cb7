//! The check catalogue.
//!
//! Every check is a pure function of the company data and/or the model run.
//! Forecast-side inputs (growth, margins, capex) are read from the forecast
//! rows, i.e. the values the model actually used after hold-last fallbacks.
//! ROIC and FCF growth read the full projection series, history included.

use serde::{Deserialize, Serialize};
use valuation_core::stats::{mean, population_std_dev};
use valuation_core::{DcfData, DcfModel, ProjectionYear, ValuationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckCategory {
    #[serde(rename = "Data Quality")]
    DataQuality,
    #[serde(rename = "Model Consistency")]
    ModelConsistency,
    #[serde(rename = "Assumption Reasonableness")]
    AssumptionReasonableness,
    #[serde(rename = "Output Validation")]
    OutputValidation,
}

impl CheckCategory {
    pub const ALL: [CheckCategory; 4] = [
        CheckCategory::DataQuality,
        CheckCategory::ModelConsistency,
        CheckCategory::AssumptionReasonableness,
        CheckCategory::OutputValidation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckCategory::DataQuality => "Data Quality",
            CheckCategory::ModelConsistency => "Model Consistency",
            CheckCategory::AssumptionReasonableness => "Assumption Reasonableness",
            CheckCategory::OutputValidation => "Output Validation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticCheck {
    pub id: String,
    pub name: String,
    pub category: CheckCategory,
    pub status: CheckStatus,
    /// 0-100
    pub score: f64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl DiagnosticCheck {
    pub fn new(
        id: &str,
        name: &str,
        category: CheckCategory,
        status: CheckStatus,
        score: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            status,
            score,
            message: message.into(),
            details: None,
            recommendation: None,
        }
    }

    /// Placeholder for a check that could not be evaluated.
    pub fn failed(id: &str, name: &str, category: CheckCategory, message: impl Into<String>) -> Self {
        Self::new(id, name, category, CheckStatus::Fail, 0.0, message)
    }

    pub fn with_details(mut self, details: Option<&str>) -> Self {
        self.details = details.map(str::to_string);
        self
    }

    pub fn with_recommendation(mut self, recommendation: Option<&str>) -> Self {
        self.recommendation = recommendation.map(str::to_string);
        self
    }
}

/// A check in the catalogue. `None` means the check does not apply.
pub type CheckFn = fn(&CheckDef, &DcfData, &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError>;

pub struct CheckDef {
    pub id: &'static str,
    pub name: &'static str,
    pub category: CheckCategory,
    pub run: CheckFn,
}

pub static CHECKS: [CheckDef; 16] = [
    CheckDef { id: "historical_completeness", name: "Historical Data Completeness", category: CheckCategory::DataQuality, run: historical_completeness },
    CheckDef { id: "revenue_consistency", name: "Revenue Growth Consistency", category: CheckCategory::DataQuality, run: revenue_consistency },
    CheckDef { id: "margin_consistency", name: "Operating Margin Stability", category: CheckCategory::DataQuality, run: margin_consistency },
    CheckDef { id: "cash_flow_quality", name: "Cash Flow Quality", category: CheckCategory::DataQuality, run: cash_flow_quality },
    CheckDef { id: "wacc_reasonableness", name: "WACC Reasonableness", category: CheckCategory::ModelConsistency, run: wacc_reasonableness },
    CheckDef { id: "terminal_value_dependency", name: "Terminal Value Dependency", category: CheckCategory::ModelConsistency, run: terminal_value_dependency },
    CheckDef { id: "terminal_spread_guard", name: "Terminal Spread Guard", category: CheckCategory::ModelConsistency, run: terminal_spread_guard },
    CheckDef { id: "growth_progression", name: "Growth Rate Progression", category: CheckCategory::ModelConsistency, run: growth_progression },
    CheckDef { id: "margin_progression", name: "Margin Expansion Reasonableness", category: CheckCategory::ModelConsistency, run: margin_progression },
    CheckDef { id: "terminal_growth_gdp", name: "Terminal Growth vs GDP", category: CheckCategory::AssumptionReasonableness, run: terminal_growth_gdp },
    CheckDef { id: "beta_reasonableness", name: "Beta Reasonableness", category: CheckCategory::AssumptionReasonableness, run: beta_reasonableness },
    CheckDef { id: "tax_rate_reasonableness", name: "Tax Rate Reasonableness", category: CheckCategory::AssumptionReasonableness, run: tax_rate_reasonableness },
    CheckDef { id: "capex_reasonableness", name: "CapEx Intensity Reasonableness", category: CheckCategory::AssumptionReasonableness, run: capex_reasonableness },
    CheckDef { id: "valuation_reasonableness", name: "Valuation Upside/Downside", category: CheckCategory::OutputValidation, run: valuation_reasonableness },
    CheckDef { id: "roic_reasonableness", name: "Return on Invested Capital", category: CheckCategory::OutputValidation, run: roic_reasonableness },
    CheckDef { id: "fcf_growth_reasonableness", name: "Free Cash Flow Growth", category: CheckCategory::OutputValidation, run: fcf_growth_reasonableness },
];

impl CheckDef {
    fn check(&self, status: CheckStatus, score: f64, message: impl Into<String>) -> DiagnosticCheck {
        DiagnosticCheck::new(self.id, self.name, self.category, status, score, message)
    }
}

fn finite(label: &str, value: f64) -> Result<f64, ValuationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValuationError::CalculationError(format!("{label} is not finite: {value}")))
    }
}

/// Three-band status with the 100/70/30 scores shared by the range checks.
fn banded(pass: bool, warn: bool) -> (CheckStatus, f64) {
    if pass {
        (CheckStatus::Pass, 100.0)
    } else if warn {
        (CheckStatus::Warning, 70.0)
    } else {
        (CheckStatus::Fail, 30.0)
    }
}

fn status_below(value: f64, pass: f64, warn: f64) -> CheckStatus {
    if value < pass {
        CheckStatus::Pass
    } else if value < warn {
        CheckStatus::Warning
    } else {
        CheckStatus::Fail
    }
}

fn forecast_rows(model: &DcfModel) -> Vec<&ProjectionYear> {
    model.forecast().collect()
}

// Data quality

fn historical_completeness(d: &CheckDef, data: &DcfData, _: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let years = data.historical.len();
    let status = match years {
        5.. => CheckStatus::Pass,
        3 | 4 => CheckStatus::Warning,
        _ => CheckStatus::Fail,
    };
    let short = years < 5;
    Ok(Some(
        d.check(status, (years as f64 * 20.0).min(100.0), format!("{years} years of historical data available"))
            .with_details(short.then_some("DCF models typically require 5+ years of historical data for reliable projections"))
            .with_recommendation(short.then_some("Consider using industry averages to supplement limited historical data")),
    ))
}

fn revenue_consistency(d: &CheckDef, data: &DcfData, _: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let revenues: Vec<f64> = data
        .sorted_history()
        .iter()
        .map(|r| r.revenue)
        .filter(|&r| r > 0.0)
        .collect();
    if revenues.len() < 2 {
        return Ok(Some(d.check(CheckStatus::Fail, 0.0, "Insufficient revenue data for consistency analysis")));
    }

    let rates: Vec<f64> = revenues
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .filter(|r| r.is_finite())
        .collect();
    if rates.is_empty() {
        return Ok(Some(d.check(
            CheckStatus::Warning,
            50.0,
            "Unable to calculate revenue growth rates from available data",
        )));
    }

    let volatility = finite("revenue growth volatility", population_std_dev(&rates))?;
    Ok(Some(
        d.check(
            status_below(volatility, 0.2, 0.4),
            (100.0 - volatility * 200.0).max(0.0),
            format!("Revenue growth volatility: {:.1}%", volatility * 100.0),
        )
        .with_details((volatility > 0.2).then_some("High revenue volatility may indicate cyclical business or data quality issues"))
        .with_recommendation((volatility > 0.3).then_some("Consider using normalized growth rates or industry-adjusted figures")),
    ))
}

fn margin_consistency(d: &CheckDef, data: &DcfData, _: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let margins: Vec<f64> = data
        .historical
        .iter()
        .map(|r| if r.revenue > 0.0 { r.ebit / r.revenue } else { 0.0 })
        .filter(|m| m.is_finite())
        .collect();
    if margins.len() < 2 {
        return Ok(Some(d.check(CheckStatus::Warning, 50.0, "Insufficient data for margin stability analysis")));
    }

    let volatility = population_std_dev(&margins);
    Ok(Some(
        d.check(
            status_below(volatility, 0.05, 0.1),
            (100.0 - volatility * 500.0).max(0.0),
            format!("Operating margin volatility: {:.1}%", volatility * 100.0),
        )
        .with_details(
            (volatility > 0.05).then_some("High margin volatility suggests operational instability or accounting irregularities"),
        ),
    ))
}

fn cash_flow_quality(d: &CheckDef, data: &DcfData, _: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let ratios: Vec<f64> = data
        .historical
        .iter()
        .map(|r| if r.nopat != 0.0 { r.fcff / r.nopat } else { 0.0 })
        .filter(|r| r.is_finite())
        .collect();
    if ratios.is_empty() {
        return Ok(Some(d.check(
            CheckStatus::Warning,
            50.0,
            "Unable to analyze cash flow quality - insufficient data",
        )));
    }

    let ratio = mean(&ratios);
    let status = if ratio > 0.8 {
        CheckStatus::Pass
    } else if ratio > 0.6 {
        CheckStatus::Warning
    } else {
        CheckStatus::Fail
    };
    Ok(Some(
        d.check(status, (ratio.abs() * 100.0).min(100.0), format!("Average FCF/NOPAT ratio: {ratio:.2}"))
            .with_details((ratio < 0.8).then_some("Low cash conversion suggests working capital issues or aggressive accounting"))
            .with_recommendation((ratio < 0.7).then_some("Investigate working capital trends and accounting policies")),
    ))
}

// Model consistency

fn wacc_reasonableness(d: &CheckDef, _: &DcfData, model: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let wacc = finite("WACC", model.valuation.wacc)?;
    let (status, score) = banded((0.05..=0.20).contains(&wacc), (0.03..=0.25).contains(&wacc));
    let outside = !(0.05..=0.20).contains(&wacc);
    let recommendation = if wacc < 0.05 {
        Some("Consider higher risk premium")
    } else if wacc > 0.20 {
        Some("Review beta and risk assumptions")
    } else {
        None
    };
    Ok(Some(
        d.check(status, score, format!("WACC: {:.1}%", wacc * 100.0))
            .with_details(outside.then_some("WACC outside typical range for public companies (5%-20%)"))
            .with_recommendation(recommendation),
    ))
}

fn terminal_value_dependency(d: &CheckDef, _: &DcfData, model: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let v = &model.valuation;
    let share = finite("terminal value share", v.pv_terminal / v.enterprise_value)?;
    Ok(Some(
        d.check(
            status_below(share, 0.75, 0.85),
            (100.0 - (share - 0.5) * 200.0).clamp(0.0, 100.0),
            format!("Terminal value: {:.0}% of enterprise value", share * 100.0),
        )
        .with_details((share > 0.75).then_some("High terminal value dependency reduces model reliability"))
        .with_recommendation(
            (share > 0.8).then_some("Extend forecast period or reduce terminal growth assumptions"),
        ),
    ))
}

fn terminal_spread_guard(d: &CheckDef, _: &DcfData, model: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let check = if model.valuation.terminal_spread_clamped {
        d.check(CheckStatus::Fail, 40.0, "WACC does not exceed terminal growth; minimum spread applied")
            .with_details(Some("The Gordon denominator was floored, so the terminal value is an artefact of the floor"))
            .with_recommendation(Some("Lower terminal growth below WACC"))
    } else {
        d.check(CheckStatus::Pass, 100.0, "WACC exceeds terminal growth")
    };
    Ok(Some(check))
}

fn growth_progression(d: &CheckDef, _: &DcfData, model: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let growth: Vec<f64> = forecast_rows(model).iter().map(|p| p.revenue_growth).collect();
    let declining = growth.windows(2).all(|w| w[1] <= w[0] + 0.02);
    let check = if declining {
        d.check(CheckStatus::Pass, 100.0, "Growth rates decline over time")
    } else {
        d.check(CheckStatus::Warning, 70.0, "Growth rates increase over forecast period")
            .with_details(Some("Accelerating growth rates over time are typically unrealistic"))
            .with_recommendation(Some("Consider tapering growth rates over the forecast period"))
    };
    Ok(Some(check))
}

fn margin_progression(d: &CheckDef, _: &DcfData, model: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let rows = forecast_rows(model);
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return Err(ValuationError::InsufficientData("no forecast years".to_string()));
    };
    let change = finite("margin change", last.operating_margin - first.operating_margin)?;
    let size = change.abs();
    Ok(Some(
        d.check(
            status_below(size, 0.05, 0.1),
            (100.0 - size * 500.0).max(0.0),
            format!("Margin change: {:.1}pp over forecast period", change * 100.0),
        )
        .with_details((size > 0.05).then_some("Large margin changes require strong business case justification"))
        .with_recommendation((size > 0.08).then_some("Validate margin assumptions with industry analysis")),
    ))
}

// Assumption reasonableness

fn terminal_growth_gdp(d: &CheckDef, _: &DcfData, model: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let g = finite("terminal growth", model.assumptions.terminal_growth_rate)?;
    let (status, score) = banded(g <= 0.04, g <= 0.06);
    Ok(Some(
        d.check(status, score, format!("Terminal growth: {:.1}%", g * 100.0))
            .with_details(
                (g > 0.04).then_some("Terminal growth above long-term GDP growth (3-4%) is typically unsustainable"),
            )
            .with_recommendation((g > 0.05).then_some("Consider reducing terminal growth to 3-4% range")),
    ))
}

fn beta_reasonableness(d: &CheckDef, _: &DcfData, model: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let beta = finite("beta", model.assumptions.beta)?;
    let typical = (0.5..=2.5).contains(&beta);
    let (status, score) = banded(typical, (0.2..=3.0).contains(&beta));
    Ok(Some(
        d.check(status, score, format!("Beta: {beta:.2}"))
            .with_details((!typical).then_some("Beta outside typical range for most public companies"))
            .with_recommendation(
                (beta > 2.5).then_some("High beta suggests very risky business - validate with peer analysis"),
            ),
    ))
}

fn tax_rate_reasonableness(d: &CheckDef, _: &DcfData, model: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let tax = finite("tax rate", model.assumptions.tax_rate)?;
    let typical = (0.15..=0.35).contains(&tax);
    let (status, score) = banded(typical, (0.10..=0.45).contains(&tax));
    Ok(Some(
        d.check(status, score, format!("Tax rate: {:.1}%", tax * 100.0))
            .with_details((!typical).then_some("Tax rate outside typical corporate range (15%-35%)")),
    ))
}

fn capex_reasonableness(d: &CheckDef, _: &DcfData, model: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let intensity: Vec<f64> = forecast_rows(model)
        .iter()
        .filter(|p| p.revenue > 0.0)
        .map(|p| p.capex / p.revenue)
        .collect();
    if intensity.is_empty() {
        return Err(ValuationError::InsufficientData("no forecast revenue".to_string()));
    }
    let capex = finite("capex intensity", mean(&intensity))?;
    let (status, score) = banded(capex <= 0.15, capex <= 0.25);
    Ok(Some(
        d.check(status, score, format!("Average CapEx: {:.1}% of revenue", capex * 100.0))
            .with_details(
                (capex > 0.15).then_some("High CapEx intensity may indicate capital-intensive business or growth phase"),
            )
            .with_recommendation((capex > 0.20).then_some("Validate CapEx assumptions with industry benchmarks")),
    ))
}

// Output validation

fn valuation_reasonableness(d: &CheckDef, _: &DcfData, model: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let upside = finite("upside", model.valuation.upside)?;
    let size = upside.abs();
    let status = if size <= 0.5 {
        CheckStatus::Pass
    } else if size <= 1.0 {
        CheckStatus::Warning
    } else {
        CheckStatus::Fail
    };
    Ok(Some(
        d.check(status, (100.0 - size * 100.0).max(0.0), format!("Price difference: {:.1}%", upside * 100.0))
            .with_details(
                (size > 0.5).then_some("Large valuation differences may indicate model issues or market inefficiency"),
            )
            .with_recommendation(
                (size > 0.8).then_some("Review all assumptions and consider alternative valuation methods"),
            ),
    ))
}

/// Read from the year before the terminal row, which is the last history
/// year on a one-year horizon. Invested capital is approximated as 30% of revenue.
fn roic_reasonableness(d: &CheckDef, _: &DcfData, model: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let Some(year) = model.projections.len().checked_sub(2).and_then(|i| model.projections.get(i)) else {
        return Ok(None);
    };
    let roic = finite("implied ROIC", year.nopat / (year.revenue * 0.3))?;
    let typical = (0.10..=0.50).contains(&roic);
    let (status, score) = banded(typical, (0.05..=0.70).contains(&roic));
    let recommendation = if roic < 0.08 {
        Some("Low ROIC may not justify growth assumptions")
    } else if roic > 0.60 {
        Some("Very high ROIC may be unsustainable")
    } else {
        None
    };
    Ok(Some(
        d.check(status, score, format!("Implied ROIC: {:.1}%", roic * 100.0))
            .with_details((!typical).then_some("ROIC outside typical range suggests model inconsistencies"))
            .with_recommendation(recommendation),
    ))
}

/// YoY FCFF growth across history and the explicit forecast.
fn fcf_growth_reasonableness(d: &CheckDef, _: &DcfData, model: &DcfModel) -> Result<Option<DiagnosticCheck>, ValuationError> {
    let fcff: Vec<f64> = model
        .projections
        .iter()
        .filter(|p| !p.is_terminal)
        .map(|p| p.fcff)
        .collect();
    let rates: Vec<f64> = fcff
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .filter(|r| r.is_finite())
        .collect();
    if rates.is_empty() {
        return Ok(None);
    }

    let growth = mean(&rates);
    let status = if growth <= 0.25 {
        CheckStatus::Pass
    } else if growth <= 0.40 {
        CheckStatus::Warning
    } else {
        CheckStatus::Fail
    };
    Ok(Some(
        d.check(
            status,
            (100.0 - (growth - 0.15).max(0.0) * 200.0).max(0.0),
            format!("Average FCF growth: {:.1}%", growth * 100.0),
        )
        .with_details((growth > 0.25).then_some("High FCF growth rates may be difficult to sustain long-term"))
        .with_recommendation((growth > 0.35).then_some("Consider more conservative growth assumptions")),
    ))
}
