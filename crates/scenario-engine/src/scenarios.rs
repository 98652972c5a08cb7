//! Named assumption overlays and their valuations.

use serde::{Deserialize, Serialize};
use tracing::warn;
use valuation_core::{
    merge_assumptions, AssumptionOverlay, DcfModel, ModelAssumptions, ValuationError,
    ValuationResult, Valuator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// The live model, reused as-is
    Base,
    Bull,
    Bear,
    HighGrowth,
    Recession,
    Custom,
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioKind::Base => write!(f, "Base Case"),
            ScenarioKind::Bull => write!(f, "Bull Case"),
            ScenarioKind::Bear => write!(f, "Bear Case"),
            ScenarioKind::HighGrowth => write!(f, "High Growth"),
            ScenarioKind::Recession => write!(f, "Recession"),
            ScenarioKind::Custom => write!(f, "Custom"),
        }
    }
}

/// A partial overlay on the base assumptions plus its cached valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub name: String,
    pub description: String,
    pub overlay: AssumptionOverlay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation: Option<ValuationResult>,
    /// Set when this scenario's valuation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Scenario {
    fn new(kind: ScenarioKind, description: &str, overlay: AssumptionOverlay) -> Self {
        Self {
            kind,
            name: kind.to_string(),
            description: description.to_string(),
            overlay,
            valuation: None,
            error: None,
        }
    }

    pub fn custom(name: impl Into<String>, description: impl Into<String>, overlay: AssumptionOverlay) -> Self {
        Self {
            kind: ScenarioKind::Custom,
            name: name.into(),
            description: description.into(),
            overlay,
            valuation: None,
            error: None,
        }
    }

    /// Full assumption set this scenario stands for.
    pub fn assumptions(&self, base: &ModelAssumptions) -> ModelAssumptions {
        match self.kind {
            ScenarioKind::Base => base.clone(),
            _ => merge_assumptions(base, &self.overlay),
        }
    }
}

fn scaled(values: &[f64], f: impl Fn(usize, f64) -> f64) -> Vec<f64> {
    values.iter().enumerate().map(|(i, &v)| f(i, v)).collect()
}

/// Library of predefined scenarios
pub struct ScenarioLibrary;

impl ScenarioLibrary {
    /// Base, Bull, Bear, High Growth and Recession, derived from `base`.
    pub fn predefined(base: &ModelAssumptions) -> Vec<Scenario> {
        vec![
            Self::base_case(),
            Self::bull_case(base),
            Self::bear_case(base),
            Self::high_growth(base),
            Self::recession(base),
        ]
    }

    pub fn base_case() -> Scenario {
        Scenario::new(
            ScenarioKind::Base,
            "Original model assumptions without modifications",
            AssumptionOverlay::default(),
        )
    }

    pub fn bull_case(base: &ModelAssumptions) -> Scenario {
        Scenario::new(
            ScenarioKind::Bull,
            "Optimistic growth, higher margins, lower discount rate",
            AssumptionOverlay {
                revenue_growth_rates: Some(scaled(&base.revenue_growth_rates, |_, g| g * 1.5)),
                operating_margins: Some(scaled(&base.operating_margins, |_, m| (m * 1.2).min(0.5))),
                terminal_growth_rate: Some((base.terminal_growth_rate * 1.3).min(0.05)),
                beta: Some((base.beta * 0.9).max(0.5)),
                capex_percent: Some(scaled(&base.capex_percent, |_, c| c * 0.8)),
                tax_rate: Some(base.tax_rate * 1.1),
                ..Default::default()
            },
        )
    }

    pub fn bear_case(base: &ModelAssumptions) -> Scenario {
        Scenario::new(
            ScenarioKind::Bear,
            "Conservative growth, margin pressure, higher discount rate",
            AssumptionOverlay {
                revenue_growth_rates: Some(scaled(&base.revenue_growth_rates, |_, g| (g * 0.5).max(0.0))),
                operating_margins: Some(scaled(&base.operating_margins, |_, m| m * 0.8)),
                terminal_growth_rate: Some((base.terminal_growth_rate * 0.7).max(0.01)),
                beta: Some(base.beta * 1.2),
                capex_percent: Some(scaled(&base.capex_percent, |_, c| c * 1.3)),
                cost_of_debt: Some(base.cost_of_debt * 1.5),
                ..Default::default()
            },
        )
    }

    pub fn high_growth(base: &ModelAssumptions) -> Scenario {
        let growth = (0..base.forecast_years)
            .map(|i| (0.15 - i as f64 * 0.02).max(0.03))
            .collect();
        Scenario::new(
            ScenarioKind::HighGrowth,
            "Sustained high growth with margin expansion",
            AssumptionOverlay {
                revenue_growth_rates: Some(growth),
                operating_margins: Some(scaled(&base.operating_margins, |i, m| {
                    (m + i as f64 * 0.01).min(0.4)
                })),
                terminal_growth_rate: Some(0.04),
                ..Default::default()
            },
        )
    }

    pub fn recession(base: &ModelAssumptions) -> Scenario {
        Scenario::new(
            ScenarioKind::Recession,
            "Economic downturn with reduced growth and margins",
            AssumptionOverlay {
                revenue_growth_rates: Some(scaled(&base.revenue_growth_rates, |i, g| {
                    if i < 2 {
                        (g - 0.1).max(-0.05)
                    } else {
                        (g * 0.6).max(0.01)
                    }
                })),
                operating_margins: Some(scaled(&base.operating_margins, |_, m| m * 0.7)),
                terminal_growth_rate: Some(0.02),
                risk_free_rate: Some((base.risk_free_rate - 0.01).max(0.01)),
                equity_risk_premium: Some(base.equity_risk_premium * 1.5),
                ..Default::default()
            },
        )
    }
}

/// Attach a valuation to every scenario.
///
/// The Base Case reuses `base.valuation` exactly. A scenario whose run fails
/// keeps `valuation: None` and records the error; the rest still run.
pub fn analyze_scenarios<V: Valuator + ?Sized>(
    valuator: &V,
    base: &DcfModel,
    scenarios: Vec<Scenario>,
) -> Vec<Scenario> {
    scenarios
        .into_iter()
        .map(|mut scenario| {
            let outcome = match scenario.kind {
                ScenarioKind::Base => Ok(base.valuation.clone()),
                _ => valuator.valuate(&scenario.assumptions(&base.assumptions)),
            };
            match outcome {
                Ok(valuation) => {
                    scenario.valuation = Some(valuation);
                    scenario.error = None;
                }
                Err(e) => {
                    warn!(scenario = %scenario.name, error = %e, "scenario valuation failed");
                    scenario.valuation = None;
                    scenario.error = Some(e.to_string());
                }
            }
            scenario
        })
        .collect()
}

/// New full model for `scenario`. Base Case returns a copy of `base`.
pub fn apply_scenario<V: Valuator + ?Sized>(
    valuator: &V,
    base: &DcfModel,
    scenario: &Scenario,
) -> Result<DcfModel, ValuationError> {
    match scenario.kind {
        ScenarioKind::Base => Ok(base.clone()),
        _ => valuator.run(&scenario.assumptions(&base.assumptions)),
    }
}
