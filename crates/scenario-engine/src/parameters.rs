//! Addressable numeric assumptions for sensitivity and simulation.

use serde::{Deserialize, Serialize};
use valuation_core::{merge_assumptions, AssumptionOverlay, ModelAssumptions};

/// A single numeric assumption. Series parameters (per-year arrays) are
/// addressed through their first-year value and move as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    RiskFreeRate,
    EquityRiskPremium,
    Beta,
    CostOfDebt,
    TaxRate,
    TargetDebtToCapital,
    TerminalGrowthRate,
    ExitMultiple,
    RevenueGrowth,
    GrossMargin,
    OperatingMargin,
    DepreciationPercent,
    CapexPercent,
    NwcPercent,
    StockCompensationPercent,
}

impl Parameter {
    pub const ALL: [Parameter; 15] = [
        Parameter::RiskFreeRate,
        Parameter::EquityRiskPremium,
        Parameter::Beta,
        Parameter::CostOfDebt,
        Parameter::TaxRate,
        Parameter::TargetDebtToCapital,
        Parameter::TerminalGrowthRate,
        Parameter::ExitMultiple,
        Parameter::RevenueGrowth,
        Parameter::GrossMargin,
        Parameter::OperatingMargin,
        Parameter::DepreciationPercent,
        Parameter::CapexPercent,
        Parameter::NwcPercent,
        Parameter::StockCompensationPercent,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Parameter::RiskFreeRate => "Risk-Free Rate",
            Parameter::EquityRiskPremium => "Equity Risk Premium",
            Parameter::Beta => "Beta",
            Parameter::CostOfDebt => "Cost of Debt",
            Parameter::TaxRate => "Tax Rate",
            Parameter::TargetDebtToCapital => "Debt to Capital",
            Parameter::TerminalGrowthRate => "Terminal Growth Rate",
            Parameter::ExitMultiple => "Exit Multiple",
            Parameter::RevenueGrowth => "Revenue Growth",
            Parameter::GrossMargin => "Gross Margin",
            Parameter::OperatingMargin => "Operating Margin",
            Parameter::DepreciationPercent => "D&A % of Revenue",
            Parameter::CapexPercent => "Capex % of Revenue",
            Parameter::NwcPercent => "NWC % of Revenue Change",
            Parameter::StockCompensationPercent => "SBC % of Revenue",
        }
    }

    pub fn is_series(&self) -> bool {
        self.series(&ModelAssumptions::default()).is_some()
    }

    fn series<'a>(&self, a: &'a ModelAssumptions) -> Option<&'a Vec<f64>> {
        match self {
            Parameter::RevenueGrowth => Some(&a.revenue_growth_rates),
            Parameter::GrossMargin => Some(&a.gross_margins),
            Parameter::OperatingMargin => Some(&a.operating_margins),
            Parameter::DepreciationPercent => Some(&a.depreciation_percent),
            Parameter::CapexPercent => Some(&a.capex_percent),
            Parameter::NwcPercent => Some(&a.nwc_percent),
            Parameter::StockCompensationPercent => Some(&a.stock_compensation_percent),
            _ => None,
        }
    }

    /// Scalar value, or the first-year value of a series (0 for an empty series).
    pub fn base_value(&self, a: &ModelAssumptions) -> f64 {
        match self {
            Parameter::RiskFreeRate => a.risk_free_rate,
            Parameter::EquityRiskPremium => a.equity_risk_premium,
            Parameter::Beta => a.beta,
            Parameter::CostOfDebt => a.cost_of_debt,
            Parameter::TaxRate => a.tax_rate,
            Parameter::TargetDebtToCapital => a.target_debt_to_capital,
            Parameter::TerminalGrowthRate => a.terminal_growth_rate,
            Parameter::ExitMultiple => a.exit_multiple,
            _ => self
                .series(a)
                .and_then(|s| s.first().copied())
                .unwrap_or(0.0),
        }
    }

    /// Overlay that moves this parameter to `value`.
    ///
    /// A series is rescaled by `value / base` so its shape is kept; a series
    /// whose first-year value is 0 is filled with `value` instead.
    pub fn overlay(&self, base: &ModelAssumptions, value: f64) -> AssumptionOverlay {
        let mut overlay = AssumptionOverlay::default();
        match self {
            Parameter::RiskFreeRate => overlay.risk_free_rate = Some(value),
            Parameter::EquityRiskPremium => overlay.equity_risk_premium = Some(value),
            Parameter::Beta => overlay.beta = Some(value),
            Parameter::CostOfDebt => overlay.cost_of_debt = Some(value),
            Parameter::TaxRate => overlay.tax_rate = Some(value),
            Parameter::TargetDebtToCapital => overlay.target_debt_to_capital = Some(value),
            Parameter::TerminalGrowthRate => overlay.terminal_growth_rate = Some(value),
            Parameter::ExitMultiple => overlay.exit_multiple = Some(value),
            Parameter::RevenueGrowth => overlay.revenue_growth_rates = Some(self.rescaled(base, value)),
            Parameter::GrossMargin => overlay.gross_margins = Some(self.rescaled(base, value)),
            Parameter::OperatingMargin => overlay.operating_margins = Some(self.rescaled(base, value)),
            Parameter::DepreciationPercent => {
                overlay.depreciation_percent = Some(self.rescaled(base, value))
            }
            Parameter::CapexPercent => overlay.capex_percent = Some(self.rescaled(base, value)),
            Parameter::NwcPercent => overlay.nwc_percent = Some(self.rescaled(base, value)),
            Parameter::StockCompensationPercent => {
                overlay.stock_compensation_percent = Some(self.rescaled(base, value))
            }
        }
        overlay
    }

    /// `base` with this parameter moved to `value`.
    pub fn apply(&self, base: &ModelAssumptions, value: f64) -> ModelAssumptions {
        merge_assumptions(base, &self.overlay(base, value))
    }

    fn rescaled(&self, base: &ModelAssumptions, value: f64) -> Vec<f64> {
        let series = self.series(base).map(Vec::as_slice).unwrap_or(&[]);
        let anchor = series.first().copied().unwrap_or(0.0);
        if anchor == 0.0 {
            vec![value; series.len().max(base.forecast_years)]
        } else {
            let scale = value / anchor;
            series.iter().map(|v| v * scale).collect()
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scalar_round_trip() {
        let base = ModelAssumptions::default();
        for p in Parameter::ALL.iter().filter(|p| !p.is_series()) {
            let moved = p.apply(&base, 0.123);
            assert_eq!(p.base_value(&moved), 0.123, "{p}");
        }
    }

    #[test]
    fn test_series_keeps_shape() {
        let base = ModelAssumptions {
            revenue_growth_rates: vec![0.10, 0.08, 0.06],
            ..Default::default()
        };
        let moved = Parameter::RevenueGrowth.apply(&base, 0.15);
        assert_relative_eq!(moved.revenue_growth_rates[0], 0.15, epsilon = 1e-12);
        assert_relative_eq!(moved.revenue_growth_rates[1], 0.12, epsilon = 1e-12);
        assert_relative_eq!(moved.revenue_growth_rates[2], 0.09, epsilon = 1e-12);
        assert_eq!(moved.operating_margins, base.operating_margins);
    }

    #[test]
    fn test_zero_series_is_filled() {
        let base = ModelAssumptions {
            forecast_years: 4,
            capex_percent: vec![0.0, 0.01],
            ..Default::default()
        };
        let moved = Parameter::CapexPercent.apply(&base, 0.05);
        assert_eq!(moved.capex_percent, vec![0.05; 4]);
    }

    #[test]
    fn test_series_classification() {
        assert!(Parameter::OperatingMargin.is_series());
        assert!(!Parameter::TerminalGrowthRate.is_series());
        assert_eq!(Parameter::ALL.iter().filter(|p| p.is_series()).count(), 7);
    }
}
