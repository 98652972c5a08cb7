//! Enterprise value, the equity bridge and per-share figures.

use serde::{Deserialize, Serialize};
use tracing::debug;
use valuation_core::stats::mean;
use valuation_core::{
    HistoricalFinancialRow, ModelAssumptions, ProjectionYear, TerminalMethod, ValuationError,
    ValuationResult,
};

use crate::capital_cost::CapitalCost;
use crate::terminal::{terminal_metrics, terminal_value};

/// Balance-sheet adjustments between enterprise and equity value.
/// A component switched off by its toggle is 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityBridge {
    pub cash: f64,
    pub debt: f64,
    pub net_debt: f64,
    pub minority_interest: f64,
    pub investments: f64,
}

impl EquityBridge {
    pub fn equity_value(&self, enterprise_value: f64) -> f64 {
        enterprise_value - self.net_debt - self.minority_interest + self.investments
    }
}

pub fn equity_bridge(latest: &HistoricalFinancialRow, assumptions: &ModelAssumptions) -> EquityBridge {
    let pick = |enabled: bool, value: f64| if enabled { value } else { 0.0 };
    let cash = pick(assumptions.cash_adjustment, latest.cash);
    let debt = pick(assumptions.debt_adjustment, latest.total_debt);
    EquityBridge {
        cash,
        debt,
        net_debt: debt - cash,
        minority_interest: pick(assumptions.minority_interest_adjustment, latest.minority_interest),
        investments: pick(assumptions.investments_adjustment, latest.investments),
    }
}

/// Zero shares propagates as infinity/NaN; diagnostics flag it.
pub fn value_per_share(equity_value: f64, shares: f64) -> f64 {
    equity_value / shares
}

/// Compound annual growth rate; 0 for a non-positive start or a zero span.
pub fn calculate_cagr(start: f64, end: f64, years: f64) -> f64 {
    if start <= 0.0 || years == 0.0 {
        return 0.0;
    }
    (end / start).powf(1.0 / years) - 1.0
}

/// Aggregate a finished projection into a [`ValuationResult`].
///
/// `history` and `forecast` must both be non-empty and the forecast must end
/// with its terminal year.
pub fn run_valuation(
    history: &[ProjectionYear],
    forecast: &[ProjectionYear],
    assumptions: &ModelAssumptions,
    capital: &CapitalCost,
    latest: &HistoricalFinancialRow,
    shares: f64,
    current_price: f64,
) -> Result<ValuationResult, ValuationError> {
    let (Some(first_hist), Some(last_hist)) = (history.first(), history.last()) else {
        return Err(ValuationError::InsufficientData("no historical years to value".to_string()));
    };
    let Some(terminal_year) = forecast.last() else {
        return Err(ValuationError::CalculationError("empty forecast".to_string()));
    };

    let tv = terminal_value(terminal_year, capital.wacc, assumptions);
    let pv_fcff: f64 = forecast.iter().map(|p| p.discounted_fcff).sum();
    let pv_terminal = tv.discounted;
    let enterprise_value = pv_fcff + pv_terminal;

    let bridge = equity_bridge(latest, assumptions);
    let equity_value = bridge.equity_value(enterprise_value);
    let per_share = value_per_share(equity_value, shares);
    let metrics = terminal_metrics(terminal_year, tv.value);

    let span = (terminal_year.year - first_hist.year) as f64;
    let margins: Vec<f64> = forecast.iter().map(|p| p.operating_margin).collect();

    debug!(
        wacc = capital.wacc,
        pv_fcff,
        pv_terminal,
        enterprise_value,
        per_share,
        "valuation complete"
    );

    Ok(ValuationResult {
        cost_of_equity: capital.cost_of_equity,
        cost_of_debt: assumptions.cost_of_debt,
        after_tax_cost_of_debt: capital.after_tax_cost_of_debt,
        wacc: capital.wacc,
        pv_fcff,
        pv_terminal,
        terminal_value: tv.value,
        enterprise_value,
        cash: bridge.cash,
        debt: bridge.debt,
        net_debt: bridge.net_debt,
        minority_interest: bridge.minority_interest,
        investments: bridge.investments,
        equity_value,
        shares_outstanding: shares,
        value_per_share: per_share,
        current_price,
        upside: per_share / current_price - 1.0,
        implied_ev_revenue: enterprise_value / last_hist.revenue,
        implied_ev_ebit: enterprise_value / last_hist.ebit,
        implied_pe: per_share / (last_hist.nopat / shares),
        terminal_ev_revenue: metrics.ev_revenue,
        terminal_ev_ebit: metrics.ev_ebit,
        terminal_fcff_yield: metrics.fcff_yield,
        forecast_years: assumptions.forecast_years,
        terminal_method: assumptions.terminal_method,
        terminal_growth_rate: (assumptions.terminal_method == TerminalMethod::Gordon)
            .then_some(assumptions.terminal_growth_rate),
        exit_multiple: (assumptions.terminal_method == TerminalMethod::ExitMultiple)
            .then_some(assumptions.exit_multiple),
        terminal_spread_clamped: tv.spread_clamped,
        revenue_cagr: calculate_cagr(first_hist.revenue, terminal_year.revenue, span),
        average_margin: mean(&margins),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn balance_sheet() -> HistoricalFinancialRow {
        HistoricalFinancialRow {
            year: 2023,
            cash: 50.0,
            total_debt: 120.0,
            minority_interest: 10.0,
            investments: 5.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_bridge_with_all_adjustments() {
        let bridge = equity_bridge(&balance_sheet(), &ModelAssumptions::default());
        assert_eq!(bridge.net_debt, 70.0);
        // 1000 - 70 - 10 + 5
        assert_relative_eq!(bridge.equity_value(1000.0), 925.0);
    }

    #[test]
    fn test_bridge_toggles_zero_components() {
        let a = ModelAssumptions {
            cash_adjustment: false,
            minority_interest_adjustment: false,
            ..Default::default()
        };
        let bridge = equity_bridge(&balance_sheet(), &a);
        assert_eq!(bridge.cash, 0.0);
        assert_eq!(bridge.net_debt, 120.0);
        assert_eq!(bridge.minority_interest, 0.0);
        assert_relative_eq!(bridge.equity_value(1000.0), 885.0);
    }

    #[test]
    fn test_cagr() {
        assert_relative_eq!(calculate_cagr(100.0, 121.0, 2.0), 0.1, epsilon = 1e-12);
        assert_eq!(calculate_cagr(0.0, 121.0, 2.0), 0.0);
        assert_eq!(calculate_cagr(100.0, 121.0, 0.0), 0.0);
    }

    #[test]
    fn test_zero_shares_is_not_an_error() {
        assert!(!value_per_share(100.0, 0.0).is_finite());
    }
}
