//! Historical ratios and the starting assumption set derived from them.

use serde::{Deserialize, Serialize};
use valuation_core::stats::{mean, median};
use valuation_core::{DcfData, HistoricalFinancialRow, ModelAssumptions, TerminalMethod};

use crate::valuation::calculate_cagr;

const DEFAULT_HORIZON: usize = 5;
const DEFAULT_TERMINAL_GROWTH: f64 = 0.03;

/// Per-year ratios observed in the reported history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalMetrics {
    pub revenue_growth_rates: Vec<f64>,
    pub gross_margins: Vec<f64>,
    pub operating_margins: Vec<f64>,
    pub depreciation_percent: Vec<f64>,
    pub capex_percent: Vec<f64>,
    pub nwc_percent: Vec<f64>,
    pub stock_compensation_percent: Vec<f64>,
    pub effective_tax_rates: Vec<f64>,
    pub average_revenue_growth: f64,
    pub average_gross_margin: f64,
    pub average_operating_margin: f64,
    pub median_revenue_growth: f64,
    pub median_gross_margin: f64,
    pub median_operating_margin: f64,
    pub revenue_cagr: f64,
}

/// Fewer than two rows gives an empty set.
pub fn calculate_historical_metrics(rows: &[HistoricalFinancialRow]) -> HistoricalMetrics {
    if rows.len() < 2 {
        return HistoricalMetrics::default();
    }
    let mut sorted: Vec<&HistoricalFinancialRow> = rows.iter().collect();
    sorted.sort_by_key(|r| r.year);

    let mut m = HistoricalMetrics::default();
    for (i, row) in sorted.iter().enumerate() {
        if row.revenue > 0.0 {
            m.gross_margins.push(row.gross_profit / row.revenue);
            m.operating_margins.push(row.ebit / row.revenue);
            m.depreciation_percent.push(row.depreciation / row.revenue);
            m.capex_percent.push(row.capex / row.revenue);
            m.stock_compensation_percent
                .push(row.stock_based_compensation / row.revenue);
        }

        if i > 0 {
            let prev = sorted[i - 1];
            if prev.revenue > 0.0 {
                m.revenue_growth_rates.push(row.revenue / prev.revenue - 1.0);
            }
            let revenue_change = row.revenue - prev.revenue;
            if revenue_change != 0.0 {
                m.nwc_percent.push(row.change_in_working_capital / revenue_change);
            }
        }

        if (0.0..=1.0).contains(&row.effective_tax_rate) {
            m.effective_tax_rates.push(row.effective_tax_rate);
        }
    }

    let first = sorted[0];
    let last = sorted[sorted.len() - 1];
    m.revenue_cagr = calculate_cagr(first.revenue, last.revenue, (last.year - first.year) as f64);

    m.average_revenue_growth = mean(&m.revenue_growth_rates);
    m.average_gross_margin = mean(&m.gross_margins);
    m.average_operating_margin = mean(&m.operating_margins);
    m.median_revenue_growth = median(&m.revenue_growth_rates);
    m.median_gross_margin = median(&m.gross_margins);
    m.median_operating_margin = median(&m.operating_margins);
    m
}

fn median_or(values: &[f64], fallback: f64) -> f64 {
    if values.is_empty() {
        fallback
    } else {
        median(values)
    }
}

/// Zero counts as missing, matching how absent market fields arrive upstream.
fn nonzero_or(value: f64, fallback: f64) -> f64 {
    if value == 0.0 || value.is_nan() {
        fallback
    } else {
        value
    }
}

/// Starting assumptions for a company, anchored on its own history.
pub fn build_default_assumptions(data: &DcfData) -> ModelAssumptions {
    let metrics = calculate_historical_metrics(&data.historical);
    let horizon = DEFAULT_HORIZON;

    let start_growth = metrics.median_revenue_growth.clamp(0.03, 0.2);
    let revenue_growth_rates = (0..horizon)
        .map(|i| {
            let fade = i as f64 / (horizon - 1) as f64;
            start_growth * (1.0 - fade) + DEFAULT_TERMINAL_GROWTH * fade
        })
        .collect();

    let risk_free_rate = nonzero_or(data.market.risk_free_rate.unwrap_or(0.0), 0.0382);
    let equity_risk_premium = nonzero_or(data.market.equity_risk_premium.unwrap_or(0.0), 0.0472);
    let beta = nonzero_or(data.market.beta.unwrap_or(0.0), 1.0);

    ModelAssumptions {
        forecast_years: horizon,
        terminal_method: TerminalMethod::Gordon,
        risk_free_rate,
        equity_risk_premium,
        beta,
        cost_of_debt: risk_free_rate + 0.02,
        tax_rate: median_or(&metrics.effective_tax_rates, 0.25),
        target_debt_to_capital: 0.2,
        revenue_growth_rates,
        terminal_growth_rate: DEFAULT_TERMINAL_GROWTH,
        exit_multiple: 15.0,
        gross_margins: vec![nonzero_or(metrics.median_gross_margin, 0.4); horizon],
        operating_margins: vec![nonzero_or(metrics.median_operating_margin, 0.15); horizon],
        depreciation_percent: vec![median_or(&metrics.depreciation_percent, 0.03); horizon],
        capex_percent: vec![median_or(&metrics.capex_percent, 0.04); horizon],
        nwc_percent: vec![median_or(&metrics.nwc_percent, 0.1); horizon],
        stock_compensation_percent: vec![median_or(&metrics.stock_compensation_percent, 0.02); horizon],
        include_stock_compensation: true,
        cash_adjustment: true,
        debt_adjustment: true,
        minority_interest_adjustment: true,
        investments_adjustment: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use valuation_core::MarketData;

    fn rows() -> Vec<HistoricalFinancialRow> {
        [(2021, 100.0), (2022, 110.0), (2023, 121.0)]
            .iter()
            .map(|&(year, revenue)| HistoricalFinancialRow {
                year,
                revenue,
                gross_profit: revenue * 0.6,
                ebit: revenue * 0.25,
                depreciation: revenue * 0.05,
                capex: revenue * 0.06,
                change_in_working_capital: 1.0,
                effective_tax_rate: 0.21,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_metrics_from_history() {
        let m = calculate_historical_metrics(&rows());
        assert_eq!(m.revenue_growth_rates.len(), 2);
        assert_relative_eq!(m.median_revenue_growth, 0.1, epsilon = 1e-9);
        assert_relative_eq!(m.median_operating_margin, 0.25, epsilon = 1e-12);
        assert_relative_eq!(m.revenue_cagr, 0.1, epsilon = 1e-9);
        // 1 / 10 and 1 / 11
        assert_relative_eq!(m.nwc_percent[0], 0.1, epsilon = 1e-12);
        assert_eq!(m.effective_tax_rates, vec![0.21, 0.21, 0.21]);
    }

    #[test]
    fn test_single_row_gives_empty_metrics() {
        let m = calculate_historical_metrics(&rows()[..1]);
        assert_eq!(m, HistoricalMetrics::default());
    }

    #[test]
    fn test_defaults_fade_growth_to_terminal() {
        let data = DcfData { historical: rows(), ..Default::default() };
        let a = build_default_assumptions(&data);
        assert_eq!(a.forecast_years, 5);
        assert_relative_eq!(a.revenue_growth_rates[0], 0.1, epsilon = 1e-9);
        assert_relative_eq!(a.revenue_growth_rates[4], 0.03, epsilon = 1e-12);
        assert_relative_eq!(a.operating_margins[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(a.capex_percent[0], 0.06, epsilon = 1e-12);
        assert_relative_eq!(a.tax_rate, 0.21);
        assert_relative_eq!(a.cost_of_debt, 0.0582, epsilon = 1e-12);
    }

    #[test]
    fn test_market_inputs_override_defaults() {
        let data = DcfData {
            historical: rows(),
            market: MarketData {
                beta: Some(1.4),
                risk_free_rate: Some(0.045),
                ..Default::default()
            },
            ..Default::default()
        };
        let a = build_default_assumptions(&data);
        assert_eq!(a.beta, 1.4);
        assert_eq!(a.risk_free_rate, 0.045);
        assert_eq!(a.equity_risk_premium, 0.0472);
        assert_relative_eq!(a.cost_of_debt, 0.065, epsilon = 1e-12);
    }

    #[test]
    fn test_no_history_uses_fallbacks() {
        let a = build_default_assumptions(&DcfData::default());
        assert_relative_eq!(a.revenue_growth_rates[0], 0.03);
        assert_eq!(a.gross_margins, vec![0.4; 5]);
        assert_eq!(a.nwc_percent, vec![0.1; 5]);
        assert_eq!(a.tax_rate, 0.25);
    }
}
