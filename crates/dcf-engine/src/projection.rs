//! Historical normalisation and the explicit forecast.

use valuation_core::{value_for_year, HistoricalFinancialRow, ModelAssumptions, ProjectionYear};

/// Convert reported rows into the projection layout, ascending by year.
///
/// Growth is 0 for the first row and whenever the prior year's revenue is not
/// positive. Discount factor is fixed at 1 and nothing is discounted.
pub fn historical_projections(rows: &[HistoricalFinancialRow]) -> Vec<ProjectionYear> {
    let mut sorted: Vec<&HistoricalFinancialRow> = rows.iter().collect();
    sorted.sort_by_key(|r| r.year);

    let mut out = Vec::with_capacity(sorted.len());
    for (i, row) in sorted.iter().enumerate() {
        let revenue_growth = match i.checked_sub(1).map(|p| sorted[p]) {
            Some(prev) if prev.revenue > 0.0 => row.revenue / prev.revenue - 1.0,
            _ => 0.0,
        };
        let (gross_margin, operating_margin) = if row.revenue > 0.0 {
            (row.gross_profit / row.revenue, row.ebit / row.revenue)
        } else {
            (0.0, 0.0)
        };

        out.push(ProjectionYear {
            year: row.year,
            is_history: true,
            is_terminal: false,
            revenue: row.revenue,
            revenue_growth,
            cogs: row.cogs,
            gross_profit: row.gross_profit,
            gross_margin,
            operating_expenses: row.operating_expenses,
            ebit: row.ebit,
            operating_margin,
            tax_rate: row.effective_tax_rate,
            taxes: row.tax_expense,
            nopat: row.nopat,
            depreciation: row.depreciation,
            capex: row.capex,
            change_in_working_capital: row.change_in_working_capital,
            stock_compensation: row.stock_based_compensation,
            fcff: row.fcff,
            discount_factor: 1.0,
            discounted_fcff: 0.0,
            terminal_value: None,
            discounted_terminal_value: None,
        });
    }
    out
}

/// Extend the last historical year by `assumptions.forecast_years` years,
/// discounting each at `wacc`. The final year is flagged terminal.
///
/// Returns an empty series when there is no history to grow from.
pub fn forecast_projections(
    history: &[ProjectionYear],
    assumptions: &ModelAssumptions,
    wacc: f64,
) -> Vec<ProjectionYear> {
    let Some(last) = history.last() else {
        return Vec::new();
    };

    let horizon = assumptions.forecast_years;
    let mut out: Vec<ProjectionYear> = Vec::with_capacity(horizon);

    for i in 0..horizon {
        let prev = out.last().unwrap_or(last);

        let revenue_growth = value_for_year(&assumptions.revenue_growth_rates, i).unwrap_or(0.0);
        let gross_margin = value_for_year(&assumptions.gross_margins, i).unwrap_or(prev.gross_margin);
        let operating_margin =
            value_for_year(&assumptions.operating_margins, i).unwrap_or(prev.operating_margin);
        let depreciation_pct = value_for_year(&assumptions.depreciation_percent, i).unwrap_or(0.0);
        let capex_pct = value_for_year(&assumptions.capex_percent, i).unwrap_or(0.0);
        let nwc_pct = value_for_year(&assumptions.nwc_percent, i).unwrap_or(0.0);
        let sbc_pct = value_for_year(&assumptions.stock_compensation_percent, i).unwrap_or(0.0);

        let revenue = prev.revenue * (1.0 + revenue_growth);
        let gross_profit = revenue * gross_margin;
        let ebit = revenue * operating_margin;

        let tax_rate = assumptions.tax_rate;
        let nopat = ebit * (1.0 - tax_rate);
        let depreciation = revenue * depreciation_pct;
        let capex = revenue * capex_pct;
        // NWC drag follows the revenue delta, not the revenue level
        let change_in_working_capital = (revenue - prev.revenue) * nwc_pct;
        let stock_compensation = if assumptions.include_stock_compensation {
            revenue * sbc_pct
        } else {
            0.0
        };

        let fcff = nopat + depreciation - capex - change_in_working_capital + stock_compensation;
        let discount_factor = (1.0 + wacc).powi(i as i32 + 1);

        let year = ProjectionYear {
            year: last.year + i as i32 + 1,
            is_history: false,
            is_terminal: i + 1 == horizon,
            revenue,
            revenue_growth,
            cogs: revenue - gross_profit,
            gross_profit,
            gross_margin,
            operating_expenses: gross_profit - ebit,
            ebit,
            operating_margin,
            tax_rate,
            taxes: ebit * tax_rate,
            nopat,
            depreciation,
            capex,
            change_in_working_capital,
            stock_compensation,
            fcff,
            discount_factor,
            discounted_fcff: fcff / discount_factor,
            terminal_value: None,
            discounted_terminal_value: None,
        };
        out.push(year);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn row(year: i32, revenue: f64, ebit: f64) -> HistoricalFinancialRow {
        HistoricalFinancialRow {
            year,
            revenue,
            ebit,
            gross_profit: revenue * 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_history_is_resorted_and_guarded() {
        let rows = vec![row(2023, 120.0, 24.0), row(2021, 0.0, 0.0), row(2022, 100.0, 10.0)];
        let hist = historical_projections(&rows);
        let years: Vec<i32> = hist.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2021, 2022, 2023]);
        // prior revenue is zero
        assert_eq!(hist[1].revenue_growth, 0.0);
        assert_eq!(hist[0].operating_margin, 0.0);
        assert_relative_eq!(hist[2].revenue_growth, 0.2, epsilon = 1e-12);
        assert_relative_eq!(hist[2].operating_margin, 0.2, epsilon = 1e-12);
        assert!(hist.iter().all(|p| p.is_history && p.discount_factor == 1.0));
    }

    #[test]
    fn test_forecast_years_are_consecutive_with_one_terminal() {
        let hist = historical_projections(&[row(2022, 90.0, 9.0), row(2023, 100.0, 10.0)]);
        let a = ModelAssumptions { forecast_years: 4, ..Default::default() };
        let fc = forecast_projections(&hist, &a, 0.1);
        let years: Vec<i32> = fc.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2024, 2025, 2026, 2027]);
        assert_eq!(fc.iter().filter(|p| p.is_terminal).count(), 1);
        assert!(fc.last().unwrap().is_terminal);
        assert_relative_eq!(fc[1].discount_factor, 1.21, epsilon = 1e-12);
    }

    #[test]
    fn test_short_series_holds_last_value() {
        let hist = historical_projections(&[row(2023, 100.0, 10.0)]);
        let a = ModelAssumptions {
            forecast_years: 3,
            revenue_growth_rates: vec![0.10],
            ..Default::default()
        };
        let fc = forecast_projections(&hist, &a, 0.1);
        assert_relative_eq!(fc[2].revenue, 133.1, epsilon = 1e-9);
        assert_relative_eq!(fc[2].revenue_growth, 0.10);
    }

    #[test]
    fn test_working_capital_follows_revenue_delta() {
        let hist = historical_projections(&[row(2023, 100.0, 10.0)]);
        let a = ModelAssumptions {
            forecast_years: 1,
            revenue_growth_rates: vec![0.2],
            nwc_percent: vec![0.1],
            include_stock_compensation: false,
            ..Default::default()
        };
        let fc = forecast_projections(&hist, &a, 0.1);
        assert_relative_eq!(fc[0].change_in_working_capital, 2.0, epsilon = 1e-12);
        assert_eq!(fc[0].stock_compensation, 0.0);
        let p = &fc[0];
        assert_relative_eq!(
            p.fcff,
            p.nopat + p.depreciation - p.capex - p.change_in_working_capital,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_no_history_no_forecast() {
        assert!(forecast_projections(&[], &ModelAssumptions::default(), 0.1).is_empty());
    }
}
