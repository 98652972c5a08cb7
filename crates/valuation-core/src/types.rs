use serde::{Deserialize, Serialize};

/// One fiscal year of reported figures, as delivered by the data-fetch layer.
/// Missing numeric fields default to 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalFinancialRow {
    pub year: i32,
    pub revenue: f64,
    pub cogs: f64,
    pub gross_profit: f64,
    pub operating_expenses: f64,
    pub ebit: f64,
    pub tax_expense: f64,
    pub effective_tax_rate: f64,
    pub nopat: f64,
    pub depreciation: f64,
    pub capex: f64,
    pub change_in_working_capital: f64,
    pub stock_based_compensation: f64,
    pub fcff: f64,
    pub total_debt: f64,
    pub cash: f64,
    pub minority_interest: f64,
    pub investments: f64,
}

/// Company profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub shares_outstanding: f64,
    pub diluted_shares: f64,
}

/// Market snapshot for the company
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketData {
    pub current_price: f64,
    pub market_cap: f64,
    pub beta: Option<f64>,
    pub risk_free_rate: Option<f64>,
    pub equity_risk_premium: Option<f64>,
}

/// Everything the engine needs about a company besides the assumptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DcfData {
    pub company: CompanyProfile,
    pub historical: Vec<HistoricalFinancialRow>,
    pub market: MarketData,
}

impl DcfData {
    /// Historical rows sorted ascending by year.
    pub fn sorted_history(&self) -> Vec<HistoricalFinancialRow> {
        let mut rows = self.historical.clone();
        rows.sort_by_key(|r| r.year);
        rows
    }

    /// Most recent historical row by year.
    pub fn latest_row(&self) -> Option<&HistoricalFinancialRow> {
        self.historical.iter().max_by_key(|r| r.year)
    }
}

/// Terminal value method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalMethod {
    #[default]
    Gordon,
    ExitMultiple,
}

impl std::fmt::Display for TerminalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminalMethod::Gordon => write!(f, "Gordon Growth"),
            TerminalMethod::ExitMultiple => write!(f, "Exit Multiple"),
        }
    }
}

/// The editable DCF inputs. All rates are decimals (0.05 = 5%).
///
/// Per-year series may be shorter than `forecast_years`; the last element is
/// held for the remaining years (see [`crate::value_for_year`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAssumptions {
    pub forecast_years: usize,
    pub terminal_method: TerminalMethod,

    // WACC components
    pub risk_free_rate: f64,
    pub equity_risk_premium: f64,
    pub beta: f64,
    pub cost_of_debt: f64,
    pub tax_rate: f64,
    pub target_debt_to_capital: f64,

    // Growth
    pub revenue_growth_rates: Vec<f64>,
    pub terminal_growth_rate: f64,
    pub exit_multiple: f64,

    // Margins
    pub gross_margins: Vec<f64>,
    pub operating_margins: Vec<f64>,

    // Capital efficiency
    pub depreciation_percent: Vec<f64>,
    pub capex_percent: Vec<f64>,
    pub nwc_percent: Vec<f64>,
    pub stock_compensation_percent: Vec<f64>,
    pub include_stock_compensation: bool,

    // Equity bridge toggles
    pub cash_adjustment: bool,
    pub debt_adjustment: bool,
    pub minority_interest_adjustment: bool,
    pub investments_adjustment: bool,
}

impl Default for ModelAssumptions {
    fn default() -> Self {
        let years = 5;
        Self {
            forecast_years: years,
            terminal_method: TerminalMethod::Gordon,
            risk_free_rate: 0.0382,
            equity_risk_premium: 0.0472,
            beta: 1.0,
            cost_of_debt: 0.0582,
            tax_rate: 0.25,
            target_debt_to_capital: 0.2,
            revenue_growth_rates: vec![0.05; years],
            terminal_growth_rate: 0.03,
            exit_multiple: 15.0,
            gross_margins: vec![0.4; years],
            operating_margins: vec![0.15; years],
            depreciation_percent: vec![0.03; years],
            capex_percent: vec![0.04; years],
            nwc_percent: vec![0.1; years],
            stock_compensation_percent: vec![0.02; years],
            include_stock_compensation: true,
            cash_adjustment: true,
            debt_adjustment: true,
            minority_interest_adjustment: true,
            investments_adjustment: true,
        }
    }
}

/// One historical or forecast year of the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionYear {
    pub year: i32,
    pub is_history: bool,
    pub is_terminal: bool,

    // Income statement
    pub revenue: f64,
    pub revenue_growth: f64,
    pub cogs: f64,
    pub gross_profit: f64,
    pub gross_margin: f64,
    pub operating_expenses: f64,
    pub ebit: f64,
    pub operating_margin: f64,

    // Cash flow
    pub tax_rate: f64,
    pub taxes: f64,
    pub nopat: f64,
    pub depreciation: f64,
    pub capex: f64,
    pub change_in_working_capital: f64,
    pub stock_compensation: f64,
    pub fcff: f64,

    // Discounting (1.0 / 0.0 for history)
    pub discount_factor: f64,
    pub discounted_fcff: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discounted_terminal_value: Option<f64>,
}

/// Snapshot produced by one model run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    // Capital cost
    pub cost_of_equity: f64,
    pub cost_of_debt: f64,
    pub after_tax_cost_of_debt: f64,
    pub wacc: f64,

    // Present values
    pub pv_fcff: f64,
    pub pv_terminal: f64,
    pub terminal_value: f64,
    pub enterprise_value: f64,

    // Equity bridge
    pub cash: f64,
    pub debt: f64,
    pub net_debt: f64,
    pub minority_interest: f64,
    pub investments: f64,
    pub equity_value: f64,

    // Per share
    pub shares_outstanding: f64,
    pub value_per_share: f64,
    pub current_price: f64,
    pub upside: f64,

    // Implied multiples (latest historical year)
    pub implied_ev_revenue: f64,
    pub implied_ev_ebit: f64,
    pub implied_pe: f64,

    // Terminal-year multiples
    pub terminal_ev_revenue: f64,
    pub terminal_ev_ebit: f64,
    pub terminal_fcff_yield: f64,

    // Model summary
    pub forecast_years: usize,
    pub terminal_method: TerminalMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_growth_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_multiple: Option<f64>,
    /// True when WACC <= terminal growth and the minimum spread was used.
    pub terminal_spread_clamped: bool,
    pub revenue_cagr: f64,
    pub average_margin: f64,
}

/// A complete model run: the inputs it used, the projection series and the valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfModel {
    pub assumptions: ModelAssumptions,
    pub projections: Vec<ProjectionYear>,
    pub valuation: ValuationResult,
}

impl DcfModel {
    pub fn history(&self) -> impl Iterator<Item = &ProjectionYear> {
        self.projections.iter().filter(|p| p.is_history)
    }

    pub fn forecast(&self) -> impl Iterator<Item = &ProjectionYear> {
        self.projections.iter().filter(|p| !p.is_history)
    }

    pub fn terminal_year(&self) -> Option<&ProjectionYear> {
        self.projections.iter().find(|p| p.is_terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_method_wire_names() {
        let json = serde_json::to_string(&TerminalMethod::ExitMultiple).unwrap();
        assert_eq!(json, "\"exit_multiple\"");
        let parsed: TerminalMethod = serde_json::from_str("\"gordon\"").unwrap();
        assert_eq!(parsed, TerminalMethod::Gordon);
    }

    #[test]
    fn test_missing_row_fields_default_to_zero() {
        let row: HistoricalFinancialRow =
            serde_json::from_str(r#"{"year": 2023, "revenue": 120.0}"#).unwrap();
        assert_eq!(row.year, 2023);
        assert_eq!(row.revenue, 120.0);
        assert_eq!(row.fcff, 0.0);
        assert_eq!(row.minority_interest, 0.0);
    }

    #[test]
    fn test_latest_row_ignores_input_order() {
        let data = DcfData {
            historical: vec![
                HistoricalFinancialRow { year: 2023, revenue: 3.0, ..Default::default() },
                HistoricalFinancialRow { year: 2021, revenue: 1.0, ..Default::default() },
                HistoricalFinancialRow { year: 2022, revenue: 2.0, ..Default::default() },
            ],
            ..Default::default()
        };
        assert_eq!(data.latest_row().unwrap().year, 2023);
        let years: Vec<i32> = data.sorted_history().iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2021, 2022, 2023]);
    }
}
