//! Single-company unlevered FCFF discounted-cash-flow model.
//!
//! [`run_model`] is the entry point every other analysis builds on: capital
//! cost, projection, terminal value and valuation are recomputed in full on
//! every call.

pub mod capital_cost;
pub mod defaults;
pub mod model;
pub mod projection;
pub mod terminal;
pub mod valuation;

pub use capital_cost::{
    after_tax_cost_of_debt, capital_cost, cost_of_equity, estimate_cost_of_debt,
    implied_equity_risk_premium, industry_beta, interest_coverage, wacc, CapitalCost,
};
pub use defaults::{build_default_assumptions, calculate_historical_metrics, HistoricalMetrics};
pub use model::{run_model, run_scenario, update_model, DcfEngine};
pub use projection::{forecast_projections, historical_projections};
pub use terminal::{TerminalMetrics, TerminalValue, MIN_TERMINAL_SPREAD};
pub use valuation::{calculate_cagr, equity_bridge, EquityBridge};
