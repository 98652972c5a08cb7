use serde::{Deserialize, Serialize};
use tracing::warn;
use valuation_core::{ModelAssumptions, ProjectionYear, TerminalMethod};

/// Denominator used by the Gordon model when WACC does not exceed terminal growth.
pub const MIN_TERMINAL_SPREAD: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalValue {
    pub value: f64,
    pub discounted: f64,
    /// Gordon spread fell back to [`MIN_TERMINAL_SPREAD`].
    pub spread_clamped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalMetrics {
    pub ev_revenue: f64,
    pub ev_ebit: f64,
    pub fcff_yield: f64,
}

/// Gordon growth on next year's cash flow.
///
/// If `wacc <= growth` the spread is replaced by [`MIN_TERMINAL_SPREAD`]. The
/// result is finite and positive for positive cash flow, but jumps at the
/// threshold; callers see the flag and the diagnostics report it.
pub fn gordon_terminal_value(next_year_fcff: f64, wacc: f64, growth: f64) -> (f64, bool) {
    if wacc <= growth {
        (next_year_fcff / MIN_TERMINAL_SPREAD, true)
    } else {
        (next_year_fcff / (wacc - growth), false)
    }
}

pub fn exit_multiple_terminal_value(terminal_ebit: f64, multiple: f64) -> f64 {
    terminal_ebit * multiple
}

/// Terminal value for the final forecast year under the chosen method.
pub fn terminal_value(
    terminal_year: &ProjectionYear,
    wacc: f64,
    assumptions: &ModelAssumptions,
) -> TerminalValue {
    let (value, spread_clamped) = match assumptions.terminal_method {
        TerminalMethod::Gordon => {
            let g = assumptions.terminal_growth_rate;
            let next_fcff = terminal_year.fcff * (1.0 + g);
            gordon_terminal_value(next_fcff, wacc, g)
        }
        TerminalMethod::ExitMultiple => (
            exit_multiple_terminal_value(terminal_year.ebit, assumptions.exit_multiple),
            false,
        ),
    };

    if spread_clamped {
        warn!(
            wacc,
            terminal_growth = assumptions.terminal_growth_rate,
            "WACC does not exceed terminal growth, using minimum spread of {}",
            MIN_TERMINAL_SPREAD
        );
    }

    TerminalValue {
        value,
        discounted: value / terminal_year.discount_factor,
        spread_clamped,
    }
}

pub fn terminal_metrics(terminal_year: &ProjectionYear, terminal_value: f64) -> TerminalMetrics {
    TerminalMetrics {
        ev_revenue: terminal_value / terminal_year.revenue,
        ev_ebit: terminal_value / terminal_year.ebit,
        fcff_yield: terminal_year.fcff / terminal_value,
    }
}
