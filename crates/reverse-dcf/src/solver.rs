//! One-dimensional bisection on value per share.
//!
//! Each axis maps a scalar `x` onto a full assumption set. The price is assumed
//! monotone in `x`; the sign of that relationship is the axis `direction`.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use valuation_core::stats::mean;
use valuation_core::{value_for_year, EngineConfig, ModelAssumptions, TerminalMethod, ValuationError, Valuator};

use dcf_engine::implied_equity_risk_premium;

/// Search stops once the bracket is narrower than this.
pub const MIN_BRACKET_WIDTH: f64 = 1e-12;

const GROWTH_FADE: f64 = 0.8;
const MARGIN_FLOOR: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveAxis {
    TerminalGrowth,
    Wacc,
    RevenueGrowth,
    OperatingMargin,
}

/// Search bracket and price direction for an axis.
/// `direction` is +1 when price rises with the axis value, -1 when it falls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSpec {
    pub axis: SolveAxis,
    pub low: f64,
    pub high: f64,
    pub direction: i8,
}

pub const AXIS_TABLE: [AxisSpec; 4] = [
    SolveAxis::TerminalGrowth.spec(),
    SolveAxis::Wacc.spec(),
    SolveAxis::RevenueGrowth.spec(),
    SolveAxis::OperatingMargin.spec(),
];

impl SolveAxis {
    pub const ALL: [SolveAxis; 4] = [
        SolveAxis::TerminalGrowth,
        SolveAxis::Wacc,
        SolveAxis::RevenueGrowth,
        SolveAxis::OperatingMargin,
    ];

    pub const fn spec(self) -> AxisSpec {
        let (low, high, direction) = match self {
            SolveAxis::TerminalGrowth => (0.005, 0.08, 1),
            SolveAxis::Wacc => (0.04, 0.20, -1),
            SolveAxis::RevenueGrowth => (-0.10, 0.50, 1),
            SolveAxis::OperatingMargin => (0.01, 0.60, 1),
        };
        AxisSpec { axis: self, low, high, direction }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SolveAxis::TerminalGrowth => "Terminal Growth",
            SolveAxis::Wacc => "WACC",
            SolveAxis::RevenueGrowth => "Revenue Growth",
            SolveAxis::OperatingMargin => "Operating Margin",
        }
    }

    /// Assumptions with this axis set to `x`, plus the per-year series for series axes.
    pub fn assumptions_at(
        &self,
        base: &ModelAssumptions,
        x: f64,
    ) -> Result<(ModelAssumptions, Option<Vec<f64>>), ValuationError> {
        let mut a = base.clone();
        let horizon = base.forecast_years;
        match self {
            SolveAxis::TerminalGrowth => {
                a.terminal_growth_rate = x;
                a.terminal_method = TerminalMethod::Gordon;
                Ok((a, None))
            }
            SolveAxis::Wacc => {
                a.equity_risk_premium = implied_equity_risk_premium(x, base)?;
                Ok((a, None))
            }
            SolveAxis::RevenueGrowth => {
                let series: Vec<f64> = (0..horizon).map(|i| x * GROWTH_FADE.powi(i as i32)).collect();
                a.revenue_growth_rates = series.clone();
                Ok((a, Some(series)))
            }
            SolveAxis::OperatingMargin => {
                // linear ramp from each year's base margin to x in the final year
                let series: Vec<f64> = (0..horizon)
                    .map(|i| {
                        let start = value_for_year(&base.operating_margins, i).unwrap_or(x);
                        let ramped = start + (x - start) * (i + 1) as f64 / horizon as f64;
                        ramped.max(MARGIN_FLOOR)
                    })
                    .collect();
                a.operating_margins = series.clone();
                Ok((a, Some(series)))
            }
        }
    }
}

impl std::fmt::Display for SolveAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Price tolerance in currency units
    pub tolerance: f64,
    pub max_iterations: usize,
    pub deadline: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            max_iterations: 100,
            deadline: None,
        }
    }
}

impl From<&EngineConfig> for SolverConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            tolerance: config.solver_tolerance,
            max_iterations: config.solver_max_iterations,
            deadline: config.deadline(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSolution {
    pub axis: SolveAxis,
    pub value: f64,
    /// Per-year values for the revenue growth and operating margin axes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implied_series: Option<Vec<f64>>,
    /// Mean of the series, or `value` for scalar axes
    pub average: f64,
    pub iterations: usize,
    pub converged: bool,
    /// Price at `value`; NaN if that run failed
    pub final_price: f64,
}

fn price_at<V: Valuator + ?Sized>(
    valuator: &V,
    base: &ModelAssumptions,
    axis: SolveAxis,
    x: f64,
) -> (Option<f64>, Option<Vec<f64>>) {
    match axis.assumptions_at(base, x) {
        Ok((assumptions, series)) => {
            let price = valuator
                .valuate(&assumptions)
                .ok()
                .map(|v| v.value_per_share)
                .filter(|p| p.is_finite());
            (price, series)
        }
        Err(e) => {
            debug!(axis = %axis, x, error = %e, "axis mapping failed");
            (None, None)
        }
    }
}

fn solution(
    axis: SolveAxis,
    value: f64,
    series: Option<Vec<f64>>,
    iterations: usize,
    converged: bool,
    price: Option<f64>,
) -> AxisSolution {
    let average = series.as_deref().map(mean).unwrap_or(value);
    AxisSolution {
        axis,
        value,
        implied_series: series,
        average,
        iterations,
        converged,
        final_price: price.unwrap_or(f64::NAN),
    }
}

/// Bisect `axis` until value per share is within `config.tolerance` of `target`.
///
/// Never fails: when the loop runs out of iterations, time or bracket width the
/// midpoint of the last bracket is returned with `converged: false`. A failed
/// or non-finite evaluation is treated as a price above target.
pub fn solve_axis<V: Valuator + ?Sized>(
    valuator: &V,
    base: &ModelAssumptions,
    axis: SolveAxis,
    target: f64,
    config: &SolverConfig,
) -> AxisSolution {
    let spec = axis.spec();
    let rising = spec.direction > 0;
    let (mut low, mut high) = (spec.low, spec.high);
    let started = Instant::now();
    let mut iterations = 0;

    while iterations < config.max_iterations && high - low >= MIN_BRACKET_WIDTH {
        if config.deadline.is_some_and(|d| started.elapsed() >= d) {
            warn!(axis = %axis, iterations, "solver deadline reached");
            break;
        }
        let mid = (low + high) / 2.0;
        iterations += 1;

        let (price, series) = price_at(valuator, base, axis, mid);
        match price {
            Some(p) if (p - target).abs() < config.tolerance => {
                debug!(axis = %axis, value = mid, iterations, "solver converged");
                return solution(axis, mid, series, iterations, true, Some(p));
            }
            Some(p) => {
                if (p < target) == rising {
                    low = mid;
                } else {
                    high = mid;
                }
            }
            None => {
                if rising {
                    high = mid;
                } else {
                    low = mid;
                }
            }
        }
    }

    let mid = (low + high) / 2.0;
    let (price, series) = price_at(valuator, base, axis, mid);
    warn!(
        axis = %axis,
        value = mid,
        iterations,
        target,
        final_price = price.unwrap_or(f64::NAN),
        "solver did not converge"
    );
    solution(axis, mid, series, iterations, false, price)
}
