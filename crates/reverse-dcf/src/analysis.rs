//! What the market price implies, axis by axis.
//!
//! Axes are solved independently: each solution holds every other assumption
//! at its base value, so the four answers are alternatives, not a joint fit.

use serde::{Deserialize, Serialize};
use tracing::info;
use valuation_core::{ModelAssumptions, ValuationError, Valuator};

use crate::solver::{solve_axis, AxisSolution, SolveAxis, SolverConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feasibility {
    High,
    Medium,
    Low,
}

impl Feasibility {
    /// 4 plausible axes is High, 2-3 Medium, fewer Low.
    pub fn from_passing(count: usize) -> Self {
        match count {
            4.. => Feasibility::High,
            2 | 3 => Feasibility::Medium,
            _ => Feasibility::Low,
        }
    }
}

impl std::fmt::Display for Feasibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feasibility::High => write!(f, "High"),
            Feasibility::Medium => write!(f, "Medium"),
            Feasibility::Low => write!(f, "Low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketExpectations {
    /// Target above the model's own value
    pub is_optimistic: bool,
    pub is_realistic: bool,
    pub key_drivers: Vec<String>,
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityAssessment {
    pub terminal_growth_feasible: bool,
    pub wacc_reasonable: bool,
    pub growth_achievable: bool,
    pub margins_realistic: bool,
    pub overall: Feasibility,
}

impl FeasibilityAssessment {
    fn assess(tg: &AxisSolution, wacc: &AxisSolution, growth: &AxisSolution, margin: &AxisSolution) -> Self {
        let terminal_growth_feasible = (0.015..=0.045).contains(&tg.value);
        let wacc_reasonable = (0.06..=0.15).contains(&wacc.value);
        let growth_achievable = (-0.05..=0.25).contains(&growth.average);
        let margins_realistic = (0.05..=0.35).contains(&margin.average);
        let passing = [terminal_growth_feasible, wacc_reasonable, growth_achievable, margins_realistic]
            .iter()
            .filter(|&&ok| ok)
            .count();
        Self {
            terminal_growth_feasible,
            wacc_reasonable,
            growth_achievable,
            margins_realistic,
            overall: Feasibility::from_passing(passing),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseReport {
    pub target_price: f64,
    pub current_model_price: f64,
    pub terminal_growth: AxisSolution,
    pub wacc: AxisSolution,
    pub revenue_growth: AxisSolution,
    pub operating_margin: AxisSolution,
    pub market_expectations: MarketExpectations,
    pub feasibility: FeasibilityAssessment,
}

fn market_expectations(
    target: f64,
    model_price: f64,
    tg: &AxisSolution,
    wacc: &AxisSolution,
    growth: &AxisSolution,
    margin: &AxisSolution,
    overall: Feasibility,
) -> MarketExpectations {
    let mut key_drivers = Vec::new();
    let mut risk_factors = Vec::new();

    if tg.value > 0.04 {
        key_drivers.push("High terminal growth expectations".to_string());
        if tg.value > 0.05 {
            risk_factors.push("Terminal growth above GDP growth rate".to_string());
        }
    }
    if wacc.value < 0.08 {
        key_drivers.push("Low discount rate assumptions".to_string());
        if wacc.value < 0.06 {
            risk_factors.push("WACC below risk-free rate plus a reasonable risk premium".to_string());
        }
    }
    if growth.average > 0.15 {
        key_drivers.push("Aggressive revenue growth expectations".to_string());
        if growth.average > 0.20 {
            risk_factors.push("Revenue growth above historical industry averages".to_string());
        }
    }
    if margin.average > 0.25 {
        key_drivers.push("Margin expansion expectations".to_string());
        if margin.average > 0.30 {
            risk_factors.push("Operating margins above industry benchmarks".to_string());
        }
    }

    MarketExpectations {
        is_optimistic: target > model_price,
        is_realistic: overall != Feasibility::Low,
        key_drivers,
        risk_factors,
    }
}

/// Solve all four axes for `target_price` (the market price when `None`).
///
/// Only a failure of the unmodified base run is an error; axis
/// non-convergence is reported inside each [`AxisSolution`].
pub fn run_reverse_analysis<V: Valuator + ?Sized>(
    valuator: &V,
    base: &ModelAssumptions,
    target_price: Option<f64>,
    config: &SolverConfig,
) -> Result<ReverseReport, ValuationError> {
    let target = target_price.unwrap_or_else(|| valuator.current_price());
    let current_model_price = valuator.valuate(base)?.value_per_share;

    let solve = |axis| solve_axis(valuator, base, axis, target, config);
    let terminal_growth = solve(SolveAxis::TerminalGrowth);
    let wacc = solve(SolveAxis::Wacc);
    let revenue_growth = solve(SolveAxis::RevenueGrowth);
    let operating_margin = solve(SolveAxis::OperatingMargin);

    let feasibility = FeasibilityAssessment::assess(&terminal_growth, &wacc, &revenue_growth, &operating_margin);
    let market_expectations = market_expectations(
        target,
        current_model_price,
        &terminal_growth,
        &wacc,
        &revenue_growth,
        &operating_margin,
        feasibility.overall,
    );

    info!(
        target,
        current_model_price,
        implied_terminal_growth = terminal_growth.value,
        implied_wacc = wacc.value,
        feasibility = %feasibility.overall,
        "reverse analysis complete"
    );

    Ok(ReverseReport {
        target_price: target,
        current_model_price,
        terminal_growth,
        wacc,
        revenue_growth,
        operating_margin,
        market_expectations,
        feasibility,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredAssumptions {
    pub terminal_growth: f64,
    pub wacc: f64,
    pub avg_revenue_growth: f64,
    pub avg_operating_margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatIfResult {
    pub target_price: f64,
    pub required: RequiredAssumptions,
    pub feasibility: Feasibility,
    pub recommendation: String,
}

/// Required assumptions and a verdict for each price in `targets`.
pub fn run_what_if_analysis<V: Valuator + ?Sized>(
    valuator: &V,
    base: &ModelAssumptions,
    targets: &[f64],
    config: &SolverConfig,
) -> Result<Vec<WhatIfResult>, ValuationError> {
    let market_price = valuator.current_price();
    targets
        .iter()
        .map(|&target| {
            let report = run_reverse_analysis(valuator, base, Some(target), config)?;
            let recommendation = match report.feasibility.overall {
                Feasibility::High if target > market_price => "Achievable upside",
                Feasibility::High => "Fair value",
                Feasibility::Medium => "Requires optimistic assumptions",
                Feasibility::Low => "Unrealistic expectations",
            };
            Ok(WhatIfResult {
                target_price: target,
                required: RequiredAssumptions {
                    terminal_growth: report.terminal_growth.value,
                    wacc: report.wacc.value,
                    avg_revenue_growth: report.revenue_growth.average,
                    avg_operating_margin: report.operating_margin.average,
                },
                feasibility: report.feasibility.overall,
                recommendation: recommendation.to_string(),
            })
        })
        .collect()
}
