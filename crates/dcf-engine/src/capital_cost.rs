use serde::{Deserialize, Serialize};
use valuation_core::{ModelAssumptions, ValuationError};

/// Cost-of-capital components for one assumption set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalCost {
    pub cost_of_equity: f64,
    pub after_tax_cost_of_debt: f64,
    pub wacc: f64,
}

/// CAPM: risk-free + beta * equity risk premium.
pub fn cost_of_equity(risk_free_rate: f64, beta: f64, equity_risk_premium: f64) -> f64 {
    risk_free_rate + beta * equity_risk_premium
}

pub fn after_tax_cost_of_debt(cost_of_debt: f64, tax_rate: f64) -> f64 {
    cost_of_debt * (1.0 - tax_rate)
}

/// Weighted by target capital structure, not market values.
pub fn wacc(cost_of_equity: f64, after_tax_cost_of_debt: f64, debt_to_capital: f64) -> f64 {
    (1.0 - debt_to_capital) * cost_of_equity + debt_to_capital * after_tax_cost_of_debt
}

pub fn capital_cost(assumptions: &ModelAssumptions) -> CapitalCost {
    let ke = cost_of_equity(
        assumptions.risk_free_rate,
        assumptions.beta,
        assumptions.equity_risk_premium,
    );
    let kd = after_tax_cost_of_debt(assumptions.cost_of_debt, assumptions.tax_rate);
    CapitalCost {
        cost_of_equity: ke,
        after_tax_cost_of_debt: kd,
        wacc: wacc(ke, kd, assumptions.target_debt_to_capital),
    }
}

/// Equity risk premium that makes [`capital_cost`] return `target_wacc`
/// with every other input held fixed.
pub fn implied_equity_risk_premium(
    target_wacc: f64,
    assumptions: &ModelAssumptions,
) -> Result<f64, ValuationError> {
    let equity_weight = 1.0 - assumptions.target_debt_to_capital;
    if equity_weight.abs() < 1e-9 {
        return Err(ValuationError::InvalidAssumptions(
            "WACC does not depend on equity when debt/capital is 100%".to_string(),
        ));
    }
    if assumptions.beta.abs() < 1e-9 {
        return Err(ValuationError::InvalidAssumptions(
            "WACC does not depend on the equity risk premium when beta is 0".to_string(),
        ));
    }
    let debt_part = assumptions.target_debt_to_capital
        * after_tax_cost_of_debt(assumptions.cost_of_debt, assumptions.tax_rate);
    let required_ke = (target_wacc - debt_part) / equity_weight;
    Ok((required_ke - assumptions.risk_free_rate) / assumptions.beta)
}

/// EBIT / interest expense. No interest means unlimited coverage.
pub fn interest_coverage(ebit: f64, interest_expense: f64) -> f64 {
    if interest_expense == 0.0 {
        return f64::INFINITY;
    }
    ebit / interest_expense
}

/// Risk-free rate plus a synthetic-rating credit spread keyed on interest coverage.
pub fn estimate_cost_of_debt(risk_free_rate: f64, interest_coverage: Option<f64>) -> f64 {
    let spread = match interest_coverage {
        None => 0.03,
        Some(c) if c == 0.0 || c.is_nan() => 0.03,
        Some(c) if c > 8.5 => 0.0075,  // AAA/AA
        Some(c) if c > 6.5 => 0.01,    // A
        Some(c) if c > 4.25 => 0.015,  // BBB
        Some(c) if c > 3.0 => 0.025,   // BB
        Some(c) if c > 1.75 => 0.04,   // B
        Some(c) if c > 1.25 => 0.06,   // CCC
        Some(_) => 0.10,
    };
    risk_free_rate + spread
}

/// Rough industry beta. Unknown industries get the market beta.
pub fn industry_beta(industry: &str) -> f64 {
    match industry {
        "Technology" => 1.2,
        "Software" => 1.3,
        "Consumer Electronics" => 1.15,
        "Healthcare" => 0.9,
        "Financial Services" => 1.1,
        "Energy" => 1.4,
        "Utilities" => 0.7,
        "Consumer Staples" => 0.6,
        "Retail" => 1.0,
        "Telecommunications" => 0.8,
        "Industrial" => 1.1,
        "Materials" => 1.2,
        "Real Estate" => 0.8,
        _ => 1.0,
    }
}
