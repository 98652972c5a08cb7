//! Tornado ranking and two-parameter sensitivity grids.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use valuation_core::{merge_assumptions, ModelAssumptions, ValuationError, Valuator};

use crate::parameters::Parameter;

/// One tornado input: swing `parameter` by ±`variation` (0.2 = 20%) of its base value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TornadoParameter {
    pub parameter: Parameter,
    pub variation: f64,
}

impl TornadoParameter {
    pub fn new(parameter: Parameter, variation: f64) -> Self {
        Self { parameter, variation }
    }
}

pub fn default_tornado_parameters() -> Vec<TornadoParameter> {
    vec![
        TornadoParameter::new(Parameter::TerminalGrowthRate, 0.2),
        TornadoParameter::new(Parameter::RevenueGrowth, 0.25),
        TornadoParameter::new(Parameter::OperatingMargin, 0.15),
        TornadoParameter::new(Parameter::TaxRate, 0.1),
        TornadoParameter::new(Parameter::CapexPercent, 0.2),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TornadoBar {
    pub parameter: Parameter,
    pub label: String,
    pub base_value: f64,
    pub low_value: f64,
    pub high_value: f64,
    pub low_price: f64,
    pub high_price: f64,
    /// |high_price - low_price|
    pub impact: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TornadoChart {
    pub base_price: f64,
    /// Descending by impact
    pub bars: Vec<TornadoBar>,
}

fn price_at<V: Valuator + ?Sized>(
    valuator: &V,
    assumptions: &ModelAssumptions,
) -> Result<f64, ValuationError> {
    valuator.valuate(assumptions).map(|v| v.value_per_share)
}

/// Rank `parameters` by how far their swing moves value per share.
///
/// A parameter whose low or high run fails is left out of the chart.
pub fn run_tornado<V: Valuator + ?Sized>(
    valuator: &V,
    base: &ModelAssumptions,
    parameters: &[TornadoParameter],
) -> Result<TornadoChart, ValuationError> {
    let base_price = price_at(valuator, base)?;

    let mut bars: Vec<TornadoBar> = parameters
        .iter()
        .filter_map(|tp| {
            let p = tp.parameter;
            let base_value = p.base_value(base);
            let low_value = base_value * (1.0 - tp.variation);
            let high_value = base_value * (1.0 + tp.variation);

            let prices = price_at(valuator, &p.apply(base, low_value))
                .and_then(|low| price_at(valuator, &p.apply(base, high_value)).map(|high| (low, high)));
            match prices {
                Ok((low_price, high_price)) => Some(TornadoBar {
                    parameter: p,
                    label: p.label().to_string(),
                    base_value,
                    low_value,
                    high_value,
                    low_price,
                    high_price,
                    impact: (high_price - low_price).abs(),
                }),
                Err(e) => {
                    warn!(parameter = %p, error = %e, "tornado run failed, skipping parameter");
                    None
                }
            }
        })
        .collect();

    // non-finite impacts sink to the bottom
    let rank = |bar: &TornadoBar| if bar.impact.is_finite() { bar.impact } else { f64::NEG_INFINITY };
    bars.sort_by(|a, b| rank(b).total_cmp(&rank(a)));

    Ok(TornadoChart { base_price, bars })
}

/// Linearly spaced values from `min` to `max` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
    pub steps: usize,
}

impl ParameterRange {
    pub fn new(min: f64, max: f64, steps: usize) -> Self {
        Self { min, max, steps }
    }

    /// A single step yields `[min]`.
    pub fn values(&self) -> Vec<f64> {
        match self.steps {
            0 => Vec::new(),
            1 => vec![self.min],
            n => (0..n)
                .map(|i| self.min + (self.max - self.min) * (i as f64 / (n - 1) as f64))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseCasePoint {
    pub row_value: f64,
    pub column_value: f64,
    pub value_per_share: Option<f64>,
}

/// Value per share over the cross product of two parameter value lists.
/// `cells[i][j]` pairs `row_values[i]` with `column_values[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityMatrix {
    pub row_parameter: Parameter,
    pub column_parameter: Parameter,
    pub row_values: Vec<f64>,
    pub column_values: Vec<f64>,
    /// `None` where the run failed or produced a non-finite price
    pub cells: Vec<Vec<Option<f64>>>,
    pub base_case: BaseCasePoint,
}

fn cell<V: Valuator + ?Sized>(valuator: &V, assumptions: &ModelAssumptions) -> Option<f64> {
    price_at(valuator, assumptions).ok().filter(|p| p.is_finite())
}

/// Full model run per cell; rows are evaluated in parallel.
pub fn run_sensitivity_grid<V: Valuator + ?Sized>(
    valuator: &V,
    base: &ModelAssumptions,
    row_parameter: Parameter,
    row_values: &[f64],
    column_parameter: Parameter,
    column_values: &[f64],
) -> SensitivityMatrix {
    let cells: Vec<Vec<Option<f64>>> = row_values
        .par_iter()
        .map(|&rv| {
            let row_overlay = row_parameter.overlay(base, rv);
            column_values
                .iter()
                .map(|&cv| {
                    let overlay = row_overlay.clone().combine(column_parameter.overlay(base, cv));
                    cell(valuator, &merge_assumptions(base, &overlay))
                })
                .collect()
        })
        .collect();

    debug!(
        rows = row_values.len(),
        columns = column_values.len(),
        failed = cells.iter().flatten().filter(|c| c.is_none()).count(),
        "sensitivity grid"
    );

    SensitivityMatrix {
        row_parameter,
        column_parameter,
        row_values: row_values.to_vec(),
        column_values: column_values.to_vec(),
        cells,
        base_case: BaseCasePoint {
            row_value: row_parameter.base_value(base),
            column_value: column_parameter.base_value(base),
            value_per_share: cell(valuator, base),
        },
    }
}

pub fn run_sensitivity_matrix<V: Valuator + ?Sized>(
    valuator: &V,
    base: &ModelAssumptions,
    row_parameter: Parameter,
    row_range: ParameterRange,
    column_parameter: Parameter,
    column_range: ParameterRange,
) -> SensitivityMatrix {
    run_sensitivity_grid(
        valuator,
        base,
        row_parameter,
        &row_range.values(),
        column_parameter,
        &column_range.values(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_range_values() {
        let v = ParameterRange::new(0.02, 0.04, 3).values();
        assert_eq!(v.len(), 3);
        assert_relative_eq!(v[0], 0.02);
        assert_relative_eq!(v[1], 0.03, epsilon = 1e-12);
        assert_relative_eq!(v[2], 0.04, epsilon = 1e-12);
        assert_eq!(ParameterRange::new(0.05, 0.09, 1).values(), vec![0.05]);
        assert!(ParameterRange::new(0.05, 0.09, 0).values().is_empty());
    }

    #[test]
    fn test_default_tornado_set() {
        let params = default_tornado_parameters();
        assert_eq!(params.len(), 5);
        assert_eq!(params[1].parameter, Parameter::RevenueGrowth);
        assert_eq!(params[1].variation, 0.25);
    }
}
