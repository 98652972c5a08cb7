//! Partial assumption overlays and the hold-last-value accessor.
//!
//! Scenario overlays and Monte Carlo / sensitivity perturbations all go through
//! [`merge_assumptions`], so there is exactly one merge path.

use serde::{Deserialize, Serialize};

use crate::types::{ModelAssumptions, TerminalMethod};

/// Value of a per-year series for forecast year `index` (0-based).
///
/// A series shorter than the horizon holds its last element for the remaining
/// years. Returns `None` only for an empty series.
pub fn value_for_year(values: &[f64], index: usize) -> Option<f64> {
    values.get(index).or_else(|| values.last()).copied()
}

/// A partial set of assumptions. Every `Some` field fully replaces the
/// corresponding base field when merged (series are replaced, not patched).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssumptionOverlay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_years: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_method: Option<TerminalMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_free_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_risk_premium: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_of_debt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_debt_to_capital: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_growth_rates: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_growth_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_multiple: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_margins: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_margins: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depreciation_percent: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capex_percent: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nwc_percent: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_compensation_percent: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_stock_compensation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_adjustment: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_adjustment: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minority_interest_adjustment: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investments_adjustment: Option<bool>,
}

impl AssumptionOverlay {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn combine(self, other: AssumptionOverlay) -> Self {
        let mut combined = self;
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $( if other.$field.is_some() { combined.$field = other.$field; } )*
            };
        }
        take!(
            forecast_years,
            terminal_method,
            risk_free_rate,
            equity_risk_premium,
            beta,
            cost_of_debt,
            tax_rate,
            target_debt_to_capital,
            revenue_growth_rates,
            terminal_growth_rate,
            exit_multiple,
            gross_margins,
            operating_margins,
            depreciation_percent,
            capex_percent,
            nwc_percent,
            stock_compensation_percent,
            include_stock_compensation,
            cash_adjustment,
            debt_adjustment,
            minority_interest_adjustment,
            investments_adjustment,
        );
        combined
    }
}

/// Shallow merge: returns `base` with every field present in `overlay` replaced.
pub fn merge_assumptions(base: &ModelAssumptions, overlay: &AssumptionOverlay) -> ModelAssumptions {
    let mut merged = base.clone();
    macro_rules! apply {
        ($($field:ident),* $(,)?) => {
            $( if let Some(value) = &overlay.$field { merged.$field = value.clone(); } )*
        };
    }
    apply!(
        forecast_years,
        terminal_method,
        risk_free_rate,
        equity_risk_premium,
        beta,
        cost_of_debt,
        tax_rate,
        target_debt_to_capital,
        revenue_growth_rates,
        terminal_growth_rate,
        exit_multiple,
        gross_margins,
        operating_margins,
        depreciation_percent,
        capex_percent,
        nwc_percent,
        stock_compensation_percent,
        include_stock_compensation,
        cash_adjustment,
        debt_adjustment,
        minority_interest_adjustment,
        investments_adjustment,
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_for_year_holds_last_value() {
        let series = vec![0.10, 0.08, 0.06];
        assert_eq!(value_for_year(&series, 0), Some(0.10));
        assert_eq!(value_for_year(&series, 2), Some(0.06));
        assert_eq!(value_for_year(&series, 3), Some(0.06));
        assert_eq!(value_for_year(&series, 9), Some(0.06));
        assert_eq!(value_for_year(&[], 0), None);
    }

    #[test]
    fn test_empty_overlay_is_identity() {
        let base = ModelAssumptions::default();
        let overlay = AssumptionOverlay::default();
        assert!(overlay.is_empty());
        assert_eq!(merge_assumptions(&base, &overlay), base);
    }

    #[test]
    fn test_overlay_replaces_whole_series() {
        let base = ModelAssumptions::default();
        let overlay = AssumptionOverlay {
            revenue_growth_rates: Some(vec![0.2]),
            beta: Some(1.4),
            ..Default::default()
        };
        let merged = merge_assumptions(&base, &overlay);
        assert_eq!(merged.revenue_growth_rates, vec![0.2]);
        assert_eq!(merged.beta, 1.4);
        assert_eq!(merged.operating_margins, base.operating_margins);
        assert_eq!(merged.tax_rate, base.tax_rate);
    }

    #[test]
    fn test_combine_prefers_later_overlay() {
        let first = AssumptionOverlay {
            beta: Some(0.9),
            tax_rate: Some(0.2),
            ..Default::default()
        };
        let second = AssumptionOverlay {
            beta: Some(1.3),
            ..Default::default()
        };
        let combined = first.combine(second);
        assert_eq!(combined.beta, Some(1.3));
        assert_eq!(combined.tax_rate, Some(0.2));
    }
}
