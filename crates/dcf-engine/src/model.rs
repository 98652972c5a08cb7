use tracing::debug;
use valuation_core::{
    merge_assumptions, AssumptionOverlay, DcfData, DcfModel, HistoricalFinancialRow,
    ModelAssumptions, ProjectionYear, ValuationError, ValuationResult, Valuator,
};

use crate::capital_cost::capital_cost;
use crate::projection::{forecast_projections, historical_projections};
use crate::valuation::run_valuation;

fn validate<'a>(
    data: &'a DcfData,
    assumptions: &ModelAssumptions,
) -> Result<&'a HistoricalFinancialRow, ValuationError> {
    let latest = data.latest_row().ok_or_else(|| {
        ValuationError::InsufficientData(format!(
            "no historical financials for {}",
            data.company.symbol
        ))
    })?;
    if assumptions.forecast_years == 0 {
        return Err(ValuationError::InvalidAssumptions(
            "forecast horizon must be at least one year".to_string(),
        ));
    }
    Ok(latest)
}

/// Projection series plus valuation, without assembling the final model.
fn evaluate(
    data: &DcfData,
    assumptions: &ModelAssumptions,
) -> Result<(Vec<ProjectionYear>, Vec<ProjectionYear>, ValuationResult), ValuationError> {
    let latest = validate(data, assumptions)?;
    let capital = capital_cost(assumptions);
    let history = historical_projections(&data.historical);
    let forecast = forecast_projections(&history, assumptions, capital.wacc);
    let valuation = run_valuation(
        &history,
        &forecast,
        assumptions,
        &capital,
        latest,
        data.company.diluted_shares,
        data.market.current_price,
    )?;
    Ok((history, forecast, valuation))
}

/// Full projection -> terminal -> valuation pipeline.
pub fn run_model(data: &DcfData, assumptions: &ModelAssumptions) -> Result<DcfModel, ValuationError> {
    let (history, mut forecast, valuation) = evaluate(data, assumptions)?;

    if let Some(terminal) = forecast.last_mut() {
        terminal.terminal_value = Some(valuation.terminal_value);
        terminal.discounted_terminal_value = Some(valuation.pv_terminal);
    }

    debug!(
        symbol = %data.company.symbol,
        years = assumptions.forecast_years,
        value_per_share = valuation.value_per_share,
        "model run"
    );

    let mut projections = history;
    projections.extend(forecast);
    Ok(DcfModel {
        assumptions: assumptions.clone(),
        projections,
        valuation,
    })
}

/// Merge `changes` onto the model's assumptions and re-run. `current` is untouched.
pub fn update_model(
    data: &DcfData,
    current: &DcfModel,
    changes: &AssumptionOverlay,
) -> Result<DcfModel, ValuationError> {
    run_model(data, &merge_assumptions(&current.assumptions, changes))
}

/// Valuation only, for `overlay` applied to `base`.
pub fn run_scenario(
    data: &DcfData,
    base: &ModelAssumptions,
    overlay: &AssumptionOverlay,
) -> Result<ValuationResult, ValuationError> {
    evaluate(data, &merge_assumptions(base, overlay)).map(|(_, _, valuation)| valuation)
}

/// [`Valuator`] over one company's data.
#[derive(Debug, Clone, Copy)]
pub struct DcfEngine<'a> {
    data: &'a DcfData,
}

impl<'a> DcfEngine<'a> {
    pub fn new(data: &'a DcfData) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &'a DcfData {
        self.data
    }
}

impl Valuator for DcfEngine<'_> {
    fn current_price(&self) -> f64 {
        self.data.market.current_price
    }

    fn run(&self, assumptions: &ModelAssumptions) -> Result<DcfModel, ValuationError> {
        run_model(self.data, assumptions)
    }

    fn valuate(&self, assumptions: &ModelAssumptions) -> Result<ValuationResult, ValuationError> {
        evaluate(self.data, assumptions).map(|(_, _, valuation)| valuation)
    }
}
