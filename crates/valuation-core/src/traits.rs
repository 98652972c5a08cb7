use crate::{DcfModel, ModelAssumptions, ValuationError, ValuationResult};

/// A full projection -> terminal -> valuation pipeline bound to one company.
///
/// Scenario, sensitivity, Monte Carlo and reverse analysis only ever see this
/// trait, so each of their runs is an independent full re-evaluation.
pub trait Valuator: Sync {
    /// Market price the valuation is compared against.
    fn current_price(&self) -> f64;

    /// Run the whole model for `assumptions`.
    fn run(&self, assumptions: &ModelAssumptions) -> Result<DcfModel, ValuationError>;

    /// Valuation only. Implementations may skip assembling the projection series.
    fn valuate(&self, assumptions: &ModelAssumptions) -> Result<ValuationResult, ValuationError> {
        self.run(assumptions).map(|model| model.valuation)
    }
}
